// SPDX-License-Identifier: GPL-3.0-only

//! Embeds a build version string (`GIT_VERSION`) used in the CLI and the
//! EXIF `Software` tag of written photos.

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-env-changed=BEAUTY_CAMERA_VERSION");

    let package_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();

    // Packagers may pin the version when building from a source tarball
    let version = match std::env::var("BEAUTY_CAMERA_VERSION") {
        Ok(pinned) if !pinned.is_empty() => pinned,
        _ => match short_commit_hash() {
            Some(hash) => format!("{}-{}", package_version, hash),
            None => package_version,
        },
    };

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

fn short_commit_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!hash.is_empty()).then_some(hash)
}
