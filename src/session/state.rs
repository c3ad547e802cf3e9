// SPDX-License-Identifier: GPL-3.0-only

//! Mutable session state shared by the producer side and the renderer
//!
//! Everything sits behind one mutex. Writers go through [`SharedState::update`],
//! readers take a [`StateSnapshot`] and never hold the lock while working.

use crate::backends::camera::FocusPoint;
use crate::config::Config;
use crate::constants::EXPOSURE_BIAS_LIMIT;
use crate::filters::{FilterCatalog, FilterDescriptor};
use crate::flash::FlashMode;
use crate::orientation::{OrientationFrame, OrientationTracker};
use crate::preview::{PreviewSettings, PreviewSettingsSource};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub struct SessionState {
    pub filter: FilterDescriptor,
    pub orientation: OrientationFrame,
    pub tracker: OrientationTracker,
    pub flash: FlashMode,
    /// Linear zoom, 0.0 to 1.0
    pub zoom: f32,
    /// Exposure bias in EV
    pub exposure: f32,
    pub focus_point: Option<FocusPoint>,
    pub auto_focus: bool,
    /// Platform id of the active lens
    pub lens_id: Option<String>,
    /// Bumped whenever something that changes preview output changes
    pub preview_generation: u64,
}

impl SessionState {
    pub fn from_config(config: &Config, catalog: &FilterCatalog) -> Self {
        let filter_name = catalog
            .canonical_name(&config.initial_filter)
            .unwrap_or_else(|| config.initial_filter.clone());

        Self {
            filter: FilterDescriptor::new(filter_name, config.initial_intensity),
            orientation: OrientationFrame {
                lens_facing: config.initial_lens,
                locked_ui_orientation: config.locked_ui_orientation,
                ..OrientationFrame::default()
            },
            tracker: OrientationTracker::new(config.orientation_hysteresis_degrees),
            flash: config.initial_flash,
            zoom: clamp_zoom(config.initial_zoom),
            exposure: 0.0,
            focus_point: None,
            auto_focus: true,
            lens_id: None,
            preview_generation: 0,
        }
    }

    /// Mark preview output as changed
    pub fn touch_preview(&mut self) {
        self.preview_generation = self.preview_generation.wrapping_add(1);
    }
}

/// Zoom clamped to 0-1; NaN becomes 0
pub fn clamp_zoom(zoom: f32) -> f32 {
    if zoom.is_nan() { 0.0 } else { zoom.clamp(0.0, 1.0) }
}

/// Exposure bias clamped to the supported EV range
pub fn clamp_exposure(exposure: f32) -> f32 {
    exposure.clamp(-EXPOSURE_BIAS_LIMIT, EXPOSURE_BIAS_LIMIT)
}

/// Immutable copy of the state
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub filter: FilterDescriptor,
    pub orientation: OrientationFrame,
    pub flash: FlashMode,
    pub zoom: f32,
    pub exposure: f32,
    pub focus_point: Option<FocusPoint>,
    pub auto_focus: bool,
    pub lens_id: Option<String>,
    pub preview_generation: u64,
}

#[derive(Debug)]
pub struct SharedState {
    inner: Mutex<SessionState>,
}

impl SharedState {
    pub fn new(state: SessionState) -> Self {
        Self {
            inner: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let state = self.lock();
        StateSnapshot {
            filter: state.filter.clone(),
            orientation: state.orientation,
            flash: state.flash,
            zoom: state.zoom,
            exposure: state.exposure,
            focus_point: state.focus_point,
            auto_focus: state.auto_focus,
            lens_id: state.lens_id.clone(),
            preview_generation: state.preview_generation,
        }
    }

    /// Run `f` with exclusive access
    pub fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        f(&mut self.lock())
    }
}

impl PreviewSettingsSource for SharedState {
    fn preview_settings(&self) -> PreviewSettings {
        let state = self.lock();
        PreviewSettings {
            filter: state.filter.clone(),
            ui_orientation: state.orientation.locked_ui_orientation,
            generation: state.preview_generation,
        }
    }
}
