// SPDX-License-Identifier: GPL-3.0-only

//! Compiled filter programs keyed by filter kind
//!
//! A program is compiled the first time its kind is used and kept for the
//! lifetime of the cache. Parameter changes within a kind (intensity, a
//! different matrix) never reach this cache; they travel as uniforms.

use crate::filters::FilterKind;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::debug;

pub struct ProgramCache<P> {
    programs: HashMap<FilterKind, P>,
    active: Option<FilterKind>,
    compilations: usize,
    swaps: usize,
}

impl<P> ProgramCache<P> {
    pub fn new() -> Self {
        Self {
            programs: HashMap::new(),
            active: None,
            compilations: 0,
            swaps: 0,
        }
    }

    /// Make `kind` the active program, compiling it on first use
    pub fn get_or_compile<E, F>(&mut self, kind: FilterKind, compile: F) -> Result<&P, E>
    where
        F: FnOnce(FilterKind) -> Result<P, E>,
    {
        if self.active != Some(kind) {
            debug!(from = ?self.active, to = kind.as_str(), "Swapping filter program");
            self.active = Some(kind);
            self.swaps += 1;
        }

        match self.programs.entry(kind) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let program = compile(kind)?;
                self.compilations += 1;
                debug!(kind = kind.as_str(), "Compiled filter program");
                Ok(entry.insert(program))
            }
        }
    }

    pub fn active(&self) -> Option<FilterKind> {
        self.active
    }

    /// Number of programs compiled so far
    pub fn compilations(&self) -> usize {
        self.compilations
    }

    /// Number of times the active program changed
    pub fn swaps(&self) -> usize {
        self.swaps
    }

    pub fn contains(&self, kind: FilterKind) -> bool {
        self.programs.contains_key(&kind)
    }
}

impl<P> Default for ProgramCache<P> {
    fn default() -> Self {
        Self::new()
    }
}
