//! Autosave debouncing.
//!
//! The debounce window is measured from the last successful save, not from
//! the last trigger. Triggers that land inside the window are dropped.

use tabula_core::{AutosaveConfig, Stamp};

/// Whether a timer trigger should save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosaveDecision {
    Save,
    Disabled,
    Paused,
    /// Too soon after the last save
    Debounced,
}

/// What an autosave attempt ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutosaveOutcome {
    /// Saved under this session name
    Saved(String),
    /// Nothing to do: no current session
    NoSession,
    Skipped(AutosaveDecision),
    /// The save failed; the error was logged and swallowed
    Failed(String),
}

/// Debounce and pause state of the autosave timer.
#[derive(Debug, Clone)]
pub struct AutosaveState {
    enabled: bool,
    on_exit: bool,
    debounce_ms: u64,
    paused: bool,
    last_saved: Option<Stamp>,
}

impl AutosaveState {
    pub fn new(enabled: bool, on_exit: bool, debounce_ms: u64) -> Self {
        Self {
            enabled,
            on_exit,
            debounce_ms,
            paused: false,
            last_saved: None,
        }
    }

    pub fn from_config(config: &AutosaveConfig) -> Self {
        Self::new(config.enabled, config.on_exit, config.debounce_ms)
    }

    /// Decide whether a periodic trigger at `now` should save.
    pub fn check(&self, now: Stamp) -> AutosaveDecision {
        if !self.enabled {
            return AutosaveDecision::Disabled;
        }
        if self.paused {
            return AutosaveDecision::Paused;
        }
        match self.last_saved {
            Some(last) if now.millis_since(last) < self.debounce_ms => AutosaveDecision::Debounced,
            _ => AutosaveDecision::Save,
        }
    }

    /// Decide whether the exit-intent save should run. Ignores the debounce
    /// window.
    pub fn check_exit(&self) -> AutosaveDecision {
        if !self.enabled || !self.on_exit {
            AutosaveDecision::Disabled
        } else if self.paused {
            AutosaveDecision::Paused
        } else {
            AutosaveDecision::Save
        }
    }

    pub fn record_save(&mut self, at: Stamp) {
        self.last_saved = Some(at);
    }

    pub fn last_saved(&self) -> Option<Stamp> {
        self.last_saved
    }

    /// Suppress triggers; the timer keeps running.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}
