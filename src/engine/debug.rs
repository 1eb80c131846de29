// src/engine/debug.rs

use std::sync::atomic::{AtomicBool, Ordering};

pub struct DebugFlags {
    pub debug_text: AtomicBool,
    pub field_trace: AtomicBool,
}

impl DebugFlags {
    pub const fn new() -> Self {
        Self {
            debug_text: AtomicBool::new(false),
            field_trace: AtomicBool::new(false),
        }
    }

    pub fn set_debug_text(&self, enabled: bool) {
        self.debug_text.store(enabled, Ordering::Relaxed);
    }

    pub fn set_field_trace(&self, enabled: bool) {
        self.field_trace.store(enabled, Ordering::Relaxed);
    }

    pub fn is_debug_text_enabled(&self) -> bool {
        self.debug_text.load(Ordering::Relaxed)
    }

    /// Per-step stage timings are only logged while this is on
    pub fn is_field_trace_enabled(&self) -> bool {
        self.field_trace.load(Ordering::Relaxed)
    }
}

impl Default for DebugFlags {
    fn default() -> Self {
        Self::new()
    }
}

static DEBUG_FLAGS: DebugFlags = DebugFlags::new();

pub fn debug_flags() -> &'static DebugFlags {
    &DEBUG_FLAGS
}

#[macro_export]
macro_rules! debug_print {
    ($($arg:tt)*) => {
        if $crate::engine::debug::debug_flags().is_debug_text_enabled() {
            $crate::tracing::debug!(file = file!(), line = line!(), "{}", format!($($arg)*));
        }
    };
}

/// Toggle debug text
pub fn toggle_debug_text() {
    let current = DEBUG_FLAGS.is_debug_text_enabled();
    DEBUG_FLAGS.set_debug_text(!current);
    tracing::info!("Debug text: {}", if !current { "ON" } else { "OFF" });
}

/// Toggle per-step field tracing
pub fn toggle_field_trace() {
    let current = DEBUG_FLAGS.is_field_trace_enabled();
    DEBUG_FLAGS.set_field_trace(!current);
    tracing::info!("Field trace: {}", if !current { "ON" } else { "OFF" });
}

/// Set debug text flag
pub fn set_debug_text(enabled: bool) {
    DEBUG_FLAGS.set_debug_text(enabled);
}

/// Set field trace flag
pub fn set_field_trace(enabled: bool) {
    DEBUG_FLAGS.set_field_trace(enabled);
}
