//! Global statistics collection control
//!
//! This module provides a global flag to enable/disable host-side timing
//! statistics collection. Device-measured profiling timestamps are always
//! collected; the flag only gates additional wall-clock measurements that
//! would otherwise add overhead to tight benchmark loops.

use std::sync::atomic::{AtomicBool, Ordering};

/// Global flag for enabling host-side statistics collection
static STATS_ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable or disable statistics collection globally
pub fn set_stats_enabled(enabled: bool) {
    STATS_ENABLED.store(enabled, Ordering::SeqCst);
}

/// Check if statistics collection is enabled
#[inline]
pub fn is_stats_enabled() -> bool {
    STATS_ENABLED.load(Ordering::Relaxed)
}

/// Macro to conditionally execute timing code only when stats are enabled
#[macro_export]
macro_rules! if_stats {
    ($($code:tt)*) => {
        if $crate::stats::is_stats_enabled() {
            $($code)*
        }
    };
}

/// Macro to measure elapsed time only when stats are enabled
/// Returns Option<Duration> - Some(duration) if stats enabled, None otherwise
#[macro_export]
macro_rules! measure_if_stats {
    ($start:expr) => {
        if $crate::stats::is_stats_enabled() {
            Some($start.elapsed())
        } else {
            None
        }
    };
}
