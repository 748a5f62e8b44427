//! Global constants for BenchLink
//!
//! This module centralizes commonly used constants across the codebase
//! to improve maintainability and reduce duplication.

/// Default benchmark transfer sizes in bytes (1 KiB up to 512 MiB)
///
/// Used when the caller supplies no size list of its own. The table is
/// sorted ascending before use; small sizes expose per-transfer latency,
/// large sizes expose sustained link bandwidth.
pub const DEFAULT_SIZE_LIST: [u64; 20] = [
    1 << 10,
    2 << 10,
    4 << 10,
    8 << 10,
    16 << 10,
    32 << 10,
    64 << 10,
    128 << 10,
    256 << 10,
    512 << 10,
    1 << 20,
    2 << 20,
    4 << 20,
    8 << 20,
    16 << 20,
    32 << 20,
    64 << 20,
    128 << 20,
    256 << 20,
    512 << 20,
];

/// Maximum single transfer size (1GB)
///
/// Upper bound accepted by configuration validation for one copy operation.
pub const MAX_TRANSFER_SIZE: u64 = 1 << 30;

/// Completion-signal threshold
///
/// Signals are created with this value and the runtime decrements them on
/// copy completion; a transfer is finished once the observed value drops
/// below the threshold.
pub const SIGNAL_DONE_THRESHOLD: i64 = 1;

/// Sentinel NUMA node for agents whose node query failed during discovery
///
/// `u32::MAX` cannot collide with a real NUMA node id, so a partially
/// discovered agent never satisfies a node lookup by accident.
pub const UNKNOWN_NODE: u32 = u32::MAX;

/// Nanoseconds per second, for converting profiling timestamps
pub const NANOS_PER_SEC: f64 = 1_000_000_000.0;
