//! Timed asynchronous transfers
//!
//! Drives one (or two, for bidirectional measurements) asynchronous copy
//! operations end-to-end: buffer-pair allocation, completion-signal
//! lifecycle, the active wait, and duration derivation from the runtime's
//! profiling timestamps.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::constants::{NANOS_PER_SEC, SIGNAL_DONE_THRESHOLD};
use crate::runtime::{ComputeRuntime, CopySpan, SignalHandle};
use crate::topology::Topology;
use crate::transfer::allocator::allocate;
use crate::transfer::{TransferError, TransferResult};

/// A completion signal, destroyed on drop
pub struct CompletionSignal<'r, R: ComputeRuntime> {
    rt: &'r R,
    handle: SignalHandle,
}

impl<'r, R: ComputeRuntime> CompletionSignal<'r, R> {
    /// Create a signal with the standard initial value
    pub fn create(rt: &'r R) -> TransferResult<Self> {
        let handle = rt.signal_create(SIGNAL_DONE_THRESHOLD)?;
        Ok(Self { rt, handle })
    }

    /// Runtime handle of the signal
    pub fn handle(&self) -> SignalHandle {
        self.handle
    }
}

impl<R: ComputeRuntime> Drop for CompletionSignal<'_, R> {
    fn drop(&mut self) {
        if let Err(status) = self.rt.signal_destroy(self.handle) {
            debug!("signal destroy failed: {}", status);
        }
    }
}

/// Measure one point-to-point transfer between two NUMA nodes
///
/// Returns the device-measured duration in seconds. For a bidirectional
/// measurement a second buffer pair is allocated with the roles swapped
/// and both copies run concurrently; the reported duration is the window
/// spanning both transfers (latest end minus earliest start), not their
/// sum.
///
/// The completion wait is an active spin with no internal timeout: the
/// thread burns until the device signals, so the profiling timestamps are
/// free of scheduler wait jitter. A stalled transfer therefore blocks the
/// caller indefinitely unless `wait_timeout` is supplied; the timeout is
/// an external bound on the spin, not part of the measurement.
///
/// Every buffer and signal created here is released before returning, on
/// success and on every failure path.
pub fn send_traffic<R: ComputeRuntime>(
    rt: &R,
    topo: &Topology,
    src_node: u32,
    dst_node: u32,
    size: u64,
    bidirectional: bool,
    wait_timeout: Option<Duration>,
) -> TransferResult<f64> {
    let src_ix = topo
        .find_agent(src_node)
        .ok_or(TransferError::UnknownNode(src_node))?;
    let dst_ix = topo
        .find_agent(dst_node)
        .ok_or(TransferError::UnknownNode(dst_node))?;

    let host_start = if crate::stats::is_stats_enabled() {
        Some(Instant::now())
    } else {
        None
    };

    let fwd = allocate(rt, topo, src_ix, dst_ix, size)?;
    let signal_fwd = CompletionSignal::create(rt)?;

    let reverse = if bidirectional {
        let pair = allocate(rt, topo, dst_ix, src_ix, size)?;
        let signal = CompletionSignal::create(rt)?;
        Some((pair, signal))
    } else {
        None
    };

    let src_agent = topo.agents()[src_ix].handle;
    let dst_agent = topo.agents()[dst_ix].handle;

    rt.signal_store(signal_fwd.handle(), SIGNAL_DONE_THRESHOLD);
    rt.async_copy(
        fwd.dst_buf.handle(),
        dst_agent,
        fwd.src_buf.handle(),
        src_agent,
        size,
        signal_fwd.handle(),
    )?;

    if let Some((pair, signal)) = &reverse {
        rt.signal_store(signal.handle(), SIGNAL_DONE_THRESHOLD);
        rt.async_copy(
            pair.dst_buf.handle(),
            src_agent,
            pair.src_buf.handle(),
            dst_agent,
            size,
            signal.handle(),
        )?;
    }

    spin_wait(rt, signal_fwd.handle(), wait_timeout)?;
    if let Some((_, signal)) = &reverse {
        spin_wait(rt, signal.handle(), wait_timeout)?;
    }

    let span_fwd = rt.copy_span(signal_fwd.handle())?;
    let duration_ns = match &reverse {
        None => span_fwd.end_ns.saturating_sub(span_fwd.start_ns),
        Some((_, signal)) => {
            let span_rev = rt.copy_span(signal.handle())?;
            overlap_window_ns(span_fwd, span_rev)
        }
    };
    let duration = duration_ns as f64 / NANOS_PER_SEC;

    if let Some(start) = host_start {
        debug!(
            "transfer {}->{} size={} bidirectional={}: device {:.9}s, host {:?}",
            src_node,
            dst_node,
            size,
            bidirectional,
            duration,
            start.elapsed()
        );
    }

    Ok(duration)
}

/// Window spanning two concurrent copies, in nanoseconds
///
/// The bidirectional measurement covers the full overlap of both
/// transfers: earliest start to latest end.
fn overlap_window_ns(fwd: CopySpan, rev: CopySpan) -> u64 {
    let start = fwd.start_ns.min(rev.start_ns);
    let end = fwd.end_ns.max(rev.end_ns);
    end.saturating_sub(start)
}

/// Actively poll a signal until its value drops below the threshold
fn spin_wait<R: ComputeRuntime>(
    rt: &R,
    signal: SignalHandle,
    wait_timeout: Option<Duration>,
) -> TransferResult<()> {
    let start = Instant::now();

    while rt.signal_value(signal) >= SIGNAL_DONE_THRESHOLD {
        if let Some(limit) = wait_timeout {
            if start.elapsed() > limit {
                return Err(TransferError::WaitTimeout(limit));
            }
        }
        std::hint::spin_loop();
    }

    Ok(())
}
