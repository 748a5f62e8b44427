//! End-to-end transfer scenarios
//!
//! Runs timed transfers through the public session API against the
//! simulated runtime, checking the duration rules and that no buffer or
//! signal survives a call on any path.

use benchlink::bench::BenchLink;
use benchlink::config::BenchConfig;
use benchlink::runtime::sim::{SimPoolSpec, SimRuntime};
use benchlink::runtime::{AgentHandle, PoolAccess, PoolHandle};
use benchlink::transfer::TransferError;

struct Rig {
    sim: SimRuntime,
    gpu: AgentHandle,
    cpu_pool: PoolHandle,
    gpu_pool: PoolHandle,
}

/// CPU(node 0) and GPU(node 1), one pool each, both directions open
fn open_rig() -> Rig {
    let sim = SimRuntime::new();
    let cpu = sim.add_cpu("cpu0", 0);
    let cpu_pool = sim.add_pool(cpu, SimPoolSpec::kernarg(1 << 30));
    let gpu = sim.add_gpu("gfx906", 1);
    let gpu_pool = sim.add_pool(gpu, SimPoolSpec::device_local(1 << 30));
    sim.set_access(cpu, gpu_pool, PoolAccess::AllowedByDefault);
    sim.set_access(gpu, gpu_pool, PoolAccess::AllowedByDefault);
    sim.set_access(gpu, cpu_pool, PoolAccess::AllowedByDefault);
    Rig {
        sim,
        gpu,
        cpu_pool,
        gpu_pool,
    }
}

#[test]
fn unidirectional_duration_from_profiling_window() {
    let rig = open_rig();
    rig.sim.push_copy_window(1_000, 5_000);

    let session = BenchLink::init(rig.sim, &BenchConfig::default());
    let seconds = session.send_traffic(0, 1, 1 << 20, false).unwrap();
    assert_eq!(seconds, 4_000.0 / 1e9);

    let sim = session.runtime();
    assert_eq!(sim.outstanding_buffers(), 0);
    assert_eq!(sim.outstanding_signals(), 0);
}

#[test]
fn bidirectional_duration_spans_both_windows() {
    // forward [10, 50] ns, reverse [20, 80] ns -> (80 - 10) / 1e9 s
    let rig = open_rig();
    rig.sim.push_copy_window(10, 50);
    rig.sim.push_copy_window(20, 80);

    let session = BenchLink::init(rig.sim, &BenchConfig::default());
    let seconds = session.send_traffic(0, 1, 1 << 20, true).unwrap();
    assert_eq!(seconds, (80.0 - 10.0) / 1e9);

    let sim = session.runtime();
    // two buffer pairs and two signals, all gone
    assert_eq!(sim.allocation_count(), 4);
    assert_eq!(sim.outstanding_buffers(), 0);
    assert_eq!(sim.outstanding_signals(), 0);
}

#[test]
fn durations_are_non_negative_across_size_sweep() {
    let rig = open_rig();
    let mut config = BenchConfig::default();
    config.measure.sizes = vec![512, 4096, 1 << 20];

    let session = BenchLink::init(rig.sim, &config);
    for &size in session.sizes() {
        let seconds = session.send_traffic(0, 1, size, false).unwrap();
        assert!(seconds >= 0.0, "negative duration for size {}", size);
    }
}

#[test]
fn unknown_nodes_fail_without_touching_the_runtime() {
    let rig = open_rig();
    let session = BenchLink::init(rig.sim, &BenchConfig::default());

    let result = session.send_traffic(3, 1, 4096, false);
    assert!(matches!(result, Err(TransferError::UnknownNode(3))));
    let result = session.send_traffic(0, 9, 4096, false);
    assert!(matches!(result, Err(TransferError::UnknownNode(9))));
    assert_eq!(session.runtime().allocation_count(), 0);
}

#[test]
fn exhausted_pool_search_leaves_no_allocations() {
    let rig = open_rig();
    rig.sim.fail_allocation(rig.gpu_pool);

    let session = BenchLink::init(rig.sim, &BenchConfig::default());
    let result = session.send_traffic(0, 1, 4096, false);
    assert!(matches!(
        result,
        Err(TransferError::NoMatchingPoolPair { .. })
    ));

    let sim = session.runtime();
    assert_eq!(sim.outstanding_buffers(), 0);
    assert_eq!(sim.outstanding_signals(), 0);
}

#[test]
fn reverse_allocation_failure_releases_forward_resources() {
    let rig = open_rig();
    // close the reverse direction only: the GPU may not reach the CPU pool
    rig.sim.set_access(rig.gpu, rig.cpu_pool, PoolAccess::NeverAllowed);

    let session = BenchLink::init(rig.sim, &BenchConfig::default());

    // forward-only still works
    assert!(session.send_traffic(0, 1, 4096, false).is_ok());

    // bidirectional cannot build the reverse pair
    let result = session.send_traffic(0, 1, 4096, true);
    assert!(matches!(
        result,
        Err(TransferError::NoMatchingPoolPair { .. })
    ));

    let sim = session.runtime();
    assert_eq!(sim.outstanding_buffers(), 0);
    assert_eq!(sim.outstanding_signals(), 0);
}

#[test]
fn configured_wait_timeout_bounds_a_stalled_transfer() {
    let rig = open_rig();
    // the copy never signals completion
    rig.sim.set_polls_until_done(u32::MAX);

    let mut config = BenchConfig::default();
    config.measure.wait_timeout_ms = 20;

    let session = BenchLink::init(rig.sim, &config);
    let result = session.send_traffic(0, 1, 4096, false);
    assert!(matches!(result, Err(TransferError::WaitTimeout(_))));

    let sim = session.runtime();
    assert_eq!(sim.outstanding_buffers(), 0);
    assert_eq!(sim.outstanding_signals(), 0);
}

#[test]
fn repeated_transfers_allocate_fresh_resources_each_time() {
    let rig = open_rig();
    let session = BenchLink::init(rig.sim, &BenchConfig::default());

    for round in 1..=3 {
        session.send_traffic(0, 1, 4096, false).unwrap();
        let sim = session.runtime();
        assert_eq!(sim.allocation_count(), round * 2);
        assert_eq!(sim.outstanding_buffers(), 0);
    }
}
