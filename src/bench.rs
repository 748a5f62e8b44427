//! BenchLink session
//!
//! [`BenchLink`] bundles a compute-runtime backend with the topology
//! discovered on it and hands out the per-pair queries. A session is the
//! unit of lifecycle: construction initializes the runtime and discovers
//! the topology exactly once, dropping the session shuts the runtime down
//! exactly once, and nothing mutates the topology in between. All query
//! methods take `&self`, so sharing a session across readers is safe once
//! it is built.

use std::time::Duration;

use tracing::warn;

use crate::config::BenchConfig;
use crate::runtime::ComputeRuntime;
use crate::topology::{
    discovery, link_info, peer_status, LinkPath, PeerStatus, Topology, TopologyResult,
};
use crate::transfer::{engine, TransferResult};

/// A discovered topology plus the runtime it was discovered on
pub struct BenchLink<R: ComputeRuntime> {
    runtime: R,
    topology: Topology,
    wait_timeout: Option<Duration>,
}

impl<R: ComputeRuntime> BenchLink<R> {
    /// Initialize the runtime and discover the topology
    ///
    /// Discovery is best-effort: a runtime that fails to initialize or
    /// enumerate yields an empty topology, not a panic or an error. The
    /// configured size list (or the default table) is finalized here.
    pub fn init(runtime: R, config: &BenchConfig) -> Self {
        crate::stats::set_stats_enabled(config.log.enable_stats);
        let topology = discovery::init_and_discover(&runtime, &config.effective_sizes());
        Self {
            runtime,
            topology,
            wait_timeout: config.wait_timeout(),
        }
    }

    /// The discovered topology snapshot
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// The runtime backend this session drives
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Benchmark transfer sizes, sorted ascending
    pub fn sizes(&self) -> &[u64] {
        self.topology.sizes()
    }

    /// Measure one transfer between two NUMA nodes (seconds)
    ///
    /// See [`engine::send_traffic`] for the wait and timing contract.
    pub fn send_traffic(
        &self,
        src_node: u32,
        dst_node: u32,
        size: u64,
        bidirectional: bool,
    ) -> TransferResult<f64> {
        engine::send_traffic(
            &self.runtime,
            &self.topology,
            src_node,
            dst_node,
            size,
            bidirectional,
            self.wait_timeout,
        )
    }

    /// Classify the pairwise access between two NUMA nodes
    pub fn peer_status(&self, src_node: u32, dst_node: u32) -> PeerStatus {
        peer_status(&self.runtime, &self.topology, src_node, dst_node)
    }

    /// Resolve the link path between two NUMA nodes
    pub fn link_info(&self, src_node: u32, dst_node: u32) -> TopologyResult<LinkPath> {
        link_info(&self.runtime, &self.topology, src_node, dst_node)
    }
}

impl<R: ComputeRuntime> Drop for BenchLink<R> {
    fn drop(&mut self) {
        if let Err(status) = self.runtime.shutdown() {
            warn!("runtime shutdown failed: {}", status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::sim::{SimPoolSpec, SimRuntime};

    fn session() -> BenchLink<SimRuntime> {
        let sim = SimRuntime::new();
        let cpu = sim.add_cpu("cpu0", 0);
        sim.add_pool(cpu, SimPoolSpec::kernarg(1 << 30));
        let gpu = sim.add_gpu("gfx906", 1);
        sim.add_pool(gpu, SimPoolSpec::device_local(1 << 30));
        BenchLink::init(sim, &BenchConfig::default())
    }

    #[test]
    fn test_init_discovers_and_enables_profiling() {
        let session = session();
        assert_eq!(session.topology().agents().len(), 2);
        assert!(session.runtime().profiling_enabled());
        assert_eq!(session.sizes().len(), crate::constants::DEFAULT_SIZE_LIST.len());
    }

    #[test]
    fn test_drop_shuts_runtime_down() {
        let sim = SimRuntime::new();
        sim.add_cpu("cpu0", 0);

        let session = BenchLink::init(&sim, &BenchConfig::default());
        assert_eq!(sim.calls("init"), 1);
        assert_eq!(sim.calls("shutdown"), 0);
        drop(session);
        assert_eq!(sim.calls("shutdown"), 1);
    }

    #[test]
    fn test_configured_sizes_reach_topology() {
        let sim = SimRuntime::new();
        sim.add_cpu("cpu0", 0);
        let mut config = BenchConfig::default();
        config.measure.sizes = vec![1 << 20, 1 << 10];

        let session = BenchLink::init(sim, &config);
        assert_eq!(session.sizes(), &[1 << 10, 1 << 20]);
    }
}
