//! Pairwise peer-access evaluation
//!
//! Classifies how two agents can reach each other's memory pools. Unlike
//! discovery, this path is hard-fail: a failed access query immediately
//! reports no access, because a topology decision built on partial data is
//! worse than one built on none.

use tracing::debug;

use crate::runtime::{ComputeRuntime, DeviceClass};
use crate::topology::{AgentRecord, Topology};

/// Pairwise access classification between two agents
///
/// The discriminants are the access scores reported to callers: 0 no
/// access, 1 one-way, 2 two-way. Derived ordering follows that scale, so
/// the best observation across pool pairs is a plain `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PeerStatus {
    None,
    OneWay,
    TwoWay,
}

impl PeerStatus {
    /// Numeric access score (0, 1 or 2)
    pub fn score(self) -> u8 {
        match self {
            PeerStatus::None => 0,
            PeerStatus::OneWay => 1,
            PeerStatus::TwoWay => 2,
        }
    }
}

impl std::fmt::Display for PeerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.score())
    }
}

/// Classify the access relationship between two agents
///
/// Every (src pool, dst pool) pair is probed in both directions and the
/// best pair decides the result. A single usable direction normally counts
/// as one-way, except between two GPUs, where it is downgraded to no
/// access: GPU peers must reach each other in both directions to be
/// usable at all.
pub fn peer_status_agents<R: ComputeRuntime>(
    rt: &R,
    src: &AgentRecord,
    dst: &AgentRecord,
) -> PeerStatus {
    let gpu_pair =
        matches!(src.device, DeviceClass::Gpu) && matches!(dst.device, DeviceClass::Gpu);

    let mut best = PeerStatus::None;
    for src_pool in &src.pools {
        for dst_pool in &dst.pools {
            let forward = match rt.agent_pool_access(src.handle, *dst_pool) {
                Ok(access) => access,
                Err(status) => {
                    debug!("peer access query (src->dst) failed: {}", status);
                    return PeerStatus::None;
                }
            };
            let backward = match rt.agent_pool_access(dst.handle, *src_pool) {
                Ok(access) => access,
                Err(status) => {
                    debug!("peer access query (dst->src) failed: {}", status);
                    return PeerStatus::None;
                }
            };

            let current = match (forward.usable(), backward.usable()) {
                (false, false) => PeerStatus::None,
                (true, true) => PeerStatus::TwoWay,
                _ if gpu_pair => PeerStatus::None,
                _ => PeerStatus::OneWay,
            };

            best = best.max(current);
        }
    }

    best
}

/// Classify the access relationship between two NUMA nodes
///
/// Unresolvable nodes report no access rather than an error.
pub fn peer_status<R: ComputeRuntime>(
    rt: &R,
    topo: &Topology,
    src_node: u32,
    dst_node: u32,
) -> PeerStatus {
    let (src_ix, dst_ix) = match (topo.find_agent(src_node), topo.find_agent(dst_node)) {
        (Some(s), Some(d)) => (s, d),
        _ => return PeerStatus::None,
    };

    let status = peer_status_agents(rt, &topo.agents()[src_ix], &topo.agents()[dst_ix]);
    debug!("src: {}  dst: {}  access: {}", src_node, dst_node, status);
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::sim::{SimPoolSpec, SimRuntime};
    use crate::runtime::PoolAccess;
    use crate::topology::discover;

    /// CPU on node 0, GPU on node 1, one pool each
    fn cpu_gpu_sim() -> (SimRuntime, crate::runtime::AgentHandle, crate::runtime::AgentHandle)
    {
        let sim = SimRuntime::new();
        let cpu = sim.add_cpu("cpu0", 0);
        sim.add_pool(cpu, SimPoolSpec::kernarg(1 << 30));
        let gpu = sim.add_gpu("gfx906", 1);
        sim.add_pool(gpu, SimPoolSpec::device_local(1 << 30));
        (sim, cpu, gpu)
    }

    #[test]
    fn test_two_way_access() {
        let (sim, cpu, gpu) = cpu_gpu_sim();
        let topo = discover(&sim, &[]);
        let cpu_pool = topo.agents()[0].pools[0];
        let gpu_pool = topo.agents()[1].pools[0];
        sim.set_access(cpu, gpu_pool, PoolAccess::AllowedByDefault);
        sim.set_access(gpu, cpu_pool, PoolAccess::AllowedByDefault);

        assert_eq!(peer_status(&sim, &topo, 0, 1), PeerStatus::TwoWay);
    }

    #[test]
    fn test_one_way_cpu_gpu() {
        let (sim, cpu, gpu) = cpu_gpu_sim();
        let topo = discover(&sim, &[]);
        let gpu_pool = topo.agents()[1].pools[0];
        // CPU can reach the GPU pool; the kernarg pool is accessible to
        // all, so forbid the reverse direction explicitly
        sim.set_access(cpu, gpu_pool, PoolAccess::AllowedByDefault);
        let cpu_pool = topo.agents()[0].pools[0];
        sim.set_access(gpu, cpu_pool, PoolAccess::NeverAllowed);

        assert_eq!(peer_status(&sim, &topo, 0, 1), PeerStatus::OneWay);
        assert_eq!(peer_status(&sim, &topo, 1, 0), PeerStatus::OneWay);
    }

    #[test]
    fn test_no_access() {
        let (sim, _cpu, gpu) = cpu_gpu_sim();
        let topo = discover(&sim, &[]);
        let cpu_pool = topo.agents()[0].pools[0];
        sim.set_access(gpu, cpu_pool, PoolAccess::NeverAllowed);
        // CPU -> GPU pool defaults to NeverAllowed in the sim

        assert_eq!(peer_status(&sim, &topo, 0, 1), PeerStatus::None);
    }

    #[test]
    fn test_gpu_pair_single_direction_downgraded() {
        let sim = SimRuntime::new();
        let gpu0 = sim.add_gpu("gfx906-0", 0);
        sim.add_pool(gpu0, SimPoolSpec::device_local(1 << 30));
        let gpu1 = sim.add_gpu("gfx906-1", 1);
        sim.add_pool(gpu1, SimPoolSpec::device_local(1 << 30));

        let topo = discover(&sim, &[]);
        let pool1 = topo.agents()[1].pools[0];
        sim.set_access(gpu0, pool1, PoolAccess::AllowedByDefault);

        // one usable direction between two GPUs counts as no access
        assert_eq!(peer_status(&sim, &topo, 0, 1), PeerStatus::None);

        // both directions restore the pair
        let pool0 = topo.agents()[0].pools[0];
        sim.set_access(gpu1, pool0, PoolAccess::AllowedByDefault);
        assert_eq!(peer_status(&sim, &topo, 0, 1), PeerStatus::TwoWay);
    }

    #[test]
    fn test_query_error_hard_fails_to_none() {
        let (sim, cpu, gpu) = cpu_gpu_sim();
        let topo = discover(&sim, &[]);
        let cpu_pool = topo.agents()[0].pools[0];
        let gpu_pool = topo.agents()[1].pools[0];
        sim.set_access(cpu, gpu_pool, PoolAccess::AllowedByDefault);
        sim.set_access(gpu, cpu_pool, PoolAccess::AllowedByDefault);
        sim.fail_access_query(cpu, gpu_pool);

        assert_eq!(peer_status(&sim, &topo, 0, 1), PeerStatus::None);
    }

    #[test]
    fn test_unresolved_node_reports_none() {
        let (sim, _cpu, _gpu) = cpu_gpu_sim();
        let topo = discover(&sim, &[]);
        assert_eq!(peer_status(&sim, &topo, 0, 9), PeerStatus::None);
        assert_eq!(peer_status(&sim, &topo, 9, 0), PeerStatus::None);
    }

    #[test]
    fn test_best_pair_wins() {
        // two dst pools: one unreachable, one reachable both ways
        let (sim, cpu, gpu) = cpu_gpu_sim();
        let far = sim.add_pool(gpu, SimPoolSpec::device_local(1 << 30));
        let topo = discover(&sim, &[]);
        let near = topo.agents()[1].pools[0];
        sim.set_access(cpu, near, PoolAccess::AllowedByDefault);
        sim.set_access(cpu, far, PoolAccess::NeverAllowed);

        assert_eq!(peer_status(&sim, &topo, 0, 1), PeerStatus::TwoWay);
    }

    #[test]
    fn test_repeated_queries_idempotent() {
        let (sim, cpu, _gpu) = cpu_gpu_sim();
        let topo = discover(&sim, &[]);
        let gpu_pool = topo.agents()[1].pools[0];
        sim.set_access(cpu, gpu_pool, PoolAccess::AllowedByDefault);

        let first = peer_status(&sim, &topo, 0, 1);
        for _ in 0..3 {
            assert_eq!(peer_status(&sim, &topo, 0, 1), first);
        }
    }
}
