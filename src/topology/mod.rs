//! Discovered topology snapshot
//!
//! [`Topology`] is the read-only result of agent discovery: every agent the
//! runtime exposed (in enumeration order), the CPU/GPU views over them, and
//! the benchmark size set. It is built once per session and never mutated
//! afterwards, so query components can share it freely.

pub mod discovery;
pub mod link;
pub mod peer;

pub use discovery::discover;
pub use link::{link_info, LinkHop, LinkKind, LinkPath, TopologyError, TopologyResult};
pub use peer::{peer_status, peer_status_agents, PeerStatus};

use crate::runtime::{AgentHandle, DeviceClass, PoolHandle};

/// Everything known about one discovered agent
#[derive(Debug, Clone)]
pub struct AgentRecord {
    /// Runtime handle
    pub handle: AgentHandle,
    /// Display name reported by the runtime
    pub name: String,
    /// Device classification
    pub device: DeviceClass,
    /// NUMA node id ([`crate::constants::UNKNOWN_NODE`] if the query failed)
    pub node: u32,
    /// Global, allocatable memory pools, in enumeration order
    pub pools: Vec<PoolHandle>,
    /// Max allocatable byte size per pool; index-aligned with `pools`
    pub pool_sizes: Vec<u64>,
    /// Kernel-argument-capable pool, if the agent has one
    pub system_pool: Option<PoolHandle>,
}

impl AgentRecord {
    pub(crate) fn new(handle: AgentHandle) -> Self {
        Self {
            handle,
            name: String::new(),
            device: DeviceClass::Unknown(u32::MAX),
            node: crate::constants::UNKNOWN_NODE,
            pools: Vec::new(),
            pool_sizes: Vec::new(),
            system_pool: None,
        }
    }

    /// Append a classified pool together with its max allocatable size
    ///
    /// The two lists move in lockstep; this is the only place they grow.
    pub(crate) fn push_pool(&mut self, pool: PoolHandle, max_size: u64) {
        self.pools.push(pool);
        self.pool_sizes.push(max_size);
    }
}

/// Snapshot of the discovered compute topology
#[derive(Debug, Default)]
pub struct Topology {
    /// All agents, in runtime enumeration order
    agents: Vec<AgentRecord>,
    /// Indices into `agents` for CPU agents
    cpu_view: Vec<usize>,
    /// Indices into `agents` for GPU agents
    gpu_view: Vec<usize>,
    /// Benchmark transfer sizes, sorted ascending
    sizes: Vec<u64>,
}

impl Topology {
    pub(crate) fn new(
        agents: Vec<AgentRecord>,
        cpu_view: Vec<usize>,
        gpu_view: Vec<usize>,
        sizes: Vec<u64>,
    ) -> Self {
        Self {
            agents,
            cpu_view,
            gpu_view,
            sizes,
        }
    }

    /// All discovered agents
    pub fn agents(&self) -> &[AgentRecord] {
        &self.agents
    }

    /// CPU agents, as indices into [`Topology::agents`]
    pub fn cpu_view(&self) -> &[usize] {
        &self.cpu_view
    }

    /// GPU agents, as indices into [`Topology::agents`]
    pub fn gpu_view(&self) -> &[usize] {
        &self.gpu_view
    }

    /// Benchmark transfer sizes, sorted ascending
    pub fn sizes(&self) -> &[u64] {
        &self.sizes
    }

    /// Find the agent living on `node`
    ///
    /// Returns the index of the first matching agent, or `None` when no
    /// discovered agent reports that NUMA node.
    pub fn find_agent(&self, node: u32) -> Option<usize> {
        self.agents.iter().position(|a| a.node == node)
    }
}
