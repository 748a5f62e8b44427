//! Simulated compute runtime for tests and dry-runs
//!
//! `SimRuntime` is an in-memory [`ComputeRuntime`] backend. Tests script a
//! topology (agents, pools, access matrix, link tables), inject allocation
//! or grant failures, and pin per-copy profiling windows; the sim then
//! tracks resource balances and per-method call counts so invariants like
//! "no buffer outlives a transfer" can be asserted directly.
//!
//! The sim is deliberately single-threaded (`RefCell` state), matching the
//! calling contract of the crate.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};

use super::{
    AgentHandle, BufferHandle, ComputeRuntime, CopySpan, PoolAccess, PoolFlags, PoolHandle,
    RawLinkHop, RuntimeResult, RuntimeStatus, Segment, SignalHandle,
};

/// Properties of a simulated memory pool
#[derive(Debug, Clone)]
pub struct SimPoolSpec {
    pub segment: Segment,
    pub alloc_allowed: bool,
    pub size: u64,
    pub accessible_by_all: bool,
    pub flags: PoolFlags,
}

impl Default for SimPoolSpec {
    fn default() -> Self {
        Self {
            segment: Segment::Global,
            alloc_allowed: true,
            size: 1 << 30,
            accessible_by_all: false,
            flags: PoolFlags::default(),
        }
    }
}

impl SimPoolSpec {
    /// Global, allocatable, kernarg-capable pool (a CPU system pool)
    pub fn kernarg(size: u64) -> Self {
        Self {
            size,
            flags: PoolFlags(PoolFlags::KERNARG_INIT | PoolFlags::FINE_GRAINED),
            accessible_by_all: true,
            ..Self::default()
        }
    }

    /// Global, allocatable, coarse-grained device pool
    pub fn device_local(size: u64) -> Self {
        Self {
            size,
            flags: PoolFlags(PoolFlags::COARSE_GRAINED),
            ..Self::default()
        }
    }
}

#[derive(Debug)]
struct SimAgent {
    name: String,
    device_code: u32,
    node: u32,
    pools: Vec<u64>,
}

#[derive(Debug)]
struct SimPool {
    owner: u64,
    spec: SimPoolSpec,
}

#[derive(Debug)]
struct SimSignal {
    value: i64,
    /// Remaining polls before an attached copy completes
    pending_polls: Option<u32>,
}

#[derive(Default)]
struct SimState {
    agents: Vec<SimAgent>,
    pools: HashMap<u64, SimPool>,
    next_pool: u64,

    access: HashMap<(u64, u64), PoolAccess>,
    links: HashMap<(u64, u64), Vec<RawLinkHop>>,

    fail_alloc_pools: HashSet<u64>,
    fail_grant_pools: HashSet<u64>,
    fail_access_pairs: HashSet<(u64, u64)>,
    fail_link_pairs: HashSet<(u64, u64)>,
    fail_name_agents: HashSet<u64>,
    fail_node_agents: HashSet<u64>,

    buffers: HashMap<u64, u64>,
    next_buffer: u64,
    total_allocs: usize,
    total_frees: usize,

    signals: HashMap<u64, SimSignal>,
    next_signal: u64,
    total_signals: usize,

    copy_windows: VecDeque<(u64, u64)>,
    spans: HashMap<u64, CopySpan>,
    copies_issued: u64,
    polls_until_done: u32,

    profiling_enabled: bool,
    initialized: bool,
    calls: HashMap<&'static str, usize>,
}

/// Scriptable in-memory compute runtime
pub struct SimRuntime {
    state: RefCell<SimState>,
}

impl Default for SimRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRuntime {
    pub fn new() -> Self {
        // One poll observes the copy in flight before completion lands,
        // so the engine's spin loop is actually exercised.
        let state = SimState {
            polls_until_done: 1,
            ..SimState::default()
        };
        Self {
            state: RefCell::new(state),
        }
    }

    fn count(&self, method: &'static str) {
        *self.state.borrow_mut().calls.entry(method).or_insert(0) += 1;
    }

    // ---- topology scripting ----

    /// Add an agent with a raw device-type code
    pub fn add_agent(&self, name: &str, device_code: u32, node: u32) -> AgentHandle {
        let mut state = self.state.borrow_mut();
        state.agents.push(SimAgent {
            name: name.to_string(),
            device_code,
            node,
            pools: Vec::new(),
        });
        AgentHandle(state.agents.len() as u64 - 1)
    }

    /// Add a CPU agent
    pub fn add_cpu(&self, name: &str, node: u32) -> AgentHandle {
        self.add_agent(name, 0, node)
    }

    /// Add a GPU agent
    pub fn add_gpu(&self, name: &str, node: u32) -> AgentHandle {
        self.add_agent(name, 1, node)
    }

    /// Attach a memory pool to an agent
    pub fn add_pool(&self, agent: AgentHandle, spec: SimPoolSpec) -> PoolHandle {
        let mut state = self.state.borrow_mut();
        let id = state.next_pool;
        state.next_pool += 1;
        state.pools.insert(id, SimPool {
            owner: agent.0,
            spec,
        });
        state.agents[agent.0 as usize].pools.push(id);
        PoolHandle(id)
    }

    /// Override the access matrix for one (agent, pool) pair
    pub fn set_access(&self, agent: AgentHandle, pool: PoolHandle, access: PoolAccess) {
        self.state.borrow_mut().access.insert((agent.0, pool.0), access);
    }

    /// Script the link table between an agent and a remote pool
    pub fn set_link(&self, agent: AgentHandle, pool: PoolHandle, hops: Vec<RawLinkHop>) {
        self.state.borrow_mut().links.insert((agent.0, pool.0), hops);
    }

    // ---- failure injection ----

    /// Make allocations from `pool` fail with `OutOfResources`
    pub fn fail_allocation(&self, pool: PoolHandle) {
        self.state.borrow_mut().fail_alloc_pools.insert(pool.0);
    }

    /// Make access grants on buffers from `pool` fail
    pub fn fail_grant(&self, pool: PoolHandle) {
        self.state.borrow_mut().fail_grant_pools.insert(pool.0);
    }

    /// Make the access query for one (agent, pool) pair fail
    pub fn fail_access_query(&self, agent: AgentHandle, pool: PoolHandle) {
        self.state.borrow_mut().fail_access_pairs.insert((agent.0, pool.0));
    }

    /// Make link queries for one (agent, pool) pair fail
    pub fn fail_link_query(&self, agent: AgentHandle, pool: PoolHandle) {
        self.state.borrow_mut().fail_link_pairs.insert((agent.0, pool.0));
    }

    /// Make the name query for `agent` fail
    pub fn fail_name_query(&self, agent: AgentHandle) {
        self.state.borrow_mut().fail_name_agents.insert(agent.0);
    }

    /// Make the NUMA-node query for `agent` fail
    pub fn fail_node_query(&self, agent: AgentHandle) {
        self.state.borrow_mut().fail_node_agents.insert(agent.0);
    }

    // ---- copy timing scripting ----

    /// Pin the profiling window of the next issued copy (FIFO per copy)
    pub fn push_copy_window(&self, start_ns: u64, end_ns: u64) {
        self.state.borrow_mut().copy_windows.push_back((start_ns, end_ns));
    }

    /// Number of polls a signal stays pending after its copy is issued
    pub fn set_polls_until_done(&self, polls: u32) {
        self.state.borrow_mut().polls_until_done = polls;
    }

    // ---- observation ----

    /// Buffers currently allocated and not freed
    pub fn outstanding_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    /// Signals currently created and not destroyed
    pub fn outstanding_signals(&self) -> usize {
        self.state.borrow().signals.len()
    }

    /// Total allocations performed so far
    pub fn allocation_count(&self) -> usize {
        self.state.borrow().total_allocs
    }

    /// Total frees performed so far
    pub fn free_count(&self) -> usize {
        self.state.borrow().total_frees
    }

    /// Number of calls made to a trait method, by name
    pub fn calls(&self, method: &str) -> usize {
        self.state.borrow().calls.get(method).copied().unwrap_or(0)
    }

    /// Whether async-copy profiling has been enabled
    pub fn profiling_enabled(&self) -> bool {
        self.state.borrow().profiling_enabled
    }

    fn default_access(state: &SimState, agent: u64, pool_id: u64) -> PoolAccess {
        if let Some(pool) = state.pools.get(&pool_id) {
            if pool.owner == agent || pool.spec.accessible_by_all {
                return PoolAccess::AllowedByDefault;
            }
        }
        PoolAccess::NeverAllowed
    }
}

impl ComputeRuntime for SimRuntime {
    fn init(&self) -> RuntimeResult<()> {
        self.count("init");
        self.state.borrow_mut().initialized = true;
        Ok(())
    }

    fn shutdown(&self) -> RuntimeResult<()> {
        self.count("shutdown");
        let mut state = self.state.borrow_mut();
        if !state.initialized {
            return Err(RuntimeStatus::NotInitialized);
        }
        state.initialized = false;
        Ok(())
    }

    fn enable_copy_profiling(&self, enable: bool) -> RuntimeResult<()> {
        self.count("enable_copy_profiling");
        self.state.borrow_mut().profiling_enabled = enable;
        Ok(())
    }

    fn agents(&self) -> RuntimeResult<Vec<AgentHandle>> {
        self.count("agents");
        let state = self.state.borrow();
        Ok((0..state.agents.len() as u64).map(AgentHandle).collect())
    }

    fn agent_name(&self, agent: AgentHandle) -> RuntimeResult<String> {
        self.count("agent_name");
        let state = self.state.borrow();
        if state.fail_name_agents.contains(&agent.0) {
            return Err(RuntimeStatus::Error);
        }
        state
            .agents
            .get(agent.0 as usize)
            .map(|a| a.name.clone())
            .ok_or(RuntimeStatus::InvalidAgent)
    }

    fn agent_device_code(&self, agent: AgentHandle) -> RuntimeResult<u32> {
        self.count("agent_device_code");
        let state = self.state.borrow();
        state
            .agents
            .get(agent.0 as usize)
            .map(|a| a.device_code)
            .ok_or(RuntimeStatus::InvalidAgent)
    }

    fn agent_node(&self, agent: AgentHandle) -> RuntimeResult<u32> {
        self.count("agent_node");
        let state = self.state.borrow();
        if state.fail_node_agents.contains(&agent.0) {
            return Err(RuntimeStatus::Error);
        }
        state
            .agents
            .get(agent.0 as usize)
            .map(|a| a.node)
            .ok_or(RuntimeStatus::InvalidAgent)
    }

    fn agent_pools(&self, agent: AgentHandle) -> RuntimeResult<Vec<PoolHandle>> {
        self.count("agent_pools");
        let state = self.state.borrow();
        state
            .agents
            .get(agent.0 as usize)
            .map(|a| a.pools.iter().copied().map(PoolHandle).collect())
            .ok_or(RuntimeStatus::InvalidAgent)
    }

    fn pool_segment(&self, pool: PoolHandle) -> RuntimeResult<Segment> {
        self.count("pool_segment");
        let state = self.state.borrow();
        state
            .pools
            .get(&pool.0)
            .map(|p| p.spec.segment)
            .ok_or(RuntimeStatus::InvalidPool)
    }

    fn pool_alloc_allowed(&self, pool: PoolHandle) -> RuntimeResult<bool> {
        self.count("pool_alloc_allowed");
        let state = self.state.borrow();
        state
            .pools
            .get(&pool.0)
            .map(|p| p.spec.alloc_allowed)
            .ok_or(RuntimeStatus::InvalidPool)
    }

    fn pool_size(&self, pool: PoolHandle) -> RuntimeResult<u64> {
        self.count("pool_size");
        let state = self.state.borrow();
        state
            .pools
            .get(&pool.0)
            .map(|p| p.spec.size)
            .ok_or(RuntimeStatus::InvalidPool)
    }

    fn pool_accessible_by_all(&self, pool: PoolHandle) -> RuntimeResult<bool> {
        self.count("pool_accessible_by_all");
        let state = self.state.borrow();
        state
            .pools
            .get(&pool.0)
            .map(|p| p.spec.accessible_by_all)
            .ok_or(RuntimeStatus::InvalidPool)
    }

    fn pool_global_flags(&self, pool: PoolHandle) -> RuntimeResult<PoolFlags> {
        self.count("pool_global_flags");
        let state = self.state.borrow();
        state
            .pools
            .get(&pool.0)
            .map(|p| p.spec.flags)
            .ok_or(RuntimeStatus::InvalidPool)
    }

    fn agent_pool_access(
        &self,
        agent: AgentHandle,
        pool: PoolHandle,
    ) -> RuntimeResult<PoolAccess> {
        self.count("agent_pool_access");
        let state = self.state.borrow();
        if state.fail_access_pairs.contains(&(agent.0, pool.0)) {
            return Err(RuntimeStatus::Error);
        }
        if !state.pools.contains_key(&pool.0) {
            return Err(RuntimeStatus::InvalidPool);
        }
        Ok(state
            .access
            .get(&(agent.0, pool.0))
            .copied()
            .unwrap_or_else(|| Self::default_access(&state, agent.0, pool.0)))
    }

    fn allocate(&self, pool: PoolHandle, size: u64) -> RuntimeResult<BufferHandle> {
        self.count("allocate");
        let mut state = self.state.borrow_mut();
        let max = state
            .pools
            .get(&pool.0)
            .map(|p| p.spec.size)
            .ok_or(RuntimeStatus::InvalidPool)?;
        if state.fail_alloc_pools.contains(&pool.0) {
            return Err(RuntimeStatus::OutOfResources);
        }
        if size > max {
            return Err(RuntimeStatus::InvalidAllocation);
        }
        let id = state.next_buffer;
        state.next_buffer += 1;
        state.buffers.insert(id, pool.0);
        state.total_allocs += 1;
        Ok(BufferHandle(id))
    }

    fn free(&self, buffer: BufferHandle) -> RuntimeResult<()> {
        self.count("free");
        let mut state = self.state.borrow_mut();
        if state.buffers.remove(&buffer.0).is_none() {
            return Err(RuntimeStatus::InvalidAllocation);
        }
        state.total_frees += 1;
        Ok(())
    }

    fn allow_access(&self, agent: AgentHandle, buffer: BufferHandle) -> RuntimeResult<()> {
        self.count("allow_access");
        let state = self.state.borrow();
        if state.agents.get(agent.0 as usize).is_none() {
            return Err(RuntimeStatus::InvalidAgent);
        }
        let pool = state
            .buffers
            .get(&buffer.0)
            .ok_or(RuntimeStatus::InvalidAllocation)?;
        if state.fail_grant_pools.contains(pool) {
            return Err(RuntimeStatus::Error);
        }
        Ok(())
    }

    fn async_copy(
        &self,
        dst: BufferHandle,
        _dst_agent: AgentHandle,
        src: BufferHandle,
        _src_agent: AgentHandle,
        size: u64,
        completion: SignalHandle,
    ) -> RuntimeResult<()> {
        self.count("async_copy");
        let mut state = self.state.borrow_mut();
        if !state.buffers.contains_key(&dst.0) || !state.buffers.contains_key(&src.0) {
            return Err(RuntimeStatus::InvalidAllocation);
        }
        if !state.signals.contains_key(&completion.0) {
            return Err(RuntimeStatus::InvalidSignal);
        }

        let window = state.copy_windows.pop_front().unwrap_or_else(|| {
            // synthetic window: later copies start later, duration scales
            // with size so bandwidth numbers stay plausible
            let base = state.copies_issued * 1_000;
            (base, base + size.max(1))
        });
        state.spans.insert(
            completion.0,
            CopySpan {
                start_ns: window.0,
                end_ns: window.1,
            },
        );
        state.copies_issued += 1;

        let polls = state.polls_until_done;
        let signal = state
            .signals
            .get_mut(&completion.0)
            .ok_or(RuntimeStatus::InvalidSignal)?;
        signal.pending_polls = Some(polls);
        Ok(())
    }

    fn signal_create(&self, initial: i64) -> RuntimeResult<SignalHandle> {
        self.count("signal_create");
        let mut state = self.state.borrow_mut();
        let id = state.next_signal;
        state.next_signal += 1;
        state.signals.insert(id, SimSignal {
            value: initial,
            pending_polls: None,
        });
        state.total_signals += 1;
        Ok(SignalHandle(id))
    }

    fn signal_store(&self, signal: SignalHandle, value: i64) {
        self.count("signal_store");
        if let Some(sig) = self.state.borrow_mut().signals.get_mut(&signal.0) {
            sig.value = value;
        }
    }

    fn signal_value(&self, signal: SignalHandle) -> i64 {
        self.count("signal_value");
        let mut state = self.state.borrow_mut();
        match state.signals.get_mut(&signal.0) {
            Some(sig) => {
                if let Some(polls) = sig.pending_polls {
                    if polls == 0 {
                        sig.value -= 1;
                        sig.pending_polls = None;
                    } else {
                        sig.pending_polls = Some(polls - 1);
                    }
                }
                sig.value
            }
            // A destroyed signal reads as completed so a buggy caller
            // spins on an error path instead of hanging the test suite.
            None => 0,
        }
    }

    fn signal_destroy(&self, signal: SignalHandle) -> RuntimeResult<()> {
        self.count("signal_destroy");
        let mut state = self.state.borrow_mut();
        if state.signals.remove(&signal.0).is_none() {
            return Err(RuntimeStatus::InvalidSignal);
        }
        Ok(())
    }

    fn copy_span(&self, signal: SignalHandle) -> RuntimeResult<CopySpan> {
        self.count("copy_span");
        let state = self.state.borrow();
        state
            .spans
            .get(&signal.0)
            .copied()
            .ok_or(RuntimeStatus::InvalidSignal)
    }

    fn link_hops(&self, agent: AgentHandle, pool: PoolHandle) -> RuntimeResult<u32> {
        self.count("link_hops");
        let state = self.state.borrow();
        if state.fail_link_pairs.contains(&(agent.0, pool.0)) {
            return Err(RuntimeStatus::Error);
        }
        Ok(state
            .links
            .get(&(agent.0, pool.0))
            .map(|hops| hops.len() as u32)
            .unwrap_or(0))
    }

    fn link_hop_info(
        &self,
        agent: AgentHandle,
        pool: PoolHandle,
    ) -> RuntimeResult<Vec<RawLinkHop>> {
        self.count("link_hop_info");
        let state = self.state.borrow();
        if state.fail_link_pairs.contains(&(agent.0, pool.0)) {
            return Err(RuntimeStatus::Error);
        }
        Ok(state
            .links
            .get(&(agent.0, pool.0))
            .cloned()
            .unwrap_or_default())
    }
}
