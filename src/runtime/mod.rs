//! Compute-runtime capability layer
//!
//! BenchLink does not talk to any particular vendor runtime directly.
//! Everything it needs (agent and pool enumeration, property queries,
//! allocation, access grants, asynchronous copies, completion signals,
//! profiling timestamps, link queries) is expressed through the
//! [`ComputeRuntime`] trait, and a backend crate binds it to the real
//! driver. [`sim::SimRuntime`] is an in-memory backend for tests and
//! dry-runs.

pub mod sim;
pub mod status;

pub use status::{RuntimeResult, RuntimeStatus};

/// Opaque handle to a compute agent (CPU, GPU, DSP)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentHandle(pub u64);

/// Opaque handle to a memory pool owned by an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle(pub u64);

/// Opaque handle to a buffer allocated from a memory pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Opaque handle to a completion signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalHandle(pub u64);

/// Device classification of an agent
///
/// Unrecognized device codes are kept, not discarded; such agents stay in
/// the full agent list but join neither the CPU nor the GPU view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Cpu,
    Gpu,
    Dsp,
    Unknown(u32),
}

impl DeviceClass {
    /// Classify a raw device-type code from the runtime
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => DeviceClass::Cpu,
            1 => DeviceClass::Gpu,
            2 => DeviceClass::Dsp,
            other => DeviceClass::Unknown(other),
        }
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceClass::Cpu => write!(f, "CPU"),
            DeviceClass::Gpu => write!(f, "GPU"),
            DeviceClass::Dsp => write!(f, "DSP"),
            DeviceClass::Unknown(code) => write!(f, "unknown-{}", code),
        }
    }
}

/// Memory segment a pool belongs to
///
/// Only [`Segment::Global`] pools are eligible for cross-agent sharing and
/// therefore for benchmarking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Global,
    ReadOnly,
    Private,
    Group,
    Unknown(u32),
}

/// Directional access of one agent to a memory pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolAccess {
    NeverAllowed,
    AllowedByDefault,
    DisallowedByDefault,
}

impl PoolAccess {
    /// Whether this access kind can be used at all
    ///
    /// `DisallowedByDefault` counts as usable: an explicit grant can turn
    /// it on, unlike `NeverAllowed`.
    #[inline]
    pub fn usable(&self) -> bool {
        !matches!(self, PoolAccess::NeverAllowed)
    }
}

/// Global property flags of a memory pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolFlags(pub u32);

impl PoolFlags {
    /// Pool is initialized for staging kernel arguments
    pub const KERNARG_INIT: u32 = 1 << 0;
    /// Pool memory is fine-grained coherent
    pub const FINE_GRAINED: u32 = 1 << 1;
    /// Pool memory is coarse-grained coherent
    pub const COARSE_GRAINED: u32 = 1 << 2;

    /// Whether the pool is kernel-argument capable
    ///
    /// Such a pool doubles as the agent's CPU-visible system pool.
    #[inline]
    pub fn is_kernarg_init(&self) -> bool {
        self.0 & Self::KERNARG_INIT != 0
    }

    #[inline]
    pub fn is_fine_grained(&self) -> bool {
        self.0 & Self::FINE_GRAINED != 0
    }
}

/// Start/end profiling timestamps of one asynchronous copy, in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopySpan {
    pub start_ns: u64,
    pub end_ns: u64,
}

/// One raw link hop between an agent and a remote pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLinkHop {
    /// NUMA distance contributed by this hop
    pub numa_distance: u32,
    /// Runtime link-type code (classified by the topology layer)
    pub link_type_code: u32,
}

/// Capability surface of the underlying heterogeneous-compute runtime
///
/// BenchLink is single-threaded by contract, so the trait is synchronous;
/// the only long-running operation is the copy itself, which completes
/// through a signal rather than a blocking call. Implementations must not
/// require `&mut self`; backends keep whatever interior state they need.
pub trait ComputeRuntime {
    /// Initialize the runtime (reference-counted in real backends)
    fn init(&self) -> RuntimeResult<()>;

    /// Shut the runtime down
    fn shutdown(&self) -> RuntimeResult<()>;

    /// Enable or disable profiling of asynchronous copies
    ///
    /// Must be enabled before [`ComputeRuntime::copy_span`] yields valid
    /// timestamps.
    fn enable_copy_profiling(&self, enable: bool) -> RuntimeResult<()>;

    /// Enumerate all agents, in runtime order
    fn agents(&self) -> RuntimeResult<Vec<AgentHandle>>;

    /// Display name of an agent
    fn agent_name(&self, agent: AgentHandle) -> RuntimeResult<String>;

    /// Raw device-type code of an agent (see [`DeviceClass::from_code`])
    fn agent_device_code(&self, agent: AgentHandle) -> RuntimeResult<u32>;

    /// NUMA node the agent lives on
    fn agent_node(&self, agent: AgentHandle) -> RuntimeResult<u32>;

    /// Enumerate the memory pools of an agent, in runtime order
    fn agent_pools(&self, agent: AgentHandle) -> RuntimeResult<Vec<PoolHandle>>;

    /// Memory segment the pool belongs to
    fn pool_segment(&self, pool: PoolHandle) -> RuntimeResult<Segment>;

    /// Whether runtime-initiated allocation is permitted in the pool
    fn pool_alloc_allowed(&self, pool: PoolHandle) -> RuntimeResult<bool>;

    /// Maximum allocatable size of the pool, in bytes
    fn pool_size(&self, pool: PoolHandle) -> RuntimeResult<u64>;

    /// Whether the pool is accessible to all agents by default
    fn pool_accessible_by_all(&self, pool: PoolHandle) -> RuntimeResult<bool>;

    /// Global property flags of the pool
    fn pool_global_flags(&self, pool: PoolHandle) -> RuntimeResult<PoolFlags>;

    /// Access kind of `agent` to `pool`
    fn agent_pool_access(&self, agent: AgentHandle, pool: PoolHandle)
        -> RuntimeResult<PoolAccess>;

    /// Allocate `size` bytes from `pool`
    fn allocate(&self, pool: PoolHandle, size: u64) -> RuntimeResult<BufferHandle>;

    /// Free a buffer previously returned by [`ComputeRuntime::allocate`]
    fn free(&self, buffer: BufferHandle) -> RuntimeResult<()>;

    /// Grant `agent` access to `buffer`
    fn allow_access(&self, agent: AgentHandle, buffer: BufferHandle) -> RuntimeResult<()>;

    /// Issue an asynchronous copy of `size` bytes from `src` to `dst`
    ///
    /// The runtime decrements `completion` once the copy finishes.
    fn async_copy(
        &self,
        dst: BufferHandle,
        dst_agent: AgentHandle,
        src: BufferHandle,
        src_agent: AgentHandle,
        size: u64,
        completion: SignalHandle,
    ) -> RuntimeResult<()>;

    /// Create a completion signal with the given initial value
    fn signal_create(&self, initial: i64) -> RuntimeResult<SignalHandle>;

    /// Store a value into a signal
    fn signal_store(&self, signal: SignalHandle, value: i64);

    /// Current value of a signal (non-blocking; used for active polling)
    fn signal_value(&self, signal: SignalHandle) -> i64;

    /// Destroy a signal
    fn signal_destroy(&self, signal: SignalHandle) -> RuntimeResult<()>;

    /// Profiling timestamps of the copy that completed `signal`
    fn copy_span(&self, signal: SignalHandle) -> RuntimeResult<CopySpan>;

    /// Number of link hops between `agent` and the owner of `pool`
    fn link_hops(&self, agent: AgentHandle, pool: PoolHandle) -> RuntimeResult<u32>;

    /// Per-hop link records between `agent` and the owner of `pool`
    fn link_hop_info(
        &self,
        agent: AgentHandle,
        pool: PoolHandle,
    ) -> RuntimeResult<Vec<RawLinkHop>>;
}

impl<R: ComputeRuntime + ?Sized> ComputeRuntime for &R {
    fn init(&self) -> RuntimeResult<()> {
        (**self).init()
    }

    fn shutdown(&self) -> RuntimeResult<()> {
        (**self).shutdown()
    }

    fn enable_copy_profiling(&self, enable: bool) -> RuntimeResult<()> {
        (**self).enable_copy_profiling(enable)
    }

    fn agents(&self) -> RuntimeResult<Vec<AgentHandle>> {
        (**self).agents()
    }

    fn agent_name(&self, agent: AgentHandle) -> RuntimeResult<String> {
        (**self).agent_name(agent)
    }

    fn agent_device_code(&self, agent: AgentHandle) -> RuntimeResult<u32> {
        (**self).agent_device_code(agent)
    }

    fn agent_node(&self, agent: AgentHandle) -> RuntimeResult<u32> {
        (**self).agent_node(agent)
    }

    fn agent_pools(&self, agent: AgentHandle) -> RuntimeResult<Vec<PoolHandle>> {
        (**self).agent_pools(agent)
    }

    fn pool_segment(&self, pool: PoolHandle) -> RuntimeResult<Segment> {
        (**self).pool_segment(pool)
    }

    fn pool_alloc_allowed(&self, pool: PoolHandle) -> RuntimeResult<bool> {
        (**self).pool_alloc_allowed(pool)
    }

    fn pool_size(&self, pool: PoolHandle) -> RuntimeResult<u64> {
        (**self).pool_size(pool)
    }

    fn pool_accessible_by_all(&self, pool: PoolHandle) -> RuntimeResult<bool> {
        (**self).pool_accessible_by_all(pool)
    }

    fn pool_global_flags(&self, pool: PoolHandle) -> RuntimeResult<PoolFlags> {
        (**self).pool_global_flags(pool)
    }

    fn agent_pool_access(
        &self,
        agent: AgentHandle,
        pool: PoolHandle,
    ) -> RuntimeResult<PoolAccess> {
        (**self).agent_pool_access(agent, pool)
    }

    fn allocate(&self, pool: PoolHandle, size: u64) -> RuntimeResult<BufferHandle> {
        (**self).allocate(pool, size)
    }

    fn free(&self, buffer: BufferHandle) -> RuntimeResult<()> {
        (**self).free(buffer)
    }

    fn allow_access(&self, agent: AgentHandle, buffer: BufferHandle) -> RuntimeResult<()> {
        (**self).allow_access(agent, buffer)
    }

    fn async_copy(
        &self,
        dst: BufferHandle,
        dst_agent: AgentHandle,
        src: BufferHandle,
        src_agent: AgentHandle,
        size: u64,
        completion: SignalHandle,
    ) -> RuntimeResult<()> {
        (**self).async_copy(dst, dst_agent, src, src_agent, size, completion)
    }

    fn signal_create(&self, initial: i64) -> RuntimeResult<SignalHandle> {
        (**self).signal_create(initial)
    }

    fn signal_store(&self, signal: SignalHandle, value: i64) {
        (**self).signal_store(signal, value)
    }

    fn signal_value(&self, signal: SignalHandle) -> i64 {
        (**self).signal_value(signal)
    }

    fn signal_destroy(&self, signal: SignalHandle) -> RuntimeResult<()> {
        (**self).signal_destroy(signal)
    }

    fn copy_span(&self, signal: SignalHandle) -> RuntimeResult<CopySpan> {
        (**self).copy_span(signal)
    }

    fn link_hops(&self, agent: AgentHandle, pool: PoolHandle) -> RuntimeResult<u32> {
        (**self).link_hops(agent, pool)
    }

    fn link_hop_info(
        &self,
        agent: AgentHandle,
        pool: PoolHandle,
    ) -> RuntimeResult<Vec<RawLinkHop>> {
        (**self).link_hop_info(agent, pool)
    }
}
