//! Agent discovery and memory-pool classification
//!
//! Discovery is strictly best-effort: every individual runtime query that
//! fails is logged through the status catalog and replaced with a neutral
//! placeholder, and enumeration carries on. Only the complete absence of
//! the runtime yields an empty (but valid) topology; nothing here aborts.

use tracing::{debug, trace, warn};

use crate::constants::{DEFAULT_SIZE_LIST, UNKNOWN_NODE};
use crate::runtime::{ComputeRuntime, DeviceClass, Segment};
use crate::topology::{AgentRecord, Topology};

/// Discover all agents and their pools, and finalize the size set
///
/// Side effect: enables asynchronous-copy profiling on the runtime so the
/// transfer engine's later timestamp queries are valid.
///
/// `sizes` is the caller-supplied benchmark size list; an empty slice
/// selects the built-in default table. The result is sorted ascending.
pub fn discover<R: ComputeRuntime>(rt: &R, sizes: &[u64]) -> Topology {
    if let Err(status) = rt.enable_copy_profiling(true) {
        warn!("enable_copy_profiling failed: {}", status);
    }

    let handles = match rt.agents() {
        Ok(handles) => handles,
        Err(status) => {
            warn!("agent enumeration failed: {}", status);
            Vec::new()
        }
    };

    let mut agents = Vec::with_capacity(handles.len());
    let mut cpu_view = Vec::new();
    let mut gpu_view = Vec::new();

    for handle in handles {
        let mut record = AgentRecord::new(handle);

        record.name = match rt.agent_name(handle) {
            Ok(name) => name,
            Err(status) => {
                debug!("agent_name query failed: {}", status);
                "unknown".to_string()
            }
        };

        record.device = match rt.agent_device_code(handle) {
            Ok(code) => DeviceClass::from_code(code),
            Err(status) => {
                debug!("agent_device_code query failed: {}", status);
                DeviceClass::Unknown(u32::MAX)
            }
        };

        record.node = match rt.agent_node(handle) {
            Ok(node) => node,
            Err(status) => {
                debug!("agent_node query failed: {}", status);
                UNKNOWN_NODE
            }
        };

        trace!(
            "found agent name={} device={} node={}",
            record.name,
            record.device,
            record.node
        );

        classify_pools(rt, &mut record);

        let index = agents.len();
        match record.device {
            DeviceClass::Cpu => cpu_view.push(index),
            DeviceClass::Gpu => gpu_view.push(index),
            other => debug!("agent {} has unexpected device type: {}", record.name, other),
        }
        agents.push(record);
    }

    let mut size_list: Vec<u64> = if sizes.is_empty() {
        DEFAULT_SIZE_LIST.to_vec()
    } else {
        sizes.to_vec()
    };
    size_list.sort_unstable();

    debug!(
        "discovery complete: {} agents ({} CPU, {} GPU), {} sizes",
        agents.len(),
        cpu_view.len(),
        gpu_view.len(),
        size_list.len()
    );

    Topology::new(agents, cpu_view, gpu_view, size_list)
}

/// Classify one agent's memory pools into its record
///
/// Pools outside the global segment and pools that forbid runtime-initiated
/// allocation are skipped silently. Every pool passing both filters is
/// appended to the pool list unconditionally; the kernarg/owner-access
/// branch below only drives system-pool tagging and logging.
fn classify_pools<R: ComputeRuntime>(rt: &R, record: &mut AgentRecord) {
    let pools = match rt.agent_pools(record.handle) {
        Ok(pools) => pools,
        Err(status) => {
            debug!("pool enumeration failed for {}: {}", record.name, status);
            return;
        }
    };

    for pool in pools {
        match rt.pool_segment(pool) {
            Ok(Segment::Global) => {}
            Ok(_) => continue,
            Err(status) => {
                debug!("pool_segment query failed: {}", status);
                continue;
            }
        }

        match rt.pool_alloc_allowed(pool) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(status) => {
                debug!("pool_alloc_allowed query failed: {}", status);
                continue;
            }
        }

        let max_size = match rt.pool_size(pool) {
            Ok(size) => size,
            Err(status) => {
                debug!("pool_size query failed: {}", status);
                0
            }
        };

        match rt.pool_accessible_by_all(pool) {
            Ok(all) => trace!("pool accessible_by_all={}", all),
            Err(status) => debug!("pool_accessible_by_all query failed: {}", status),
        }

        let owner_access = rt.agent_pool_access(record.handle, pool);
        if let Err(status) = &owner_access {
            debug!("owner access query failed: {}", status);
        }

        let flags = match rt.pool_global_flags(pool) {
            Ok(flags) => flags,
            Err(status) => {
                debug!("pool_global_flags query failed: {}", status);
                Default::default()
            }
        };

        if flags.is_kernarg_init() {
            record.system_pool = Some(pool);
            debug!("found system memory pool on {}", record.name);
        } else if matches!(&owner_access, Ok(access) if access.usable()) {
            debug!("found regular memory pool on {}", record.name);
        }

        record.push_pool(pool, max_size);
    }
}

/// Convenience wrapper: discover and log the runtime init status
///
/// Runtime initialization is reference-counted in real backends, so a
/// failure here is logged and discovery still runs; it will simply come
/// back empty if the runtime is truly unavailable.
pub fn init_and_discover<R: ComputeRuntime>(rt: &R, sizes: &[u64]) -> Topology {
    if let Err(status) = rt.init() {
        warn!("runtime init failed: {}", status);
    }
    discover(rt, sizes)
}
