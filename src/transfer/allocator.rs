//! Mutually accessible buffer-pair allocation
//!
//! Finds, for a source/destination agent pair and a transfer size, the
//! first pool pair that can hold the buffers and that the copying agents
//! are allowed to reach, then allocates both buffers and grants the one
//! cross-agent access the copy needs. The search is first-fit and
//! best-effort: individual allocation or grant failures are logged and the
//! search moves on; only full exhaustion is an error.

use tracing::debug;

use crate::runtime::{BufferHandle, ComputeRuntime, DeviceClass, PoolHandle};
use crate::topology::Topology;
use crate::transfer::{TransferError, TransferResult};

/// A buffer allocated from a memory pool, freed on drop
///
/// Holding the runtime borrow inside the guard makes the no-leak contract
/// structural: every exit path of the transfer engine releases its buffers
/// when the guards unwind. A failed free only produces a diagnostic; the
/// handle is gone either way.
pub struct PoolBuffer<'r, R: ComputeRuntime> {
    rt: &'r R,
    handle: BufferHandle,
}

impl<'r, R: ComputeRuntime> PoolBuffer<'r, R> {
    /// Allocate `size` bytes from `pool`
    pub fn allocate(rt: &'r R, pool: PoolHandle, size: u64) -> TransferResult<Self> {
        let handle = rt.allocate(pool, size)?;
        Ok(Self { rt, handle })
    }

    /// Runtime handle of the buffer
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }
}

impl<R: ComputeRuntime> Drop for PoolBuffer<'_, R> {
    fn drop(&mut self) {
        if let Err(status) = self.rt.free(self.handle) {
            debug!("buffer free failed: {}", status);
        }
    }
}

/// A matched source/destination buffer pair with access granted
pub struct BufferPair<'r, R: ComputeRuntime> {
    pub src_pool: PoolHandle,
    pub src_buf: PoolBuffer<'r, R>,
    pub dst_pool: PoolHandle,
    pub dst_buf: PoolBuffer<'r, R>,
}

/// Find and allocate a mutually accessible buffer pair
///
/// Pool selection is first-fit over the recorded max sizes. Directional
/// accessibility is judged from the non-CPU side: a CPU agent reaches its
/// own pools implicitly, so when the source is a CPU the destination
/// agent's view of the destination pool decides, and otherwise the source
/// agent's view does. The matching access grant is equally one-sided;
/// the CPU side never needs one.
pub fn allocate<'r, R: ComputeRuntime>(
    rt: &'r R,
    topo: &Topology,
    src_ix: usize,
    dst_ix: usize,
    size: u64,
) -> TransferResult<BufferPair<'r, R>> {
    let src = &topo.agents()[src_ix];
    let dst = &topo.agents()[dst_ix];
    let src_is_cpu = matches!(src.device, DeviceClass::Cpu);

    for (i, &src_pool) in src.pools.iter().enumerate() {
        if size > src.pool_sizes[i] {
            continue;
        }

        let src_buf = match PoolBuffer::allocate(rt, src_pool, size) {
            Ok(buf) => buf,
            Err(TransferError::Runtime(status)) => {
                debug!("source allocation failed in pool {:?}: {}", src_pool, status);
                continue;
            }
            Err(other) => return Err(other),
        };

        for (j, &dst_pool) in dst.pools.iter().enumerate() {
            if size > dst.pool_sizes[j] {
                continue;
            }

            // judge accessibility from the non-CPU side
            let access = if src_is_cpu {
                rt.agent_pool_access(dst.handle, dst_pool)
            } else {
                rt.agent_pool_access(src.handle, dst_pool)
            };
            match access {
                Ok(access) if access.usable() => {}
                Ok(_) => continue,
                Err(status) => {
                    debug!("destination access query failed: {}", status);
                    continue;
                }
            }

            let dst_buf = match PoolBuffer::allocate(rt, dst_pool, size) {
                Ok(buf) => buf,
                Err(TransferError::Runtime(status)) => {
                    debug!(
                        "destination allocation failed in pool {:?}: {}",
                        dst_pool, status
                    );
                    continue;
                }
                Err(other) => return Err(other),
            };

            // grant the single cross-agent access the copy needs
            let grant = if src_is_cpu {
                rt.allow_access(dst.handle, src_buf.handle())
            } else {
                rt.allow_access(src.handle, dst_buf.handle())
            };
            if let Err(status) = grant {
                debug!("access grant failed: {}", status);
                // dst_buf freed on drop, keep searching destinations
                continue;
            }

            return Ok(BufferPair {
                src_pool,
                src_buf,
                dst_pool,
                dst_buf,
            });
        }

        // no destination matched this source buffer; src_buf freed on drop
    }

    Err(TransferError::NoMatchingPoolPair {
        src_ix,
        dst_ix,
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::sim::{SimPoolSpec, SimRuntime};
    use crate::runtime::PoolAccess;
    use crate::topology::discover;

    /// CPU(node 0) with kernarg pool, GPU(node 1) with device pool,
    /// access open in both directions
    fn open_sim() -> (SimRuntime, crate::topology::Topology) {
        let sim = SimRuntime::new();
        let cpu = sim.add_cpu("cpu0", 0);
        sim.add_pool(cpu, SimPoolSpec::kernarg(1 << 30));
        let gpu = sim.add_gpu("gfx906", 1);
        let gpu_pool = sim.add_pool(gpu, SimPoolSpec::device_local(1 << 30));
        sim.set_access(cpu, gpu_pool, PoolAccess::AllowedByDefault);
        sim.set_access(gpu, gpu_pool, PoolAccess::AllowedByDefault);
        let topo = discover(&sim, &[]);
        (sim, topo)
    }

    #[test]
    fn test_successful_pair_and_release() {
        let (sim, topo) = open_sim();
        {
            let pair = allocate(&sim, &topo, 0, 1, 1 << 20).unwrap();
            assert_eq!(sim.outstanding_buffers(), 2);
            assert_eq!(pair.src_pool, topo.agents()[0].pools[0]);
            assert_eq!(pair.dst_pool, topo.agents()[1].pools[0]);
        }
        // guards dropped
        assert_eq!(sim.outstanding_buffers(), 0);
    }

    #[test]
    fn test_exhaustion_leaves_no_buffers() {
        let (sim, topo) = open_sim();
        let gpu_pool = topo.agents()[1].pools[0];
        sim.fail_allocation(gpu_pool);

        let result = allocate(&sim, &topo, 0, 1, 1 << 20);
        assert!(matches!(
            result,
            Err(TransferError::NoMatchingPoolPair { .. })
        ));
        assert_eq!(sim.outstanding_buffers(), 0);
    }

    #[test]
    fn test_size_filter_skips_small_pools() {
        let sim = SimRuntime::new();
        let cpu = sim.add_cpu("cpu0", 0);
        sim.add_pool(cpu, SimPoolSpec::kernarg(1 << 10)); // too small
        let big = sim.add_pool(cpu, SimPoolSpec::kernarg(1 << 30));
        let gpu = sim.add_gpu("gfx906", 1);
        let gpu_pool = sim.add_pool(gpu, SimPoolSpec::device_local(1 << 30));
        sim.set_access(gpu, gpu_pool, PoolAccess::AllowedByDefault);
        let topo = discover(&sim, &[]);

        let pair = allocate(&sim, &topo, 0, 1, 1 << 20).unwrap();
        assert_eq!(pair.src_pool, big);
        // the undersized pool was never touched
        assert_eq!(sim.allocation_count(), 2);
    }

    #[test]
    fn test_never_allowed_destination_skipped() {
        let (sim, topo) = open_sim();
        let gpu = topo.agents()[1].handle;
        let gpu_pool = topo.agents()[1].pools[0];
        // source is CPU, so the destination agent's view decides
        sim.set_access(gpu, gpu_pool, PoolAccess::NeverAllowed);

        let result = allocate(&sim, &topo, 0, 1, 1 << 20);
        assert!(matches!(
            result,
            Err(TransferError::NoMatchingPoolPair { .. })
        ));
        assert_eq!(sim.outstanding_buffers(), 0);
    }

    #[test]
    fn test_gpu_source_uses_own_view() {
        let (sim, topo) = open_sim();
        let cpu = topo.agents()[0].handle;
        let gpu = topo.agents()[1].handle;
        let cpu_pool = topo.agents()[0].pools[0];
        // GPU -> CPU transfer: the GPU (non-CPU source) must see the
        // destination pool; the destination agent's own view is moot
        sim.set_access(gpu, cpu_pool, PoolAccess::AllowedByDefault);
        sim.set_access(cpu, cpu_pool, PoolAccess::NeverAllowed);

        let pair = allocate(&sim, &topo, 1, 0, 1 << 20).unwrap();
        assert_eq!(pair.dst_pool, cpu_pool);
    }

    #[test]
    fn test_grant_failure_continues_to_next_destination() {
        // GPU -> CPU transfer: the grant lands on the destination buffer,
        // so a per-pool grant failure on the first CPU pool must push the
        // search to the second one
        let sim = SimRuntime::new();
        let cpu = sim.add_cpu("cpu0", 0);
        let bad = sim.add_pool(cpu, SimPoolSpec::kernarg(1 << 30));
        let good = sim.add_pool(cpu, SimPoolSpec::kernarg(1 << 30));
        let gpu = sim.add_gpu("gfx906", 1);
        sim.add_pool(gpu, SimPoolSpec::device_local(1 << 30));
        sim.set_access(gpu, bad, PoolAccess::AllowedByDefault);
        sim.set_access(gpu, good, PoolAccess::AllowedByDefault);
        sim.fail_grant(bad);
        let topo = discover(&sim, &[]);

        let pair = allocate(&sim, &topo, 1, 0, 1 << 20).unwrap();
        assert_eq!(pair.dst_pool, good);
        // src + failed dst + successful dst
        assert_eq!(sim.allocation_count(), 3);
        drop(pair);
        assert_eq!(sim.outstanding_buffers(), 0);
    }

    #[test]
    fn test_grant_failure_everywhere_exhausts_cleanly() {
        // CPU source grants on the source buffer; failing grants against
        // the kernarg pool defeats every destination candidate
        let (sim, topo) = open_sim();
        let kernarg = topo.agents()[0].pools[0];
        sim.fail_grant(kernarg);

        let result = allocate(&sim, &topo, 0, 1, 1 << 20);
        assert!(matches!(
            result,
            Err(TransferError::NoMatchingPoolPair { .. })
        ));
        assert_eq!(sim.outstanding_buffers(), 0);
    }

    #[test]
    fn test_first_fit_returns_first_satisfying_pair() {
        let sim = SimRuntime::new();
        let cpu = sim.add_cpu("cpu0", 0);
        let first = sim.add_pool(cpu, SimPoolSpec::kernarg(1 << 30));
        sim.add_pool(cpu, SimPoolSpec::kernarg(1 << 30));
        let gpu = sim.add_gpu("gfx906", 1);
        let gpu_first = sim.add_pool(gpu, SimPoolSpec::device_local(1 << 30));
        sim.add_pool(gpu, SimPoolSpec::device_local(1 << 30));
        sim.set_access(gpu, gpu_first, PoolAccess::AllowedByDefault);
        let topo = discover(&sim, &[]);

        let pair = allocate(&sim, &topo, 0, 1, 1 << 20).unwrap();
        assert_eq!(pair.src_pool, first);
        assert_eq!(pair.dst_pool, gpu_first);
        // exactly one source and one destination allocation
        assert_eq!(sim.allocation_count(), 2);
    }
}
