//! BenchLink - Heterogeneous Compute Link Discovery and Benchmarking
//!
//! BenchLink discovers the compute agents (CPUs, GPUs) and memory pools a
//! heterogeneous-compute runtime exposes and measures point-to-point
//! transfer bandwidth and latency between them. It features:
//!
//! - **Topology Discovery**: Enumerates agents with their NUMA placement and
//!   memory pools, classifies device types, and tags each agent's
//!   CPU-visible system pool
//! - **Peer Access Classification**: Rates every agent pair as no-access,
//!   one-way, or two-way, including the stricter both-directions rule for
//!   GPU peers
//! - **Link Resolution**: Walks the per-hop interconnect path (PCIe,
//!   HyperTransport, QPI, InfiniBand) and aggregates NUMA distance
//! - **Timed Transfers**: Drives asynchronous copies with completion
//!   signals and derives durations from device-side profiling timestamps,
//!   including the overlap-window rule for bidirectional runs
//! - **Backend Agnostic**: Everything runs against the [`runtime::ComputeRuntime`]
//!   trait; a scriptable in-memory backend ([`runtime::sim::SimRuntime`])
//!   ships for tests and dry-runs
//!
//! # Architecture
//!
//! BenchLink consists of several key components:
//!
//! - **Runtime Layer** ([`runtime`]): The capability trait the crate calls
//!   into, the status-code catalog, and the simulated backend
//! - **Topology Layer** ([`topology`]): Discovery, the immutable topology
//!   snapshot, peer-access evaluation, and link resolution
//! - **Transfer Layer** ([`transfer`]): Buffer-pair allocation with RAII
//!   cleanup and the timed transfer engine
//! - **Session** ([`bench`]): [`bench::BenchLink`] ties a runtime and its
//!   discovered topology together with an init-once / teardown-once
//!   lifecycle
//!
//! # Example
//!
//! ```rust,no_run
//! use benchlink::bench::BenchLink;
//! use benchlink::config::BenchConfig;
//! use benchlink::runtime::sim::{SimPoolSpec, SimRuntime};
//!
//! // Script a topology (a real deployment binds ComputeRuntime to the
//! // vendor runtime instead)
//! let sim = SimRuntime::new();
//! let cpu = sim.add_cpu("cpu0", 0);
//! sim.add_pool(cpu, SimPoolSpec::kernarg(1 << 30));
//! let gpu = sim.add_gpu("gfx906", 1);
//! sim.add_pool(gpu, SimPoolSpec::device_local(1 << 30));
//!
//! let session = BenchLink::init(sim, &BenchConfig::default());
//! for &size in session.sizes() {
//!     match session.send_traffic(0, 1, size, false) {
//!         Ok(seconds) => println!("{} B in {:.9} s", size, seconds),
//!         Err(e) => eprintln!("transfer failed: {}", e),
//!     }
//! }
//! println!("peer access 0<->1: {}", session.peer_status(0, 1));
//! ```

pub mod bench;
pub mod config;
pub mod constants;
pub mod logging;
pub mod runtime;
pub mod stats;
pub mod topology;
pub mod transfer;

pub use bench::BenchLink;
pub use config::BenchConfig;
pub use runtime::{ComputeRuntime, RuntimeStatus};
pub use topology::{LinkPath, PeerStatus, Topology};
pub use transfer::TransferError;
