//! Link topology resolution between agent pairs
//!
//! Resolves the hop-by-hop interconnect path from a source agent to a
//! destination agent's memory, classifying each hop's link type and
//! summing NUMA distances. Link queries are hard-fail (see the crate's
//! error-policy split): partial path data is not reported.

use thiserror::Error;

use crate::runtime::{ComputeRuntime, RuntimeStatus};
use crate::topology::Topology;

/// Topology query errors
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("no agent found for node {0}")]
    UnknownNode(u32),

    #[error(transparent)]
    Runtime(#[from] RuntimeStatus),
}

/// Result alias for topology queries
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Interconnect classification of one link hop
///
/// Unrecognized link-type codes are preserved for diagnostics instead of
/// being collapsed into a catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    HyperTransport,
    Qpi,
    Pcie,
    InfiniBand,
    Unknown(u32),
}

impl LinkKind {
    /// Classify a raw link-type code from the runtime
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => LinkKind::HyperTransport,
            1 => LinkKind::Qpi,
            2 => LinkKind::Pcie,
            3 => LinkKind::InfiniBand,
            other => LinkKind::Unknown(other),
        }
    }
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkKind::HyperTransport => write!(f, "HyperTransport"),
            LinkKind::Qpi => write!(f, "QPI"),
            LinkKind::Pcie => write!(f, "PCIe"),
            LinkKind::InfiniBand => write!(f, "InfiniBand"),
            LinkKind::Unknown(code) => write!(f, "unknown-{}", code),
        }
    }
}

/// One hop on the path between two agents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkHop {
    /// NUMA distance contributed by this hop
    pub distance: u32,
    /// Link classification
    pub kind: LinkKind,
}

/// Full path between two agents
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkPath {
    /// Aggregate NUMA distance (sum over hops)
    pub distance: u32,
    /// Hops in path order; empty when there is no topology to measure
    pub hops: Vec<LinkHop>,
}

/// Resolve the link path from `src_node` to `dst_node`
///
/// A destination agent without pools has no reachable memory, so the path
/// is trivially empty (distance 0) and no link queries are issued. The
/// same applies when the runtime reports fewer than one hop.
pub fn link_info<R: ComputeRuntime>(
    rt: &R,
    topo: &Topology,
    src_node: u32,
    dst_node: u32,
) -> TopologyResult<LinkPath> {
    let src_ix = topo
        .find_agent(src_node)
        .ok_or(TopologyError::UnknownNode(src_node))?;
    let dst_ix = topo
        .find_agent(dst_node)
        .ok_or(TopologyError::UnknownNode(dst_node))?;

    let src = &topo.agents()[src_ix];
    let dst = &topo.agents()[dst_ix];

    let Some(&dst_pool) = dst.pools.first() else {
        return Ok(LinkPath::default());
    };

    let hop_count = rt.link_hops(src.handle, dst_pool)?;
    if hop_count < 1 {
        return Ok(LinkPath::default());
    }

    let raw = rt.link_hop_info(src.handle, dst_pool)?;

    let mut distance = 0u32;
    let mut hops = Vec::with_capacity(raw.len());
    for hop in raw {
        distance += hop.numa_distance;
        hops.push(LinkHop {
            distance: hop.numa_distance,
            kind: LinkKind::from_code(hop.link_type_code),
        });
    }

    Ok(LinkPath { distance, hops })
}
