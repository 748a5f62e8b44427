//! Transfer path: buffer allocation and timed asynchronous copies

pub mod allocator;
pub mod engine;

pub use allocator::{allocate, BufferPair, PoolBuffer};
pub use engine::{send_traffic, CompletionSignal};

use thiserror::Error;

use crate::runtime::RuntimeStatus;

/// Transfer errors
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("no agent found for node {0}")]
    UnknownNode(u32),

    #[error("no mutually accessible pool pair for {size} bytes between agents {src_ix} and {dst_ix}")]
    NoMatchingPoolPair {
        src_ix: usize,
        dst_ix: usize,
        size: u64,
    },

    #[error("completion wait exceeded {0:?}")]
    WaitTimeout(std::time::Duration),

    #[error(transparent)]
    Runtime(#[from] RuntimeStatus),
}

/// Result alias for transfer operations
pub type TransferResult<T> = Result<T, TransferError>;
