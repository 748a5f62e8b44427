//! Runtime status codes and their diagnostic text
//!
//! The compute runtime reports failures as numeric status codes. This
//! module owns the translation into human-readable messages before the
//! text reaches the log sink; nothing here holds state.

use thiserror::Error;

/// Result alias for calls into the compute runtime
pub type RuntimeResult<T> = Result<T, RuntimeStatus>;

/// Status codes reported by the compute runtime
///
/// Unrecognized codes are preserved in [`RuntimeStatus::Unknown`] so
/// diagnostics never silently drop information.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeStatus {
    #[error("a generic runtime error occurred")]
    Error,

    #[error("an argument does not meet a precondition of the call")]
    InvalidArgument,

    #[error("the requested allocation is not valid")]
    InvalidAllocation,

    #[error("the agent handle is invalid")]
    InvalidAgent,

    #[error("the memory pool handle is invalid")]
    InvalidPool,

    #[error("the completion signal handle is invalid")]
    InvalidSignal,

    #[error("the index is out of range")]
    InvalidIndex,

    #[error("the runtime failed to allocate the necessary resources")]
    OutOfResources,

    #[error("an error was detected while releasing a resource")]
    ResourceFree,

    #[error("the runtime has not been initialized")]
    NotInitialized,

    #[error("the maximum reference count for the object has been reached")]
    RefcountOverflow,

    #[error("the arguments passed to the call are not compatible")]
    IncompatibleArguments,

    #[error("the operation raised a hardware exception")]
    Exception,

    #[error("unrecognized runtime status code {0}")]
    Unknown(u32),
}

impl RuntimeStatus {
    /// Map a raw runtime status code onto the catalog
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => RuntimeStatus::Error,
            2 => RuntimeStatus::InvalidArgument,
            3 => RuntimeStatus::InvalidAllocation,
            4 => RuntimeStatus::InvalidAgent,
            5 => RuntimeStatus::InvalidPool,
            6 => RuntimeStatus::InvalidSignal,
            7 => RuntimeStatus::InvalidIndex,
            8 => RuntimeStatus::OutOfResources,
            9 => RuntimeStatus::ResourceFree,
            10 => RuntimeStatus::NotInitialized,
            11 => RuntimeStatus::RefcountOverflow,
            12 => RuntimeStatus::IncompatibleArguments,
            13 => RuntimeStatus::Exception,
            other => RuntimeStatus::Unknown(other),
        }
    }

    /// Raw status code for this catalog entry
    pub fn code(&self) -> u32 {
        match self {
            RuntimeStatus::Error => 1,
            RuntimeStatus::InvalidArgument => 2,
            RuntimeStatus::InvalidAllocation => 3,
            RuntimeStatus::InvalidAgent => 4,
            RuntimeStatus::InvalidPool => 5,
            RuntimeStatus::InvalidSignal => 6,
            RuntimeStatus::InvalidIndex => 7,
            RuntimeStatus::OutOfResources => 8,
            RuntimeStatus::ResourceFree => 9,
            RuntimeStatus::NotInitialized => 10,
            RuntimeStatus::RefcountOverflow => 11,
            RuntimeStatus::IncompatibleArguments => 12,
            RuntimeStatus::Exception => 13,
            RuntimeStatus::Unknown(code) => *code,
        }
    }
}
