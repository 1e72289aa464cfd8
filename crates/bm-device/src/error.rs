use thiserror::Error;

use crate::dim::Dim2;

/// Why a launch configuration was rejected before any work was queued.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("grid {grid} has no groups")]
    EmptyGrid { grid: Dim2 },
    #[error("group shape {block} has no workers")]
    EmptyBlock { block: Dim2 },
    #[error("group of {requested} workers exceeds the device limit of {limit}")]
    TooManyThreads { requested: usize, limit: usize },
    #[error("kernel needs {requested} bytes of shared memory per group, device allows {limit}")]
    SharedMemoryExceeded { requested: usize, limit: usize },
    #[error("kernel '{kernel}' rejected its arguments: {reason}")]
    InvalidArguments { kernel: String, reason: String },
}

/// A fault raised while a kernel was executing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelFault {
    #[error("illegal address: index {index} outside a buffer of {len} elements")]
    IllegalAddress { index: usize, len: usize },
    #[error("worker {thread} of group {block} hit a barrier in a kernel declared barrier-free")]
    UndeclaredBarrier { block: Dim2, thread: Dim2 },
    #[error("worker {thread} of group {block} panicked: {message}")]
    WorkerPanicked {
        block: Dim2,
        thread: Dim2,
        message: String,
    },
    #[error("shared state setup for group {block} panicked: {message}")]
    SharedSetupPanicked { block: Dim2, message: String },
    #[error("stream worker terminated before completing queued work")]
    StreamTerminated,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("out of device memory: requested {requested} bytes, {available} available")]
    AllocationFailure { requested: usize, available: usize },
    #[error("launch failure: {0}")]
    LaunchFailure(#[from] LaunchError),
    #[error("execution failure: {0}")]
    ExecutionFailure(#[from] KernelFault),
    #[error("copy size mismatch: device buffer holds {expected} elements, host slice has {got}")]
    InvalidCopy { expected: usize, got: usize },
    #[error("device initialization failed: {0}")]
    Initialization(String),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
