use std::sync::{Mutex, PoisonError};

use crate::error::KernelFault;

/// First fault raised through a device's buffers.
///
/// One log serves the whole device. Kernels never unwind on a bad access:
/// the access is recorded here and execution continues. Each launch drains
/// the log when it starts, discarding anything host code recorded, and again
/// when it ends, which is the fault reported for that launch. Launches run
/// one at a time, so the two drains bracket exactly one launch.
#[derive(Debug, Default)]
pub(crate) struct FaultLog {
    first: Mutex<Option<KernelFault>>,
}

impl FaultLog {
    pub(crate) fn record(&self, fault: KernelFault) {
        let mut first = self.first.lock().unwrap_or_else(PoisonError::into_inner);
        if first.is_none() {
            log::warn!("kernel fault: {fault}");
            *first = Some(fault);
        }
    }

    pub(crate) fn take(&self) -> Option<KernelFault> {
        self.first
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
