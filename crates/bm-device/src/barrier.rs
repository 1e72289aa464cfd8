use std::sync::{Condvar, Mutex, PoisonError};

/// Group-wide barrier that can be broken.
///
/// Behaves like `std::sync::Barrier`, except that when a worker dies the
/// barrier is broken and every current and future `wait` returns at once,
/// so the surviving workers of the group run to completion instead of
/// blocking forever.
#[derive(Debug)]
pub(crate) struct GroupBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

#[derive(Debug, Default)]
struct BarrierState {
    arrived: usize,
    generation: u64,
    broken: bool,
}

impl GroupBarrier {
    pub(crate) fn new(parties: usize) -> Self {
        GroupBarrier {
            parties,
            state: Mutex::new(BarrierState::default()),
            cvar: Condvar::new(),
        }
    }

    /// Block until all parties arrive. Returns `false` if the barrier is
    /// (or becomes) broken.
    pub(crate) fn wait(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.broken {
            return false;
        }
        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation += 1;
            self.cvar.notify_all();
            return true;
        }
        while state.generation == generation && !state.broken {
            state = self
                .cvar
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.generation != generation
    }

    pub(crate) fn break_barrier(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.broken = true;
        self.cvar.notify_all();
    }
}
