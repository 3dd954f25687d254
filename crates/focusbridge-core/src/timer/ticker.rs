//! Lifecycle-scoped tick tokens.
//!
//! Whoever drives the one-second trigger asks for a [`TickHandle`] and passes
//! it with every tick. Once the handle is invalidated (teardown, or a new
//! handle was scheduled) any tick still carrying it is ignored.

/// Token identifying one tick schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle {
    generation: u64,
}

impl TickHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Default)]
pub struct TickScope {
    live: Option<u64>,
    issued: u64,
}

impl TickScope {
    /// Issue a new handle. Any previously issued handle stops being live.
    pub fn schedule(&mut self) -> TickHandle {
        self.issued += 1;
        self.live = Some(self.issued);
        TickHandle {
            generation: self.issued,
        }
    }

    /// Retire `handle`. Returns `false` if it was already dead.
    pub fn invalidate(&mut self, handle: TickHandle) -> bool {
        if self.live == Some(handle.generation) {
            self.live = None;
            true
        } else {
            false
        }
    }

    pub fn is_live(&self, handle: &TickHandle) -> bool {
        self.live == Some(handle.generation)
    }
}
