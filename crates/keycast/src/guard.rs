//! Re-entrancy guard shared by the injector and the dispatch boundary.
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Process-wide flag, true exactly while an injection is in progress.
///
/// The dispatch layer checks this before acting on any hook event; while it
/// is set, everything arriving from the hook is our own output echoed back.
#[derive(Clone, Default)]
pub struct InjectGuard {
    active: Arc<AtomicBool>,
}

impl InjectGuard {
    /// Create a cleared guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while an injection is emitting events.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Set the guard, returning a scope that clears it on drop.
    pub fn enter(&self) -> GuardScope {
        self.active.store(true, Ordering::SeqCst);
        GuardScope {
            active: self.active.clone(),
        }
    }
}

/// RAII scope holding the guard set; dropping clears it. Drop runs on every
/// exit path, so the guard can never be left stuck on — a stuck guard would
/// permanently deafen input dispatch.
pub struct GuardScope {
    active: Arc<AtomicBool>,
}

impl Drop for GuardScope {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_sets_and_clears() {
        let g = InjectGuard::new();
        assert!(!g.is_active());
        {
            let _scope = g.enter();
            assert!(g.is_active());
        }
        assert!(!g.is_active());
    }

    #[test]
    fn clones_share_state() {
        let g = InjectGuard::new();
        let view = g.clone();
        let _scope = g.enter();
        assert!(view.is_active());
    }
}
