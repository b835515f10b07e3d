use std::sync::{Arc, Mutex, MutexGuard};

use super::settings::BlockMode;

/// External enforcement collaborator.
///
/// The engine decides *what* is blocked and *when* a bypass is open; the
/// gate is whatever actually intercepts requests or launches.
pub trait EnforcementGate: Send {
    /// Open a bypass for `duration_secs`. Returns whether it was granted.
    fn request_bypass(&mut self, duration_secs: u32) -> bool;

    /// Close any bypass. Must be safe to call when none is open.
    fn end_bypass(&mut self);

    /// Replace the rule set. An empty pattern list disengages blocking.
    fn apply_rules(&mut self, mode: BlockMode, patterns: &[String]);
}

#[derive(Debug, Default)]
struct GateState {
    mode: BlockMode,
    patterns: Vec<String>,
    bypass_secs: Option<u32>,
    deny_bypass: bool,
}

/// In-process gate that evaluates rules without intercepting anything.
///
/// Clones share state, so a caller can keep a handle after boxing one into
/// the engine.
#[derive(Debug, Clone, Default)]
pub struct LocalGate {
    state: Arc<Mutex<GateState>>,
}

impl LocalGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate that refuses every bypass request.
    pub fn denying() -> Self {
        let gate = Self::default();
        gate.lock().deny_bypass = true;
        gate
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_bypass_open(&self) -> bool {
        self.lock().bypass_secs.is_some()
    }

    pub fn mode(&self) -> BlockMode {
        self.lock().mode
    }

    pub fn patterns(&self) -> Vec<String> {
        self.lock().patterns.clone()
    }

    /// Whether requests matching `pattern` are currently intercepted.
    pub fn is_engaged(&self, pattern: &str) -> bool {
        let state = self.lock();
        state.bypass_secs.is_none() && state.patterns.iter().any(|p| p == pattern)
    }
}

impl EnforcementGate for LocalGate {
    fn request_bypass(&mut self, duration_secs: u32) -> bool {
        let mut state = self.lock();
        if state.deny_bypass {
            return false;
        }
        state.bypass_secs = Some(duration_secs);
        true
    }

    fn end_bypass(&mut self) {
        self.lock().bypass_secs = None;
    }

    fn apply_rules(&mut self, mode: BlockMode, patterns: &[String]) {
        let mut state = self.lock();
        state.mode = mode;
        state.patterns = patterns.to_vec();
    }
}
