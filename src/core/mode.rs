//! Process-wide execution mode switch
//!
//! Read by every deduction, written rarely, so it sits behind a
//! reader/writer lock of its own. A deduction uses whatever value is current
//! at the instant it looks; a toggle racing with in-flight calls splits them
//! across both modes.

use parking_lot::RwLock;

use crate::types::ExecutionMode;

#[derive(Debug, Default)]
pub struct ModeSwitch {
    mode: RwLock<ExecutionMode>,
}

impl ModeSwitch {
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            mode: RwLock::new(mode),
        }
    }

    pub fn current(&self) -> ExecutionMode {
        *self.mode.read()
    }

    /// Switch modes, returning the previous one
    pub fn set(&self, mode: ExecutionMode) -> ExecutionMode {
        std::mem::replace(&mut *self.mode.write(), mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_unprotected() {
        assert_eq!(ModeSwitch::default().current(), ExecutionMode::Unprotected);
    }

    #[test]
    fn test_set_returns_previous_mode() {
        let switch = ModeSwitch::new(ExecutionMode::Unprotected);

        assert_eq!(switch.set(ExecutionMode::Protected), ExecutionMode::Unprotected);
        assert_eq!(switch.current(), ExecutionMode::Protected);
        assert_eq!(switch.set(ExecutionMode::Protected), ExecutionMode::Protected);
    }
}
