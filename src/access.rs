//! Sender allow-list checked before an update reaches the pipeline.

use std::collections::HashSet;
use teloxide::types::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

pub struct AccessGate {
    allowed: HashSet<UserId>,
}

impl AccessGate {
    /// An empty allow-list admits everyone.
    pub fn new(allowed: HashSet<UserId>) -> Self {
        Self { allowed }
    }

    /// With an allow-list configured, updates without a sender are denied too.
    pub fn check(&self, sender: Option<UserId>) -> Access {
        if self.allowed.is_empty() {
            return Access::Allow;
        }
        match sender {
            Some(id) if self.allowed.contains(&id) => Access::Allow,
            _ => Access::Deny,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_gate() {
        let gate = AccessGate::new(HashSet::new());
        assert_eq!(gate.check(Some(UserId(1))), Access::Allow);
    }

    #[test]
    fn test_allow_list() {
        let gate = AccessGate::new(HashSet::from([UserId(1)]));
        assert_eq!(gate.check(Some(UserId(1))), Access::Allow);
        assert_eq!(gate.check(Some(UserId(2))), Access::Deny);
    }

    #[test]
    fn test_anonymous_denied_by_allow_list() {
        let gate = AccessGate::new(HashSet::from([UserId(1)]));
        assert_eq!(gate.check(None), Access::Deny);
    }

    #[test]
    fn test_anonymous_passes_open_gate() {
        let gate = AccessGate::new(HashSet::new());
        assert_eq!(gate.check(None), Access::Allow);
    }
}
