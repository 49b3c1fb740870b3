use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::service::ProtocolViolation;
use crate::{AppError, AppResult};

pub type ConnectionId = u64;

/// Protocol state of one connection.
///
/// Every connection starts in `Handshaking` and moves to `Status` or `Login`
/// exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Handshaking,
    Status,
    Login,
}

impl ConnectionState {
    /// Maps the `next state` field of a handshake.
    pub fn from_next_state(raw_state: i32) -> Result<ConnectionState, ProtocolViolation> {
        match raw_state {
            1 => Ok(ConnectionState::Status),
            2 => Ok(ConnectionState::Login),
            other => Err(ProtocolViolation::UnknownStateValue(other)),
        }
    }
}

/// Connection id → protocol state for every open connection.
///
/// Shared by all connection workers; each access locks the shard holding the
/// entry, so readers and the idle watchdog never observe a torn update.
#[derive(Debug)]
pub struct SessionRegistry {
    states: DashMap<ConnectionId, ConnectionState>,
    next_id: AtomicU64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry {
            states: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocates an id for a freshly accepted connection and registers it in
    /// `Handshaking`. The entry is removed when the returned guard drops.
    pub fn open(self: &Arc<Self>) -> SessionGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.states.insert(id, ConnectionState::Handshaking);
        trace!("session {} registered", id);
        SessionGuard {
            registry: self.clone(),
            id,
        }
    }

    pub fn state(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.states.get(&id).map(|entry| *entry.value())
    }

    /// Moves a session out of `Handshaking`.
    pub fn transition(&self, id: ConnectionId, next: ConnectionState) -> AppResult<()> {
        let mut entry = self.states.get_mut(&id).ok_or_else(|| {
            AppError::IllegalStateError(format!("session {} is not registered", id).into())
        })?;
        if *entry != ConnectionState::Handshaking {
            return Err(AppError::IllegalStateError(
                format!("session {} already left handshaking ({:?})", id, *entry).into(),
            ));
        }
        *entry = next;
        Ok(())
    }

    pub fn remove(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.states.remove(&id).map(|(_, state)| state)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Keeps a session registered for as long as its connection worker runs,
/// including when the worker unwinds from a panic.
#[derive(Debug)]
pub struct SessionGuard {
    registry: Arc<SessionRegistry>,
    id: ConnectionId,
}

impl SessionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove(self.id);
        trace!("session {} removed", self.id);
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1, ConnectionState::Status)]
    #[case(2, ConnectionState::Login)]
    fn test_known_next_states(#[case] raw: i32, #[case] expected: ConnectionState) {
        assert_eq!(ConnectionState::from_next_state(raw), Ok(expected));
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    #[case(-1)]
    fn test_unknown_next_states(#[case] raw: i32) {
        assert_eq!(
            ConnectionState::from_next_state(raw),
            Err(ProtocolViolation::UnknownStateValue(raw))
        );
    }

    #[test]
    fn test_guard_registers_and_removes() {
        let registry = Arc::new(SessionRegistry::new());
        let first = registry.open();
        let second = registry.open();
        assert_ne!(first.id(), second.id());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.state(first.id()), Some(ConnectionState::Handshaking));

        let id = first.id();
        drop(first);
        assert_eq!(registry.state(id), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_transition_only_from_handshaking() {
        let registry = Arc::new(SessionRegistry::new());
        let guard = registry.open();
        registry
            .transition(guard.id(), ConnectionState::Status)
            .unwrap();
        assert_eq!(registry.state(guard.id()), Some(ConnectionState::Status));

        let err = registry
            .transition(guard.id(), ConnectionState::Login)
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(registry.state(guard.id()), Some(ConnectionState::Status));
    }

    #[test]
    fn test_guard_removes_on_panic() {
        let registry = Arc::new(SessionRegistry::new());
        let cloned = registry.clone();
        let result = std::thread::spawn(move || {
            let _guard = cloned.open();
            panic!("handler blew up");
        })
        .join();
        assert!(result.is_err());
        assert!(registry.is_empty());
    }
}
