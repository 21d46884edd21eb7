//! Session lifecycle bookkeeping: who has joined, and who currently
//! holds the mutual-exclusion "edit control" token.
//!
//! Entirely host-side UI policy — the Sync Manager never reads
//! anything in this module, and any participant may submit local
//! operations at the engine layer regardless of token state.

use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::error::SessionError;

pub type SessionId = Uuid;

/// The mutual-exclusion edit-control token for a session. Serializes
/// in serde's default external form: `"Free"` or `{"HeldBy":"u1"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EditControlState {
    Free,
    HeldBy(String),
}

struct SessionRecord {
    participants: Vec<String>,
    edit_control: EditControlState,
}

impl SessionRecord {
    fn new() -> Self {
        Self {
            participants: Vec::new(),
            edit_control: EditControlState::Free,
        }
    }
}

/// Registry of collaboration sessions. Keyed by opaque `SessionId`;
/// in practice a single host process serves one session at a time, but
/// the registry does not assume that.
pub struct SessionManager {
    sessions: DashMap<SessionId, SessionRecord>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn create_session(&self) -> SessionId {
        let id = Uuid::new_v4();
        self.sessions.insert(id, SessionRecord::new());
        tracing::info!(session_id = %id, "session created");
        id
    }

    pub fn join(&self, session_id: SessionId, participant: &str) -> Result<(), SessionError> {
        let mut session = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        if !session.participants.iter().any(|p| p == participant) {
            session.participants.push(participant.to_string());
        }
        tracing::info!(session_id = %session_id, participant, "participant joined");
        Ok(())
    }

    pub fn leave(&self, session_id: SessionId, participant: &str) -> Result<(), SessionError> {
        let mut session = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        session.participants.retain(|p| p != participant);
        if session.edit_control == EditControlState::HeldBy(participant.to_string()) {
            session.edit_control = EditControlState::Free;
        }
        tracing::info!(session_id = %session_id, participant, "participant left");
        Ok(())
    }

    /// Grants edit control if free; otherwise leaves it untouched and
    /// returns the current (unchanged) holder.
    pub fn request_edit_control(
        &self,
        session_id: SessionId,
        participant: &str,
    ) -> Result<EditControlState, SessionError> {
        let mut session = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        if !session.participants.iter().any(|p| p == participant) {
            return Err(SessionError::NotAMember(participant.to_string()));
        }
        if session.edit_control == EditControlState::Free {
            session.edit_control = EditControlState::HeldBy(participant.to_string());
        }
        Ok(session.edit_control.clone())
    }

    pub fn release_edit_control(
        &self,
        session_id: SessionId,
        participant: &str,
    ) -> Result<(), SessionError> {
        let mut session = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        if session.edit_control == EditControlState::HeldBy(participant.to_string()) {
            session.edit_control = EditControlState::Free;
        }
        Ok(())
    }

    pub fn participants(&self, session_id: SessionId) -> Result<Vec<String>, SessionError> {
        self.sessions
            .get(&session_id)
            .map(|s| s.participants.clone())
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    pub fn edit_control(&self, session_id: SessionId) -> Result<EditControlState, SessionError> {
        self.sessions
            .get(&session_id)
            .map(|s| s.edit_control.clone())
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_adds_participant_once() {
        let mgr = SessionManager::new();
        let id = mgr.create_session();
        mgr.join(id, "u1").unwrap();
        mgr.join(id, "u1").unwrap();
        assert_eq!(mgr.participants(id).unwrap(), vec!["u1".to_string()]);
    }

    #[test]
    fn request_edit_control_grants_when_free() {
        let mgr = SessionManager::new();
        let id = mgr.create_session();
        mgr.join(id, "u1").unwrap();
        let state = mgr.request_edit_control(id, "u1").unwrap();
        assert_eq!(state, EditControlState::HeldBy("u1".to_string()));
    }

    #[test]
    fn request_edit_control_denied_when_held_by_another() {
        let mgr = SessionManager::new();
        let id = mgr.create_session();
        mgr.join(id, "u1").unwrap();
        mgr.join(id, "u2").unwrap();
        mgr.request_edit_control(id, "u1").unwrap();
        let state = mgr.request_edit_control(id, "u2").unwrap();
        assert_eq!(state, EditControlState::HeldBy("u1".to_string()));
    }

    #[test]
    fn non_member_cannot_request_edit_control() {
        let mgr = SessionManager::new();
        let id = mgr.create_session();
        assert!(matches!(
            mgr.request_edit_control(id, "ghost"),
            Err(SessionError::NotAMember(_))
        ));
    }

    #[test]
    fn leaving_holder_releases_edit_control() {
        let mgr = SessionManager::new();
        let id = mgr.create_session();
        mgr.join(id, "u1").unwrap();
        mgr.request_edit_control(id, "u1").unwrap();
        mgr.leave(id, "u1").unwrap();
        assert_eq!(mgr.edit_control(id).unwrap(), EditControlState::Free);
    }

    #[test]
    fn unknown_session_returns_not_found() {
        let mgr = SessionManager::new();
        assert!(matches!(
            mgr.join(Uuid::new_v4(), "u1"),
            Err(SessionError::NotFound(_))
        ));
    }
}
