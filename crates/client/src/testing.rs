//! Test doubles shared by the unit tests of this crate.

use crate::api::{SessionApi, SessionGrant};
use crate::error::SessionError;
use async_trait::async_trait;
use pong_sync_core::{Actor, Player, SessionId, SessionState, Slot};
use pong_sync_net::SessionPayload;

/// Grant for `session_id` as `actor` with a `(id, slot)` roster.
pub(crate) fn grant(session_id: &str, actor: &str, players: &[(&str, u8)]) -> SessionGrant {
    SessionGrant {
        actor: Actor::new(actor),
        session: SessionPayload {
            session_id: session_id.into(),
            state: SessionState::Pending,
            players: players
                .iter()
                .map(|&(id, slot)| Player::new(id, Slot::from_u8(slot).expect("valid slot")))
                .collect(),
        },
    }
}

#[derive(Debug, Clone)]
enum Response {
    Grant(SessionGrant),
    Fail(u16, String),
}

/// Session endpoint answering every request the same way.
#[derive(Debug)]
pub(crate) struct FakeApi {
    response: Response,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self::failing(500, "not configured")
    }
}

impl FakeApi {
    pub(crate) fn granting(grant: SessionGrant) -> Self {
        Self {
            response: Response::Grant(grant),
        }
    }

    pub(crate) fn failing(status: u16, body: &str) -> Self {
        Self {
            response: Response::Fail(status, body.to_string()),
        }
    }

    fn answer(&self) -> Result<SessionGrant, SessionError> {
        match &self.response {
            Response::Grant(grant) => Ok(grant.clone()),
            Response::Fail(status, body) => Err(SessionError::Remote {
                status: *status,
                body: body.clone(),
            }),
        }
    }
}

#[async_trait]
impl SessionApi for FakeApi {
    async fn create_session(&self) -> Result<SessionGrant, SessionError> {
        self.answer()
    }

    async fn join_session(&self, _session_id: &SessionId) -> Result<SessionGrant, SessionError> {
        self.answer()
    }

    async fn watch_session(&self, _session_id: &SessionId) -> Result<SessionGrant, SessionError> {
        self.answer()
    }
}
