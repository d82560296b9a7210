//! HTTP endpoints that originate network sessions.

use crate::error::SessionError;
use async_trait::async_trait;
use pong_sync_core::{Actor, SessionId};
use pong_sync_net::SessionPayload;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Identity and roster assigned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionGrant {
    /// This client's actor.
    pub actor: Actor,
    /// Session as created or joined.
    pub session: SessionPayload,
}

#[derive(Deserialize)]
struct Envelope {
    data: SessionGrant,
}

#[derive(Serialize)]
struct SessionRequest<'a> {
    session_id: &'a SessionId,
}

/// Session origin operations.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Create a session hosted by this client.
    async fn create_session(&self) -> Result<SessionGrant, SessionError>;

    /// Join an existing session as the second player.
    async fn join_session(&self, session_id: &SessionId) -> Result<SessionGrant, SessionError>;

    /// Watch an existing session.
    async fn watch_session(&self, session_id: &SessionId) -> Result<SessionGrant, SessionError>;
}

/// [`SessionApi`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpSessionApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpSessionApi {
    /// Create an API client for `base` with a per-request timeout.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pong-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, name: &str) -> Result<Url, SessionError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SessionError::InvalidBase(self.base.to_string()))?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }

    async fn post(
        &self,
        name: &str,
        session_id: Option<&SessionId>,
    ) -> Result<SessionGrant, SessionError> {
        let url = self.endpoint(name)?;
        debug!("POST {}", url);

        let mut request = self.client.post(url);
        if let Some(session_id) = session_id {
            request = request.json(&SessionRequest { session_id });
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let Envelope { data } = response.json().await?;
        info!(
            session = %data.session.session_id,
            actor = %data.actor.id,
            "{} succeeded",
            name
        );
        Ok(data)
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn create_session(&self) -> Result<SessionGrant, SessionError> {
        self.post("create_session", None).await
    }

    async fn join_session(&self, session_id: &SessionId) -> Result<SessionGrant, SessionError> {
        self.post("join_session", Some(session_id)).await
    }

    async fn watch_session(&self, session_id: &SessionId) -> Result<SessionGrant, SessionError> {
        self.post("watch_session", Some(session_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pong_sync_core::{Player, SessionState, Slot};

    #[test]
    fn endpoints_extend_base_path() {
        let api = HttpSessionApi::new(
            Url::parse("https://example.com/pong/api/").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            api.endpoint("join_session").unwrap().as_str(),
            "https://example.com/pong/api/join_session"
        );
    }

    #[test]
    fn grant_ignores_extra_event_fields() {
        let body = r#"{"data":{
            "actor":{"id":"a"},
            "event_type":"created",
            "reason":"",
            "session":{"session_id":"s1","state":"PENDING","players":[{"id":"a","slot":1}]}
        }}"#;
        let Envelope { data } = serde_json::from_str(body).unwrap();
        assert_eq!(data.actor, Actor::new("a"));
        assert_eq!(data.session.state, SessionState::Pending);
        assert_eq!(data.session.players, vec![Player::new("a", Slot::One)]);
    }

    #[test]
    fn remote_error_display() {
        let err = SessionError::Remote {
            status: 503,
            body: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "503: overloaded");
    }
}
