use std::sync::Arc;

use http::header::{AUTHORIZATION, HeaderValue};
use http::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use url::Url;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::request::{ParameterEncoding, RequestDescriptor};
use crate::session::{Session, SessionStore};
use crate::transport::{HttpTransport, TransportRequest, TransportResponse};
use crate::types::{ApiEnvelope, AuthPayload};

/// Outcome of a token refresh.
pub type RefreshResult = Result<Session, RefreshError>;

/// Why a token refresh did not produce a new session.
///
/// Callers of [`AuthenticatedRequestExecutor::execute`] never see this type;
/// every variant collapses into [`Error::SessionExpired`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RefreshError {
    #[error("no refresh token stored")]
    MissingRefreshToken,

    #[error("refresh request failed: {0}")]
    Transport(String),

    #[error("refresh endpoint returned status {0}")]
    Status(u16),

    #[error("refresh rejected by server: {}", .0.as_deref().unwrap_or("no message"))]
    Rejected(Option<String>),

    #[error("refresh response did not decode: {0}")]
    Decode(String),
}

/// Issues bearer-authorized API calls and recovers from an expired access
/// token by refreshing it once and replaying the call.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct AuthenticatedRequestExecutor<T, S> {
    config: ClientConfig,
    transport: T,
    sessions: Arc<S>,
    refresh_gate: Mutex<()>,
}

#[cfg(feature = "reqwest")]
impl<S: SessionStore> AuthenticatedRequestExecutor<crate::transport::ReqwestTransport, S> {
    /// Executor over a `reqwest` transport built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built.
    pub fn from_config(config: ClientConfig, sessions: Arc<S>) -> Result<Self, Error> {
        let transport = crate::transport::ReqwestTransport::from_config(&config)?;
        Ok(Self::new(config, transport, sessions))
    }
}

impl<T: HttpTransport, S: SessionStore> AuthenticatedRequestExecutor<T, S> {
    #[must_use]
    pub fn new(config: ClientConfig, transport: T, sessions: Arc<S>) -> Self {
        Self {
            config,
            transport,
            sessions,
            refresh_gate: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Shared session store.
    #[must_use]
    pub fn sessions(&self) -> &Arc<S> {
        &self.sessions
    }

    /// Perform one logical API call and decode its body as `R`.
    ///
    /// A 401 triggers at most one refresh-and-replay cycle, and none at all
    /// if the descriptor disallows refresh or its retry budget is zero.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`] if no response was obtained
    /// - [`Error::SessionExpired`] if the 401-triggered refresh failed
    /// - [`Error::Server`] for any other non-success status
    /// - [`Error::Decode`] if a success body does not match `R`
    pub async fn execute<R: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<R, Error> {
        let response = self.execute_response(descriptor).await?;
        decode_response(&response)
    }

    /// Like [`execute`](Self::execute) but returns the final raw response,
    /// whatever its status.
    pub(crate) async fn execute_response(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<TransportResponse, Error> {
        let url = self.config.endpoint(descriptor.path())?;
        let mut remaining = descriptor.retry_budget();

        loop {
            let session = self.sessions.get();
            let response = self.dispatch(descriptor, url.clone(), &session).await?;

            let may_refresh = response.status == StatusCode::UNAUTHORIZED
                && remaining > 0
                && descriptor.allows_refresh_retry();
            if !may_refresh {
                return Ok(response);
            }

            tracing::debug!(
                path = descriptor.path(),
                remaining,
                "Unauthorized, refreshing access token"
            );

            let stale = session.access_token;
            match self.refresh_after_unauthorized(stale.as_deref()).await {
                Ok(_) => remaining -= 1,
                Err(e) => {
                    tracing::warn!(path = descriptor.path(), error = %e, "Token refresh failed");
                    return Err(Error::SessionExpired);
                }
            }
        }
    }

    /// Exchange the stored refresh token for a new session.
    ///
    /// On success the store is overwritten in one `set`; on any failure it is
    /// left untouched.
    pub async fn refresh(&self) -> RefreshResult {
        let current = self.sessions.get();
        let Some(refresh_token) = current.refresh_token() else {
            tracing::debug!("No refresh token stored, skipping refresh call");
            return Err(RefreshError::MissingRefreshToken);
        };

        let descriptor = RequestDescriptor::post(self.config.refresh_path())
            .with_encoding(ParameterEncoding::Json)
            .with_param("refreshToken", refresh_token)
            .without_refresh_retry();
        let url = self
            .config
            .endpoint(descriptor.path())
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let response = self
            .dispatch(&descriptor, url, &current)
            .await
            .map_err(|e| match e {
                Error::Transport { message, .. } => RefreshError::Transport(message),
                other => RefreshError::Transport(other.to_string()),
            })?;

        if !response.status.is_success() {
            return Err(RefreshError::Status(response.status.as_u16()));
        }

        let envelope: ApiEnvelope<Option<AuthPayload>> = serde_json::from_slice(&response.body)
            .map_err(|e| RefreshError::Decode(e.to_string()))?;
        if !envelope.success {
            return Err(RefreshError::Rejected(envelope.message));
        }

        let session = envelope.data.map(Session::from).unwrap_or_default();
        if session.access_token().is_none() || session.refresh_token().is_none() {
            return Err(RefreshError::Decode("empty token in refresh response".into()));
        }

        self.sessions.set(session.clone());
        tracing::info!(user_id = %session.user_id, "Access token refreshed");
        Ok(session)
    }

    /// Serialize 401-triggered refreshes. A caller that waited on the gate
    /// reuses the session if someone else already replaced the token it was
    /// rejected with.
    async fn refresh_after_unauthorized(&self, stale: Option<&str>) -> RefreshResult {
        let _gate = self.refresh_gate.lock().await;

        let current = self.sessions.get();
        let already_refreshed = current
            .access_token()
            .is_some_and(|token| stale != Some(token));
        if already_refreshed {
            tracing::debug!("Session refreshed by a concurrent request");
            return Ok(current);
        }

        self.refresh().await
    }

    /// Send a single attempt with headers derived from `session`.
    async fn dispatch(
        &self,
        descriptor: &RequestDescriptor,
        url: Url,
        session: &Session,
    ) -> Result<TransportResponse, Error> {
        let request = build_request(descriptor, url, session);
        let method = request.method.clone();

        let response = self.transport.send(request).await.map_err(|e| {
            tracing::warn!(%method, path = descriptor.path(), error = %e, "Transport failure");
            Error::from(e)
        })?;

        tracing::debug!(
            %method,
            path = descriptor.path(),
            status = response.status.as_u16(),
            "API response"
        );
        Ok(response)
    }
}

/// Merge descriptor headers with the session's bearer token. No
/// `Authorization` header is sent when the access token is absent or empty.
fn build_request(descriptor: &RequestDescriptor, url: Url, session: &Session) -> TransportRequest {
    let mut headers = descriptor.headers().clone();
    headers.remove(AUTHORIZATION);

    if let Some(token) = session.access_token() {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!("Access token is not a valid header value, sending without it"),
        }
    }

    TransportRequest {
        method: descriptor.method().clone(),
        url,
        headers,
        params: descriptor.params().cloned(),
        encoding: descriptor.encoding(),
    }
}

/// Decode a success body as `R`; anything else becomes an error carrying the
/// body text. An empty success body decodes as JSON `null`.
pub(crate) fn decode_response<R: DeserializeOwned>(
    response: &TransportResponse,
) -> Result<R, Error> {
    let status = response.status.as_u16();
    if !response.status.is_success() {
        return Err(Error::Server {
            status,
            body: response.text(),
        });
    }

    let body: &[u8] = if response.body.trim_ascii().is_empty() {
        b"null"
    } else {
        &response.body
    };

    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(status, error = %e, "Response body did not match expected shape");
        Error::Decode {
            status,
            body: response.text(),
        }
    })
}
