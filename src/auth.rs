use crate::error::Error;
use crate::executor::{AuthenticatedRequestExecutor, decode_response};
use crate::request::RequestDescriptor;
use crate::session::{Session, SessionStore};
use crate::transport::HttpTransport;
use crate::types::{ApiEnvelope, AuthPayload, LoginRequest, RegisterRequest};

impl<T: HttpTransport, S: SessionStore> AuthenticatedRequestExecutor<T, S> {
    /// Sign in with email and password and store the new session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Server`] for rejected credentials (server message as
    /// text), [`Error::Transport`] on network failure, or [`Error::Decode`]
    /// if the response is not an auth envelope.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<Session, Error> {
        let descriptor = RequestDescriptor::post(self.config().login_path())
            .with_json(credentials)?
            .without_refresh_retry();
        let session = self.authenticate(&descriptor).await?;
        tracing::info!(user_id = %session.user_id, "Login successful");
        Ok(session)
    }

    /// Create an account and store the resulting session.
    ///
    /// # Errors
    ///
    /// Same as [`login`](Self::login).
    pub async fn register(&self, account: &RegisterRequest) -> Result<Session, Error> {
        let descriptor = RequestDescriptor::post(self.config().register_path())
            .with_json(account)?
            .without_refresh_retry();
        let session = self.authenticate(&descriptor).await?;
        tracing::info!(user_id = %session.user_id, "Registration successful");
        Ok(session)
    }

    /// Forget all credentials. Purely local; nothing is sent to the server.
    pub fn logout(&self) {
        self.sessions().clear();
        tracing::info!("Logged out");
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.sessions().get()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.sessions().get().is_authenticated()
    }

    async fn authenticate(&self, descriptor: &RequestDescriptor) -> Result<Session, Error> {
        let response = self.execute_response(descriptor).await?;
        let envelope: ApiEnvelope<Option<AuthPayload>> = decode_response(&response)?;

        if !envelope.success {
            return Err(Error::Server {
                status: response.status.as_u16(),
                body: envelope.message.unwrap_or_default(),
            });
        }

        let session = envelope.data.map(Session::from).unwrap_or_default();
        if !session.is_authenticated() {
            return Err(Error::Decode {
                status: response.status.as_u16(),
                body: response.text(),
            });
        }

        self.sessions().set(session.clone());
        Ok(session)
    }
}
