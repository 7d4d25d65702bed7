#![doc = include_str!("../README.md")]

mod auth;
pub mod config;
pub mod error;
pub mod executor;
pub mod request;
pub mod session;
#[cfg(test)]
mod testing;
pub mod transport;
pub mod types;

// Re-exports for convenient access
pub use config::ClientConfig;
pub use error::{Error, ErrorKind};
pub use executor::{AuthenticatedRequestExecutor, RefreshError, RefreshResult};
pub use request::{DEFAULT_RETRY_BUDGET, ParameterEncoding, RequestDescriptor};
pub use session::{InMemorySessionStore, Session, SessionStore};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::{HttpTransport, TransportError, TransportRequest, TransportResponse};
pub use types::{ApiEnvelope, AuthPayload, LoginRequest, RegisterRequest, UserId, UserInfo};

/// Executor over `reqwest` with the in-memory session store.
#[cfg(feature = "reqwest")]
pub type MemeApiClient = AuthenticatedRequestExecutor<ReqwestTransport, InMemorySessionStore>;
