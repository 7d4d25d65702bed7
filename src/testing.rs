//! In-memory transport for unit tests.

use std::sync::{Arc, Mutex};

use http::StatusCode;
use http::header::AUTHORIZATION;
use serde_json::{Value, json};

use crate::transport::{HttpTransport, TransportError, TransportRequest, TransportResponse};

type Handler =
    dyn Fn(&TransportRequest) -> Result<TransportResponse, TransportError> + Send + Sync;

/// Answers every request with `handler` and records what was sent.
#[derive(Clone)]
pub(crate) struct FakeTransport {
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<TransportRequest>>>,
}

impl FakeTransport {
    pub(crate) fn new(
        handler: impl Fn(&TransportRequest) -> Result<TransportResponse, TransportError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            handler: Arc::new(handler),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&TransportRequest) -> bool) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| pred(r)).count()
    }
}

impl HttpTransport for FakeTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        // let concurrent callers interleave like real network I/O
        tokio::task::yield_now().await;
        (self.handler)(&request)
    }
}

pub(crate) fn json_response(status: u16, body: Value) -> TransportResponse {
    TransportResponse::new(
        StatusCode::from_u16(status).unwrap(),
        serde_json::to_vec(&body).unwrap(),
    )
}

/// Successful login/refresh envelope.
pub(crate) fn auth_body(access: &str, refresh: &str, user_id: &str) -> Value {
    json!({
        "success": true,
        "data": {
            "user": { "id": user_id, "email": "cat@memes.test", "username": "cat" },
            "accessToken": access,
            "refreshToken": refresh
        }
    })
}

/// Token carried in the request's `Authorization` header.
pub(crate) fn bearer(request: &TransportRequest) -> Option<&str> {
    request
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
