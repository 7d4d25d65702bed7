use http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use serde::Serialize;
use serde_json::{Map, Value};

/// Retry budget a descriptor starts with: one replay after a refresh.
pub const DEFAULT_RETRY_BUDGET: u32 = 1;

/// How request parameters are put on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParameterEncoding {
    /// Query string for `GET`/`HEAD`/`DELETE`, form body otherwise.
    #[default]
    Url,
    /// JSON object body.
    Json,
}

impl ParameterEncoding {
    /// Whether `method` carries URL-encoded parameters in the query string.
    #[must_use]
    pub fn uses_query(self, method: &Method) -> bool {
        self == Self::Url && matches!(*method, Method::GET | Method::HEAD | Method::DELETE)
    }
}

/// Immutable description of one API call and its retry policy.
///
/// ```rust,ignore
/// let descriptor = RequestDescriptor::post("/memes/generate")
///     .with_json(&GenerateMeme { prompt: "cat in a hat".into() })?;
/// let meme: ApiEnvelope<Meme> = executor.execute(&descriptor).await?;
/// ```
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    path: String,
    method: Method,
    params: Option<Map<String, Value>>,
    encoding: ParameterEncoding,
    headers: HeaderMap,
    retry_budget: u32,
    allow_refresh_retry: bool,
}

impl RequestDescriptor {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            params: None,
            encoding: ParameterEncoding::default(),
            headers: HeaderMap::new(),
            retry_budget: DEFAULT_RETRY_BUDGET,
            allow_refresh_retry: true,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Set parameters from a raw map.
    #[must_use]
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    /// Add a single parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Serialize `body` as a JSON object and send it as the request body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if `body` does not
    /// serialize to a JSON object.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, crate::Error> {
        match serde_json::to_value(body) {
            Ok(Value::Object(map)) => {
                self.params = Some(map);
                self.encoding = ParameterEncoding::Json;
                Ok(self)
            }
            Ok(other) => Err(crate::Error::Config(format!(
                "request body must be a JSON object, got {other}"
            ))),
            Err(e) => Err(crate::Error::Config(format!("request body: {e}"))),
        }
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: ParameterEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Add a header override. `Authorization` is always derived from the
    /// session and cannot be overridden here.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        if name != AUTHORIZATION {
            self.headers.insert(name, value);
        }
        self
    }

    /// Override how many refresh-and-replay cycles a 401 may trigger.
    /// Capped at [`DEFAULT_RETRY_BUDGET`]: a call is never replayed twice.
    #[must_use]
    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget.min(DEFAULT_RETRY_BUDGET);
        self
    }

    /// Disallow refresh-on-401 for this call (used by the auth endpoints
    /// themselves).
    #[must_use]
    pub fn without_refresh_retry(mut self) -> Self {
        self.allow_refresh_retry = false;
        self
    }

    /// Path relative to the API root.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request parameters, if any.
    #[must_use]
    pub fn params(&self) -> Option<&Map<String, Value>> {
        self.params.as_ref()
    }

    /// How parameters are encoded.
    #[must_use]
    pub fn encoding(&self) -> ParameterEncoding {
        self.encoding
    }

    /// Header overrides (never contains `Authorization`).
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Remaining refresh-and-replay cycles, at most one.
    #[must_use]
    pub fn retry_budget(&self) -> u32 {
        self.retry_budget
    }

    /// Whether a 401 may trigger a token refresh.
    #[must_use]
    pub fn allows_refresh_retry(&self) -> bool {
        self.allow_refresh_retry
    }
}

/// Flatten parameters into `key=value` pairs for URL encoding.
///
/// Strings are sent verbatim, `null` is skipped, everything else uses its
/// JSON text.
#[must_use]
pub fn url_encoded_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((key.clone(), value))
        })
        .collect()
}
