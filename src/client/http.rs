//! HTTP Transport
//!
//! Builds authenticated requests, paces them against the advertised rate
//! limits, and maps responses into documents or typed errors. There are no
//! implicit retries here: the only wait is the documented pre-request pacing,
//! and a 429 always surfaces to the caller.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, StatusCode, Url};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::api::document::Document;
use crate::client::rate_limit::{Bucket, RateLimitState};
use crate::config::ClientOptions;
use crate::error::{Error, Result};

/// A single outbound request: endpoint path, method, query pairs, and an
/// optional JSON body. Paths are plain strings rather than a closed enum, so
/// endpoints the typed methods do not cover remain reachable.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Option<serde_json::Value>,
    pub(crate) bucket: Option<BucketSpec>,
}

/// An endpoint-local rate limit to apply on top of the global budget.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BucketSpec {
    pub name: &'static str,
    pub rate: u32,
    pub per: Duration,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bucket: None,
        }
    }

    /// Append one query parameter. Repeated keys are allowed; the API uses
    /// them for array-valued filters.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append many query parameters.
    pub fn params<I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.query.extend(pairs);
        self
    }

    /// Attach a JSON body.
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub(crate) fn with_bucket(mut self, name: &'static str, rate: u32, per: Duration) -> Self {
        self.bucket = Some(BucketSpec { name, rate, per });
        self
    }

    /// Drop every pair with the given key.
    pub(crate) fn remove_param(&mut self, key: &str) {
        self.query.retain(|(k, _)| k != key);
    }

    /// Replace the whole query, e.g. with the pairs of a `links.next` URL.
    pub(crate) fn set_query(&mut self, pairs: Vec<(String, String)>) {
        self.query = pairs;
    }
}

/// The rate-limited HTTP client all operations go through.
///
/// Rate limit state is private to one instance: two clients constructed
/// against the same token pace independently, so callers wanting the limits
/// respected in aggregate should share a single client. The connection pool
/// is owned by the client and released when it drops, on every exit path.
pub struct HttpClient {
    client: Client,
    base_url: String,
    auth: Option<HeaderValue>,
    state: Mutex<RateLimitState>,
    buckets: parking_lot::Mutex<HashMap<&'static str, Bucket>>,
}

impl HttpClient {
    pub fn new(token: Option<String>, options: &ClientOptions) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&options.user_agent)
                .map_err(|e| Error::Configuration(format!("invalid user agent: {}", e)))?,
        );
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(options.timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to create HTTP client: {}", e)))?;

        let auth = token
            .map(|token| {
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| Error::Configuration(format!("invalid token: {}", e)))
            })
            .transpose()?;

        Ok(Self {
            client,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            auth,
            state: Mutex::new(RateLimitState::new(options.default_wait)),
            buckets: parking_lot::Mutex::new(HashMap::new()),
        })
    }

    /// Whether a token was configured.
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    /// Issue one request and parse the response envelope.
    ///
    /// Requests from one client are serialized through a single async mutex:
    /// concurrent call sites interleave only at suspension points, and the
    /// rate limit state is updated atomically per completed response. Both
    /// the pacing wait and the network I/O are cancellable; a cancelled
    /// attempt leaves the state untouched.
    pub async fn request(&self, request: ApiRequest) -> Result<Document> {
        let mut state = self.state.lock().await;

        if let Some(wait) = state.wait_needed(Instant::now()) {
            if !wait.is_zero() {
                warn!(
                    path = %request.path,
                    wait_secs = wait.as_secs_f64(),
                    "request budget exhausted, waiting for reset"
                );
                tokio::time::sleep(wait).await;
            }
        }

        if let Some(spec) = request.bucket {
            let wait = {
                let mut buckets = self.buckets.lock();
                let bucket = buckets
                    .entry(spec.name)
                    .or_insert_with(|| Bucket::new(spec.rate, spec.per));
                bucket.retry_after(Instant::now())
            };
            if !wait.is_zero() {
                debug!(
                    bucket = spec.name,
                    wait_secs = wait.as_secs_f64(),
                    "endpoint bucket drained, waiting"
                );
                tokio::time::sleep(wait).await;
            }
            if let Some(bucket) = self.buckets.lock().get_mut(spec.name) {
                bucket.update(Instant::now());
            }
        }

        let url = self.url_for(&request)?;
        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(auth) = &self.auth {
            builder = builder.header(AUTHORIZATION, auth.clone());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        debug!(method = %request.method, path = %request.path, %status, "request completed");

        if status == StatusCode::TOO_MANY_REQUESTS {
            // The server was stricter than it advertised. Record its
            // retry-after so the next request paces correctly, but surface
            // the failure instead of retrying behind the caller's back.
            let retry_after = state.observe_rate_limited(&headers, Instant::now());
            drop(state);
            warn!(path = %request.path, ?retry_after, "rate limited by server despite pacing");
            let body = response.text().await?;
            return Err(Error::RateLimitExceeded { retry_after, body });
        }

        state.observe(&headers, Instant::now());
        drop(state);

        let body = response.text().await?;
        if status.is_success() {
            return serde_json::from_str::<Document>(&body).map_err(|e| {
                let snippet: String = body.chars().take(200).collect();
                Error::MalformedResponse(format!("{} (body: {})", e, snippet))
            });
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(Error::Authentication { status, body })
            }
            StatusCode::NOT_FOUND => Err(Error::NotFound { body }),
            _ => Err(Error::RemoteService { status, body }),
        }
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, request.path))
            .map_err(|e| Error::InvalidQuery(format!("invalid path {:?}: {}", request.path, e)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}
