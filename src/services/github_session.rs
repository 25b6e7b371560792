use crate::config::GithubConfig;
use crate::error::{AppError, RateLimitInfo, Result};
use opentelemetry::{KeyValue, global, metrics::Counter};
use reqwest::header::{HeaderMap, LINK};
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

const RATELIMIT_REMAINING: &str = "X-RateLimit-Remaining";
const RATELIMIT_RESET: &str = "X-RateLimit-Reset";

/// Credential-injection strategy for a [`GithubSession`].
///
/// Every request carries exactly one `Authorization` credential: either the
/// acting user's token or the fixed org-admin token, never both.
#[derive(Clone)]
pub enum Credential {
    /// Per-user token obtained through the OAuth web flow.
    Bearer(String),
    /// The fixed org-admin token, accompanied by the OAuth app id/secret.
    /// This session speaks for the application, not for an individual user.
    App { token: String, client_id: String, client_secret: String },
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Credential::Bearer(..)"),
            Self::App { client_id, .. } => {
                f.debug_struct("Credential::App").field("client_id", client_id).finish_non_exhaustive()
            }
        }
    }
}

#[derive(Clone)]
struct Metrics {
    requests_total: Counter<u64>,
    rate_limited_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("bandstand");
        Self {
            requests_total: meter
                .u64_counter("github_requests_total")
                .with_description("Total number of GitHub API requests issued")
                .build(),
            rate_limited_total: meter
                .u64_counter("github_rate_limited_total")
                .with_description("Total number of requests rejected by the GitHub rate limit")
                .build(),
        }
    }
}

/// An authenticated GitHub API session with rate-limit detection and
/// Link-header pagination.
///
/// One session wraps one credential and one base URL; it is cheap to clone
/// and safe to share, since nothing is written after construction.
#[derive(Clone)]
pub struct GithubSession {
    http: reqwest::Client,
    base_url: Url,
    credential: Credential,
    metrics: Metrics,
}

impl std::fmt::Debug for GithubSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubSession")
            .field("base_url", &self.base_url.as_str())
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl GithubSession {
    /// # Errors
    /// Returns `AppError::BadRequest` if the configured base URL does not
    /// parse, or `AppError::Http` if the HTTP client cannot be built.
    pub fn new(config: &GithubConfig, credential: Credential) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("bandstand/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| AppError::BadRequest(format!("invalid API base URL: {e}")))?;

        Ok(Self { http, base_url, credential, metrics: Metrics::new() })
    }

    /// Resolves a relative path against the configured base URL. Absolute
    /// URLs (pagination links) pass through unchanged.
    fn resolve(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| AppError::BadRequest(format!("invalid request path {path:?}: {e}")))
    }

    /// Issues a single request with the session credential injected.
    ///
    /// # Errors
    /// `AppError::RateLimited` when GitHub signals an exhausted quota,
    /// `AppError::Timeout` on timeout, `AppError::Http` on other transport
    /// failures. Non-2xx responses are returned as-is for the caller to
    /// inspect.
    #[tracing::instrument(skip(self, body), err(level = "warn"))]
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Response> {
        let url = self.resolve(path)?;
        self.request_url(method, url, body).await
    }

    async fn request_url(&self, method: Method, url: Url, body: Option<&Value>) -> Result<Response> {
        let mut request = self.http.request(method, url);

        request = match &self.credential {
            Credential::Bearer(token) => request.bearer_auth(token),
            Credential::App { token, client_id, client_secret } => request
                .bearer_auth(token)
                .query(&[("client_id", client_id.as_str()), ("client_secret", client_secret.as_str())]),
        };

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        self.check_rate_limit(response).await
    }

    /// Turns a 403 carrying an exhausted `X-RateLimit-Remaining` header into
    /// `AppError::RateLimited`. A missing or non-numeric header is treated
    /// as no rate-limit signal.
    async fn check_rate_limit(&self, response: Response) -> Result<Response> {
        if response.status() == StatusCode::FORBIDDEN
            && let Some(remaining) = header_i64(response.headers(), RATELIMIT_REMAINING)
            && remaining < 1
        {
            self.metrics.rate_limited_total.add(1, &[]);
            self.metrics.requests_total.add(1, &[KeyValue::new("outcome", "rate_limited")]);
            tracing::warn!(remaining, "GitHub rate limit exhausted");

            let status = response.status();
            let reset = header_i64(response.headers(), RATELIMIT_RESET);
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::RateLimited(Box::new(RateLimitInfo { status, remaining, reset, body })));
        }

        self.metrics.requests_total.add(1, &[KeyValue::new("outcome", "ok")]);
        Ok(response)
    }

    /// Issues a request and follows the response's `next` Link relation
    /// until exhausted, aggregating the decoded pages.
    ///
    /// Array bodies concatenate element-wise. Object bodies holding an
    /// `items` array concatenate `items`, with the remaining keys keeping
    /// their first-page values. Any other body shape yields the first page
    /// unchanged.
    ///
    /// # Errors
    /// As [`request`](Self::request); additionally, non-2xx pages propagate
    /// as `AppError::Http`.
    #[tracing::instrument(skip(self, body), err(level = "warn"))]
    pub async fn request_all_pages(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let response = self.request(method.clone(), path, body).await?;
        let mut next = next_link(response.headers());
        let mut result: Value = response.error_for_status()?.json().await?;

        while let Some(url) = next {
            let response = self.request_url(method.clone(), url, body).await?;
            next = next_link(response.headers());
            let page: Value = response.error_for_status()?.json().await?;
            merge_page(&mut result, page);
        }

        Ok(result)
    }

    /// # Errors
    /// As [`request`](Self::request).
    pub async fn get(&self, path: &str) -> Result<Response> {
        self.request(Method::GET, path, None).await
    }

    /// # Errors
    /// As [`request_all_pages`](Self::request_all_pages).
    pub async fn get_all_pages(&self, path: &str) -> Result<Value> {
        self.request_all_pages(Method::GET, path, None).await
    }

    /// # Errors
    /// As [`request`](Self::request).
    pub async fn put(&self, path: &str) -> Result<Response> {
        self.request(Method::PUT, path, None).await
    }

    /// # Errors
    /// As [`request`](Self::request).
    pub async fn delete(&self, path: &str) -> Result<Response> {
        self.request(Method::DELETE, path, None).await
    }

    /// # Errors
    /// As [`request`](Self::request).
    pub async fn post(&self, path: &str, body: &Value) -> Result<Response> {
        self.request(Method::POST, path, Some(body)).await
    }
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Extracts the `rel="next"` target from an RFC 5988 `Link` header.
fn next_link(headers: &HeaderMap) -> Option<Url> {
    let value = headers.get(LINK)?.to_str().ok()?;

    for part in value.split(',') {
        let mut segments = part.trim().split(';');
        let target = segments.next()?.trim();
        if !(target.starts_with('<') && target.ends_with('>')) {
            continue;
        }
        let is_next = segments.any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });
        if is_next {
            return Url::parse(&target[1..target.len() - 1]).ok();
        }
    }

    None
}

/// Folds one decoded page into the aggregate, keyed on the first page's
/// shape.
fn merge_page(result: &mut Value, page: Value) {
    match (&mut *result, page) {
        (Value::Array(acc), Value::Array(mut items)) => acc.append(&mut items),
        (Value::Object(acc), Value::Object(mut page)) => {
            if let (Some(Value::Array(acc_items)), Some(Value::Array(items))) =
                (acc.get_mut("items"), page.get_mut("items"))
            {
                acc_items.append(items);
            }
        }
        _ => {}
    }
}
