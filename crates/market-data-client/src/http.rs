use analysis_core::AnalysisError;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;
const USER_AGENT: &str = concat!("finsight/", env!("CARGO_PKG_VERSION"));

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
pub struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    pub async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request leaves the window
            let sleep_dur = match ts.front() {
                Some(&oldest) => (oldest + self.window).saturating_duration_since(now) + Duration::from_millis(50),
                None => Duration::from_millis(50),
            };
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for a request slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Shared request plumbing for one provider: timeout, rate budget, 429 retry.
#[derive(Clone)]
pub struct HttpTransport {
    provider: &'static str,
    client: Client,
    rate_limiter: RateLimiter,
    retry_backoff: Duration,
}

impl HttpTransport {
    pub fn new(provider: &'static str, requests_per_minute: usize) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            provider,
            client,
            rate_limiter: RateLimiter::per_minute(requests_per_minute),
            retry_backoff: Duration::from_secs(5),
        }
    }

    /// Delay between retries after an HTTP 429.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Send with rate limiting and automatic 429 retry.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, AnalysisError> {
        let request = builder.build().map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        for attempt in 1..=MAX_ATTEMPTS {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| AnalysisError::ApiError("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| AnalysisError::ApiError(format!("{}: {}", self.provider, e)))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            if attempt < MAX_ATTEMPTS {
                let wait = self.retry_backoff * attempt;
                tracing::warn!(
                    "{} 429 rate limited, waiting {:.1}s before retry {}/{}",
                    self.provider,
                    wait.as_secs_f64(),
                    attempt,
                    MAX_ATTEMPTS - 1
                );
                tokio::time::sleep(wait).await;
            }
        }

        Err(AnalysisError::RateLimited(format!(
            "{} after {} attempts",
            self.provider, MAX_ATTEMPTS
        )))
    }

    /// Send and decode a JSON body; non-success statuses become `ApiError`.
    pub async fn get_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, AnalysisError> {
        let response = self.send(builder).await?;
        let status = response.status();

        if !status.is_success() {
            return Err(AnalysisError::ApiError(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidData(format!("{} response: {}", self.provider, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn limiter_waits_for_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn zero_budget_still_allows_requests() {
        let limiter = RateLimiter::new(0, Duration::from_secs(60));
        limiter.acquire().await;
        assert_eq!(limiter.max_requests, 1);
    }
}
