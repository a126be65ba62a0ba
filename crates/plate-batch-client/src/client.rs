use std::time::Duration;

use log::{debug, warn};
use plate_batch_types::RecognitionResult;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use tokio::time::sleep;
use url::Url;

use crate::endpoint::Endpoint;
use crate::error::ClientError;
use crate::limiter::RateLimiter;
use crate::request::RecognitionRequest;

/// Seam between the orchestrator and the recognition service.
#[allow(async_fn_in_trait)]
pub trait Recognizer {
    async fn submit(&self, request: &RecognitionRequest) -> Result<RecognitionResult, ClientError>;
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Total attempts per image in cloud mode, rate-limit retries included.
    pub max_attempts: u32,
    /// Wait after a 429 before the next attempt.
    pub retry_backoff: Duration,
    /// Minimum spacing between cloud requests; zero disables pacing.
    pub request_interval: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff: Duration::from_secs(1),
            request_interval: Duration::from_secs(1),
        }
    }
}

/// HTTP client for the recognition endpoint.
///
/// Cloud submissions are paced by a shared token bucket and retried on a
/// rate-limit signal, up to the attempt budget; the final response body is
/// always returned, a 429 on the last attempt included. Self-hosted
/// submissions are single best-effort calls with neither pacing nor retry.
pub struct AlprClient {
    http: reqwest::Client,
    endpoint: Endpoint,
    options: ClientOptions,
    limiter: RateLimiter,
}

impl AlprClient {
    pub fn new(endpoint: Endpoint, options: ClientOptions) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| ClientError::configuration(format!("http client setup: {err}")))?;
        let limiter = RateLimiter::new(options.request_interval);
        Ok(Self {
            http,
            endpoint,
            options,
            limiter,
        })
    }

    async fn post(&self, request: &RecognitionRequest) -> Result<Response, ClientError> {
        let url = self.endpoint.url();
        let part = Part::bytes(request.image().data().to_vec())
            .file_name(request.image().name().to_string());
        let mut form = Form::new().part("upload", part);
        for region in request.regions() {
            form = form.text("regions", region.clone());
        }
        if let Some(camera_id) = request.camera_id() {
            form = form.text("camera_id", camera_id.to_string());
        }
        if request.mmc() {
            form = form.text("mmc", "true");
        }

        let mut builder = self.http.post(url.clone()).multipart(form);
        if let Endpoint::Cloud { api_token, .. } = &self.endpoint {
            builder = builder.header(AUTHORIZATION, format!("Token {api_token}"));
        }
        builder.send().await.map_err(|source| ClientError::Http {
            url: url.to_string(),
            source,
        })
    }

    async fn parse(&self, url: &Url, response: Response) -> Result<RecognitionResult, ClientError> {
        let value = response
            .json::<serde_json::Value>()
            .await
            .map_err(|source| ClientError::Body {
                url: url.to_string(),
                source,
            })?;
        Ok(RecognitionResult::from_value(value))
    }
}

impl Recognizer for AlprClient {
    async fn submit(&self, request: &RecognitionRequest) -> Result<RecognitionResult, ClientError> {
        if !self.endpoint.is_cloud() {
            let response = self.post(request).await?;
            debug!(
                "{}: sdk responded {}",
                request.image().name(),
                response.status()
            );
            return self.parse(self.endpoint.url(), response).await;
        }

        let url = self.endpoint.url().clone();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.limiter.acquire().await;
            let response = self.post(request).await?;
            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS && attempt < self.options.max_attempts {
                warn!(
                    "{}: rate limited (attempt {attempt}/{}), retrying in {:?}",
                    request.image().name(),
                    self.options.max_attempts,
                    self.options.retry_backoff
                );
                sleep(self.options.retry_backoff).await;
                continue;
            }
            debug!(
                "{}: responded {status} after {attempt} attempt(s)",
                request.image().name()
            );
            return self.parse(&url, response).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plate_batch_types::ImageHandle;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn fast_options() -> ClientOptions {
        ClientOptions {
            max_attempts: 3,
            retry_backoff: Duration::from_millis(10),
            request_interval: Duration::ZERO,
        }
    }

    fn sample_request() -> RecognitionRequest {
        RecognitionRequest::new(ImageHandle::new("car.jpg", b"not-a-real-jpeg".to_vec()))
            .with_regions(vec!["gb".to_string()])
    }

    fn reason(status: u16) -> &'static str {
        match status {
            200 => "OK",
            403 => "Forbidden",
            429 => "Too Many Requests",
            500 => "Internal Server Error",
            _ => "Unknown",
        }
    }

    /// Serves one canned response per connection, then reports how many
    /// requests it actually saw.
    fn spawn_server(
        listener: TcpListener,
        responses: Vec<(u16, &'static str)>,
    ) -> JoinHandle<usize> {
        tokio::spawn(async move {
            let mut served = 0usize;
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                read_full_request(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    reason(status),
                    body.len(),
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
                served += 1;
            }
            served
        })
    }

    async fn bind() -> (TcpListener, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr)
    }

    async fn read_full_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(header_end) = find_header_end(&buf) else {
                continue;
            };
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + content_length {
                return;
            }
        }
    }

    fn find_header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4)
            .position(|window| window == b"\r\n\r\n")
            .map(|pos| pos + 4)
    }

    fn cloud_endpoint(addr: SocketAddr) -> Endpoint {
        Endpoint::Cloud {
            api_token: "TEST_KEY".to_string(),
            url: Url::parse(&format!("http://{addr}/v1/plate-reader/")).unwrap(),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rate_limit_twice_then_success_takes_three_requests() {
        let (listener, addr) = bind().await;
        let server = spawn_server(
            listener,
            vec![
                (429, r#"{"detail":"throttled"}"#),
                (429, r#"{"detail":"throttled"}"#),
                (200, r#"{"filename":"car.jpg","results":[]}"#),
            ],
        );

        let client = AlprClient::new(cloud_endpoint(addr), fast_options()).unwrap();
        let result = client.submit(&sample_request()).await.unwrap();

        assert_eq!(result.as_object()["filename"], "car.jpg");
        assert_eq!(server.await.unwrap(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn exhausted_retries_return_final_rate_limit_body() {
        let (listener, addr) = bind().await;
        let server = spawn_server(
            listener,
            vec![
                (429, r#"{"detail":"first"}"#),
                (429, r#"{"detail":"second"}"#),
                (429, r#"{"detail":"third"}"#),
            ],
        );

        let client = AlprClient::new(cloud_endpoint(addr), fast_options()).unwrap();
        let result = client.submit(&sample_request()).await.unwrap();

        assert_eq!(result.as_object()["detail"], "third");
        assert_eq!(server.await.unwrap(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_rate_limit_error_is_final() {
        let (listener, addr) = bind().await;
        let server = spawn_server(listener, vec![(403, r#"{"detail":"bad token"}"#)]);

        let client = AlprClient::new(cloud_endpoint(addr), fast_options()).unwrap();
        let result = client.submit(&sample_request()).await.unwrap();

        assert_eq!(result.as_object()["detail"], "bad token");
        assert_eq!(server.await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn self_hosted_submissions_are_single_attempt() {
        let (listener, addr) = bind().await;
        let server = spawn_server(listener, vec![(500, r#"{"error":"sdk crashed"}"#)]);

        let endpoint = Endpoint::self_hosted(&format!("http://{addr}")).unwrap();
        let client = AlprClient::new(endpoint, fast_options()).unwrap();
        let result = client.submit(&sample_request()).await.unwrap();

        assert_eq!(result.as_object()["error"], "sdk crashed");
        assert_eq!(server.await.unwrap(), 1);
    }
}
