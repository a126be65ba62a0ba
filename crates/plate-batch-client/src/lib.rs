//! HTTP client for the recognition endpoint: multipart submission, bounded
//! retry on rate-limit signals, and token-bucket pacing between cloud
//! requests.

mod client;
mod endpoint;
mod error;
mod limiter;
mod request;

pub use client::{AlprClient, ClientOptions, Recognizer};
pub use endpoint::{CLOUD_API_URL, Endpoint};
pub use error::ClientError;
pub use limiter::RateLimiter;
pub use request::RecognitionRequest;
