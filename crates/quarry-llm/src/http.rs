//! Shared HTTP client construction for consistent timeout and TLS configuration.

use std::time::Duration;

/// Generous fixed deadline for upstream model and embedding calls.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(600);

/// Create a shared HTTP client with standard quarry configuration.
///
/// Config: 30s connect timeout, caller-supplied request timeout, rustls TLS,
/// `quarry/{version}` user-agent.
#[must_use]
pub fn default_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(timeout)
        .user_agent(concat!("quarry/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("default HTTP client construction must not fail")
}
