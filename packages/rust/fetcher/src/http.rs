//! HTTP page fetcher.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::redirect::Policy;
use tracing::{debug, instrument, warn};
use url::Url;

use deepresearch_shared::{FetchConfig, ResearchError, Result};

use crate::extract::{extract_text, truncate_chars};
use crate::{PageFetcher, error_placeholder};

/// User-Agent string for page requests.
const USER_AGENT: &str = concat!("deepresearch/", env!("CARGO_PKG_VERSION"));

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 5;

/// Fetches pages over HTTP(S) and reduces them to bounded plain text.
pub struct HttpFetcher {
    client: Client,
    max_chars: usize,
    allow_private_hosts: bool,
}

impl HttpFetcher {
    /// Create a fetcher from the `[fetch]` config section.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect_policy(config.allow_private_hosts))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ResearchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_chars: config.max_chars,
            allow_private_hosts: config.allow_private_hosts,
        })
    }

    /// Fetch and extract, surfacing failures as errors.
    pub async fn try_fetch(&self, raw_url: &str) -> Result<String> {
        let url = Url::parse(raw_url)
            .map_err(|e| ResearchError::validation(format!("invalid URL: {e}")))?;

        if !self.allow_private_hosts && is_ssrf_target(&url) {
            return Err(ResearchError::validation("refusing private or non-http target"));
        }

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ResearchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResearchError::Network(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ResearchError::Network(format!("body read failed: {e}")))?;

        let text = extract_text(&body);
        Ok(truncate_chars(&text, self.max_chars).to_string())
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = url.unwrap_or("")))]
    async fn fetch_text(&self, url: Option<&str>) -> String {
        let Some(url) = url.filter(|u| !u.trim().is_empty()) else {
            return String::new();
        };

        match self.try_fetch(url).await {
            Ok(text) => {
                debug!(chars = text.chars().count(), "page fetched");
                text
            }
            Err(e) => {
                warn!(error = %e, "page fetch failed");
                error_placeholder(url, &e.to_string())
            }
        }
    }
}

/// Follows up to [`MAX_REDIRECTS`] hops, applying the SSRF guard to each one.
fn redirect_policy(allow_private_hosts: bool) -> Policy {
    Policy::custom(move |attempt| {
        let verdict = check_redirect(attempt.url(), attempt.previous().len(), allow_private_hosts);
        match verdict {
            Ok(()) => attempt.follow(),
            Err(reason) => attempt.error(reason),
        }
    })
}

/// Decide whether a redirect to `target` may be followed after `hops` prior
/// requests in the chain.
fn check_redirect(target: &Url, hops: usize, allow_private_hosts: bool) -> std::result::Result<(), &'static str> {
    if hops > MAX_REDIRECTS {
        return Err("too many redirects");
    }
    if !allow_private_hosts && is_ssrf_target(target) {
        return Err("redirect to private or non-http target refused");
    }
    Ok(())
}

/// Whether a URL points at something a research fetch must not touch.
pub fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 carrier-grade NAT
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}
