use crate::core::browser::{BrowserError, PageFetcher};
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use url::{Host, Url};

/// Largest body handed to the model, in chars.
const MAX_BODY_CHARS: usize = 500_000;

/// Browser-like User-Agent; plenty of sites answer 403 to obvious bots.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const MAX_REDIRECTS: usize = 10;

pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, BrowserError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            // Redirect targets get the same host check as the first URL.
            .redirect(Policy::custom(|attempt| {
                if attempt.previous().len() >= MAX_REDIRECTS {
                    attempt.error("too many redirects")
                } else if host_allowed(attempt.url()) {
                    attempt.follow()
                } else {
                    attempt.error("redirect to a host that is not allowed")
                }
            }))
            .build()
            .map_err(|e| BrowserError::Transport(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

pub fn validate_url(raw: &str) -> Result<Url, BrowserError> {
    let parsed = Url::parse(raw.trim()).map_err(|e| BrowserError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(BrowserError::InvalidUrl(format!(
                "URL must use http or https, got {}",
                other
            )))
        }
    }
    if !host_allowed(&parsed) {
        return Err(BrowserError::InvalidUrl(format!(
            "host {} is not allowed",
            parsed.host_str().unwrap_or_default()
        )));
    }
    Ok(parsed)
}

/// Public hosts only: no localhost names, loopback, private or link-local addresses.
fn host_allowed(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain != "localhost" && !domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => public_ipv4(ip),
        Some(Host::Ipv6(ip)) => public_ipv6(ip),
        None => false,
    }
}

fn public_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    // 100.64.0.0/10 is carrier-grade NAT space.
    let shared = a == 100 && (b & 0xc0) == 64;
    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || shared)
}

fn public_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return public_ipv4(v4);
    }
    let first = ip.segments()[0];
    let unique_local = (first & 0xfe00) == 0xfc00;
    let link_local = (first & 0xffc0) == 0xfe80;
    !(ip.is_loopback() || ip.is_unspecified() || unique_local || link_local)
}

/// Cuts `body` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(body: String, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            let mut cut = body[..idx].to_string();
            cut.push_str("...");
            cut
        }
        None => body,
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, BrowserError> {
        let url = validate_url(url)?;
        tracing::info!("Fetch page: GET {}", url);

        let resp = self
            .client
            .get(url.clone())
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| BrowserError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("").to_string();
            tracing::warn!("Fetch page failed: {} {} for URL {}", status.as_u16(), reason, url);
            return Err(BrowserError::Http {
                status: status.as_u16(),
                reason,
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| BrowserError::Transport(format!("Read body: {}", e)))?;
        let body = truncate_chars(body, MAX_BODY_CHARS);

        tracing::info!("Fetch page: fetched {} chars from {}", body.chars().count(), url);
        Ok(body)
    }
}
