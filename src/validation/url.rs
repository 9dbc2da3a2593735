use std::net::IpAddr;

use url::Url;

use crate::config::DownloadConfig;

use super::{FALLBACK_ARCHIVE_NAME, ValidationError};

/// Which hosts a fetched URL may point at.
#[derive(Debug, Clone, Default)]
pub struct UrlPolicy {
    /// Only check the scheme and the host presence
    pub skip_host_checks: bool,
    pub blocked_hostnames: Vec<String>,
    pub blocked_hostname_suffixes: Vec<String>,
}

impl UrlPolicy {
    pub fn permissive() -> Self {
        Self {
            skip_host_checks: true,
            ..Default::default()
        }
    }
}

impl From<&DownloadConfig> for UrlPolicy {
    fn from(config: &DownloadConfig) -> Self {
        Self {
            skip_host_checks: config.skip_url_checks,
            blocked_hostnames: config.blocked_hostnames.clone(),
            blocked_hostname_suffixes: config.blocked_hostname_suffixes.clone(),
        }
    }
}

fn parse_http(field: &str, raw: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ValidationError::new(field, format!("Invalid URL format: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::new(
            field,
            format!("URL scheme '{}' not allowed, must be http or https", url.scheme()),
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ValidationError::new(field, "URL must have a host"));
    }
    Ok(url)
}

/// A conversation reference must be an absolute http(s) URL.
pub fn validate_conversation_url(raw: &str, policy: &UrlPolicy) -> Result<Url, ValidationError> {
    check_host("conversation_url", parse_http("conversation_url", raw)?, policy)
}

/// An archive URL must be http(s) and, unless disabled, must not point at an
/// internal host.
pub fn validate_archive_url(raw: &str, policy: &UrlPolicy) -> Result<Url, ValidationError> {
    check_host("zip_url", parse_http("zip_url", raw)?, policy)
}

fn check_host(field: &str, url: Url, policy: &UrlPolicy) -> Result<Url, ValidationError> {
    if policy.skip_host_checks {
        return Ok(url);
    }
    let host = url
        .host_str()
        .unwrap_or_default()
        .trim_matches(|c| c == '[' || c == ']')
        .to_lowercase();

    let blocked_name = policy.blocked_hostnames.iter().any(|b| {
        let b = b.to_lowercase();
        host == b || host.ends_with(&format!(".{}", b))
    });
    let blocked_suffix = policy
        .blocked_hostname_suffixes
        .iter()
        .any(|s| host.ends_with(&s.to_lowercase()));
    let internal_ip = host.parse::<IpAddr>().is_ok_and(|ip| is_internal_ip(&ip));

    if blocked_name || blocked_suffix || internal_ip {
        return Err(ValidationError::new(
            field,
            format!("URL host '{}' is not allowed (internal/reserved)", host),
        ));
    }
    Ok(url)
}

fn is_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.octets()[0] == 0
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fe80::/10
                || (first & 0xffc0) == 0xfe80
                // fc00::/7
                || (first & 0xfe00) == 0xfc00
                || v6.to_ipv4_mapped().is_some_and(|v4| is_internal_ip(&IpAddr::V4(v4)))
        }
    }
}

/// Name given to a downloaded archive: the last path segment when it ends in
/// `.zip`, a fixed fallback otherwise.
pub fn archive_filename(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| name.to_lowercase().ends_with(".zip"))
        .map(ToString::to_string)
        .unwrap_or_else(|| FALLBACK_ARCHIVE_NAME.to_string())
}
