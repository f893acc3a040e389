use crate::error::StreamflowError;
use url::Url;

/// Validate a media locator or click-through link submitted by an admin.
///
/// Accepts only absolute `http://` and `https://` URLs with a host. The
/// player hands these straight to a video element or a new browser tab, so
/// `javascript:`, `data:` and relative links are refused.
///
/// # Errors
/// Returns [`StreamflowError::InvalidUrl`] for:
/// - Invalid or relative URLs
/// - Non-HTTP(S) schemes
/// - URLs without a host
pub fn validate_media_url(url: &str) -> Result<(), StreamflowError> {
    let parsed =
        Url::parse(url).map_err(|_| StreamflowError::InvalidUrl(format!("Invalid URL: {url}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(StreamflowError::InvalidUrl(format!(
                "Scheme '{scheme}' not allowed, only http/https permitted"
            )));
        }
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(StreamflowError::InvalidUrl(format!("No host in URL: {url}"))),
    }
}

/// Like [`validate_media_url`], but an empty value means "not set".
pub fn validate_optional_url(url: Option<&str>) -> Result<(), StreamflowError> {
    match url.map(str::trim) {
        None | Some("") => Ok(()),
        Some(url) => validate_media_url(url),
    }
}
