use crate::UrlError;
use url::Url;

/// Normalizes a URL for frontier filtering and de-duplication
///
/// Only the fragment is removed. Query strings, trailing slashes and path
/// casing are kept exactly as written, so `https://x/a/` and `https://x/a`
/// remain distinct URLs.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(String)` - The URL without its fragment
/// * `Err(UrlError)` - The URL is malformed, not HTTP(S), or has no host
///
/// # Examples
///
/// ```
/// use sumi_scribe::url::normalize_url;
///
/// let url = normalize_url("https://docs.example.com/guide/?v=2#install").unwrap();
/// assert_eq!(url, "https://docs.example.com/guide/?v=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<String, UrlError> {
    let trimmed = url_str.trim();
    let url = parse_http_url(trimmed)?;

    if url.fragment().is_none() {
        return Ok(trimmed.to_string());
    }

    let without_fragment = match trimmed.find('#') {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    };

    Ok(without_fragment.to_string())
}

/// Parses a URL and checks that it can be crawled over HTTP(S)
pub fn parse_http_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_fragment() {
        assert_eq!(
            normalize_url("https://example.com/page#section").unwrap(),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_keeps_query_and_trailing_slash() {
        assert_eq!(
            normalize_url("https://example.com/docs/?lang=en").unwrap(),
            "https://example.com/docs/?lang=en"
        );
        assert_ne!(
            normalize_url("https://example.com/docs/").unwrap(),
            normalize_url("https://example.com/docs").unwrap()
        );
    }

    #[test]
    fn test_keeps_case() {
        assert_eq!(
            normalize_url("https://example.com/API/Reference").unwrap(),
            "https://example.com/API/Reference"
        );
    }

    #[test]
    fn test_empty_fragment() {
        assert_eq!(
            normalize_url("https://example.com/page#").unwrap(),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(
            normalize_url("  https://example.com/page  ").unwrap(),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_rejects_non_http() {
        assert!(matches!(
            normalize_url("mailto:admin@example.com"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(
            normalize_url("ftp://example.com/file"),
            Err(UrlError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(normalize_url("not a url"), Err(UrlError::Parse(_))));
        assert!(normalize_url("").is_err());
        assert!(normalize_url("/relative/path").is_err());
    }
}
