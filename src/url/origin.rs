use url::Url;

/// Returns the origin (`scheme://host[:port]`) of a URL
///
/// Every crawl target remembers the origin of the start URL it descends from,
/// which keeps records and reports attributable to a documentation site.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_scribe::url::origin_of;
///
/// let url = Url::parse("https://Docs.Example.com:8443/guide").unwrap();
/// assert_eq!(origin_of(&url), "https://docs.example.com:8443");
/// ```
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_drops_path_and_query() {
        let url = Url::parse("https://example.com/a/b?c=d#e").unwrap();
        assert_eq!(origin_of(&url), "https://example.com");
    }

    #[test]
    fn test_origin_lowercases_host() {
        let url = Url::parse("https://EXAMPLE.com/").unwrap();
        assert_eq!(origin_of(&url), "https://example.com");
    }

    #[test]
    fn test_origin_keeps_non_default_port() {
        let url = Url::parse("http://127.0.0.1:8080/docs").unwrap();
        assert_eq!(origin_of(&url), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_origin_omits_default_port() {
        let url = Url::parse("https://example.com:443/").unwrap();
        assert_eq!(origin_of(&url), "https://example.com");
    }
}
