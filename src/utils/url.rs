//! RTMP URL helpers: `rtmp://host[:1935]/app/stream`.

use url::Url;

use crate::{Error, Result};

/// Default RTMP TCP port
pub const DEFAULT_RTMP_PORT: u16 = 1935;

/// Host used when a peer never told us where it connected to
const FALLBACK_HOST: &str = "rtmp://localhost";

/// Parse an RTMP URL, filling in the default port when absent.
pub fn parse_rtmp_url(uri: &str) -> Result<Url> {
    let mut url = Url::parse(uri)
        .map_err(|e| Error::config(format!("Invalid URL {}: {}", uri, e)))?;

    if url.host_str().is_none() {
        return Err(Error::config(format!("URL {} has no host", uri)));
    }

    if url.port().is_none() {
        url.set_port(Some(DEFAULT_RTMP_PORT))
            .map_err(|_| Error::config(format!("URL {} cannot carry a port", uri)))?;
    }

    Ok(url)
}

/// `host:port` suitable for a TCP connect
pub fn socket_addr(url: &Url) -> Result<String> {
    let host = url.host_str()
        .ok_or_else(|| Error::config("Missing host"))?;
    let port = url.port().unwrap_or(DEFAULT_RTMP_PORT);
    Ok(format!("{}:{}", host, port))
}

/// Split the request path into (app, stream).
///
/// The stream part keeps any further slashes and the query string.
pub fn split_path(url: &Url) -> (String, String) {
    let mut request_uri = url.path().to_string();
    if let Some(query) = url.query() {
        request_uri.push('?');
        request_uri.push_str(query);
    }

    let mut segments = request_uri.splitn(3, '/');
    segments.next();
    let app = segments.next().unwrap_or_default().to_string();
    let stream = segments.next().unwrap_or_default().to_string();
    (app, stream)
}

/// The `tcUrl` sent in `connect`: the URL with its path cut back to `/app`.
pub fn tc_url(url: &Url) -> String {
    let (app, _) = split_path(url);
    let mut tc = url.clone();
    tc.set_path(&format!("/{}", app));
    tc.set_query(None);
    tc.to_string()
}

/// Rebuild a session URL from what the peer sent in `connect` and `publish`/`play`.
///
/// Empty path segments are dropped; scheme and host come from `tc_url` when it parses.
pub fn create_url(tc_url: &str, app: &str, play_path: &str) -> Result<Url> {
    let joined = format!("{}/{}", app, play_path);
    let segments: Vec<&str> = joined.split('/').filter(|s| !s.is_empty()).collect();

    let mut url = match Url::parse(tc_url) {
        Ok(u) if u.host_str().is_some() => u,
        _ => Url::parse(FALLBACK_HOST)
            .map_err(|e| Error::config(format!("Invalid fallback URL: {}", e)))?,
    };
    url.set_path(&format!("/{}", segments.join("/")));
    url.set_query(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port() {
        let url = parse_rtmp_url("rtmp://example.com/live/cam1").unwrap();
        assert_eq!(url.port(), Some(1935));
        assert_eq!(socket_addr(&url).unwrap(), "example.com:1935");

        let url = parse_rtmp_url("rtmp://example.com:19350/live/cam1").unwrap();
        assert_eq!(url.port(), Some(19350));
    }

    #[test]
    fn test_split_path() {
        let url = parse_rtmp_url("rtmp://example.com/live/cam1").unwrap();
        assert_eq!(split_path(&url), ("live".to_string(), "cam1".to_string()));

        let url = parse_rtmp_url("rtmp://example.com/live/a/b?token=1").unwrap();
        assert_eq!(split_path(&url), ("live".to_string(), "a/b?token=1".to_string()));

        let url = parse_rtmp_url("rtmp://example.com/live").unwrap();
        assert_eq!(split_path(&url), ("live".to_string(), String::new()));
    }

    #[test]
    fn test_tc_url() {
        let url = parse_rtmp_url("rtmp://example.com/live/cam1").unwrap();
        assert_eq!(tc_url(&url), "rtmp://example.com:1935/live");
    }

    #[test]
    fn test_create_url() {
        let url = create_url("rtmp://example.com:1935/live", "live", "cam1").unwrap();
        assert_eq!(url.as_str(), "rtmp://example.com:1935/live/cam1");

        let url = create_url("", "live/", "/cam1").unwrap();
        assert_eq!(url.path(), "/live/cam1");
        assert_eq!(url.host_str(), Some("localhost"));
    }

    #[test]
    fn test_rejects_hostless() {
        assert!(parse_rtmp_url("not a url").is_err());
    }
}
