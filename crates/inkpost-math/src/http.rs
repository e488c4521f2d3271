//! Client for an HTTP typesetting service.
//!
//! The service accepts TeX as a `text/plain` POST body at
//! `{server_url}/svg?display={true|false}` and answers with SVG markup.

use std::time::Duration;

use inkpost_cache::{CacheBucket, CacheBucketExt, NullCacheBucket};
use inkpost_renderer::{ExtensionError, MathTypesetter};
use ureq::Agent;

use crate::cache::FormulaKey;
use crate::error::TypesetError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP agent with the given timeout.
///
/// HTTP error statuses are returned as responses so the error body can be
/// reported.
#[must_use]
pub fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Typesets formulas through a remote service.
///
/// Results are cached by [`FormulaKey`] hash with the server URL as the
/// fingerprint, so pointing at another server never serves stale SVG.
pub struct HttpTypesetter {
    server_url: String,
    agent: Agent,
    cache: Box<dyn CacheBucket>,
}

impl HttpTypesetter {
    /// Typesetter for `server_url` (trailing `/` ignored), uncached.
    #[must_use]
    pub fn new(server_url: impl Into<String>) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_owned();
        Self {
            server_url,
            agent: create_agent(DEFAULT_TIMEOUT),
            cache: Box::new(NullCacheBucket),
        }
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.agent = create_agent(timeout);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Box<dyn CacheBucket>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn fetch(&self, source: &str, display: bool) -> Result<String, TypesetError> {
        let url = format!("{}/svg?display={display}", self.server_url);
        let response = self
            .agent
            .post(&url)
            .header("Content-Type", "text/plain; charset=utf-8")
            .send(source.as_bytes())
            .map_err(|e| TypesetError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let mut body = response.into_body();

        if status >= 400 {
            let body = body
                .read_to_string()
                .unwrap_or_else(|_| String::from("(unable to read error body)"));
            return Err(TypesetError::Status { status, body });
        }

        let svg = body
            .read_to_string()
            .map_err(|e| TypesetError::Io(e.to_string()))?;
        if svg.trim().is_empty() {
            return Err(TypesetError::Empty);
        }
        Ok(svg)
    }
}

impl MathTypesetter for HttpTypesetter {
    fn typeset(&self, source: &str, display: bool) -> Result<String, ExtensionError> {
        let hash = FormulaKey { source, display }.compute_hash();
        if let Some(svg) = self.cache.get_string(&hash, &self.server_url) {
            tracing::debug!(hash = %hash, "formula cache hit");
            return Ok(svg);
        }

        let svg = self.fetch(source, display).inspect_err(|e| {
            let is_display = display;
            tracing::warn!(error = %e, display = is_display, "typesetting failed");
        })?;
        self.cache.set_string(&hash, &self.server_url, &svg);
        Ok(svg)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    use super::*;
    use inkpost_cache::{Cache, MemoryCache};
    use pretty_assertions::assert_eq;

    /// Serve one request with `status` and `body`; returns the request line
    /// and body that were received.
    fn one_shot_server(status: u16, body: &'static str) -> (String, JoinHandle<(String, String)>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':')
                    && name.eq_ignore_ascii_case("content-length")
                {
                    content_length = value.trim().parse().unwrap();
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            stream.flush().unwrap();
            (
                request_line.trim_end().to_owned(),
                String::from_utf8(request_body).unwrap(),
            )
        });
        (url, handle)
    }

    #[test]
    fn test_posts_source_and_caches_result() {
        let (url, server) = one_shot_server(200, "<svg>x</svg>");
        let cache = MemoryCache::default();
        let typesetter = HttpTypesetter::new(format!("{url}/"))
            .timeout(Duration::from_secs(5))
            .with_cache(cache.bucket("math"));

        assert_eq!(typesetter.typeset("x^2", true).unwrap(), "<svg>x</svg>");
        let (request_line, body) = server.join().unwrap();
        assert_eq!(request_line, "POST /svg?display=true HTTP/1.1");
        assert_eq!(body, "x^2");

        // The server is gone; the second call must come from the cache.
        assert_eq!(typesetter.typeset("x^2", true).unwrap(), "<svg>x</svg>");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_error_status_is_reported() {
        let (url, server) = one_shot_server(400, "bad tex");
        let typesetter = HttpTypesetter::new(url).timeout(Duration::from_secs(5));
        let err = typesetter.typeset("\\frac{", false).unwrap_err();
        server.join().unwrap();
        let message = err.to_string();
        assert!(message.contains("HTTP 400"), "{message}");
        assert!(message.contains("bad tex"), "{message}");
    }

    #[test]
    fn test_empty_body_is_an_error() {
        let (url, server) = one_shot_server(200, "  ");
        let typesetter = HttpTypesetter::new(url).timeout(Duration::from_secs(5));
        let err = typesetter.typeset("x", false).unwrap_err();
        server.join().unwrap();
        assert!(err.to_string().contains("empty response"));
    }

    #[test]
    fn test_cache_is_fingerprinted_by_server() {
        let cache = MemoryCache::default();
        let hash = FormulaKey {
            source: "y",
            display: false,
        }
        .compute_hash();
        cache
            .bucket("math")
            .set_string(&hash, "http://127.0.0.1:1", "<svg>cached</svg>");

        let same = HttpTypesetter::new("http://127.0.0.1:1/").with_cache(cache.bucket("math"));
        assert_eq!(same.typeset("y", false).unwrap(), "<svg>cached</svg>");
        assert_eq!(same.server_url(), "http://127.0.0.1:1");
    }
}
