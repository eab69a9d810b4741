use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::FetchError;

/// Seam between feed clients and the wire. Clients only ever GET and parse,
/// so one method per response shape is enough.
pub trait Transport {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<String, FetchError>;

    /// Open a long-lived body for line-by-line consumption. The connection
    /// closes when the returned reader is dropped.
    fn open_stream(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<Box<dyn Read + Send>, FetchError>;
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("tabula/", env!("CARGO_PKG_VERSION"));

/// Blocking reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    fn request(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> reqwest::blocking::RequestBuilder {
        let mut builder = self.client.get(url).query(query);
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }
}

impl Transport for HttpTransport {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<String, FetchError> {
        debug!(url, params = query.len(), "dispatching feed request");
        let response = self.request(url, query, headers).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        Ok(response.text()?)
    }

    fn open_stream(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<Box<dyn Read + Send>, FetchError> {
        debug!(url, "opening streaming connection");
        let response = self.request(url, query, headers).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        Ok(Box::new(response))
    }
}

/// Canned bodies keyed by URL, for exercising feed clients without a
/// network. Recorded request URLs (with query string) are kept for
/// assertions.
#[derive(Debug, Clone, Default)]
pub struct FixtureTransport {
    bodies: Arc<Mutex<BTreeMap<String, String>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FixtureTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, url: &str, body: &str) -> Result<(), FetchError> {
        let mut guard = self
            .bodies
            .lock()
            .map_err(|_| FetchError::FixtureLockPoisoned)?;
        guard.insert(url.to_owned(), body.to_owned());
        Ok(())
    }

    pub fn requests(&self) -> Result<Vec<String>, FetchError> {
        let guard = self
            .requests
            .lock()
            .map_err(|_| FetchError::FixtureLockPoisoned)?;
        Ok(guard.clone())
    }

    fn record_and_lookup(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<String, FetchError> {
        let rendered = if query.is_empty() {
            url.to_owned()
        } else {
            let params = query
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("&");
            format!("{url}?{params}")
        };

        self.requests
            .lock()
            .map_err(|_| FetchError::FixtureLockPoisoned)?
            .push(rendered);

        let guard = self
            .bodies
            .lock()
            .map_err(|_| FetchError::FixtureLockPoisoned)?;
        guard
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::FixtureMissing(url.to_owned()))
    }
}

impl Transport for FixtureTransport {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        _headers: &[(String, String)],
    ) -> Result<String, FetchError> {
        self.record_and_lookup(url, query)
    }

    fn open_stream(
        &self,
        url: &str,
        query: &[(String, String)],
        _headers: &[(String, String)],
    ) -> Result<Box<dyn Read + Send>, FetchError> {
        let body = self.record_and_lookup(url, query)?;
        Ok(Box::new(Cursor::new(body.into_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::{FixtureTransport, Transport};
    use crate::FetchError;

    #[test]
    fn fixture_transport_replays_registered_bodies() {
        let transport = FixtureTransport::new();
        transport
            .register("https://example.test/feed", "{\"ok\":true}")
            .expect("register");

        let body = transport
            .get("https://example.test/feed", &[], &[])
            .expect("get");
        assert_eq!(body, "{\"ok\":true}");
    }

    #[test]
    fn fixture_transport_records_query_strings() {
        let transport = FixtureTransport::new();
        transport.register("https://example.test/q", "[]").expect("register");

        transport
            .get(
                "https://example.test/q",
                &[("text".to_owned(), "Denver".to_owned())],
                &[],
            )
            .expect("get");

        assert_eq!(
            transport.requests().expect("requests"),
            vec!["https://example.test/q?text=Denver"]
        );
    }

    #[test]
    fn unregistered_urls_fail_loudly() {
        let transport = FixtureTransport::new();
        let err = transport
            .get("https://example.test/missing", &[], &[])
            .expect_err("must fail");
        assert!(matches!(err, FetchError::FixtureMissing(url) if url.contains("missing")));
    }

    #[test]
    fn fixture_stream_yields_the_registered_bytes() {
        let transport = FixtureTransport::new();
        transport
            .register("https://example.test/stream", "line-1\nline-2\n")
            .expect("register");

        let mut reader = transport
            .open_stream("https://example.test/stream", &[], &[])
            .expect("stream");
        let mut out = String::new();
        reader.read_to_string(&mut out).expect("read");
        assert_eq!(out, "line-1\nline-2\n");
    }
}
