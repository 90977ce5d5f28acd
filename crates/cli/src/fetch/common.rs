//! Shared HTTP plumbing for the portal and gist clients.
//!
//! `FetchClient` owns a blocking `reqwest` client with a bounded timeout and
//! classifies every failure into a [`SourceError`] kind:
//!
//! | Outcome                        | Kind        |
//! |--------------------------------|-------------|
//! | transport error, timeout       | `Network`   |
//! | HTTP 401 / 403                 | `Auth`      |
//! | HTTP 429, 5xx                  | `Network`   |
//! | other HTTP 4xx                 | `Rejected`  |
//! | 2xx with unparseable JSON body | `Malformed` |
//!
//! There is no retry loop here. Retrying a failed window is the pipeline's
//! call, and the gist lookup falls through to the next credential source.

use std::time::Duration;

use cardtrail_recon::SourceError;

use crate::exit_codes;
use crate::CliError;

pub(crate) const USER_AGENT: &str = concat!("cardtrail/", env!("CARGO_PKG_VERSION"));

pub(crate) struct FetchClient {
    pub(crate) http: reqwest::blocking::Client,
    source_name: String,
}

impl FetchClient {
    pub(crate) fn new(source_name: &str, timeout_secs: u64) -> Result<Self, CliError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CliError {
                code: exit_codes::EXIT_ERROR,
                message: format!("cannot build HTTP client: {}", e),
                hint: None,
            })?;

        Ok(Self {
            http,
            source_name: source_name.to_string(),
        })
    }

    /// Send one request and return the body text of a 2xx response.
    ///
    /// `build_request` receives the underlying client and returns a fully
    /// configured `RequestBuilder` (URL, headers, cookies, body).
    pub(crate) fn request_text(
        &self,
        build_request: impl FnOnce(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<String, SourceError> {
        let resp = build_request(&self.http).send().map_err(|e| {
            let what = if e.is_timeout() { "timed out" } else { "unreachable" };
            SourceError::network(format!("{} {}: {}", self.source_name, what, e))
        })?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp.text().unwrap_or_default();
            return Err(classify_status(&self.source_name, status, &body));
        }

        resp.text().map_err(|e| {
            SourceError::network(format!(
                "failed to read {} response body: {}",
                self.source_name, e
            ))
        })
    }

    /// Like [`request_text`](Self::request_text), parsing the body as JSON.
    /// A leading BOM is tolerated.
    pub(crate) fn request_json(
        &self,
        build_request: impl FnOnce(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, SourceError> {
        let text = self.request_text(build_request)?;
        let trimmed = text.trim_start_matches('\u{feff}');
        serde_json::from_str(trimmed).map_err(|e| {
            SourceError::malformed(format!(
                "failed to parse {} JSON response: {} (body: {})",
                self.source_name,
                e,
                snippet(trimmed, 200),
            ))
        })
    }
}

fn classify_status(source_name: &str, status: u16, body: &str) -> SourceError {
    let detail = snippet(body.trim(), 120);
    match status {
        401 | 403 => SourceError::auth(format!("{} auth failed ({}): {}", source_name, status, detail)),
        429 | 500..=599 => SourceError::network(format!(
            "{} upstream error (HTTP {}): {}",
            source_name, status, detail
        )),
        _ => SourceError::rejected(format!("{} error ({}): {}", source_name, status, detail)),
    }
}

/// First `max` characters of `s`, on a char boundary.
pub(crate) fn snippet(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardtrail_recon::SourceErrorKind;
    use httpmock::prelude::*;

    #[test]
    fn status_classification() {
        assert_eq!(classify_status("Portal", 401, "").kind, SourceErrorKind::Auth);
        assert_eq!(classify_status("Portal", 403, "").kind, SourceErrorKind::Auth);
        assert_eq!(classify_status("Portal", 502, "").kind, SourceErrorKind::Network);
        assert_eq!(classify_status("Portal", 429, "").kind, SourceErrorKind::Network);
        assert_eq!(classify_status("Portal", 404, "").kind, SourceErrorKind::Rejected);
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        assert_eq!(snippet("余额不足请充值", 2), "余额");
        assert_eq!(snippet("ok", 10), "ok");
    }

    #[test]
    fn json_with_bom() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/ok");
            then.status(200).body("\u{feff}{\"success\":true}");
        });

        let client = FetchClient::new("Test", 5).unwrap();
        let url = format!("{}/ok", server.base_url());
        let body = client.request_json(|http| http.get(&url)).unwrap();
        assert_eq!(body["success"], serde_json::json!(true));
    }

    #[test]
    fn html_where_json_expected_is_malformed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/html");
            then.status(200).body("<html>login</html>");
        });

        let client = FetchClient::new("Test", 5).unwrap();
        let url = format!("{}/html", server.base_url());
        let err = client.request_json(|http| http.get(&url)).unwrap_err();
        assert_eq!(err.kind, SourceErrorKind::Malformed);
        assert!(err.message.contains("<html>"), "message: {}", err.message);
    }

    #[test]
    fn unreachable_is_network() {
        let client = FetchClient::new("Test", 1).unwrap();
        // Port 9 (discard) on localhost is normally closed.
        let err = client
            .request_text(|http| http.get("http://127.0.0.1:9/"))
            .unwrap_err();
        assert_eq!(err.kind, SourceErrorKind::Network);
    }
}
