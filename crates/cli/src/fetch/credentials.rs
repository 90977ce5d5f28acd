//! Session credential resolution.
//!
//! The portal needs two tokens: the `JSESSIONID` cookie and the `openid`
//! identity parameter. They are taken from the first source that supplies
//! both:
//!
//! 1. `--jsessionid` / `--openid` flags
//! 2. a GitHub gist kept fresh by a capture script (`GITHUB_TOKEN`,
//!    `GIST_ID`, file `GIST_FILENAME`)
//! 3. `CARD_JSESSIONID` / `CARD_OPENID` environment variables
//!
//! A gist failure is logged and falls through to the environment.

use std::fmt;

use serde::Deserialize;

use cardtrail_config::Settings;
use cardtrail_recon::SourceError;

use crate::exit_codes;
use crate::util::mask_secret;
use crate::CliError;

use super::common::FetchClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub jsessionid: String,
    pub openid: String,
}

impl Session {
    /// Both tokens trimmed and non-empty, else `None`.
    fn from_parts(jsessionid: Option<&str>, openid: Option<&str>) -> Option<Self> {
        let jsessionid = jsessionid.map(str::trim).filter(|s| !s.is_empty())?;
        let openid = openid.map(str::trim).filter(|s| !s.is_empty())?;
        Some(Self {
            jsessionid: jsessionid.to_string(),
            openid: openid.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Flags,
    Gist { updated_at: Option<String> },
    Env,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flags => f.write_str("command-line flags"),
            Self::Gist { .. } => f.write_str("GitHub gist"),
            Self::Env => f.write_str("environment"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub session: Session,
    pub source: CredentialSource,
}

/// Values of the `--jsessionid` / `--openid` flags.
#[derive(Debug, Clone, Default)]
pub struct CredentialFlags {
    pub jsessionid: Option<String>,
    pub openid: Option<String>,
}

// ── Gist store ──────────────────────────────────────────────────────

/// Content of the cookie file inside the gist.
#[derive(Debug, Deserialize)]
struct GistCookies {
    #[serde(default)]
    jsessionid: Option<String>,
    #[serde(default)]
    openid: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

pub struct GistClient {
    client: FetchClient,
    api_base: String,
    token: String,
    gist_id: String,
    filename: String,
}

impl GistClient {
    pub fn new(
        api_base: &str,
        token: String,
        gist_id: String,
        filename: String,
        timeout_secs: u64,
    ) -> Result<Self, CliError> {
        Ok(Self {
            client: FetchClient::new("GitHub gist", timeout_secs)?,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            gist_id,
            filename,
        })
    }

    /// Fetch the gist and return the session it holds plus `updated_at`.
    fn fetch_session(&self) -> Result<(Session, Option<String>), SourceError> {
        let url = format!("{}/gists/{}", self.api_base, self.gist_id);
        let auth = format!("token {}", self.token);

        let body = self.client.request_json(|http| {
            http.get(&url)
                .header(reqwest::header::AUTHORIZATION, &auth)
                .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
        })?;

        let content = body["files"][self.filename.as_str()]["content"]
            .as_str()
            .ok_or_else(|| {
                SourceError::malformed(format!("gist has no file '{}'", self.filename))
            })?;

        let cookies: GistCookies = serde_json::from_str(content).map_err(|e| {
            SourceError::malformed(format!("gist file '{}' is not valid JSON: {}", self.filename, e))
        })?;

        let session = Session::from_parts(cookies.jsessionid.as_deref(), cookies.openid.as_deref())
            .ok_or_else(|| {
                SourceError::malformed(format!(
                    "gist file '{}' lacks jsessionid or openid",
                    self.filename
                ))
            })?;
        Ok((session, cookies.updated_at))
    }
}

// ── Resolution ──────────────────────────────────────────────────────

/// Resolve credentials: flags > gist > environment > error.
///
/// `env` is `std::env::var` in production (after `.env` is loaded).
pub fn resolve<F>(flags: &CredentialFlags, settings: &Settings, env: F) -> Result<Credentials, CliError>
where
    F: Fn(&str) -> Option<String>,
{
    match (&flags.jsessionid, &flags.openid) {
        (Some(_), Some(_)) => {
            if let Some(session) =
                Session::from_parts(flags.jsessionid.as_deref(), flags.openid.as_deref())
            {
                return Ok(Credentials {
                    session,
                    source: CredentialSource::Flags,
                });
            }
            return Err(missing_credentials());
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(CliError::args("--jsessionid and --openid must be given together"));
        }
        (None, None) => {}
    }

    let token = env("GITHUB_TOKEN").filter(|s| !s.trim().is_empty());
    let gist_id = env("GIST_ID").filter(|s| !s.trim().is_empty());
    if let (Some(token), Some(gist_id)) = (token, gist_id) {
        log::info!("fetching credentials from gist...");
        let gist = GistClient::new(
            &settings.credentials.github_api,
            token.trim().to_string(),
            gist_id.trim().to_string(),
            settings.credentials.gist_filename.clone(),
            settings.portal.timeout_secs,
        )?;
        match gist.fetch_session() {
            Ok((session, updated_at)) => {
                log::info!(
                    "using gist credentials (updated {})",
                    updated_at.as_deref().unwrap_or("unknown")
                );
                return Ok(Credentials {
                    session,
                    source: CredentialSource::Gist { updated_at },
                });
            }
            Err(e) => log::warn!("gist lookup failed: {}", e),
        }
    }

    if let Some(session) = Session::from_parts(
        env("CARD_JSESSIONID").as_deref(),
        env("CARD_OPENID").as_deref(),
    ) {
        return Ok(Credentials {
            session,
            source: CredentialSource::Env,
        });
    }

    Err(missing_credentials())
}

fn missing_credentials() -> CliError {
    CliError {
        code: exit_codes::EXIT_CREDENTIALS_MISSING,
        message: "missing portal credentials (JSESSIONID and openid)".into(),
        hint: Some(
            "use --jsessionid/--openid, set GITHUB_TOKEN and GIST_ID, or set CARD_JSESSIONID and CARD_OPENID"
                .into(),
        ),
    }
}

/// Lines for `cardtrail credentials`. Tokens are masked.
pub fn describe(creds: &Credentials) -> Vec<String> {
    let mut lines = vec![
        format!("source:     {}", creds.source),
        format!("jsessionid: {}", mask_secret(&creds.session.jsessionid)),
        format!("openid:     {}", mask_secret(&creds.session.openid)),
    ];
    if let CredentialSource::Gist { updated_at } = &creds.source {
        lines.push(format!(
            "updated_at: {}",
            updated_at.as_deref().unwrap_or("unknown")
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn settings_for(server: &MockServer) -> Settings {
        let mut settings = Settings::default();
        settings.credentials.github_api = server.base_url();
        settings.portal.timeout_secs = 5;
        settings
    }

    fn gist_body(filename: &str, content: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "id": "g123",
            "files": {
                filename: {
                    "filename": filename,
                    "content": content.to_string(),
                }
            }
        })
    }

    #[test]
    fn flags_win() {
        let flags = CredentialFlags {
            jsessionid: Some(" JS123 ".into()),
            openid: Some("OID456".into()),
        };
        let env = env_from(&[("CARD_JSESSIONID", "envjs"), ("CARD_OPENID", "envoid")]);
        let creds = resolve(&flags, &Settings::default(), env).unwrap();
        assert_eq!(creds.source, CredentialSource::Flags);
        assert_eq!(creds.session.jsessionid, "JS123");
        assert_eq!(creds.session.openid, "OID456");
    }

    #[test]
    fn lone_flag_is_usage_error() {
        let flags = CredentialFlags {
            jsessionid: Some("JS".into()),
            openid: None,
        };
        let err = resolve(&flags, &Settings::default(), env_from(&[])).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_USAGE);
    }

    #[test]
    fn gist_credentials() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/gists/g123")
                .header("authorization", "token ghp_test");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(gist_body(
                    "bit_card_cookies.json",
                    serde_json::json!({
                        "jsessionid": "GISTJS0000000001",
                        "openid": "GISTOPENID000001",
                        "updated_at": "2026-03-15 08:00:00",
                    }),
                ));
        });

        let env = env_from(&[
            ("GITHUB_TOKEN", "ghp_test"),
            ("GIST_ID", "g123"),
            ("CARD_JSESSIONID", "envjs"),
            ("CARD_OPENID", "envoid"),
        ]);
        let creds = resolve(&CredentialFlags::default(), &settings_for(&server), env).unwrap();

        mock.assert();
        assert_eq!(creds.session.jsessionid, "GISTJS0000000001");
        assert_eq!(
            creds.source,
            CredentialSource::Gist {
                updated_at: Some("2026-03-15 08:00:00".into())
            }
        );

        let lines = describe(&creds);
        assert_eq!(lines[0], "source:     GitHub gist");
        assert_eq!(lines[1], "jsessionid: GIST...0001");
        assert_eq!(lines[3], "updated_at: 2026-03-15 08:00:00");
    }

    #[test]
    fn gist_failure_falls_through_to_env() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/gists/g123");
            then.status(404).json_body(serde_json::json!({ "message": "Not Found" }));
        });

        let env = env_from(&[
            ("GITHUB_TOKEN", "ghp_test"),
            ("GIST_ID", "g123"),
            ("CARD_JSESSIONID", "envjs"),
            ("CARD_OPENID", "envoid"),
        ]);
        let creds = resolve(&CredentialFlags::default(), &settings_for(&server), env).unwrap();
        assert_eq!(creds.source, CredentialSource::Env);
        assert_eq!(creds.session.openid, "envoid");
    }

    #[test]
    fn gist_without_cookie_file_falls_through() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/gists/g123");
            then.status(200).json_body(gist_body("other.json", serde_json::json!({})));
        });

        let env = env_from(&[("GITHUB_TOKEN", "t"), ("GIST_ID", "g123")]);
        let err = resolve(&CredentialFlags::default(), &settings_for(&server), env).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_CREDENTIALS_MISSING);
    }

    #[test]
    fn custom_gist_filename() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/gists/g123");
            then.status(200).json_body(gist_body(
                "cookies.json",
                serde_json::json!({ "jsessionid": "a", "openid": "b" }),
            ));
        });

        let mut settings = settings_for(&server);
        settings.credentials.gist_filename = "cookies.json".into();
        let env = env_from(&[("GITHUB_TOKEN", "t"), ("GIST_ID", "g123")]);
        let creds = resolve(&CredentialFlags::default(), &settings, env).unwrap();
        assert_eq!(creds.source, CredentialSource::Gist { updated_at: None });
    }

    #[test]
    fn nothing_configured_is_exit_50() {
        let err = resolve(&CredentialFlags::default(), &Settings::default(), env_from(&[])).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_CREDENTIALS_MISSING);
        assert!(err.hint.is_some());
    }

    #[test]
    fn blank_env_values_are_missing() {
        let env = env_from(&[("CARD_JSESSIONID", "  "), ("CARD_OPENID", "oid")]);
        let err = resolve(&CredentialFlags::default(), &Settings::default(), env).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_CREDENTIALS_MISSING);
    }
}
