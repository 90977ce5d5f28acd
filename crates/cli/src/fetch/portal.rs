//! Campus card portal client: trade query windows and the balance page.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::header;
use serde::Serialize;

use cardtrail_recon::money::parse_amount;
use cardtrail_recon::{QueryWindow, RawRecord, SourceError, TransactionSource};

use crate::exit_codes;
use crate::CliError;

use super::common::{snippet, FetchClient};
use super::credentials::Session;

// ── Constants ───────────────────────────────────────────────────────

const TRADE_PATH: &str = "/selftrade/queryCardSelfTradeList";
const HOME_PATH: &str = "/home/openHomePage";

/// The portal only serves the in-app browser.
const PORTAL_USER_AGENT: &str = "Mozilla/5.0 (iPad; CPU OS 18_5 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/22F76 AliApp(DingTalk/7.6.46)";

/// Page text shown when the openid is expired or unknown.
const IDENTITY_MARKERS: [&str; 2] = ["openid无效", "页面丢失"];

/// Tried in order; the first capture is the balance in yuan.
const BALANCE_PATTERNS: [&str; 3] = [
    r#"<p1 id="hidebalanceid"[^>]*>([\d\.]+)</p1>"#,
    r#"<span name="showbalanceid">余额:￥([\d\.]+)</span>"#,
    r#"id="hidebalanceid"[^>]*>([\d\.]+)元?</span>"#,
];

fn balance_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        BALANCE_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TradeQuery<'a> {
    begin_date: String,
    end_date: String,
    trade_type: &'a str,
    openid: &'a str,
    id_serial_other: &'a str,
    #[serde(rename = "chooseZH")]
    choose_zh: &'a str,
}

/// What the home page says about the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalancePage {
    Balance(i64),
    IdentityInvalid,
    Unrecognized,
}

pub fn has_identity_marker(text: &str) -> bool {
    IDENTITY_MARKERS.iter().any(|m| text.contains(m))
}

pub fn parse_balance_page(html: &str) -> BalancePage {
    if has_identity_marker(html) {
        return BalancePage::IdentityInvalid;
    }
    for re in balance_patterns() {
        if let Some(cap) = re.captures(html).and_then(|c| c.get(1)) {
            match parse_amount(cap.as_str()) {
                Ok(minor) => return BalancePage::Balance(minor),
                Err(e) => log::debug!("balance text {:?} not usable: {}", cap.as_str(), e),
            }
        }
    }
    BalancePage::Unrecognized
}

/// `{success, message, resultData}` → records, or the portal's refusal.
pub fn parse_trade_reply(body: &serde_json::Value) -> Result<Vec<RawRecord>, SourceError> {
    let success = match &body["success"] {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    };
    if !success {
        let message = body["message"].as_str().unwrap_or("query failed");
        return Err(SourceError::rejected(message.to_string()));
    }

    match &body["resultData"] {
        serde_json::Value::Null => Ok(Vec::new()),
        data @ serde_json::Value::Array(_) => serde_json::from_value(data.clone())
            .map_err(|e| SourceError::malformed(format!("resultData: {}", e))),
        other => Err(SourceError::malformed(format!(
            "resultData is not a list: {}",
            snippet(&other.to_string(), 80)
        ))),
    }
}

// ── Portal client ───────────────────────────────────────────────────

pub struct PortalClient {
    client: FetchClient,
    base_url: String,
    session: Session,
}

impl PortalClient {
    pub fn new(base_url: &str, session: Session, timeout_secs: u64) -> Result<Self, CliError> {
        Ok(Self {
            client: FetchClient::new("portal", timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn cookie(&self) -> String {
        format!("JSESSIONID={}", self.session.jsessionid)
    }

    fn referer(&self) -> String {
        format!(
            "{}/selftrade/openQueryCardSelfTrade?openid={}&displayflag=1&id=19",
            self.base_url, self.session.openid
        )
    }

    /// Current balance from the home page.
    ///
    /// An invalid identity is fatal. Transport problems or a page without
    /// a recognizable balance yield `Ok(None)` so the query can go on
    /// without reconstruction.
    pub fn current_balance(&self) -> Result<Option<i64>, CliError> {
        let url = format!("{}{}?openid={}", self.base_url, HOME_PATH, self.session.openid);
        let cookie = self.cookie();
        let referer = self.referer();

        let html = match self.client.request_text(|http| {
            http.get(&url)
                .header(header::USER_AGENT, PORTAL_USER_AGENT)
                .header(header::COOKIE, &cookie)
                .header(header::REFERER, &referer)
        }) {
            Ok(html) => html,
            Err(e) => {
                log::warn!("balance lookup failed: {}", e);
                return Ok(None);
            }
        };

        match parse_balance_page(&html) {
            BalancePage::Balance(minor) => Ok(Some(minor)),
            BalancePage::IdentityInvalid => Err(identity_invalid()),
            BalancePage::Unrecognized => {
                log::warn!("could not read the balance from the portal home page");
                Ok(None)
            }
        }
    }
}

impl TransactionSource for PortalClient {
    fn fetch(&mut self, window: &QueryWindow) -> Result<Vec<RawRecord>, SourceError> {
        let url = format!("{}{}?openid={}", self.base_url, TRADE_PATH, self.session.openid);
        let payload = TradeQuery {
            begin_date: window.start.format("%Y-%m-%d").to_string(),
            end_date: window.end.format("%Y-%m-%d").to_string(),
            trade_type: "-1",
            openid: &self.session.openid,
            id_serial_other: "",
            choose_zh: "1",
        };
        let cookie = self.cookie();
        let referer = self.referer();

        let text = self.client.request_text(|http| {
            http.post(&url)
                .header(header::ACCEPT, "application/json, text/javascript, */*; q=0.01")
                .header("X-Requested-With", "XMLHttpRequest")
                .header(header::USER_AGENT, PORTAL_USER_AGENT)
                .header(header::ORIGIN, &self.base_url)
                .header(header::REFERER, &referer)
                .header(header::COOKIE, &cookie)
                .json(&payload)
        })?;

        if has_identity_marker(&text) {
            return Err(SourceError::auth("portal rejected the openid"));
        }

        let body: serde_json::Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))
            .map_err(|e| {
                SourceError::malformed(format!(
                    "trade reply is not JSON: {} (body: {})",
                    e,
                    snippet(text.trim(), 120)
                ))
            })?;
        parse_trade_reply(&body)
    }
}

pub fn identity_invalid() -> CliError {
    CliError {
        code: exit_codes::EXIT_IDENTITY_INVALID,
        message: "portal reports the openid is invalid or expired".into(),
        hint: Some("capture fresh credentials and update the gist or CARD_OPENID".into()),
    }
}
