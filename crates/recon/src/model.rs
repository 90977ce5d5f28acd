use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ReconError;
use crate::money::parse_amount;

// ---------------------------------------------------------------------------
// Raw portal record
// ---------------------------------------------------------------------------

/// One entry of the portal's `resultData` array, read leniently: any field
/// may be absent, `null`, a string or a number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub txdate: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mername: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub txamt: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub txname: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub posjourno: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub journo: String,
}

impl RawRecord {
    /// Point-of-sale journal number, else the generic journal number.
    pub fn unique_id(&self) -> Option<&str> {
        let pos = self.posjourno.trim();
        if !pos.is_empty() {
            return Some(pos);
        }
        let jour = self.journo.trim();
        if !jour.is_empty() {
            return Some(jour);
        }
        None
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Normalized transaction
// ---------------------------------------------------------------------------

/// A normalized transaction. Everything except `balance_after` is fixed
/// once built; `balance_after` is written only by [`crate::balance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub occurred_at: NaiveDateTime,
    /// Timestamp exactly as the portal sent it.
    pub time_text: String,
    pub merchant: String,
    pub amount_minor: i64,
    /// Free-text type label (`txname`).
    pub kind: String,
    pub journal_id: String,
    pub balance_after: Option<i64>,
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a portal timestamp. Bare dates map to midnight.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(ts);
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

impl Transaction {
    /// Normalize a raw record. The record must carry an identifier.
    pub fn from_raw(raw: &RawRecord) -> Result<Self, ReconError> {
        let journal_id = raw.unique_id().ok_or_else(|| ReconError::Malformed {
            record_id: String::new(),
            field: "journal id",
            value: String::new(),
        })?;

        let occurred_at = parse_timestamp(&raw.txdate).ok_or_else(|| ReconError::Malformed {
            record_id: journal_id.to_string(),
            field: "timestamp",
            value: raw.txdate.clone(),
        })?;

        let amount_minor = parse_amount(&raw.txamt).map_err(|_| ReconError::Malformed {
            record_id: journal_id.to_string(),
            field: "amount",
            value: raw.txamt.clone(),
        })?;

        Ok(Self {
            occurred_at,
            time_text: raw.txdate.trim().to_string(),
            merchant: raw.mername.trim().to_string(),
            amount_minor,
            kind: raw.txname.trim().to_string(),
            journal_id: journal_id.to_string(),
            balance_after: None,
        })
    }

    pub fn category(&self) -> Category {
        crate::classify::classify(self)
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Spend,
    Topup,
    Subsidy,
}

impl Category {
    /// Sheet and report order.
    pub const ALL: [Category; 3] = [Category::Spend, Category::Topup, Category::Subsidy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spend => "spend",
            Self::Topup => "topup",
            Self::Subsidy => "subsidy",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spend" | "消费" => Ok(Self::Spend),
            "topup" | "top-up" | "充值" => Ok(Self::Topup),
            "subsidy" | "补助" => Ok(Self::Subsidy),
            other => Err(format!(
                "unknown category '{}' (expected spend, topup or subsidy)",
                other
            )),
        }
    }
}

/// Report filter: everything, or one concrete category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(c) => *c == category,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(c) => c.fmt(f),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse::<Category>().map(Self::Only)
        }
    }
}
