// =============================================================================
// models.rs — KEYWORD ROWS IN, MATCH RECORDS OUT
// =============================================================================
//
// Three families of types live here:
//
// 1. Configuration rows, as the admin side stores them. Operators edit these
//    tables at will; we only ever read them.
// 2. KeywordMeta, the tagged union attached to every keyword in an automaton.
//    One variant per domain, each with its own strongly-typed fields.
// 3. Hit records and the per-message report handed back to persistence.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

fn default_true() -> bool {
    true
}

/// The three keyword domains sharing the matching engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    TransactionMethod,
    Restricted,
    Geography,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::TransactionMethod, Domain::Restricted, Domain::Geography];
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::TransactionMethod => write!(f, "transaction_method"),
            Domain::Restricted => write!(f, "restricted"),
            Domain::Geography => write!(f, "geography"),
        }
    }
}

/// Administrative level of a place.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AreaLevel {
    Province,
    City,
    District,
}

impl fmt::Display for AreaLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AreaLevel::Province => write!(f, "province"),
            AreaLevel::City => write!(f, "city"),
            AreaLevel::District => write!(f, "district"),
        }
    }
}

// =============================================================================
// Configuration rows
// =============================================================================

/// A transaction-method phrase ("wechat pay", "face to face", ...), with the
/// method it belongs to denormalized onto the row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionKeywordRow {
    pub id: i64,
    pub keyword: String,
    pub method_id: i64,
    pub method: String,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Whether the owning method is enabled. A disabled method silences all
    /// of its phrases.
    #[serde(default = "default_true")]
    pub method_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrugCategoryRow {
    pub id: i64,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrugRow {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// A slang term or spelling that refers to a drug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrugKeywordRow {
    pub id: i64,
    pub drug_id: i64,
    pub keyword: String,
    #[serde(default)]
    pub weight: u32,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// A place in the province → city → district hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AreaRow {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    pub level: AreaLevel,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default = "default_true")]
    pub active: bool,
}

// =============================================================================
// Keyword metadata
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionMeta {
    pub method_id: i64,
    pub method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestrictedMeta {
    pub drug_id: i64,
    pub drug_name: String,
    pub category_id: i64,
    pub category_name: String,
    pub weight: u32,
}

/// A place plus its ancestors, resolved once when the automaton is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoMeta {
    pub area_id: i64,
    pub name: String,
    pub level: AreaLevel,
    /// The direct parent, whatever its level.
    pub parent_name: Option<String>,
    /// Nearest ancestor at province level.
    pub province: Option<String>,
    /// Nearest ancestor at city level.
    pub city: Option<String>,
    pub lng: Option<f64>,
    pub lat: Option<f64>,
}

/// Metadata attached to every keyword in an automaton.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum KeywordMeta {
    TransactionMethod(TransactionMeta),
    Restricted(RestrictedMeta),
    Geo(GeoMeta),
}

// =============================================================================
// Outbound records
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionHit {
    pub keyword: String,
    pub position: usize,
    pub method_id: i64,
    pub method: String,
}

/// A restricted term with the number of times it occurred in the message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestrictedHit {
    pub keyword: String,
    pub count: usize,
    pub drug_id: i64,
    pub drug_name: String,
    pub category_id: i64,
    pub category_name: String,
    pub weight: u32,
}

/// A place mention spread over the three hierarchy columns. Columns above
/// the matched level come from the resolved ancestors; columns below it stay
/// empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoHit {
    pub keyword: String,
    pub position: usize,
    pub area_id: i64,
    pub level: AreaLevel,
    pub province: String,
    pub city: String,
    pub district: String,
    pub lng: Option<f64>,
    pub lat: Option<f64>,
}

/// A chat message handed over by the ingestion side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
}

impl ChatMessage {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
        }
    }
}

/// Everything the engine found in one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReport {
    pub id: String,
    pub message_id: Option<String>,
    pub analyzed_at: DateTime<Utc>,
    pub transactions: Vec<TransactionHit>,
    pub restricted: Vec<RestrictedHit>,
    pub locations: Vec<GeoHit>,
}

impl MessageReport {
    pub fn new(message_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_id,
            analyzed_at: Utc::now(),
            transactions: Vec::new(),
            restricted: Vec::new(),
            locations: Vec::new(),
        }
    }

    /// True when any domain matched.
    pub fn is_flagged(&self) -> bool {
        !(self.transactions.is_empty() && self.restricted.is_empty() && self.locations.is_empty())
    }

    /// Sum of weights over every restricted occurrence.
    pub fn restricted_score(&self) -> u64 {
        self.restricted
            .iter()
            .map(|hit| u64::from(hit.weight) * hit.count as u64)
            .sum()
    }
}

impl fmt::Display for MessageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] message={} transactions={} restricted={} locations={}",
            self.id,
            self.message_id.as_deref().unwrap_or("-"),
            self.transactions.len(),
            self.restricted.len(),
            self.locations.len()
        )
    }
}
