use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Chain account name. Unique per chain; used as the set key for subscribers.
pub type AccountName = String;

/// Number of decimal places every chain asset carries.
pub const ASSET_PRECISION: u32 = 3;

const MILLI: u64 = 1_000;

/// A fixed-point chain amount, stored in thousandths of the unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Asset {
    /// Amount in thousandths (`1.000 GBG` is `1000`).
    pub milli: u64,
    /// Asset symbol, e.g. `GBG`.
    pub symbol: String,
}

impl Asset {
    pub fn new(milli: u64, symbol: impl Into<String>) -> Self {
        Self {
            milli,
            symbol: symbol.into(),
        }
    }

    pub fn zero(symbol: impl Into<String>) -> Self {
        Self::new(0, symbol)
    }

    /// Same symbol, different amount.
    pub fn with_milli(&self, milli: u64) -> Self {
        Self::new(milli, self.symbol.clone())
    }

    /// The numeric part only, e.g. `"20.000"`.
    pub fn amount_string(&self) -> String {
        format!("{}.{:03}", self.milli / MILLI, self.milli % MILLI)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount_string(), self.symbol)
    }
}

impl FromStr for Asset {
    type Err = AssetParseError;

    /// Parse the chain's `"12.345 GBG"` notation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let amount = parts.next().ok_or(AssetParseError::Empty)?;
        let symbol = parts
            .next()
            .ok_or_else(|| AssetParseError::MissingSymbol(s.to_string()))?;
        if parts.next().is_some() {
            return Err(AssetParseError::InvalidAmount(s.to_string()));
        }

        let (whole, frac) = amount.split_once('.').unwrap_or((amount, ""));
        if whole.is_empty() || frac.len() > ASSET_PRECISION as usize {
            return Err(AssetParseError::InvalidAmount(amount.to_string()));
        }
        let whole: u64 = whole
            .parse()
            .map_err(|_| AssetParseError::InvalidAmount(amount.to_string()))?;
        let frac_milli = if frac.is_empty() {
            0
        } else {
            let digits: u64 = frac
                .parse()
                .map_err(|_| AssetParseError::InvalidAmount(amount.to_string()))?;
            digits * 10u64.pow(ASSET_PRECISION - frac.len() as u32)
        };

        let milli = whole
            .checked_mul(MILLI)
            .and_then(|m| m.checked_add(frac_milli))
            .ok_or_else(|| AssetParseError::InvalidAmount(amount.to_string()))?;
        Ok(Asset::new(milli, symbol))
    }
}

impl TryFrom<String> for Asset {
    type Error = AssetParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Asset> for String {
    fn from(asset: Asset) -> Self {
        asset.to_string()
    }
}

/// Asset string parse failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetParseError {
    #[error("empty asset string")]
    Empty,

    #[error("asset {0:?} has no symbol")]
    MissingSymbol(String),

    #[error("invalid asset amount {0:?}")]
    InvalidAmount(String),
}

/// The subset of `get_dynamic_global_properties` this tool reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicGlobalProperties {
    /// Head block time, the chain's notion of "now".
    #[serde(with = "chain_time")]
    pub time: DateTime<Utc>,
}

/// The subset of an account object this tool reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub name: AccountName,
    /// Raw reputation magnitude. Nodes send it either as a JSON string or a
    /// number, and may omit it entirely.
    #[serde(default, deserialize_with = "raw_reputation")]
    pub reputation: Option<String>,
    /// GBG balance, the currency the rewards are paid in.
    pub sbd_balance: Asset,
}

fn raw_reputation<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "unexpected reputation value {other}"
        ))),
    }
}

/// Relation kind passed to `get_followers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowKind {
    Blog,
}

impl FollowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowKind::Blog => "blog",
        }
    }
}

/// One row of a `get_followers` page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEntry {
    pub follower: AccountName,
    pub following: AccountName,
    #[serde(default)]
    pub what: Vec<String>,
}

/// Where an account history request starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryCursor {
    /// The newest record (`-1` on the wire).
    Latest,
    /// A specific sequence id, read backward from here.
    At(u64),
}

impl HistoryCursor {
    /// Wire representation of the cursor.
    pub fn as_param(&self) -> i64 {
        match self {
            HistoryCursor::Latest => -1,
            HistoryCursor::At(seq) => *seq as i64,
        }
    }
}

impl fmt::Display for HistoryCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_param())
    }
}

/// A `(sequence id, applied operation)` pair from `get_account_history`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawHistoryEntry")]
pub struct HistoryEntry {
    pub seq: u64,
    pub record: AppliedOperation,
}

impl HistoryEntry {
    pub fn new(seq: u64, timestamp: DateTime<Utc>, op: Operation) -> Self {
        Self {
            seq,
            record: AppliedOperation { timestamp, op },
        }
    }
}

#[derive(Deserialize)]
struct RawHistoryEntry(u64, AppliedOperation);

impl From<RawHistoryEntry> for HistoryEntry {
    fn from(raw: RawHistoryEntry) -> Self {
        Self {
            seq: raw.0,
            record: raw.1,
        }
    }
}

/// A timestamped operation as stored in account history.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppliedOperation {
    #[serde(with = "chain_time")]
    pub timestamp: DateTime<Utc>,
    pub op: Operation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteOperation {
    pub voter: AccountName,
    pub author: AccountName,
    pub permlink: String,
    #[serde(default)]
    pub weight: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentOperation {
    #[serde(default)]
    pub parent_author: AccountName,
    #[serde(default)]
    pub parent_permlink: String,
    pub author: AccountName,
    pub permlink: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomJsonOperation {
    #[serde(default)]
    pub required_auths: Vec<AccountName>,
    #[serde(default)]
    pub required_posting_auths: Vec<AccountName>,
    pub id: String,
    /// Embedded payload, itself a JSON document.
    pub json: String,
}

/// Chain operations. Only the kinds the activity scanner understands get
/// their own variant; the open-ended rest is kept by name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawOperation")]
pub enum Operation {
    Vote(VoteOperation),
    Comment(CommentOperation),
    CustomJson(CustomJsonOperation),
    Other(String),
}

impl Operation {
    pub fn kind(&self) -> &str {
        match self {
            Operation::Vote(_) => "vote",
            Operation::Comment(_) => "comment",
            Operation::CustomJson(_) => "custom_json",
            Operation::Other(kind) => kind,
        }
    }
}

#[derive(Deserialize)]
struct RawOperation(String, serde_json::Value);

impl From<RawOperation> for Operation {
    fn from(raw: RawOperation) -> Self {
        let RawOperation(kind, body) = raw;
        // A body that does not match the known layout is not an activity signal.
        let parsed = match kind.as_str() {
            "vote" => serde_json::from_value(body).map(Operation::Vote).ok(),
            "comment" => serde_json::from_value(body).map(Operation::Comment).ok(),
            "custom_json" => serde_json::from_value(body).map(Operation::CustomJson).ok(),
            _ => None,
        };
        parsed.unwrap_or(Operation::Other(kind))
    }
}

/// Secret key handed to the signing gateway. Never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SigningKey(String);

impl SigningKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(***)")
    }
}

/// Errors returned by chain queries and broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("rpc error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed {method} response: {reason}")]
    MalformedResponse { method: &'static str, reason: String },

    #[error("broadcast rejected: {0}")]
    Broadcast(String),

    #[error("unsupported endpoint url {0:?} (expected http(s):// or ws(s)://)")]
    InvalidEndpoint(String),
}

impl ChainError {
    /// Human-readable cause for the operator.
    ///
    /// Node errors carry a multi-line message with the assertion first and
    /// the context after it; the first line plus at most two more are kept.
    pub fn cause(&self) -> String {
        match self {
            ChainError::Rpc { message, .. } | ChainError::Broadcast(message) => {
                let mut lines = message.lines().filter(|l| !l.trim().is_empty());
                let mut out = lines.next().unwrap_or_default().to_string();
                for line in lines.take(2) {
                    out.push_str(": ");
                    out.push_str(line.trim());
                }
                out
            }
            other => other.to_string(),
        }
    }
}

impl From<jsonrpsee::core::ClientError> for ChainError {
    fn from(err: jsonrpsee::core::ClientError) -> Self {
        match err {
            jsonrpsee::core::ClientError::Call(obj) => ChainError::Rpc {
                code: obj.code(),
                message: obj.message().to_string(),
            },
            other => ChainError::Transport(other.to_string()),
        }
    }
}

/// Serde adapter for the chain's zone-less `YYYY-MM-DDTHH:MM:SS` UTC timestamps.
pub mod chain_time {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    /// Parse a chain timestamp. A trailing `Z` is tolerated.
    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        let naive = NaiveDateTime::parse_from_str(s.trim_end_matches('Z'), FORMAT)?;
        Ok(Utc.from_utc_datetime(&naive))
    }
}
