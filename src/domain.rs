use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

pub const UNKNOWN: &str = "-";

const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/?api=1&query=";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreCode(String);

impl StoreCode {
    pub fn new(value: &str) -> Self {
        Self(value.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StoreCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StoreCode {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const REFERENCE: Coordinate = Coordinate {
        latitude: -6.9173248,
        longitude: 107.610112,
    };

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        Self::REFERENCE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Operational {
    Open,
    Closed,
    #[default]
    Unknown,
}

impl Operational {
    const OPEN_KEYWORDS: [&'static str; 4] = ["open", "buka", "operational", "aktif"];
    const CLOSED_KEYWORDS: [&'static str; 4] = ["closed", "tutup", "non-aktif", "nonaktif"];

    /// Derives the state from a free-text status. Closed keywords are tested
    /// first because "nonaktif" contains "aktif".
    pub fn from_status(status: &str) -> Self {
        let lowered = status.trim().to_lowercase();
        if lowered.is_empty() {
            return Operational::Unknown;
        }
        if Self::CLOSED_KEYWORDS
            .iter()
            .any(|keyword| lowered.contains(keyword))
        {
            return Operational::Closed;
        }
        if Self::OPEN_KEYWORDS
            .iter()
            .any(|keyword| lowered.contains(keyword))
        {
            return Operational::Open;
        }
        Operational::Unknown
    }
}

impl From<Option<bool>> for Operational {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Operational::Open,
            Some(false) => Operational::Closed,
            None => Operational::Unknown,
        }
    }
}

impl From<Operational> for Option<bool> {
    fn from(value: Operational) -> Self {
        match value {
            Operational::Open => Some(true),
            Operational::Closed => Some(false),
            Operational::Unknown => None,
        }
    }
}

impl fmt::Display for Operational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operational::Open => write!(f, "open"),
            Operational::Closed => write!(f, "closed"),
            Operational::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDetail {
    pub store_code: String,
    pub store_name: String,
    pub store_type: String,
    pub dc_code: String,
    pub address: String,
    pub opening_hour: String,
    pub closing_hour: String,
    pub distance: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub operational: Operational,
}

impl StoreDetail {
    pub fn maps_link(&self) -> Option<String> {
        maps_link(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRecord {
    #[serde(alias = "no")]
    pub sequence_number: u64,
    pub store_code: String,
    #[serde(default = "unknown", deserialize_with = "text_or_unknown")]
    pub store_name: String,
    #[serde(default = "unknown", deserialize_with = "text_or_unknown")]
    pub store_type: String,
    #[serde(default = "unknown", deserialize_with = "text_or_unknown")]
    pub dc_code: String,
    #[serde(default = "unknown", deserialize_with = "text_or_unknown")]
    pub address: String,
    #[serde(default = "unknown", deserialize_with = "text_or_unknown")]
    pub opening_hour: String,
    #[serde(default = "unknown", deserialize_with = "text_or_unknown")]
    pub closing_hour: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub operational: Operational,
    #[serde(default, alias = "googleMaps")]
    pub maps_link: Option<String>,
}

impl StoreRecord {
    pub fn from_detail(detail: StoreDetail, sequence_number: u64) -> Self {
        let maps_link = detail.maps_link();
        Self {
            sequence_number,
            store_code: detail.store_code,
            store_name: detail.store_name,
            store_type: detail.store_type,
            dc_code: detail.dc_code,
            address: detail.address,
            opening_hour: detail.opening_hour,
            closing_hour: detail.closing_hour,
            latitude: detail.latitude,
            longitude: detail.longitude,
            operational: detail.operational,
            maps_link,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    EmptyCode,
    MissingToken,
    Unauthorized,
    ClientError(u16),
    RetriesExhausted,
    Malformed(String),
    NotFound,
    Transport(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::EmptyCode => write!(f, "empty store code"),
            FallbackReason::MissingToken => write!(f, "no credential token available"),
            FallbackReason::Unauthorized => write!(f, "credential rejected"),
            FallbackReason::ClientError(status) => write!(f, "client error status {status}"),
            FallbackReason::RetriesExhausted => write!(f, "retries exhausted"),
            FallbackReason::Malformed(message) => write!(f, "malformed response: {message}"),
            FallbackReason::NotFound => write!(f, "no store in response"),
            FallbackReason::Transport(message) => write!(f, "request failed: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallback {
    pub store_code: String,
    pub store_name: String,
    pub reason: FallbackReason,
}

impl Fallback {
    pub fn new(code: &StoreCode, reason: FallbackReason) -> Self {
        Self {
            store_code: code.as_str().to_string(),
            store_name: code.as_str().to_string(),
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(StoreDetail),
    Fallback(Fallback),
}

impl FetchOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, FetchOutcome::Fallback(_))
    }
}

pub fn maps_link(latitude: Option<f64>, longitude: Option<f64>) -> Option<String> {
    match (latitude, longitude) {
        (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
            Some(format!("{MAPS_SEARCH_URL}{lat},{lng}"))
        }
        _ => None,
    }
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

fn text_or_unknown<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown))
}
