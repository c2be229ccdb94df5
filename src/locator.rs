use std::error::Error as _;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue,
    ORIGIN, REFERER, USER_AGENT,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::credentials::CredentialProvider;
use crate::delay::Delay;
use crate::domain::{
    Coordinate, Fallback, FallbackReason, FetchOutcome, Operational, StoreCode, StoreDetail,
    UNKNOWN,
};
use crate::error::BackupError;
use crate::retry::{
    AttemptOutcome, ResponseClass, RetryDecision, RetryPolicy, classify_status, is_transient_message,
};

pub const NEAREST_URL: &str = "https://ap-mc.klikindomaret.com/assets-klikidmorder/api/get/catalog-xpress/api/webapp/stores/nearest";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";
const SITE_ORIGIN: &str = "https://www.klikindomaret.com";
const SITE_REFERER: &str = "https://www.klikindomaret.com/";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub page: u32,
    pub keyword: String,
    pub selected_store_code: String,
}

impl NearestQuery {
    pub fn for_code(code: &StoreCode, coordinate: Coordinate) -> Self {
        Self {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            page: 0,
            keyword: code.as_str().to_string(),
            selected_store_code: code.as_str().to_string(),
        }
    }

    pub fn nearby(coordinate: Coordinate) -> Self {
        Self {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            page: 0,
            keyword: String::new(),
            selected_store_code: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearestResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub transient: bool,
}

impl TransportError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: true,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: false,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        // The URL carries the store code as `keyword`; keep it out of the
        // text matched against transient signatures.
        let err = err.without_url();
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = inner.source();
        }
        let transient = err.is_timeout() || is_transient_message(&message);
        Self { message, transient }
    }
}

pub trait NearestClient {
    fn get_nearest(
        &self,
        query: &NearestQuery,
        token: &str,
    ) -> Result<NearestResponse, TransportError>;
}

impl<C: NearestClient + ?Sized> NearestClient for &C {
    fn get_nearest(
        &self,
        query: &NearestQuery,
        token: &str,
    ) -> Result<NearestResponse, TransportError> {
        (**self).get_nearest(query, token)
    }
}

#[derive(Clone)]
pub struct NearestHttpClient {
    client: Client,
    endpoint: String,
}

impl NearestHttpClient {
    pub fn with_endpoint(endpoint: &str, timeout: Duration) -> Result<Self, BackupError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ORIGIN, HeaderValue::from_static(SITE_ORIGIN));
        headers.insert(REFERER, HeaderValue::from_static(SITE_REFERER));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("id-ID,id;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        headers.insert(
            HeaderName::from_static("apps"),
            HeaderValue::from_static("klikindomaret"),
        );
        headers.insert(
            HeaderName::from_static("sec-ch-ua-platform"),
            HeaderValue::from_static("\"Windows\""),
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| BackupError::HttpClient(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

impl NearestClient for NearestHttpClient {
    fn get_nearest(
        &self,
        query: &NearestQuery,
        token: &str,
    ) -> Result<NearestResponse, TransportError> {
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|err| TransportError::fatal(format!("invalid token header: {err}")))?;
        let correlation_id = chrono::Utc::now().timestamp_millis().to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(query)
            .header(AUTHORIZATION, bearer)
            .header("x-correlation-id", correlation_id)
            .send()
            .map_err(TransportError::from_reqwest)?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(TransportError::from_reqwest)?;
        Ok(NearestResponse { status, body })
    }
}

pub trait StoreLookup {
    fn fetch_store(&self, code: &str, coordinate: Option<Coordinate>) -> FetchOutcome;
}

impl<L: StoreLookup + ?Sized> StoreLookup for &L {
    fn fetch_store(&self, code: &str, coordinate: Option<Coordinate>) -> FetchOutcome {
        (**self).fetch_store(code, coordinate)
    }
}

pub struct Locator<C, P, D> {
    client: C,
    credentials: P,
    delay: D,
    policy: RetryPolicy,
}

impl<C: NearestClient, P: CredentialProvider, D: Delay> Locator<C, P, D> {
    pub fn new(client: C, credentials: P, delay: D) -> Self {
        Self {
            client,
            credentials,
            delay,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn fetch_store(&self, code: &str, coordinate: Option<Coordinate>) -> FetchOutcome {
        let code = StoreCode::new(code);
        if code.is_empty() {
            return FetchOutcome::Fallback(Fallback::new(&code, FallbackReason::EmptyCode));
        }
        let Some(token) = self.credentials.token() else {
            return fallback(&code, FallbackReason::MissingToken);
        };

        let query = NearestQuery::for_code(&code, coordinate.unwrap_or_default());
        let body = match self.send_with_retries(&query, &token) {
            Ok(body) => body,
            Err(reason) => return fallback(&code, reason),
        };

        let entries = content_entries(&body);
        match select_entry(entries, &code) {
            Some(entry) => FetchOutcome::Found(normalize_entry(entry, &code)),
            None => fallback(&code, FallbackReason::NotFound),
        }
    }

    /// All raw store entries near `coordinate`; empty on any failure.
    pub fn search_nearby(&self, coordinate: Coordinate) -> Vec<Value> {
        let Some(token) = self.credentials.token() else {
            tracing::warn!("no credential token available for nearby search");
            return Vec::new();
        };
        let query = NearestQuery::nearby(coordinate);
        match self.send_with_retries(&query, &token) {
            Ok(body) => content_entries(&body).to_vec(),
            Err(reason) => {
                tracing::warn!(
                    latitude = coordinate.latitude,
                    longitude = coordinate.longitude,
                    %reason,
                    "nearby search failed"
                );
                Vec::new()
            }
        }
    }

    fn send_with_retries(&self, query: &NearestQuery, token: &str) -> Result<Value, FallbackReason> {
        let mut attempt = 0u32;
        loop {
            tracing::debug!(attempt, keyword = %query.keyword, "nearest.request");
            let result = self.client.get_nearest(query, token);
            let outcome = match &result {
                Ok(response) => AttemptOutcome::Response(classify_status(response.status)),
                Err(err) => AttemptOutcome::TransportFailure {
                    transient: err.transient,
                },
            };
            match self.policy.decide(attempt, outcome) {
                RetryDecision::Proceed => {
                    return match result {
                        Ok(response) => serde_json::from_str(&response.body)
                            .map_err(|err| FallbackReason::Malformed(err.to_string())),
                        Err(err) => Err(FallbackReason::Transport(err.message)),
                    };
                }
                RetryDecision::Retry(delay) => {
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        keyword = %query.keyword,
                        "transient failure, retrying after back-off"
                    );
                    self.delay.sleep(delay);
                    attempt += 1;
                }
                RetryDecision::GiveUp => return Err(give_up_reason(result)),
            }
        }
    }
}

impl<C: NearestClient, P: CredentialProvider, D: Delay> StoreLookup for Locator<C, P, D> {
    fn fetch_store(&self, code: &str, coordinate: Option<Coordinate>) -> FetchOutcome {
        Locator::fetch_store(self, code, coordinate)
    }
}

fn give_up_reason(result: Result<NearestResponse, TransportError>) -> FallbackReason {
    match result {
        Ok(response) => match classify_status(response.status) {
            ResponseClass::Unauthorized => FallbackReason::Unauthorized,
            ResponseClass::ClientError => FallbackReason::ClientError(response.status),
            ResponseClass::ServerError | ResponseClass::Success => FallbackReason::RetriesExhausted,
        },
        Err(err) if err.transient => FallbackReason::RetriesExhausted,
        Err(err) => FallbackReason::Transport(err.message),
    }
}

fn fallback(code: &StoreCode, reason: FallbackReason) -> FetchOutcome {
    tracing::warn!(store_code = %code, %reason, "lookup fell back");
    FetchOutcome::Fallback(Fallback::new(code, reason))
}

pub fn content_entries(body: &Value) -> &[Value] {
    body.get("data")
        .and_then(|data| data.get("content"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Exact code match (case-insensitive), else the first entry.
pub fn select_entry<'a>(entries: &'a [Value], code: &StoreCode) -> Option<&'a Value> {
    entries
        .iter()
        .find(|entry| {
            text_field(entry, &["storeCode"])
                .map(|value| value.trim().to_uppercase() == code.as_str())
                .unwrap_or(false)
        })
        .or_else(|| entries.first())
}

pub fn normalize_entry(entry: &Value, code: &StoreCode) -> StoreDetail {
    let field = |keys: &[&str]| text_field(entry, keys).unwrap_or_else(|| UNKNOWN.to_string());
    let operational = match entry.get("operational").and_then(Value::as_bool) {
        Some(flag) => Operational::from(Some(flag)),
        None => status_text(entry)
            .map(|status| Operational::from_status(&status))
            .unwrap_or_default(),
    };

    StoreDetail {
        store_code: text_field(entry, &["storeCode"])
            .map(|value| value.trim().to_uppercase())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| code.as_str().to_string()),
        store_name: text_field(entry, &["storeName", "name"])
            .unwrap_or_else(|| code.as_str().to_string()),
        store_type: field(&["storeType"]),
        dc_code: field(&["dcCode"]),
        address: field(&["address"]),
        opening_hour: field(&["openingHour", "openHour"]),
        closing_hour: field(&["closingHour", "closeHour"]),
        distance: field(&["distanceString", "distance"]),
        latitude: finite_number(entry.get("latitude")),
        longitude: finite_number(entry.get("longitude")),
        operational,
    }
}

pub fn text_field(entry: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| entry.get(*key))
        .find(|value| !value.is_null())
        .map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
}

fn status_text(entry: &Value) -> Option<String> {
    ["status", "storeStatus"]
        .iter()
        .filter_map(|key| entry.get(*key))
        .filter_map(|value| match value {
            Value::String(text) => Some(text.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .find(|text| !text.is_empty())
}

fn finite_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn exact_match_wins_over_first_entry() {
        let entries = vec![json!({"storeCode": "ABC"}), json!({"storeCode": "xyz"})];
        let selected = select_entry(&entries, &StoreCode::new("XYZ")).unwrap();
        assert_eq!(selected["storeCode"], "xyz");
    }

    #[test]
    fn first_entry_when_no_exact_match() {
        let entries = vec![json!({"storeCode": "ABC"}), json!({"storeCode": "DEF"})];
        let selected = select_entry(&entries, &StoreCode::new("XYZ")).unwrap();
        assert_eq!(selected["storeCode"], "ABC");
        assert!(select_entry(&[], &StoreCode::new("XYZ")).is_none());
    }

    #[test]
    fn normalize_maps_field_variants_and_sentinels() {
        let entry = json!({
            "storeCode": "t001",
            "name": "INDOMARET CIHAMPELAS",
            "openHour": "07:00",
            "closeHour": "22:00",
            "distance": "1.2 km",
            "latitude": "-6.8935",
            "longitude": 107.6045,
            "status": "BUKA"
        });
        let detail = normalize_entry(&entry, &StoreCode::new("T001"));
        assert_eq!(detail.store_code, "T001");
        assert_eq!(detail.store_name, "INDOMARET CIHAMPELAS");
        assert_eq!(detail.opening_hour, "07:00");
        assert_eq!(detail.closing_hour, "22:00");
        assert_eq!(detail.distance, "1.2 km");
        assert_eq!(detail.store_type, UNKNOWN);
        assert_eq!(detail.dc_code, UNKNOWN);
        assert_eq!(detail.address, UNKNOWN);
        assert_eq!(detail.latitude, Some(-6.8935));
        assert_eq!(detail.longitude, Some(107.6045));
        assert_eq!(detail.operational, Operational::Open);
    }

    #[test]
    fn normalize_prefers_boolean_operational_and_rejects_bad_coordinates() {
        let entry = json!({
            "storeCode": "T002",
            "operational": false,
            "status": "BUKA",
            "latitude": "abc",
            "longitude": null
        });
        let detail = normalize_entry(&entry, &StoreCode::new("T002"));
        assert_eq!(detail.operational, Operational::Closed);
        assert_eq!(detail.latitude, None);
        assert_eq!(detail.longitude, None);
        assert_eq!(detail.store_name, "T002");
        assert_eq!(detail.maps_link(), None);
    }

    #[test]
    fn store_status_is_used_when_status_is_blank() {
        let entry = json!({"storeCode": "T003", "status": "", "storeStatus": "Tutup"});
        let detail = normalize_entry(&entry, &StoreCode::new("T003"));
        assert_eq!(detail.operational, Operational::Closed);
    }

    #[test]
    fn content_entries_tolerates_unexpected_shapes() {
        assert!(content_entries(&json!({})).is_empty());
        assert!(content_entries(&json!({"data": {"content": "nope"}})).is_empty());
        assert_eq!(
            content_entries(&json!({"data": {"content": [{"storeCode": "A"}]}})).len(),
            1
        );
    }

    #[test]
    fn query_shapes() {
        let code = StoreCode::new("fwcl");
        let query = NearestQuery::for_code(&code, Coordinate::REFERENCE);
        assert_eq!(query.keyword, "FWCL");
        assert_eq!(query.selected_store_code, "FWCL");
        assert_eq!(query.page, 0);

        let nearby = NearestQuery::nearby(Coordinate::new(-6.2, 106.8));
        assert!(nearby.keyword.is_empty());
        assert!(nearby.selected_store_code.is_empty());
        assert_eq!(nearby.latitude, -6.2);
    }
}
