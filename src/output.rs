use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::{Fallback, FetchOutcome, Operational, StoreDetail, UNKNOWN};
use crate::locator::text_field;

pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn render(event: &ProgressEvent) -> String {
        match event {
            ProgressEvent::Started => "\n🚀 Store backup started\n".to_string(),
            ProgressEvent::SmokeTest { store_code } => {
                format!("🔍 Test request ({store_code})...")
            }
            ProgressEvent::SmokeTestPassed => "✅ Engine OK!\n".to_string(),
            ProgressEvent::Resumed { existing } => {
                format!("📊 Resuming: {existing} stores already saved\n")
            }
            ProgressEvent::Saved {
                sequence_number,
                store_code,
            } => format!("✅ No.{sequence_number} | {store_code} | saved"),
            ProgressEvent::Skipped { store_code } => {
                format!("⚠️ {store_code} not found / rate limited")
            }
            ProgressEvent::Finished { total } => {
                format!("\n🎉 Backup finished!\n📦 Total stores: {total}\n")
            }
        }
    }

    pub fn print_lookup(outcome: &FetchOutcome) {
        let lines = match outcome {
            FetchOutcome::Found(detail) => detail_lines(detail),
            FetchOutcome::Fallback(fallback) => fallback_lines(fallback),
        };
        for line in lines {
            println!("{line}");
        }
    }

    pub fn print_nearby(entries: &[Value]) {
        if entries.is_empty() {
            println!("⚠️ No stores found near this point");
            return;
        }
        for (index, entry) in entries.iter().enumerate() {
            println!("{}", nearby_line(index + 1, entry));
        }
    }
}

pub fn nearby_line(position: usize, entry: &Value) -> String {
    let text =
        |keys: &[&str]| text_field(entry, keys).unwrap_or_else(|| UNKNOWN.to_string());
    format!(
        "{position:>3}. {} | {} | {}",
        text(&["storeCode"]),
        text(&["storeName", "name"]),
        text(&["distanceString", "distance"])
    )
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        println!("{}", Self::render(&event));
    }
}

pub fn detail_lines(detail: &StoreDetail) -> Vec<String> {
    let mut lines = vec![
        format!("📦 STORE CODE : {}", detail.store_code),
        format!("🏪 STORE NAME : {}", detail.store_name),
        format!("📍 ADDRESS    : {}", detail.address),
        format!(
            "🕒 HOURS      : {} - {}",
            detail.opening_hour, detail.closing_hour
        ),
        format!("📏 DISTANCE   : {}", detail.distance),
    ];
    if let (Some(lat), Some(lng)) = (detail.latitude, detail.longitude) {
        lines.push(format!("🌐 COORDINATES: {lat}, {lng}"));
    }
    match detail.operational {
        Operational::Open => lines.push("✅ STATUS     : Open".to_string()),
        Operational::Closed => lines.push("✅ STATUS     : Closed".to_string()),
        Operational::Unknown => {}
    }
    lines
}

fn fallback_lines(fallback: &Fallback) -> Vec<String> {
    let code = if fallback.store_code.is_empty() {
        UNKNOWN
    } else {
        fallback.store_code.as_str()
    };
    vec![
        format!("📦 STORE CODE : {code}"),
        format!("🏪 STORE NAME : {code}"),
        format!("⚠️ {}", fallback.reason),
    ]
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_lookup(outcome: &FetchOutcome) -> io::Result<()> {
        match outcome {
            FetchOutcome::Found(detail) => Self::print_json(detail),
            FetchOutcome::Fallback(fallback) => Self::print_json(&serde_json::json!({
                "storeCode": fallback.store_code,
                "storeName": fallback.store_name,
                "fallback": fallback.reason.to_string(),
            })),
        }
    }

    pub fn print_nearby(entries: &[Value]) -> io::Result<()> {
        Self::print_json(&entries)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_and_skipped_lines() {
        assert_eq!(
            ConsoleOutput::render(&ProgressEvent::Saved {
                sequence_number: 12,
                store_code: "T001".to_string()
            }),
            "✅ No.12 | T001 | saved"
        );
        assert!(
            ConsoleOutput::render(&ProgressEvent::Skipped {
                store_code: "T002".to_string()
            })
            .starts_with("⚠️ T002")
        );
    }

    #[test]
    fn detail_omits_unknown_status_and_missing_coordinates() {
        let detail = StoreDetail {
            store_code: "T001".to_string(),
            store_name: "INDOMARET".to_string(),
            store_type: UNKNOWN.to_string(),
            dc_code: UNKNOWN.to_string(),
            address: UNKNOWN.to_string(),
            opening_hour: "07:00".to_string(),
            closing_hour: "22:00".to_string(),
            distance: UNKNOWN.to_string(),
            latitude: None,
            longitude: Some(107.6),
            operational: Operational::Unknown,
        };
        let lines = detail_lines(&detail);
        assert_eq!(lines.len(), 5);
        assert!(lines[3].ends_with("07:00 - 22:00"));
    }

    #[test]
    fn nearby_line_accepts_variant_field_names() {
        let primary = serde_json::json!({
            "storeCode": "T001",
            "storeName": "INDOMARET DAGO",
            "distanceString": "0.4 km"
        });
        let variant = serde_json::json!({
            "storeCode": "T002",
            "name": "INDOMARET SEKELOA",
            "distance": "1.1 km"
        });
        assert_eq!(nearby_line(1, &primary), "  1. T001 | INDOMARET DAGO | 0.4 km");
        assert_eq!(nearby_line(2, &variant), "  2. T002 | INDOMARET SEKELOA | 1.1 km");
        assert_eq!(
            nearby_line(3, &serde_json::json!({"storeCode": "T003"})),
            "  3. T003 | - | -"
        );
    }
}
