//! Encode/decode between schedule slots and the persisted column text.
//!
//! The canonical persisted form is a JSON array of strings, each string a
//! JSON object with `day`, `time` ("HH:MM-HH:MM"), `type`, and `freq`.
//! Decoding additionally tolerates every shape older revisions of the
//! system wrote: bare `"DAY HH:MM-HH:MM"` tokens, bare JSON objects,
//! objects with separate `start`/`end` fields, and one-element nested
//! arrays. Nothing outside this module reads or writes that structure.

use serde_json::Value;
use tracing::debug;

use crate::schedule::slot::{
    Frequency, ScheduleSlot, SessionType, SlotError, day_token, format_time, parse_day,
    parse_time, parse_time_range,
};

/// Total decode of the persisted column. Malformed elements are dropped;
/// this never errors, whatever the stored text looks like.
pub fn decode(raw: Option<&str>) -> Vec<ScheduleSlot> {
    let raw = match raw {
        Some(r) if !r.trim().is_empty() => r.trim(),
        _ => return Vec::new(),
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => decode_value(&value, 0),
        // Not JSON at all: the oldest rows held a single plain token.
        Err(_) => decode_token(raw).into_iter().collect(),
    }
}

/// Element-level decode for a column already split into its sequence form.
pub fn decode_strings(items: &[String]) -> Vec<ScheduleSlot> {
    items.iter().flat_map(|item| decode_element(item)).collect()
}

fn decode_value(value: &Value, depth: u8) -> Vec<ScheduleSlot> {
    match value {
        Value::Array(items) => {
            if depth >= 3 {
                debug!("dropping schedule data nested deeper than any known legacy shape");
                return Vec::new();
            }
            items
                .iter()
                .flat_map(|item| decode_value(item, depth + 1))
                .collect()
        }
        Value::Object(map) => match decode_object(map) {
            Some(slot) => vec![slot],
            None => {
                debug!("dropping structurally invalid schedule object");
                Vec::new()
            }
        },
        Value::String(s) => decode_element(s),
        _ => {
            debug!("dropping schedule element of unexpected JSON type");
            Vec::new()
        }
    }
}

fn decode_element(s: &str) -> Vec<ScheduleSlot> {
    let trimmed = s.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        match serde_json::from_str::<Value>(trimmed) {
            Ok(inner) => decode_value(&inner, 1),
            Err(err) => {
                debug!("dropping unparseable schedule element: {err}");
                Vec::new()
            }
        }
    } else {
        match decode_token(trimmed) {
            Some(slot) => vec![slot],
            None => {
                debug!("dropping unrecognized schedule token '{trimmed}'");
                Vec::new()
            }
        }
    }
}

fn decode_object(map: &serde_json::Map<String, Value>) -> Option<ScheduleSlot> {
    let day = parse_day(map.get("day")?.as_str()?).ok()?;
    let (start, end) = match map.get("time").and_then(Value::as_str) {
        Some(range) => parse_time_range(range).ok()?,
        None => {
            let start = parse_time(map.get("start")?.as_str()?).ok()?;
            let end = parse_time(map.get("end")?.as_str()?).ok()?;
            (start, end)
        }
    };
    // Missing or unrecognized type/freq degrade to the defaults.
    let session = map
        .get("type")
        .and_then(Value::as_str)
        .and_then(|s| SessionType::parse(s).ok())
        .unwrap_or_default();
    let frequency = map
        .get("freq")
        .and_then(Value::as_str)
        .and_then(|s| Frequency::parse(s).ok())
        .unwrap_or_default();
    ScheduleSlot::new(day, start, end, session, frequency).ok()
}

fn decode_token(s: &str) -> Option<ScheduleSlot> {
    let (day, range) = s.split_once(char::is_whitespace)?;
    let day = parse_day(day).ok()?;
    let (start, end) = parse_time_range(range.trim()).ok()?;
    ScheduleSlot::new(day, start, end, SessionType::default(), Frequency::default()).ok()
}

/// Strict parse used at the API write boundary. Unlike `decode`, malformed
/// input here is the user's, so it is rejected instead of dropped.
pub fn parse_slot(raw: &str) -> Result<ScheduleSlot, SlotError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        let value: Value = serde_json::from_str(trimmed).map_err(|_| SlotError::Malformed)?;
        let map = value.as_object().ok_or(SlotError::Malformed)?;
        let day = parse_day(
            map.get("day")
                .and_then(Value::as_str)
                .ok_or(SlotError::Malformed)?,
        )?;
        let (start, end) = match map.get("time").and_then(Value::as_str) {
            Some(range) => parse_time_range(range)?,
            None => {
                let s = map
                    .get("start")
                    .and_then(Value::as_str)
                    .ok_or(SlotError::Malformed)?;
                let e = map
                    .get("end")
                    .and_then(Value::as_str)
                    .ok_or(SlotError::Malformed)?;
                (parse_time(s)?, parse_time(e)?)
            }
        };
        let session = match map.get("type").and_then(Value::as_str) {
            Some(s) => SessionType::parse(s)?,
            None => SessionType::default(),
        };
        let frequency = match map.get("freq").and_then(Value::as_str) {
            Some(s) => Frequency::parse(s)?,
            None => Frequency::default(),
        };
        ScheduleSlot::new(day, start, end, session, frequency)
    } else {
        let (day, range) = trimmed
            .split_once(char::is_whitespace)
            .ok_or(SlotError::Malformed)?;
        let day = parse_day(day)?;
        let (start, end) = parse_time_range(range.trim())?;
        ScheduleSlot::new(day, start, end, SessionType::default(), Frequency::default())
    }
}

/// Canonical sequence-of-strings form: one JSON-object string per slot.
pub fn encode(slots: &[ScheduleSlot]) -> Vec<String> {
    slots.iter().map(encode_slot).collect()
}

/// The column text: a JSON array of the canonical strings. Never a nested
/// sequence and never a bare object; every write goes through here.
pub fn encode_column(slots: &[ScheduleSlot]) -> String {
    serde_json::to_string(&encode(slots)).unwrap_or_else(|_| "[]".to_string())
}

fn encode_slot(slot: &ScheduleSlot) -> String {
    serde_json::json!({
        "day": day_token(slot.day),
        "time": format!("{}-{}", format_time(slot.start), format_time(slot.end)),
        "type": slot.session.as_str(),
        "freq": slot.frequency.as_str(),
    })
    .to_string()
}
