//! Device Link Protocol
//!
//! Both message kinds travel as string-keyed mappings of heterogeneous
//! values.
//!
//! ```text
//! Control    { "action": "START" | "STOP", "threshold": <number> }   handheld -> wearable
//! Telemetry  { "bpm": <number>, "isActive": <bool> }                 wearable -> handheld
//! ```
//!
//! A mapping is Control when `action` holds exactly one of the two tokens,
//! otherwise Telemetry when it carries `bpm`. A stop ignores `threshold`;
//! a start may omit it but a present value must be a number, and range
//! checks are left to the session. Telemetry needs only `bpm`; `isActive`
//! is applied when present. Mistyped values and mappings without either
//! discriminator decode to [`LinkMessage::Unrecognized`]. Unknown extra
//! keys are ignored.

use crate::domain::error::LinkError;
use crate::domain::models::{
    ControlAction, ControlCommand, ControlMessage, LinkMessage, TelemetryMessage, TelemetryReport,
};
use serde_json::{Map, Value};
use tracing::debug;

pub type WireMessage = Map<String, Value>;

pub const KEY_ACTION: &str = "action";
pub const KEY_THRESHOLD: &str = "threshold";
pub const KEY_BPM: &str = "bpm";
pub const KEY_IS_ACTIVE: &str = "isActive";

pub fn encode_control(message: &ControlMessage) -> WireMessage {
    let mut map = Map::new();
    map.insert(KEY_ACTION.to_string(), Value::from(message.action.as_token()));
    map.insert(KEY_THRESHOLD.to_string(), Value::from(message.threshold_bpm));
    map
}

pub fn encode_telemetry(message: &TelemetryMessage) -> WireMessage {
    let mut map = Map::new();
    map.insert(KEY_BPM.to_string(), Value::from(message.bpm));
    map.insert(KEY_IS_ACTIVE.to_string(), Value::from(message.is_active));
    map
}

/// Decode an inbound mapping. Never fails; rejects are logged at debug.
pub fn decode(raw: &WireMessage) -> LinkMessage {
    match parse(raw) {
        Ok(message) => message,
        Err(e) => {
            debug!("Dropping inbound message: {}", e);
            LinkMessage::Unrecognized
        }
    }
}

pub fn parse(raw: &WireMessage) -> Result<LinkMessage, LinkError> {
    if let Some(action) = raw
        .get(KEY_ACTION)
        .and_then(Value::as_str)
        .and_then(ControlAction::from_token)
    {
        return parse_control(raw, action).map(LinkMessage::Control);
    }

    if raw.contains_key(KEY_BPM) {
        return parse_telemetry(raw).map(LinkMessage::Telemetry);
    }

    Err(LinkError::MalformedMessage(format!(
        "no {} or {} discriminator",
        KEY_ACTION, KEY_BPM
    )))
}

fn parse_control(raw: &WireMessage, action: ControlAction) -> Result<ControlCommand, LinkError> {
    match action {
        ControlAction::Stop => Ok(ControlCommand::Stop),
        ControlAction::Start => Ok(ControlCommand::Start {
            threshold_bpm: optional_number(raw, KEY_THRESHOLD)?,
        }),
    }
}

fn parse_telemetry(raw: &WireMessage) -> Result<TelemetryReport, LinkError> {
    let bpm = optional_number(raw, KEY_BPM)?
        .ok_or_else(|| LinkError::MalformedMessage(format!("{} missing", KEY_BPM)))?;
    if bpm < 0.0 {
        return Err(LinkError::MalformedMessage(format!("negative bpm {}", bpm)));
    }
    let is_active = match raw.get(KEY_IS_ACTIVE) {
        None => None,
        Some(value) => Some(value.as_bool().ok_or_else(|| {
            LinkError::MalformedMessage(format!("{} is not a bool", KEY_IS_ACTIVE))
        })?),
    };
    Ok(TelemetryReport { bpm, is_active })
}

/// Absent keys are `None`; present ones must be finite numbers. Integer
/// and float JSON numbers are both accepted.
fn optional_number(raw: &WireMessage, key: &str) -> Result<Option<f64>, LinkError> {
    match raw.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| LinkError::MalformedMessage(format!("{} is not a number", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire(value: Value) -> WireMessage {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_control_round_trip() {
        let encoded = encode_control(&ControlMessage {
            action: ControlAction::Start,
            threshold_bpm: 72.0,
        });
        assert_eq!(encoded.get("action"), Some(&json!("START")));

        assert_eq!(
            decode(&encoded),
            LinkMessage::Control(ControlCommand::Start {
                threshold_bpm: Some(72.0),
            })
        );
    }

    #[test]
    fn test_integer_threshold_is_accepted() {
        let raw = wire(json!({ "action": "START", "threshold": 60 }));
        assert_eq!(
            decode(&raw),
            LinkMessage::Control(ControlCommand::Start {
                threshold_bpm: Some(60.0),
            })
        );
    }

    #[test]
    fn test_stop_ignores_threshold() {
        for raw in [
            json!({ "action": "STOP" }),
            json!({ "action": "STOP", "threshold": 0 }),
            json!({ "action": "STOP", "threshold": "n/a" }),
        ] {
            assert_eq!(
                decode(&wire(raw.clone())),
                LinkMessage::Control(ControlCommand::Stop),
                "{}",
                raw
            );
        }
    }

    #[test]
    fn test_start_passes_threshold_through() {
        assert_eq!(
            decode(&wire(json!({ "action": "START", "threshold": 20 }))),
            LinkMessage::Control(ControlCommand::Start {
                threshold_bpm: Some(20.0),
            })
        );
        assert_eq!(
            decode(&wire(json!({ "action": "START" }))),
            LinkMessage::Control(ControlCommand::Start {
                threshold_bpm: None,
            })
        );
    }

    #[test]
    fn test_telemetry_decodes() {
        let raw = wire(json!({ "bpm": 58.5, "isActive": true, "extra": [1, 2] }));
        assert_eq!(
            decode(&raw),
            LinkMessage::Telemetry(TelemetryReport {
                bpm: 58.5,
                is_active: Some(true),
            })
        );
    }

    #[test]
    fn test_telemetry_without_active_flag() {
        assert_eq!(
            decode(&wire(json!({ "bpm": 60 }))),
            LinkMessage::Telemetry(TelemetryReport {
                bpm: 60.0,
                is_active: None,
            })
        );
    }

    #[test]
    fn test_unknown_shapes_are_unrecognized() {
        let cases = [
            json!({ "foo": 1 }),
            json!({}),
            json!({ "action": "PAUSE" }),
            json!({ "action": "start", "threshold": 70 }),
            json!({ "action": "START", "threshold": "70" }),
            json!({ "bpm": "fast", "isActive": true }),
            json!({ "bpm": null }),
            json!({ "bpm": -1, "isActive": false }),
            json!({ "bpm": 60, "isActive": "yes" }),
        ];

        for case in cases {
            assert_eq!(decode(&wire(case.clone())), LinkMessage::Unrecognized, "{}", case);
        }
    }

    #[test]
    fn test_bad_action_falls_through_to_telemetry() {
        let raw = wire(json!({ "action": 7, "bpm": 61, "isActive": false }));
        assert!(matches!(decode(&raw), LinkMessage::Telemetry(_)));
    }

    #[test]
    fn test_parse_reports_reason() {
        let raw = wire(json!({ "foo": 1 }));
        assert!(matches!(parse(&raw), Err(LinkError::MalformedMessage(_))));
    }
}
