//! Sweep Fleet Shared Protocol Types
//!
//! This crate provides the wire messages exchanged between the fleet
//! coordinator and dashboard clients, plus the length-prefixed codec
//! that frames them.

pub mod codec;

use serde::{Deserialize, Serialize};

/// Tuning parameters for the fleet coordinator
pub mod tuning {
    /// Interval of the motion tick loop in milliseconds
    pub const TICK_INTERVAL_MS: u64 = 50;

    /// Outbound frames buffered per client before the broadcaster starts
    /// dropping frames for that client
    pub const CLIENT_SEND_QUEUE: usize = 16;
}

/// Commands sent by dashboard clients over the persistent channel.
///
/// The `type` tag on the wire matches the dashboard's event names
/// (`request_movement`, `abort_movement`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Fly the nearest agent to a geodetic target
    RequestMovement { lng: f64, lat: f64, id: String },
    /// Release a specific in-flight override
    AbortMovement { id: String },
    /// Freeze one agent's autonomous sweep in place
    DronePause { drone: usize },
    /// Resume one agent's autonomous sweep
    DroneGo { drone: usize },
    /// Clear (or keep) an agent's alert flag
    DismissAlert { drone: usize, confirmed: bool },
}

impl ClientMessage {
    /// Parse a command from a raw frame payload
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Per-drone entry in a broadcast snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneStatus {
    pub id: usize,
    pub lat: f64,
    pub lng: f64,
    /// Heading in compass degrees
    pub rotation: f64,
    /// True while the agent is off its scan path (overridden or
    /// returning to it). Spelled `overriden` on the wire; the dashboard
    /// expects that field name.
    #[serde(rename = "overriden")]
    pub overridden: bool,
    pub alert: bool,
}

/// One broadcast payload describing the whole fleet at a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub drones: Vec<DroneStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_movement_wire_shape() {
        let msg = ClientMessage::RequestMovement {
            lng: -122.612600,
            lat: 37.926400,
            id: "a".into(),
        };
        let value = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(value["type"], "request_movement");
        assert_eq!(value["lng"], -122.612600);
        assert_eq!(value["lat"], 37.926400);
        assert_eq!(value["id"], "a");
    }

    #[test]
    fn test_parse_dashboard_commands() {
        let pause = ClientMessage::from_slice(br#"{"type":"drone_pause","drone":1}"#)
            .expect("parse drone_pause");
        assert_eq!(pause, ClientMessage::DronePause { drone: 1 });

        let dismiss =
            ClientMessage::from_slice(br#"{"type":"dismiss_alert","drone":0,"confirmed":true}"#)
                .expect("parse dismiss_alert");
        assert_eq!(
            dismiss,
            ClientMessage::DismissAlert {
                drone: 0,
                confirmed: true
            }
        );

        let abort = ClientMessage::from_slice(br#"{"type":"abort_movement","id":"mv-7"}"#)
            .expect("parse abort_movement");
        assert_eq!(abort, ClientMessage::AbortMovement { id: "mv-7".into() });
    }

    #[test]
    fn test_missing_field_is_rejected() {
        // request_movement without a target point must not parse
        let result = ClientMessage::from_slice(br#"{"type":"request_movement","id":"a"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_snapshot_wire_shape() {
        let snapshot = FleetSnapshot {
            drones: vec![DroneStatus {
                id: 0,
                lat: 37.926337,
                lng: -122.612707,
                rotation: 90.0,
                overridden: true,
                alert: false,
            }],
        };
        let value = serde_json::to_value(&snapshot).expect("serialize");
        let drone = &value["drones"][0];
        assert_eq!(drone["id"], 0);
        // The dashboard reads the misspelled field name
        assert_eq!(drone["overriden"], true);
        assert_eq!(drone.get("overridden"), None);
        assert_eq!(drone["alert"], false);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let snapshot = FleetSnapshot {
            drones: vec![DroneStatus {
                id: 1,
                lat: 37.9264,
                lng: -122.6126,
                rotation: 180.0,
                overridden: false,
                alert: true,
            }],
        };
        let bytes = serde_json::to_vec(&snapshot).expect("serialize");
        let parsed: FleetSnapshot = serde_json::from_slice(&bytes).expect("parse");
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_unknown_command_type_is_rejected() {
        let value = json!({"type": "self_destruct", "drone": 0});
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(ClientMessage::from_slice(&bytes).is_err());
    }
}
