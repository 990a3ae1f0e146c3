//! Routing of decoded messages to telemetry
//!
//! Every complete [`Frame`] resolves to exactly one [`Route`]. The node-class character, the
//! value gate and the battery/door flags pick the route, rows are tried in order and the first
//! match wins:
//!
//! | class | gate  | battery | door | publishes                                   |
//! |-------|-------|---------|------|---------------------------------------------|
//! | `8`   | open  |         | set  | DoorState                                   |
//! | `8`   | open  | set     |      | DoorBat                                     |
//! | `8`   |       |         |      | nothing                                     |
//! | `4`   | open  | clear   |      | RoomTemp, RoomHumi, RoomPres                |
//! | `3`   | open  | clear   |      | ServerTemp, ServerHumi, ServerPres          |
//! | `6`   | open  | clear   |      | OutsideTemp, OutsideHumi, OutsidePres       |
//! | `6`   | open  | set     |      | OutsideBat                                  |
//! | `3`   | open  | set     |      | ServerBat                                   |
//! | `4`   | open  | set     |      | RoomBat                                     |
//! | `2`   | open  | set     |      | TrackerBat, inOffice                        |
//!
//! Anything else publishes nothing.
use core::convert::TryFrom;
#[cfg(feature = "std")]
use core::fmt;

use crate::decoder::Frame;

/// Kind of sensor node, encoded in the 4th character of the node identifier
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
#[repr(u8)]
pub enum NodeClass {
    Tracker = b'2',
    ServerCabinet = b'3',
    Room = b'4',
    Outside = b'6',
    Door = b'8',
}

impl TryFrom<u8> for NodeClass {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            b'2' => Ok(NodeClass::Tracker),
            b'3' => Ok(NodeClass::ServerCabinet),
            b'4' => Ok(NodeClass::Room),
            b'6' => Ok(NodeClass::Outside),
            b'8' => Ok(NodeClass::Door),
            _ => Err("Unknown NodeClass"),
        }
    }
}

impl NodeClass {
    /// Temperature, humidity and pressure points of a climate node
    pub fn climate_points(self) -> Option<[TelemetryPoint; 3]> {
        match self {
            NodeClass::Room => Some([
                TelemetryPoint::RoomTemperature,
                TelemetryPoint::RoomHumidity,
                TelemetryPoint::RoomPressure,
            ]),
            NodeClass::ServerCabinet => Some([
                TelemetryPoint::ServerTemperature,
                TelemetryPoint::ServerHumidity,
                TelemetryPoint::ServerPressure,
            ]),
            NodeClass::Outside => Some([
                TelemetryPoint::OutsideTemperature,
                TelemetryPoint::OutsideHumidity,
                TelemetryPoint::OutsidePressure,
            ]),
            NodeClass::Tracker | NodeClass::Door => None,
        }
    }

    pub fn battery_point(self) -> TelemetryPoint {
        match self {
            NodeClass::Tracker => TelemetryPoint::TrackerBattery,
            NodeClass::ServerCabinet => TelemetryPoint::ServerBattery,
            NodeClass::Room => TelemetryPoint::RoomBattery,
            NodeClass::Outside => TelemetryPoint::OutsideBattery,
            NodeClass::Door => TelemetryPoint::DoorBattery,
        }
    }
}

/// Telemetry values the gateway reports
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum TelemetryPoint {
    RoomTemperature,
    RoomHumidity,
    RoomPressure,
    ServerTemperature,
    ServerHumidity,
    ServerPressure,
    OutsideTemperature,
    OutsideHumidity,
    OutsidePressure,
    RoomBattery,
    ServerBattery,
    OutsideBattery,
    TrackerBattery,
    InOffice,
    DoorState,
    DoorBattery,
}

impl TelemetryPoint {
    /// Field name used in the telemetry message
    pub const fn name(&self) -> &'static str {
        match self {
            TelemetryPoint::RoomTemperature => "RoomTemp",
            TelemetryPoint::RoomHumidity => "RoomHumi",
            TelemetryPoint::RoomPressure => "RoomPres",
            TelemetryPoint::ServerTemperature => "ServerTemp",
            TelemetryPoint::ServerHumidity => "ServerHumi",
            TelemetryPoint::ServerPressure => "ServerPres",
            TelemetryPoint::OutsideTemperature => "OutsideTemp",
            TelemetryPoint::OutsideHumidity => "OutsideHumi",
            TelemetryPoint::OutsidePressure => "OutsidePres",
            TelemetryPoint::RoomBattery => "RoomBat",
            TelemetryPoint::ServerBattery => "ServerBat",
            TelemetryPoint::OutsideBattery => "OutsideBat",
            TelemetryPoint::TrackerBattery => "TrackerBat",
            TelemetryPoint::InOffice => "inOffice",
            TelemetryPoint::DoorState => "DoorState",
            TelemetryPoint::DoorBattery => "DoorBat",
        }
    }
}

#[cfg(feature = "std")]
impl fmt::Display for TelemetryPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outbound side of the dispatcher
///
/// Implementations hand the value over to a transport and return. They must not block the
/// decoder and must not fail back into it, errors are theirs to log.
pub trait Publisher {
    fn publish(&mut self, name: &str, value: &str);
}

impl<P: Publisher + ?Sized> Publisher for &mut P {
    fn publish(&mut self, name: &str, value: &str) {
        (**self).publish(name, value)
    }
}

/// Row of the routing table a frame matched
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum Route {
    DoorState,
    DoorBattery,
    /// Door node message that fails the gate or carries neither flag. Values are discarded.
    // TODO confirm with the mesh firmware owners whether these door messages should publish
    DoorSuppressed,
    Climate(NodeClass),
    Battery(NodeClass),
    /// Tracker battery together with the in-office presence value
    TrackerPresence,
    Unrouted,
}

impl Route {
    /// Picks the routing table row for `frame`
    pub fn of<const MSGL: usize>(frame: &Frame<MSGL>) -> Route {
        let class = match frame.node_class().map(NodeClass::try_from) {
            Some(Ok(class)) => class,
            _ => return Route::Unrouted,
        };
        let gate = frame.gate_open();

        match (class, gate, frame.battery_flag, frame.door_flag) {
            (NodeClass::Door, true, _, true) => Route::DoorState,
            (NodeClass::Door, true, true, _) => Route::DoorBattery,
            (NodeClass::Door, ..) => Route::DoorSuppressed,
            (NodeClass::Room, true, false, _) => Route::Climate(NodeClass::Room),
            (NodeClass::ServerCabinet, true, false, _) => Route::Climate(NodeClass::ServerCabinet),
            (NodeClass::Outside, true, false, _) => Route::Climate(NodeClass::Outside),
            (NodeClass::Outside, true, true, _) => Route::Battery(NodeClass::Outside),
            (NodeClass::ServerCabinet, true, true, _) => Route::Battery(NodeClass::ServerCabinet),
            (NodeClass::Room, true, true, _) => Route::Battery(NodeClass::Room),
            (NodeClass::Tracker, true, true, _) => Route::TrackerPresence,
            _ => Route::Unrouted,
        }
    }

    /// Number of values this route publishes
    pub fn publish_count(&self) -> usize {
        match self {
            Route::DoorState | Route::DoorBattery | Route::Battery(_) => 1,
            Route::TrackerPresence => 2,
            Route::Climate(_) => 3,
            Route::DoorSuppressed | Route::Unrouted => 0,
        }
    }
}

/// Routes `frame` and publishes its values, returns the route taken
pub fn dispatch<const MSGL: usize, P: Publisher + ?Sized>(
    frame: &Frame<MSGL>,
    publisher: &mut P,
) -> Route {
    let route = Route::of(frame);
    match route {
        Route::DoorState => emit(publisher, TelemetryPoint::DoorState, frame.door_state_str()),
        Route::DoorBattery => emit(publisher, TelemetryPoint::DoorBattery, frame.battery.as_str()),
        Route::Climate(class) => {
            if let Some([temperature, humidity, pressure]) = class.climate_points() {
                emit(publisher, temperature, frame.value1.as_str());
                emit(publisher, humidity, frame.value2.as_str());
                emit(publisher, pressure, frame.value3.as_str());
            }
        }
        Route::Battery(class) => emit(publisher, class.battery_point(), frame.battery.as_str()),
        Route::TrackerPresence => {
            emit(publisher, TelemetryPoint::TrackerBattery, frame.battery.as_str());
            emit(publisher, TelemetryPoint::InOffice, frame.value1.as_str());
        }
        Route::DoorSuppressed | Route::Unrouted => {}
    }
    route
}

fn emit<P: Publisher + ?Sized>(publisher: &mut P, point: TelemetryPoint, value: &str) {
    log::debug!("publishing {} = {:?}", point.name(), value);
    publisher.publish(point.name(), value);
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::decoder::{Decoder, DEFAULT_MAX_MESSAGE_LENGTH};
    use std::string::{String, ToString};
    use std::vec::Vec as StdVec;

    #[derive(Default)]
    struct Recorder(StdVec<(String, String)>);

    impl Publisher for Recorder {
        fn publish(&mut self, name: &str, value: &str) {
            self.0.push((name.to_string(), value.to_string()));
        }
    }

    fn frame(bytes: &[u8]) -> Frame {
        let mut decoder = Decoder::<DEFAULT_MAX_MESSAGE_LENGTH>::new();
        let mut frames = StdVec::new();
        decoder.process_bytes(bytes, |f| frames.push(f));
        assert_eq!(frames.len(), 1, "expected exactly one message");
        frames.remove(0)
    }

    fn route(bytes: &[u8]) -> (Route, StdVec<(String, String)>) {
        let mut recorder = Recorder::default();
        let route = dispatch(&frame(bytes), &mut recorder);
        (route, recorder.0)
    }

    fn pairs(expected: &[(&str, &str)]) -> StdVec<(String, String)> {
        expected
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_node_class_try_from() {
        assert_eq!(NodeClass::try_from(b'8'), Ok(NodeClass::Door));
        assert_eq!(NodeClass::try_from(b'2'), Ok(NodeClass::Tracker));
        assert!(NodeClass::try_from(b'5').is_err());
    }

    #[test]
    fn test_room_climate_publishes_three_values_in_order() {
        let (r, published) = route(br#"{"n":"D051234","eV":[12,45,990]}"#);
        assert_eq!(r, Route::Climate(NodeClass::Room));
        assert_eq!(
            published,
            pairs(&[("RoomTemp", "12"), ("RoomHumi", "45"), ("RoomPres", "990")])
        );
    }

    #[test]
    fn test_server_and_outside_climate() {
        let (r, published) = route(br#"{"n":"D051233","eV":[30,20,101]}"#);
        assert_eq!(r, Route::Climate(NodeClass::ServerCabinet));
        assert_eq!(
            published,
            pairs(&[("ServerTemp", "30"), ("ServerHumi", "20"), ("ServerPres", "101")])
        );

        let (r, published) = route(br#"{"n":"D051236","eV":[-4,90,987]}"#);
        assert_eq!(r, Route::Climate(NodeClass::Outside));
        assert_eq!(
            published,
            pairs(&[("OutsideTemp", "-4"), ("OutsideHumi", "90"), ("OutsidePres", "987")])
        );
    }

    #[test]
    fn test_gate_blocks_publishing() {
        let (r, published) = route(br#"{"n":"D051234","eV":[0,45,990]}"#);
        assert_eq!(r, Route::Unrouted);
        assert!(published.is_empty());
    }

    #[test]
    fn test_battery_routes() {
        let (r, published) = route(br#"{"n":"D051234","bat":87}"#);
        assert_eq!(r, Route::Battery(NodeClass::Room));
        assert_eq!(published, pairs(&[("RoomBat", "87")]));

        let (r, published) = route(br#"{"n":"D051233","bat":64}"#);
        assert_eq!(r, Route::Battery(NodeClass::ServerCabinet));
        assert_eq!(published, pairs(&[("ServerBat", "64")]));

        let (r, published) = route(br#"{"n":"D051236","bat":42}"#);
        assert_eq!(r, Route::Battery(NodeClass::Outside));
        assert_eq!(published, pairs(&[("OutsideBat", "42")]));
    }

    #[test]
    fn test_tracker_publishes_battery_and_presence() {
        let (r, published) = route(br#"{"n":"D051232","eV":[1],"bat":90}"#);
        assert_eq!(r, Route::TrackerPresence);
        assert_eq!(published, pairs(&[("TrackerBat", "90"), ("inOffice", "1")]));
    }

    #[test]
    fn test_tracker_without_battery_is_unrouted() {
        let (r, published) = route(br#"{"n":"D051232","eV":[1]}"#);
        assert_eq!(r, Route::Unrouted);
        assert!(published.is_empty());
    }

    #[test]
    fn test_door_state() {
        let (r, published) = route(br#"{"n":"D051238","St":1}"#);
        assert_eq!(r, Route::DoorState);
        assert_eq!(published, pairs(&[("DoorState", "1")]));
    }

    #[test]
    fn test_door_without_digit_publishes_closed() {
        let (r, published) = route(br#"{"n":"D051238","St":x}"#);
        assert_eq!(r, Route::DoorState);
        assert_eq!(published, pairs(&[("DoorState", "0")]));
    }

    #[test]
    fn test_door_node_button_flag_alone_is_suppressed() {
        let f = frame(br#"{"n":"D051238","but":1}"#);
        assert!(f.button_flag);
        assert!(!f.door_flag);
        assert_eq!(f.door_state, Some(b'1'));

        let mut recorder = Recorder::default();
        assert_eq!(dispatch(&f, &mut recorder), Route::DoorSuppressed);
        assert!(recorder.0.is_empty());
    }

    #[test]
    fn test_door_battery() {
        let (r, published) = route(br#"{"n":"D051238","bat":55}"#);
        assert_eq!(r, Route::DoorBattery);
        assert_eq!(published, pairs(&[("DoorBat", "55")]));
    }

    #[test]
    fn test_door_wins_over_battery_when_both_flags_set() {
        let f = frame(br#"{"n":"D051238","St":0,"bat":55}"#);
        assert!(f.door_flag);
        assert!(f.battery_flag);

        let mut recorder = Recorder::default();
        assert_eq!(dispatch(&f, &mut recorder), Route::DoorState);
        assert_eq!(recorder.0, pairs(&[("DoorState", "0")]));
    }

    #[test]
    fn test_door_without_gate_is_suppressed() {
        let (r, published) = route(br#"{"n":"D051238","eV":[0],"St":1}"#);
        assert_eq!(r, Route::DoorSuppressed);
        assert!(published.is_empty());

        let (r, published) = route(br#"{"n":"D051238","eV":[7]}"#);
        assert_eq!(r, Route::DoorSuppressed);
        assert!(published.is_empty());
    }

    #[test]
    fn test_unknown_class_and_missing_identifier() {
        let (r, published) = route(br#"{"n":"D051237","eV":[1,2,3]}"#);
        assert_eq!(r, Route::Unrouted);
        assert!(published.is_empty());

        let (r, _) = route(br#"{"eV":[1,2,3]}"#);
        assert_eq!(r, Route::Unrouted);
    }

    #[test]
    fn test_truncated_value_is_published_as_prefix() {
        let (_, published) = route(br#"{"n":"D051234","eV":[12345,45,990]}"#);
        assert_eq!(published[0], ("RoomTemp".to_string(), "12".to_string()));
    }

    #[test]
    fn test_publish_count_matches_publishes() {
        for msg in [
            &br#"{"n":"D051234","eV":[12,45,990]}"#[..],
            &br#"{"n":"D051232","eV":[1],"bat":90}"#[..],
            &br#"{"n":"D051238","St":1}"#[..],
            &br#"{"n":"D051238","eV":[0]}"#[..],
        ] {
            let (r, published) = route(msg);
            assert_eq!(r.publish_count(), published.len());
        }
    }
}
