//! Device twin desired properties
//!
//! The cloud can switch five LEDs through the device twin. Each desired property is an object
//! carrying a boolean `value`:
//!
//! ```text
//! {"desired":{"StatusLED":{"value":true},"office_LED":{"value":false}}}
//! ```
//!
//! Partial updates carry the desired properties at the root instead of under `desired`. Every
//! recognised property is acknowledged with a reported property of its own.
use serde_json::{Map, Value};

use super::{CommandError, Transport};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Led {
    Status,
    Office,
    Server,
    Outside,
    Tracker,
}

impl Led {
    pub const ALL: [Led; 5] = [Led::Status, Led::Office, Led::Server, Led::Outside, Led::Tracker];

    /// Desired property name
    pub const fn desired_name(&self) -> &'static str {
        match self {
            Led::Status => "StatusLED",
            Led::Office => "office_LED",
            Led::Server => "server_LED",
            Led::Outside => "outside_LED",
            Led::Tracker => "tracker_LED",
        }
    }

    /// Reported property name
    pub const fn reported_name(&self) -> &'static str {
        match self {
            Led::Status => "StatusLED",
            Led::Office => "OFFICE LED",
            Led::Server => "SERVER LED",
            Led::Outside => "OUTSIDE LED",
            Led::Tracker => "TRACKER LED",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Output driving the status LED
///
/// The board LED is wired active low, implementations take care of the inversion.
pub trait StatusLed {
    fn set(&mut self, on: bool);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedState([bool; 5]);

impl LedState {
    pub fn get(&self, led: Led) -> bool {
        self.0[led.index()]
    }

    pub fn set(&mut self, led: Led, on: bool) {
        self.0[led.index()] = on;
    }
}

/// `{"<reported name>":<bool>}`
pub fn reported_json(led: Led, on: bool) -> String {
    let mut object = Map::new();
    object.insert(led.reported_name().to_owned(), Value::Bool(on));
    Value::Object(object).to_string()
}

pub struct TwinHandler<S: StatusLed> {
    leds: LedState,
    status_led: S,
}

impl<S: StatusLed> TwinHandler<S> {
    pub fn new(status_led: S) -> Self {
        Self {
            leds: LedState::default(),
            status_led,
        }
    }

    pub fn leds(&self) -> LedState {
        self.leds
    }

    pub fn status_led(&self) -> &S {
        &self.status_led
    }

    /// Applies a twin document and reports every recognised property back through `transport`.
    /// Returns the LEDs that were updated.
    pub fn handle<T: Transport + ?Sized>(
        &mut self,
        payload: &[u8],
        transport: &mut T,
    ) -> Result<Vec<Led>, CommandError> {
        let root: Value = serde_json::from_slice(payload).map_err(|e| {
            log::warn!("cannot parse twin update as JSON content: {}", e);
            CommandError::from(e)
        })?;
        let root = root.as_object().ok_or(CommandError::NotAnObject)?;
        let desired = match root.get("desired").and_then(Value::as_object) {
            Some(desired) => desired,
            None => root,
        };

        let mut updated = Vec::new();
        for led in Led::ALL {
            let property = match desired.get(led.desired_name()).and_then(Value::as_object) {
                Some(property) => property,
                None => continue,
            };
            let on = property
                .get("value")
                .and_then(Value::as_bool)
                .unwrap_or(false);

            self.leds.set(led, on);
            if led == Led::Status {
                self.status_led.set(on);
            }
            updated.push(led);

            match transport.send_reported_state(&reported_json(led, on)) {
                Ok(()) => log::info!("reported state for '{}' to value '{}'", led.reported_name(), on),
                Err(e) => log::error!(
                    "failed to set reported state for '{}': {}",
                    led.reported_name(),
                    e
                ),
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::tests::MemoryTransport;

    #[derive(Default)]
    struct Pin(Vec<bool>);

    impl StatusLed for Pin {
        fn set(&mut self, on: bool) {
            self.0.push(on);
        }
    }

    #[test]
    fn test_desired_status_led() {
        let mut handler = TwinHandler::new(Pin::default());
        let mut transport = MemoryTransport::default();
        let updated = handler
            .handle(br#"{"desired":{"StatusLED":{"value":true}},"reported":{}}"#, &mut transport)
            .unwrap();
        assert_eq!(updated, vec![Led::Status]);
        assert!(handler.leds().get(Led::Status));
        assert_eq!(handler.status_led().0, vec![true]);
        assert_eq!(transport.reported, vec![r#"{"StatusLED":true}"#.to_owned()]);
    }

    #[test]
    fn test_partial_update_at_root() {
        let mut handler = TwinHandler::new(Pin::default());
        let mut transport = MemoryTransport::default();
        let updated = handler
            .handle(
                br#"{"office_LED":{"value":true},"tracker_LED":{"value":false},"$version":4}"#,
                &mut transport,
            )
            .unwrap();
        assert_eq!(updated, vec![Led::Office, Led::Tracker]);
        assert!(handler.leds().get(Led::Office));
        assert!(!handler.leds().get(Led::Tracker));
        assert!(handler.status_led().0.is_empty());
        assert_eq!(
            transport.reported,
            vec![
                r#"{"OFFICE LED":true}"#.to_owned(),
                r#"{"TRACKER LED":false}"#.to_owned()
            ]
        );
    }

    #[test]
    fn test_unknown_properties_are_ignored() {
        let mut handler = TwinHandler::new(Pin::default());
        let mut transport = MemoryTransport::default();
        let updated = handler
            .handle(br#"{"desired":{"fan":{"value":true}}}"#, &mut transport)
            .unwrap();
        assert!(updated.is_empty());
        assert!(transport.reported.is_empty());
        assert_eq!(handler.leds(), LedState::default());
    }

    #[test]
    fn test_invalid_payload() {
        let mut handler = TwinHandler::new(Pin::default());
        let mut transport = MemoryTransport::default();
        assert_eq!(
            handler.handle(b"{not json", &mut transport),
            Err(CommandError::InvalidJson)
        );
        assert_eq!(
            handler.handle(b"[1,2]", &mut transport),
            Err(CommandError::NotAnObject)
        );
    }

    #[test]
    fn test_report_failure_still_applies_state() {
        let mut handler = TwinHandler::new(Pin::default());
        let mut transport = MemoryTransport {
            offline: true,
            ..MemoryTransport::default()
        };
        let updated = handler
            .handle(br#"{"server_LED":{"value":true}}"#, &mut transport)
            .unwrap();
        assert_eq!(updated, vec![Led::Server]);
        assert!(handler.leds().get(Led::Server));
    }
}
