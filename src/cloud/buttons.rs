//! Board buttons
//!
//! Buttons are polled. A press is the change to low from the last known level, which starts
//! high (released). Button A and button B raise telemetry events of the form
//!
//! ```text
//! {"Name":"Orientation","Evalue":"Up"}
//! ```
//!
//! and the UART button greets the mesh coordinator.
use std::io;

use serde_json::Value;

use super::method::write_command;
use super::{CommandError, Transport};

pub const UART_GREETING: &str = "Hello world!\n";

/// Level of a button input, `true` while the line is low (button held down)
pub trait ButtonInput {
    fn is_low(&mut self) -> io::Result<bool>;
}

pub struct Button<I: ButtonInput> {
    input: I,
    low: bool,
}

impl<I: ButtonInput> Button<I> {
    pub fn new(input: I) -> Self {
        Self { input, low: false }
    }

    /// Samples the input, `true` exactly once per press
    pub fn pressed(&mut self) -> Result<bool, CommandError> {
        let low = self.input.is_low().map_err(|e| {
            log::error!("could not read button: {}", e);
            CommandError::InputRead(e.kind())
        })?;
        let pressed = low && !self.low;
        self.low = low;
        Ok(pressed)
    }
}

/// `{"Name":"<name>","Evalue":"<value>"}`
pub fn event_json(name: &str, value: &str) -> String {
    format!(
        r#"{{"Name":{},"Evalue":{}}}"#,
        Value::from(name),
        Value::from(value)
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Up,
    Down,
}

impl Orientation {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Orientation::Up => "Up",
            Orientation::Down => "Down",
        }
    }

    fn toggled(self) -> Orientation {
        match self {
            Orientation::Up => Orientation::Down,
            Orientation::Down => Orientation::Up,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonEvent {
    Press,
    Orientation(Orientation),
}

impl ButtonEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            ButtonEvent::Press => "ButtonPress",
            ButtonEvent::Orientation(_) => "Orientation",
        }
    }

    pub const fn value(&self) -> &'static str {
        match self {
            ButtonEvent::Press => "True",
            ButtonEvent::Orientation(o) => o.as_str(),
        }
    }
}

/// Button A (press event) and button B (orientation toggle)
pub struct EventButtons<A: ButtonInput, B: ButtonInput> {
    press: Button<A>,
    orientation_button: Button<B>,
    orientation: Orientation,
}

impl<A: ButtonInput, B: ButtonInput> EventButtons<A, B> {
    pub fn new(press: A, orientation: B) -> Self {
        Self {
            press: Button::new(press),
            orientation_button: Button::new(orientation),
            orientation: Orientation::Down,
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Samples both buttons and sends an event for each press. Returns the events raised.
    pub fn poll<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<Vec<ButtonEvent>, CommandError> {
        let mut events = Vec::new();
        if self.press.pressed()? {
            send(transport, ButtonEvent::Press);
            events.push(ButtonEvent::Press);
        }
        if self.orientation_button.pressed()? {
            self.orientation = self.orientation.toggled();
            let event = ButtonEvent::Orientation(self.orientation);
            send(transport, event);
            events.push(event);
        }
        Ok(events)
    }
}

fn send<T: Transport + ?Sized>(transport: &mut T, event: ButtonEvent) {
    let payload = event_json(event.name(), event.value());
    if let Err(e) = transport.send_event(&payload) {
        log::warn!("failed to hand over {} to the transport: {}", payload, e);
    }
}

/// Button writing [`UART_GREETING`] to the mesh coordinator
pub struct UartButton<I: ButtonInput> {
    button: Button<I>,
}

impl<I: ButtonInput> UartButton<I> {
    pub fn new(input: I) -> Self {
        Self {
            button: Button::new(input),
        }
    }

    /// Returns `true` if a press was seen and the greeting written
    pub fn poll<W: io::Write + ?Sized>(&mut self, uart: &mut W) -> Result<bool, CommandError> {
        if !self.button.pressed()? {
            return Ok(false);
        }
        write_command(uart, UART_GREETING)?;
        Ok(true)
    }
}
