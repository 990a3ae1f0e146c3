use defmt::Formatter;

use crate::decoder::{DecoderStats, Frame};
use crate::dispatch::{NodeClass, Route, TelemetryPoint};

impl defmt::Format for NodeClass {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(fmt, "NodeClass::{=u8}", *self as u8 - b'0')
    }
}

impl defmt::Format for TelemetryPoint {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(fmt, "{=str}", self.name())
    }
}

impl defmt::Format for Route {
    fn format(&self, fmt: Formatter<'_>) {
        match self {
            Route::DoorState => defmt::write!(fmt, "Route::DoorState"),
            Route::DoorBattery => defmt::write!(fmt, "Route::DoorBattery"),
            Route::DoorSuppressed => defmt::write!(fmt, "Route::DoorSuppressed"),
            Route::Climate(class) => defmt::write!(fmt, "Route::Climate({})", class),
            Route::Battery(class) => defmt::write!(fmt, "Route::Battery({})", class),
            Route::TrackerPresence => defmt::write!(fmt, "Route::TrackerPresence"),
            Route::Unrouted => defmt::write!(fmt, "Route::Unrouted"),
        }
    }
}

impl defmt::Format for DecoderStats {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(
            fmt,
            "DecoderStats {{ completed: {=u32}, dropped: {=u32}, stray_closes: {=u32} }}",
            self.completed,
            self.dropped,
            self.stray_closes
        )
    }
}

impl<const MSGL: usize> defmt::Format for Frame<MSGL> {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(fmt, "Frame {{ raw: {=str} }}", self.raw_str())
    }
}
