// src/setpoint.rs - Setpoint dial tracking
use crate::config::SetpointConfig;
use crate::diagnostics::{DiagnosticSink, Diagnostics, LogLevel};
use crate::hardware::{Channel, HardwareError, SensorSource};

/// Integer linear re-mapping with truncating division (Arduino `map()`).
pub fn map_range(x: i64, in_min: i64, in_max: i64, out_min: i64, out_max: i64) -> i64 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Maps the dial onto `[pot_min, pot_max]` °C and reports net changes.
#[derive(Debug, Clone)]
pub struct SetpointTracker {
    pot_min: i32,
    pot_max: i32,
    dial_max: u16,
    /// Last accepted mapped setpoint; `None` until the first read.
    last: Option<i32>,
}

impl SetpointTracker {
    pub fn new(config: &SetpointConfig) -> Self {
        Self {
            pot_min: config.pot_min,
            pot_max: config.pot_max,
            dial_max: config.dial_max,
            last: None,
        }
    }

    pub fn map_raw(&self, raw: u16) -> i32 {
        map_range(
            raw as i64,
            0,
            self.dial_max as i64,
            self.pot_min as i64,
            self.pot_max as i64,
        ) as i32
    }

    /// Map one raw dial value and update the history.
    ///
    /// The first call seeds the history silently. Afterwards only a change of
    /// the mapped value is reported; raw jitter that maps to the same degree is not.
    pub fn track<S: DiagnosticSink>(&mut self, raw: u16, diag: &mut Diagnostics<S>) -> f32 {
        let set_c = self.map_raw(raw);
        match self.last {
            None => self.last = Some(set_c),
            Some(prev) if prev != set_c => {
                diag.message_with(LogLevel::Info, || {
                    format!("CHANGE - SETPOINT - FROM {} C TO {} C", prev, set_c)
                });
                self.last = Some(set_c);
            }
            Some(_) => {}
        }
        set_c as f32
    }

    pub fn read_setpoint<H, S>(&mut self, source: &mut H, diag: &mut Diagnostics<S>) -> Result<f32, HardwareError>
    where
        H: SensorSource + ?Sized,
        S: DiagnosticSink,
    {
        let raw = source.read_raw(Channel::SetpointDial)?;
        Ok(self.track(raw, diag))
    }

    pub fn last(&self) -> Option<i32> {
        self.last
    }
}
