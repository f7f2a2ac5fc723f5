// src/hardware/mod.rs
// Trait-based interfaces between the control core and the board: analog
// inputs on one side, the motor PWM and status indicator on the other.
pub mod mock;

pub use mock::MockHardware;

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("ADC read failed on {0} channel")]
    Read(Channel),
    #[error("Output write failed: {0}")]
    Write(String),
}

/// Analog input channels the controller samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Channel {
    Temperature,
    SetpointDial,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Temperature => f.write_str("temperature"),
            Channel::SetpointDial => f.write_str("setpoint dial"),
        }
    }
}

/// Synchronous, non-blocking raw ADC reads.
pub trait SensorSource: Send {
    fn read_raw(&mut self, channel: Channel) -> Result<u16, HardwareError>;
}

/// Motor duty cycle (0..=255) and the status indicator.
pub trait ActuatorSink: Send {
    fn set_motor_duty(&mut self, duty: u8) -> Result<(), HardwareError>;
    fn set_indicator(&mut self, on: bool) -> Result<(), HardwareError>;
}
