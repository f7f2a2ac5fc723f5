// src/lib.rs - Closed-loop thermal actuator controller
//
// Each control cycle samples the temperature sensor, reads the setpoint dial,
// validates both against the configured ranges and feeds them to a
// hold-time gated, two-speed hysteresis controller driving a PWM motor.
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod hardware;
pub mod safety;
pub mod scheduler;
pub mod sensor;
pub mod setpoint;
pub mod simulator;

pub use config::{Config, ConfigError, load_config};
pub use control::{ControlLoop, CycleOutcome, CycleRecord, CycleReport, HysteresisController, MotorCommand, MotorState};
pub use diagnostics::{DiagnosticSink, Diagnostics, LogLevel, MemorySink, TracingSink};
pub use hardware::{ActuatorSink, Channel, HardwareError, SensorSource};
pub use safety::{RangeGuard, RangeViolation};
pub use scheduler::{Clock, ManualClock, StdClock};
pub use sensor::{Sampler, median3};
pub use setpoint::SetpointTracker;
pub use simulator::SimulatedPlant;
