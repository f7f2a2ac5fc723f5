// src/control/hysteresis.rs - Hold-time gated two-speed motor controller
//!
//! The motor turns ON only after the temperature has stayed above the setpoint
//! for a full hold window, and OFF only after it has stayed below for a full
//! window. Any cycle that breaks the condition restarts its window. While ON,
//! the speed tier follows the temperature immediately: `pwm_high` at or above
//! `setpoint * (1 + max_over_ratio)`, `pwm_low` otherwise.

use serde::Serialize;

use crate::config::MotorConfig;
use crate::diagnostics::{DiagnosticSink, Diagnostics, LogLevel};
use crate::scheduler::elapsed_ms;

/// A continuous-condition window, inactive or started at a millisecond timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoldTimer {
    since: Option<u32>,
}

impl HoldTimer {
    /// Start the window unless it is already running.
    pub fn arm(&mut self, now: u32) {
        if self.since.is_none() {
            self.since = Some(now);
        }
    }

    pub fn reset(&mut self) {
        self.since = None;
    }

    pub fn is_active(&self) -> bool {
        self.since.is_some()
    }

    pub fn since(&self) -> Option<u32> {
        self.since
    }

    pub fn elapsed(&self, now: u32) -> Option<u32> {
        self.since.map(|since| elapsed_ms(now, since))
    }

    pub fn has_held(&self, now: u32, hold_ms: u32) -> bool {
        self.elapsed(now).is_some_and(|elapsed| elapsed >= hold_ms)
    }
}

/// What an observer sees of the motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MotorState {
    Off,
    OnLow,
    OnHigh,
}

/// Outputs to assert on the board every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MotorCommand {
    pub duty: u8,
    pub indicator: bool,
}

impl MotorCommand {
    pub const OFF: MotorCommand = MotorCommand { duty: 0, indicator: false };

    pub fn from_duty(duty: u8) -> Self {
        Self { duty, indicator: duty > 0 }
    }
}

/// Memory carried between cycles.
///
/// `current_pwm` is 0 whenever `motor_on` is false.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerState {
    pub motor_on: bool,
    pub current_pwm: u8,
    pub over: HoldTimer,
    pub under: HoldTimer,
}

#[derive(Debug, Clone)]
pub struct HysteresisController {
    config: MotorConfig,
    state: ControllerState,
}

impl HysteresisController {
    pub fn new(config: MotorConfig) -> Self {
        Self {
            config,
            state: ControllerState::default(),
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn motor_state(&self) -> MotorState {
        if !self.state.motor_on || self.state.current_pwm == 0 {
            MotorState::Off
        } else if self.state.current_pwm == self.config.pwm_high && self.config.pwm_high != self.config.pwm_low {
            MotorState::OnHigh
        } else {
            MotorState::OnLow
        }
    }

    /// Temperature at which the motor switches to `pwm_high`.
    pub fn high_threshold(&self, set_c: f32) -> f32 {
        set_c * (1.0 + self.config.max_over_ratio)
    }

    /// Duty the motor should run at given the current run state.
    pub fn target_pwm(&self, temp_c: f32, set_c: f32) -> u8 {
        if !self.state.motor_on {
            return 0;
        }
        if temp_c >= self.high_threshold(set_c) {
            self.config.pwm_high
        } else {
            self.config.pwm_low
        }
    }

    /// Advance the state machine by one cycle. Inputs must already have
    /// passed the range guard.
    pub fn update<S: DiagnosticSink>(
        &mut self,
        temp_c: f32,
        set_c: f32,
        now: u32,
        diag: &mut Diagnostics<S>,
    ) -> MotorCommand {
        let hold_ms = self.config.hold_ms;

        if temp_c > set_c {
            self.state.over.arm(now);
            if !self.state.motor_on && self.state.over.has_held(now, hold_ms) {
                self.state.motor_on = true;
                diag.message(LogLevel::Info, "CHANGE - MOTOR ON");
            }
        } else {
            self.state.over.reset();
        }

        if temp_c < set_c {
            self.state.under.arm(now);
            if self.state.motor_on && self.state.under.has_held(now, hold_ms) {
                self.state.motor_on = false;
                diag.message(LogLevel::Info, "CHANGE - MOTOR OFF");
            }
        } else {
            self.state.under.reset();
        }

        let target = self.target_pwm(temp_c, set_c);
        if target != self.state.current_pwm {
            let from = self.state.current_pwm;
            diag.message_with(LogLevel::Info, || format!("CHANGE - MOTOR PWM FROM {} TO {}", from, target));
            self.state.current_pwm = target;
        }

        MotorCommand::from_duty(self.state.current_pwm)
    }
}
