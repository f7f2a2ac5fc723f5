// src/control/mod.rs - One control cycle: sample, setpoint, validate, control, drive
pub mod hysteresis;

pub use hysteresis::{ControllerState, HoldTimer, HysteresisController, MotorCommand, MotorState};

use serde::Serialize;
use std::future::Future;
use std::time::Duration;

use crate::config::{Config, ConfigError};
use crate::diagnostics::{DiagnosticSink, Diagnostics, LogLevel};
use crate::hardware::{ActuatorSink, HardwareError, SensorSource};
use crate::safety::{RangeGuard, RangeViolation};
use crate::scheduler::Clock;
use crate::sensor::Sampler;
use crate::setpoint::SetpointTracker;

/// Snapshot of a cycle that reached the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub at_ms: u32,
    pub temp_c: f32,
    pub setpoint_c: f32,
    pub command: MotorCommand,
    pub state: MotorState,
}

#[derive(Debug)]
pub enum CycleOutcome {
    Applied(CycleReport),
    /// Range guard refused the inputs; controller state untouched.
    Rejected(RangeViolation),
    Fault(HardwareError),
}

impl CycleOutcome {
    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            CycleOutcome::Applied(report) => Some(report),
            _ => None,
        }
    }
}

/// One line of a JSONL cycle trace.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleRecord {
    Applied(CycleReport),
    Rejected { cycle: u64, reason: String },
    Fault { cycle: u64, error: String },
}

impl CycleRecord {
    pub fn from_outcome(cycle: u64, outcome: &CycleOutcome) -> Self {
        match outcome {
            CycleOutcome::Applied(report) => CycleRecord::Applied(report.clone()),
            CycleOutcome::Rejected(violation) => CycleRecord::Rejected {
                cycle,
                reason: violation.to_string(),
            },
            CycleOutcome::Fault(error) => CycleRecord::Fault {
                cycle,
                error: error.to_string(),
            },
        }
    }
}

/// Owns the board, the clock and every piece of state carried between cycles.
///
/// ControlLoop is single-owner: cycles are run through `&mut self` and never
/// overlap.
pub struct ControlLoop<H, C, S>
where
    H: SensorSource + ActuatorSink,
    C: Clock,
    S: DiagnosticSink,
{
    hardware: H,
    clock: C,
    diagnostics: Diagnostics<S>,
    sampler: Sampler,
    tracker: SetpointTracker,
    guard: RangeGuard,
    controller: HysteresisController,
    cycles: u64,
}

impl<H, C, S> ControlLoop<H, C, S>
where
    H: SensorSource + ActuatorSink,
    C: Clock,
    S: DiagnosticSink,
{
    /// Build a loop from a validated copy of `config`.
    pub fn new(config: &Config, hardware: H, clock: C, sink: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            hardware,
            clock,
            diagnostics: Diagnostics::new(&config.logging, sink),
            sampler: Sampler::new(config.sensor.clone()),
            tracker: SetpointTracker::new(&config.setpoint),
            guard: RangeGuard::new(&config.safety, &config.setpoint),
            controller: HysteresisController::new(config.motor.clone()),
            cycles: 0,
        })
    }

    /// Seed the setpoint history, report the initial setpoint and force the outputs off.
    pub fn startup(&mut self) -> Result<f32, HardwareError> {
        self.diagnostics.set_now(self.clock.now_millis());
        let set_c = match self.tracker.read_setpoint(&mut self.hardware, &mut self.diagnostics) {
            Ok(set_c) => set_c,
            Err(e) => {
                self.report_fault(&e);
                return Err(e);
            }
        };
        self.diagnostics.value(LogLevel::Info, "SETPOINT", set_c);
        if let Err(e) = self.drive(MotorCommand::OFF) {
            self.report_fault(&e);
            return Err(e);
        }
        Ok(set_c)
    }

    pub fn run_cycle(&mut self) -> CycleOutcome {
        self.cycles += 1;
        let now = self.clock.now_millis();
        self.diagnostics.set_now(now);

        let temp_c = match self.sampler.sample(&mut self.hardware) {
            Ok(temp_c) => temp_c,
            Err(e) => return self.fault(e),
        };
        let setpoint_c = match self.tracker.read_setpoint(&mut self.hardware, &mut self.diagnostics) {
            Ok(set_c) => set_c,
            Err(e) => return self.fault(e),
        };

        if let Err(violation) = self.guard.screen(temp_c, setpoint_c, &mut self.diagnostics) {
            return CycleOutcome::Rejected(violation);
        }
        self.diagnostics.value(LogLevel::Debug, "TempC", temp_c);
        self.diagnostics.value(LogLevel::Debug, "SetC", setpoint_c);

        let command = self.controller.update(temp_c, setpoint_c, now, &mut self.diagnostics);
        if let Err(e) = self.drive(command) {
            return self.fault(e);
        }

        CycleOutcome::Applied(CycleReport {
            cycle: self.cycles,
            at_ms: now,
            temp_c,
            setpoint_c,
            command,
            state: self.controller.motor_state(),
        })
    }

    /// Run cycles on a fixed period until `shutdown` resolves or `max_cycles`
    /// have run. `observe` sees every outcome. Returns the number of cycles run.
    pub async fn run_periodic<F, O>(
        &mut self,
        period: Duration,
        max_cycles: Option<u64>,
        shutdown: F,
        mut observe: O,
    ) -> u64
    where
        F: Future<Output = ()>,
        O: FnMut(&Self, &CycleOutcome),
    {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        let mut ran = 0u64;
        tracing::info!("Control loop started, period {:?}", period);
        loop {
            if max_cycles.is_some_and(|max| ran >= max) {
                tracing::info!("Cycle limit reached after {} cycles", ran);
                break;
            }
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested after {} cycles", ran);
                    break;
                }
                _ = interval.tick() => {
                    let outcome = self.run_cycle();
                    observe(self, &outcome);
                    ran += 1;
                }
            }
        }
        ran
    }

    /// Turn the motor and indicator off, e.g. before exiting.
    pub fn shutdown(&mut self) -> Result<(), HardwareError> {
        tracing::info!("Stopping motor");
        self.drive(MotorCommand::OFF)
    }

    fn drive(&mut self, command: MotorCommand) -> Result<(), HardwareError> {
        self.hardware.set_motor_duty(command.duty)?;
        self.hardware.set_indicator(command.indicator)?;
        Ok(())
    }

    fn fault(&mut self, error: HardwareError) -> CycleOutcome {
        self.report_fault(&error);
        CycleOutcome::Fault(error)
    }

    fn report_fault(&mut self, error: &HardwareError) {
        self.diagnostics
            .message_with(LogLevel::Error, || format!("HARDWARE FAULT: {}", error));
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn controller(&self) -> &HysteresisController {
        &self.controller
    }

    pub fn tracker(&self) -> &SetpointTracker {
        &self.tracker
    }

    pub fn diagnostics(&self) -> &Diagnostics<S> {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics<S> {
        &mut self.diagnostics
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::hardware::{Channel, MockHardware};
    use crate::scheduler::ManualClock;

    // Raw counts for the default TMP36 calibration: 153 ≈ 24.8 °C, 158 ≈ 27.2 °C.
    fn control_loop(temp_raw: u16) -> (ControlLoop<MockHardware, ManualClock, MemorySink>, ManualClock) {
        let clock = ManualClock::new(0);
        let ctl = ControlLoop::new(
            &Config::default(),
            MockHardware::new(temp_raw, 512),
            clock.clone(),
            MemorySink::new(),
        )
        .unwrap();
        (ctl, clock)
    }

    #[test]
    fn test_startup_seeds_setpoint_and_drives_off() {
        let (mut ctl, _) = control_loop(153);
        assert_eq!(ctl.startup().unwrap(), 25.0);
        assert_eq!(ctl.tracker().last(), Some(25));
        assert_eq!(ctl.hardware().last_duty(), Some(0));
        assert_eq!(ctl.hardware().last_indicator(), Some(false));
        assert_eq!(ctl.diagnostics().sink().at(LogLevel::Info), vec!["SETPOINT=25.00"]);
    }

    #[test]
    fn test_cycle_logs_readings_and_drives_outputs() {
        let (mut ctl, _) = control_loop(153);
        let outcome = ctl.run_cycle();
        let report = outcome.report().unwrap();
        assert_eq!(report.cycle, 1);
        assert_eq!(report.command, MotorCommand::OFF);
        assert_eq!(report.state, MotorState::Off);
        assert_eq!(ctl.hardware().duty_writes, vec![0]);
        assert_eq!(ctl.hardware().indicator_writes, vec![false]);
        let debug = ctl.diagnostics().sink().at(LogLevel::Debug);
        assert_eq!(debug, vec!["TempC=24.78", "SetC=25.00"]);
    }

    #[test]
    fn test_rejected_cycle_leaves_state_and_outputs_alone() {
        // 1023 raw is 450 °C, far outside the safe range.
        let (mut ctl, clock) = control_loop(1023);
        let before = ctl.controller().state().clone();
        for _ in 0..5 {
            clock.advance(1000);
            assert!(matches!(ctl.run_cycle(), CycleOutcome::Rejected(RangeViolation::TemperatureOutOfRange(_))));
        }
        assert_eq!(ctl.controller().state(), &before);
        assert!(ctl.hardware().duty_writes.is_empty());
        assert_eq!(ctl.diagnostics().sink().count("TEMP OUT OF SAFE RANGE=450.00"), 5);
    }

    #[test]
    fn test_rejected_cycle_skips_reading_lines() {
        let (mut ctl, _) = control_loop(1023);
        ctl.run_cycle();
        assert!(ctl.diagnostics().sink().at(LogLevel::Debug).is_empty());
        assert_eq!(ctl.diagnostics().sink().at(LogLevel::Error), vec!["TEMP OUT OF SAFE RANGE=450.00"]);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = Config::default();
        config.setpoint.dial_max = 0;
        let built = ControlLoop::new(&config, MockHardware::new(153, 512), ManualClock::new(0), MemorySink::new());
        assert!(matches!(built, Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.sensor.adc_bits = 40;
        let built = ControlLoop::new(&config, MockHardware::new(153, 512), ManualClock::new(0), MemorySink::new());
        assert!(built.is_err());
    }

    #[test]
    fn test_lines_stamped_with_loop_clock() {
        let (mut ctl, clock) = control_loop(153);
        clock.set(40);
        ctl.startup().unwrap();
        clock.advance(100);
        ctl.run_cycle();
        assert_eq!(
            ctl.diagnostics().sink().stamped,
            vec!["40 ms INFO: SETPOINT=25.00", "140 ms DEBUG: TempC=24.78", "140 ms DEBUG: SetC=25.00"]
        );
    }

    #[test]
    fn test_logging_toggled_mid_run() {
        let (mut ctl, _) = control_loop(153);
        ctl.diagnostics_mut().set_enabled(false);
        ctl.run_cycle();
        assert!(ctl.diagnostics().sink().lines.is_empty());
        ctl.diagnostics_mut().set_enabled(true);
        ctl.run_cycle();
        assert_eq!(ctl.diagnostics().sink().lines.len(), 2);
    }

    #[test]
    fn test_read_fault_skips_cycle() {
        let (mut ctl, _) = control_loop(153);
        ctl.hardware_mut().fail_reads = Some(Channel::Temperature);
        assert!(matches!(ctl.run_cycle(), CycleOutcome::Fault(HardwareError::Read(Channel::Temperature))));
        assert!(ctl.hardware().duty_writes.is_empty());
        assert!(ctl.diagnostics().sink().contains("HARDWARE FAULT: ADC read failed on temperature channel"));
    }

    #[test]
    fn test_write_fault_is_reported() {
        let (mut ctl, _) = control_loop(153);
        ctl.hardware_mut().fail_writes = true;
        assert!(matches!(ctl.run_cycle(), CycleOutcome::Fault(HardwareError::Write(_))));
        assert!(ctl.startup().is_err());
    }

    #[test]
    fn test_cycle_record_json() {
        let (mut ctl, _) = control_loop(1023);
        let outcome = ctl.run_cycle();
        let record = CycleRecord::from_outcome(ctl.cycles(), &outcome);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["outcome"], "rejected");
        assert_eq!(json["cycle"], 1);

        let (mut ctl, _) = control_loop(153);
        let outcome = ctl.run_cycle();
        let json = serde_json::to_value(CycleRecord::from_outcome(1, &outcome)).unwrap();
        assert_eq!(json["outcome"], "applied");
        assert_eq!(json["command"]["duty"], 0);
        assert_eq!(json["state"], "Off");
    }

    #[tokio::test]
    async fn test_run_periodic_stops_at_cycle_limit() {
        let (mut ctl, _) = control_loop(153);
        let mut seen = 0;
        let ran = ctl
            .run_periodic(Duration::from_millis(1), Some(4), std::future::pending::<()>(), |_, outcome| {
                assert!(outcome.report().is_some());
                seen += 1;
            })
            .await;
        assert_eq!(ran, 4);
        assert_eq!(seen, 4);
        assert_eq!(ctl.cycles(), 4);
    }

    #[tokio::test]
    async fn test_run_periodic_honours_shutdown() {
        let (mut ctl, _) = control_loop(153);
        let ran = ctl
            .run_periodic(Duration::from_millis(1), None, async {}, |_, _| {})
            .await;
        assert_eq!(ran, 0);
        ctl.shutdown().unwrap();
        assert_eq!(ctl.hardware().last_duty(), Some(0));
    }
}
