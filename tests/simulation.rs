// Closed-loop runs of the controller against the simulated room

use std::time::Duration;

use thermo_actuator::{
    Clock, Config, ControlLoop, CycleOutcome, CycleReport, ManualClock, MemorySink, SimulatedPlant, StdClock,
};

fn fast_run(config: &Config, cycles: usize) -> (Vec<CycleReport>, MemorySink, f32) {
    let clock = ManualClock::new(0);
    let plant = SimulatedPlant::new(config, clock.clone());
    let mut ctl = ControlLoop::new(config, plant, clock.clone(), MemorySink::new()).unwrap();
    ctl.startup().unwrap();
    let mut reports = Vec::with_capacity(cycles);
    for _ in 0..cycles {
        clock.advance(config.cycle.period_ms);
        if let CycleOutcome::Applied(report) = ctl.run_cycle() {
            reports.push(report);
        }
    }
    let temp = ctl.hardware().temperature_c();
    (reports, ctl.diagnostics().sink().clone(), temp)
}

#[test]
fn test_regulates_around_setpoint() {
    let mut config = Config::default();
    config.simulation.noise_raw = 0;
    // Five simulated minutes.
    let (reports, sink, _) = fast_run(&config, 3000);

    assert_eq!(reports.len(), 3000);
    assert!(sink.count("CHANGE - MOTOR ON") >= 2);
    assert!(sink.count("CHANGE - MOTOR OFF") >= 2);
    // Once the loop has settled the room stays close to the 25 C setpoint.
    for report in &reports[600..] {
        assert!((22.0..=28.0).contains(&report.temp_c), "cycle {} at {:.2} C", report.cycle, report.temp_c);
    }
}

#[test]
fn test_motor_transitions_respect_hold_time() {
    let mut config = Config::default();
    config.simulation.noise_raw = 0;
    let (reports, _, _) = fast_run(&config, 3000);

    let mut last_switch: Option<u32> = None;
    let mut prev_on = false;
    for report in &reports {
        let on = report.command.duty > 0;
        if on != prev_on {
            if let Some(at) = last_switch {
                assert!(report.at_ms - at >= config.motor.hold_ms);
            }
            last_switch = Some(report.at_ms);
            prev_on = on;
        }
    }
    assert!(last_switch.is_some());
}

#[test]
fn test_seeded_noise_is_reproducible() {
    let mut config = Config::default();
    config.simulation.noise_raw = 2;
    config.simulation.seed = 7;
    let (a, _, temp_a) = fast_run(&config, 500);
    let (b, _, temp_b) = fast_run(&config, 500);
    assert_eq!(a, b);
    assert_eq!(temp_a, temp_b);
}

#[test]
fn test_hot_room_runs_at_high_speed() {
    let mut config = Config::default();
    config.simulation.noise_raw = 0;
    config.simulation.initial_c = 40.0;
    config.simulation.ambient_c = 45.0;
    let (reports, sink, _) = fast_run(&config, 100);
    assert!(sink.contains("CHANGE - MOTOR PWM FROM 0 TO 250"));
    assert!(reports.iter().any(|r| r.command.duty == 250));
}

#[tokio::test]
async fn test_realtime_loop_with_std_clock() {
    let mut config = Config::default();
    config.simulation.noise_raw = 0;
    let clock = StdClock::new();
    let plant = SimulatedPlant::new(&config, clock);
    let mut ctl = ControlLoop::new(&config, plant, clock, MemorySink::new()).unwrap();
    ctl.startup().unwrap();

    let mut last_at = None;
    let ran = ctl
        .run_periodic(Duration::from_millis(2), Some(5), std::future::pending::<()>(), |ctl, outcome| {
            let report = outcome.report().expect("simulated plant stays in range");
            assert_eq!(report.command.indicator, ctl.hardware().indicator());
            assert_eq!(report.command.duty, ctl.hardware().duty());
            last_at = Some(report.at_ms);
        })
        .await;

    assert_eq!(ran, 5);
    assert!(last_at.unwrap() <= ctl.clock().now_millis());
}
