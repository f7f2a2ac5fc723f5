// src/simulator/mod.rs - Simulated room for running the controller on a host
//!
//! A first-order thermal model: the room drifts toward the ambient
//! temperature and the motor (a fan) removes heat in proportion to its duty.
//! The plant integrates lazily on every temperature read using the elapsed
//! time of its own clock handle, so it runs equally well against a
//! [`StdClock`](crate::scheduler::StdClock) or a shared
//! [`ManualClock`](crate::scheduler::ManualClock).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{Config, SimulationConfig};
use crate::hardware::{ActuatorSink, Channel, HardwareError, SensorSource};
use crate::scheduler::{Clock, elapsed_ms};
use crate::sensor::Sampler;

pub struct SimulatedPlant<C: Clock> {
    params: SimulationConfig,
    sensor: Sampler,
    adc_max: u16,
    clock: C,
    rng: StdRng,
    temperature_c: f32,
    duty: u8,
    indicator: bool,
    dial_raw: u16,
    last_update_ms: u32,
}

impl<C: Clock> SimulatedPlant<C> {
    pub fn new(config: &Config, clock: C) -> Self {
        let params = config.simulation.clone();
        let last_update_ms = clock.now_millis();
        tracing::info!(
            "Simulated plant: start {:.1}C, ambient {:.1}C, dial raw {}",
            params.initial_c,
            params.ambient_c,
            params.dial_raw
        );
        Self {
            temperature_c: params.initial_c,
            dial_raw: params.dial_raw,
            rng: StdRng::seed_from_u64(params.seed),
            sensor: Sampler::new(config.sensor.clone()),
            adc_max: config.sensor.adc_max(),
            params,
            clock,
            duty: 0,
            indicator: false,
            last_update_ms,
        }
    }

    /// True room temperature, without sensor noise or quantisation.
    pub fn temperature_c(&self) -> f32 {
        self.temperature_c
    }

    pub fn set_temperature_c(&mut self, temp_c: f32) {
        self.temperature_c = temp_c;
    }

    pub fn duty(&self) -> u8 {
        self.duty
    }

    pub fn indicator(&self) -> bool {
        self.indicator
    }

    pub fn set_dial_raw(&mut self, raw: u16) {
        self.dial_raw = raw;
    }

    fn advance(&mut self) {
        let now = self.clock.now_millis();
        let dt = elapsed_ms(now, self.last_update_ms) as f32 / 1000.0;
        self.last_update_ms = now;
        if dt == 0.0 {
            return;
        }
        let drift = self.params.heat_gain * (self.params.ambient_c - self.temperature_c);
        let cooling = self.params.cooling_per_duty * self.duty as f32 / 255.0;
        self.temperature_c += (drift - cooling) * dt;
    }

    fn temperature_raw(&mut self) -> u16 {
        let ideal = self.sensor.celsius_to_raw(self.temperature_c).round() as i32;
        let amplitude = self.params.noise_raw as i32;
        let noise = if amplitude > 0 {
            self.rng.random_range(-amplitude..=amplitude)
        } else {
            0
        };
        (ideal + noise).clamp(0, self.adc_max as i32) as u16
    }
}

impl<C: Clock> SensorSource for SimulatedPlant<C> {
    fn read_raw(&mut self, channel: Channel) -> Result<u16, HardwareError> {
        match channel {
            Channel::Temperature => {
                self.advance();
                Ok(self.temperature_raw())
            }
            Channel::SetpointDial => Ok(self.dial_raw),
        }
    }
}

impl<C: Clock> ActuatorSink for SimulatedPlant<C> {
    fn set_motor_duty(&mut self, duty: u8) -> Result<(), HardwareError> {
        // Settle the physics under the previous duty before switching.
        self.advance();
        self.duty = duty;
        Ok(())
    }

    fn set_indicator(&mut self, on: bool) -> Result<(), HardwareError> {
        self.indicator = on;
        Ok(())
    }
}
