// src/sensor.rs - Noise-resistant temperature sampling
use crate::config::SensorConfig;
use crate::hardware::{Channel, HardwareError, SensorSource};

/// Median of three values.
///
/// A value is the median if it lies between the other two, inclusive, so
/// ties resolve to the first candidate that qualifies (a, then b, then c).
pub fn median3<T: PartialOrd + Copy>(a: T, b: T, c: T) -> T {
    if (a >= b && a <= c) || (a <= b && a >= c) {
        a
    } else if (b >= a && b <= c) || (b <= a && b >= c) {
        b
    } else {
        c
    }
}

/// Reads the temperature channel three times and converts the median to °C.
///
/// The median rejects a single-sample spike without the lag an averaging
/// filter would add.
#[derive(Debug, Clone)]
pub struct Sampler {
    calibration: SensorConfig,
}

impl Sampler {
    pub fn new(calibration: SensorConfig) -> Self {
        Self { calibration }
    }

    /// Linear transfer function: `((raw / steps) * v_ref - offset_v) * scale`.
    pub fn raw_to_celsius(&self, raw: u16) -> f32 {
        let cal = &self.calibration;
        let voltage = (raw as f32 / cal.adc_steps()) * cal.v_ref;
        (voltage - cal.offset_v) * cal.scale
    }

    /// Inverse of [`Sampler::raw_to_celsius`], unrounded and unclamped.
    pub fn celsius_to_raw(&self, temp_c: f32) -> f32 {
        let cal = &self.calibration;
        let voltage = temp_c / cal.scale + cal.offset_v;
        voltage / cal.v_ref * cal.adc_steps()
    }

    pub fn sample<S: SensorSource + ?Sized>(&self, source: &mut S) -> Result<f32, HardwareError> {
        let r1 = source.read_raw(Channel::Temperature)?;
        let r2 = source.read_raw(Channel::Temperature)?;
        let r3 = source.read_raw(Channel::Temperature)?;
        Ok(self.raw_to_celsius(median3(r1, r2, r3)))
    }
}
