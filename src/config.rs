//! # Controller Configuration
//!
//! Every tunable of the thermal actuator lives here: sensor calibration, the
//! setpoint dial range, safety bounds, motor hysteresis, logging and the
//! simulated plant used by the host binary.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [setpoint]
//! pot_min = 18
//! pot_max = 30
//!
//! [motor]
//! hold_ms = 3000
//! pwm_low = 120
//!
//! [logging]
//! enabled = false
//! ```
//!
//! Missing sections and fields fall back to the defaults of the reference
//! hardware (TMP36 on a 10-bit, 5 V ADC, 15..35 °C dial, 2 s hold).

// src/config.rs - Single configuration file
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostics::LogLevel;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct for the sensor, dial, safety limits, motor and logging.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub setpoint: SetpointConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub motor: MotorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Analog temperature sensor calibration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SensorConfig {
    #[serde(default = "default_v_ref")]
    pub v_ref: f32,
    #[serde(default = "default_adc_bits")]
    pub adc_bits: u8,
    /// Sensor output at 0 °C, in volts.
    #[serde(default = "default_offset_v")]
    pub offset_v: f32,
    /// Degrees Celsius per volt.
    #[serde(default = "default_scale")]
    pub scale: f32,
}

impl SensorConfig {
    /// Number of ADC steps, `2^bits - 1`.
    pub fn adc_steps(&self) -> f32 {
        self.adc_max() as f32
    }

    /// Largest raw value the ADC can report.
    pub fn adc_max(&self) -> u16 {
        ((1u32 << self.adc_bits.min(16)) - 1) as u16
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            v_ref: default_v_ref(),
            adc_bits: default_adc_bits(),
            offset_v: default_offset_v(),
            scale: default_scale(),
        }
    }
}

/// Setpoint dial range.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SetpointConfig {
    #[serde(default = "default_pot_min")]
    pub pot_min: i32,
    #[serde(default = "default_pot_max")]
    pub pot_max: i32,
    #[serde(default = "default_dial_max")]
    pub dial_max: u16,
}

impl Default for SetpointConfig {
    fn default() -> Self {
        Self {
            pot_min: default_pot_min(),
            pot_max: default_pot_max(),
            dial_max: default_dial_max(),
        }
    }
}

/// Bounds a measured temperature must fall within before it reaches the controller.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SafetyConfig {
    #[serde(default = "default_min_safe")]
    pub min_safe: f32,
    #[serde(default = "default_max_safe")]
    pub max_safe: f32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            min_safe: default_min_safe(),
            max_safe: default_max_safe(),
        }
    }
}

/// Two-speed motor hysteresis.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MotorConfig {
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u32,
    #[serde(default = "default_pwm_low")]
    pub pwm_low: u8,
    #[serde(default = "default_pwm_high")]
    pub pwm_high: u8,
    /// Fraction above the setpoint at which the motor goes to `pwm_high`.
    #[serde(default = "default_max_over_ratio")]
    pub max_over_ratio: f32,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            hold_ms: default_hold_ms(),
            pwm_low: default_pwm_low(),
            pwm_high: default_pwm_high(),
            max_over_ratio: default_max_over_ratio(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CycleConfig {
    #[serde(default = "default_period_ms")]
    pub period_ms: u32,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
        }
    }
}

/// Parameters of the simulated room driven by the host binary.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationConfig {
    #[serde(default = "default_ambient_c")]
    pub ambient_c: f32,
    #[serde(default = "default_initial_c")]
    pub initial_c: f32,
    /// Rate (1/s) at which the room drifts toward ambient.
    #[serde(default = "default_heat_gain")]
    pub heat_gain: f32,
    /// Cooling at full duty, in °C/s.
    #[serde(default = "default_cooling_per_duty")]
    pub cooling_per_duty: f32,
    /// Maximum ADC noise, in raw counts either side of the true reading.
    #[serde(default = "default_noise_raw")]
    pub noise_raw: u16,
    #[serde(default = "default_dial_raw")]
    pub dial_raw: u16,
    #[serde(default)]
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ambient_c: default_ambient_c(),
            initial_c: default_initial_c(),
            heat_gain: default_heat_gain(),
            cooling_per_duty: default_cooling_per_duty(),
            noise_raw: default_noise_raw(),
            dial_raw: default_dial_raw(),
            seed: 0,
        }
    }
}

impl Config {
    /// Reject combinations the controller cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensor.adc_bits == 0 || self.sensor.adc_bits > 16 {
            return Err(ConfigError::Invalid(format!(
                "sensor.adc_bits must be between 1 and 16, got {}",
                self.sensor.adc_bits
            )));
        }
        if self.setpoint.pot_min >= self.setpoint.pot_max {
            return Err(ConfigError::Invalid(format!(
                "setpoint.pot_min ({}) must be below setpoint.pot_max ({})",
                self.setpoint.pot_min, self.setpoint.pot_max
            )));
        }
        if self.setpoint.dial_max == 0 {
            return Err(ConfigError::Invalid("setpoint.dial_max must be > 0".to_string()));
        }
        if self.safety.min_safe >= self.safety.max_safe {
            return Err(ConfigError::Invalid(format!(
                "safety.min_safe ({}) must be below safety.max_safe ({})",
                self.safety.min_safe, self.safety.max_safe
            )));
        }
        if self.motor.pwm_low == 0 {
            return Err(ConfigError::Invalid("motor.pwm_low must be > 0".to_string()));
        }
        if self.motor.pwm_low > self.motor.pwm_high {
            return Err(ConfigError::Invalid(format!(
                "motor.pwm_low ({}) must not exceed motor.pwm_high ({})",
                self.motor.pwm_low, self.motor.pwm_high
            )));
        }
        if self.motor.max_over_ratio.is_nan() || self.motor.max_over_ratio < 0.0 {
            return Err(ConfigError::Invalid("motor.max_over_ratio must be >= 0".to_string()));
        }
        if self.cycle.period_ms == 0 || self.cycle.period_ms >= self.motor.hold_ms {
            return Err(ConfigError::Invalid(format!(
                "cycle.period_ms ({}) must be > 0 and below motor.hold_ms ({})",
                self.cycle.period_ms, self.motor.hold_ms
            )));
        }
        Ok(())
    }
}

// Default value functions
fn default_v_ref() -> f32 { 5.0 }
fn default_adc_bits() -> u8 { 10 }
fn default_offset_v() -> f32 { 0.5 }
fn default_scale() -> f32 { 100.0 }
fn default_pot_min() -> i32 { 15 }
fn default_pot_max() -> i32 { 35 }
fn default_dial_max() -> u16 { 1023 }
fn default_min_safe() -> f32 { 0.0 }
fn default_max_safe() -> f32 { 50.0 }
fn default_hold_ms() -> u32 { 2000 }
fn default_pwm_low() -> u8 { 100 }
fn default_pwm_high() -> u8 { 250 }
fn default_max_over_ratio() -> f32 { 0.15 }
fn default_logging_enabled() -> bool { true }
fn default_log_level() -> LogLevel { LogLevel::Debug }
fn default_period_ms() -> u32 { 100 }
fn default_ambient_c() -> f32 { 32.0 }
fn default_initial_c() -> f32 { 24.0 }
fn default_heat_gain() -> f32 { 0.05 }
fn default_cooling_per_duty() -> f32 { 1.2 }
fn default_noise_raw() -> u16 { 2 }
fn default_dial_raw() -> u16 { 512 }

/// Load and validate configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            return Err(ConfigError::Io(e));
        }
    };
    let config: Config = match toml::from_str(&contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to parse config TOML: {}", e);
            return Err(ConfigError::Toml(e));
        }
    };
    config.validate()?;
    Ok(config)
}
