// src/hardware/mock.rs - Scripted board for tests and benchmarks
use std::collections::VecDeque;

use super::{ActuatorSink, Channel, HardwareError, SensorSource};

/// Board double: serves queued raw readings per channel (falling back to a
/// steady value once a queue runs dry) and records every output write.
#[derive(Debug, Clone, Default)]
pub struct MockHardware {
    temperature_queue: VecDeque<u16>,
    dial_queue: VecDeque<u16>,
    pub steady_temperature: u16,
    pub steady_dial: u16,
    pub fail_reads: Option<Channel>,
    pub fail_writes: bool,
    pub duty_writes: Vec<u8>,
    pub indicator_writes: Vec<bool>,
    pub reads: usize,
}

impl MockHardware {
    pub fn new(steady_temperature: u16, steady_dial: u16) -> Self {
        Self {
            steady_temperature,
            steady_dial,
            ..Self::default()
        }
    }

    pub fn queue_temperature<I: IntoIterator<Item = u16>>(&mut self, raws: I) {
        self.temperature_queue.extend(raws);
    }

    pub fn queue_dial<I: IntoIterator<Item = u16>>(&mut self, raws: I) {
        self.dial_queue.extend(raws);
    }

    pub fn last_duty(&self) -> Option<u8> {
        self.duty_writes.last().copied()
    }

    pub fn last_indicator(&self) -> Option<bool> {
        self.indicator_writes.last().copied()
    }
}

impl SensorSource for MockHardware {
    fn read_raw(&mut self, channel: Channel) -> Result<u16, HardwareError> {
        if self.fail_reads == Some(channel) {
            return Err(HardwareError::Read(channel));
        }
        self.reads += 1;
        let raw = match channel {
            Channel::Temperature => self.temperature_queue.pop_front().unwrap_or(self.steady_temperature),
            Channel::SetpointDial => self.dial_queue.pop_front().unwrap_or(self.steady_dial),
        };
        Ok(raw)
    }
}

impl ActuatorSink for MockHardware {
    fn set_motor_duty(&mut self, duty: u8) -> Result<(), HardwareError> {
        if self.fail_writes {
            return Err(HardwareError::Write(format!("motor duty {}", duty)));
        }
        self.duty_writes.push(duty);
        Ok(())
    }

    fn set_indicator(&mut self, on: bool) -> Result<(), HardwareError> {
        if self.fail_writes {
            return Err(HardwareError::Write("indicator".to_string()));
        }
        self.indicator_writes.push(on);
        Ok(())
    }
}
