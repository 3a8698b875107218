//! Potentiometer volume control with optional motor drive
//!
//! The wiper is oversampled and scaled straight to an attenuation value; a
//! new value is pushed only when it moves by more than the hysteresis. A
//! motorised pot is driven through two lines for a fixed pulse per
//! [`volume_up`](VolumeControl::volume_up) / [`volume_down`](VolumeControl::volume_down)
//! request and stopped from [`poll`](VolumeControl::poll).

use embassy_time::{Duration, Instant};
use embedded_hal::digital::OutputPin;
use platform::{AnalogInput, Clock, LogSink, OutputLine, RegisterBus, ANALOG_FULL_SCALE};
use sabre::DacDevice;

use crate::controller::{drive, Controller};
use crate::error::ControlError;

/// Where the volume control sends attenuation values.
pub trait AttenuationTarget {
    /// Supply on.
    fn power(&self) -> bool;

    /// Initialisation sequence completed.
    fn initialised(&self) -> bool;

    /// Apply `attenuation` (0 = loudest).
    fn set_attenuation(&mut self, attenuation: u8) -> Result<(), ControlError>;
}

impl<B, L, P, C, T, const N: usize> AttenuationTarget for Controller<B, L, P, C, T, N>
where
    B: RegisterBus,
    L: LogSink,
    P: OutputPin,
    C: Clock,
    T: DacDevice,
{
    fn power(&self) -> bool {
        Controller::power(self)
    }

    fn initialised(&self) -> bool {
        Controller::initialised(self)
    }

    fn set_attenuation(&mut self, attenuation: u8) -> Result<(), ControlError> {
        Controller::set_attenuation(self, attenuation)
    }
}

/// Wiper sampling and motor timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeConfig {
    /// Conversions summed per reading
    pub oversample: u8,
    /// Right shift applied to the sum
    pub shift: u32,
    /// A reading must move by more than this to be pushed
    pub hysteresis: u16,
    /// Motor run time per up/down request
    pub motor_pulse: Duration,
}

impl VolumeConfig {
    /// Twelve 10-bit conversions shifted by 7, giving attenuation 0–95.
    pub const fn new() -> Self {
        Self {
            oversample: 12,
            shift: 7,
            hysteresis: 1,
            motor_pulse: Duration::from_millis(120),
        }
    }
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Direction the motor turns the pot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorDirection {
    /// Louder
    Up,
    /// Quieter
    Down,
}

/// Volume pot reader and motor driver.
pub struct VolumeControl<A, P, C, L> {
    analog: A,
    motor_a: OutputLine<P>,
    motor_b: OutputLine<P>,
    clock: C,
    log: L,
    config: VolumeConfig,
    position: u16,
    motor_started: Option<Instant>,
}

impl<A, P, C, L> VolumeControl<A, P, C, L>
where
    A: AnalogInput,
    P: OutputPin,
    C: Clock,
    L: LogSink,
{
    /// Pot without a motor.
    pub fn new(analog: A, clock: C, log: L, config: VolumeConfig) -> Self {
        Self {
            analog,
            motor_a: OutputLine::absent(),
            motor_b: OutputLine::absent(),
            clock,
            log,
            config,
            position: 0,
            motor_started: None,
        }
    }

    /// Drive the pot motor through two lines, both starting low.
    #[must_use]
    pub fn with_motor(mut self, a: P, b: P) -> Self {
        self.motor_a = OutputLine::new(a);
        self.motor_b = OutputLine::new(b);
        self.stop_motor();
        self
    }

    /// Whether both motor lines are wired.
    pub fn motorised(&self) -> bool {
        self.motor_a.is_present() && self.motor_b.is_present()
    }

    /// Last attenuation pushed.
    pub fn position(&self) -> u16 {
        self.position
    }

    /// Direction of the running motor pulse, if any.
    pub fn motor(&self) -> Option<MotorDirection> {
        if self.motor_started.is_none() {
            return None;
        }
        match (self.motor_a.is_active(), self.motor_b.is_active()) {
            (false, true) => Some(MotorDirection::Up),
            (true, false) => Some(MotorDirection::Down),
            _ => None,
        }
    }

    /// Read the pot and push its value regardless of hysteresis.
    pub fn initialise<T: AttenuationTarget + ?Sized>(&mut self, target: &mut T) {
        self.track(target, true);
    }

    /// Stop a finished motor pulse and track the pot. Does nothing unless the
    /// target is powered and initialised.
    pub fn poll<T: AttenuationTarget + ?Sized>(&mut self, target: &mut T) {
        if !(target.power() && target.initialised()) {
            return;
        }
        if let Some(started) = self.motor_started {
            if self.clock.elapsed_since(started) >= self.config.motor_pulse {
                self.stop_motor();
                self.log.info(format_args!("potentiometer stopped"));
            }
        }
        self.track(target, false);
    }

    /// Turn the pot towards louder for one pulse. Only while powered.
    pub fn volume_up<T: AttenuationTarget + ?Sized>(&mut self, target: &T) {
        self.run_motor(target, MotorDirection::Up);
    }

    /// Turn the pot towards quieter for one pulse. Only while powered.
    pub fn volume_down<T: AttenuationTarget + ?Sized>(&mut self, target: &T) {
        self.run_motor(target, MotorDirection::Down);
    }

    fn run_motor<T: AttenuationTarget + ?Sized>(&mut self, target: &T, direction: MotorDirection) {
        if !self.motorised() || !target.power() {
            return;
        }
        let (a, b) = match direction {
            MotorDirection::Up => (false, true),
            MotorDirection::Down => (true, false),
        };
        drive(&mut self.motor_a, a, &self.log, "pot motor");
        drive(&mut self.motor_b, b, &self.log, "pot motor");
        self.motor_started = Some(self.clock.now());
    }

    fn stop_motor(&mut self) {
        drive(&mut self.motor_a, false, &self.log, "pot motor");
        drive(&mut self.motor_b, false, &self.log, "pot motor");
        self.motor_started = None;
    }

    fn track<T: AttenuationTarget + ?Sized>(&mut self, target: &mut T, force: bool) {
        let Some(position) = self.read_position() else {
            return;
        };
        if !force && position.abs_diff(self.position) <= self.config.hysteresis {
            return;
        }
        self.position = position;
        let attenuation = u8::try_from(position).unwrap_or(u8::MAX);
        if let Err(err) = target.set_attenuation(attenuation) {
            self.log.warn(format_args!(
                "attenuation {} not applied - {}",
                attenuation,
                err
            ));
        }
    }

    fn read_position(&mut self) -> Option<u16> {
        let mut sum: u32 = 0;
        for _ in 0..self.config.oversample {
            match self.analog.read() {
                Ok(value) => sum = sum.saturating_add(u32::from(value.min(ANALOG_FULL_SCALE))),
                Err(_) => {
                    self.log.error(format_args!("error reading potentiometer"));
                    return None;
                }
            }
        }
        Some(u16::try_from(sum.wrapping_shr(self.config.shift)).unwrap_or(u16::MAX))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use platform::mocks::{ManualClock, MockAnalog, MockPin, RecordingSink};

    #[derive(Default)]
    struct Target {
        power: bool,
        initialised: bool,
        pushed: Vec<u8>,
    }

    impl Target {
        fn running() -> Self {
            Self {
                power: true,
                initialised: true,
                pushed: Vec::new(),
            }
        }
    }

    impl AttenuationTarget for Target {
        fn power(&self) -> bool {
            self.power
        }

        fn initialised(&self) -> bool {
            self.initialised
        }

        fn set_attenuation(&mut self, attenuation: u8) -> Result<(), ControlError> {
            self.pushed.push(attenuation);
            Ok(())
        }
    }

    type Volume<'a> = VolumeControl<MockAnalog, MockPin, &'a ManualClock, &'a RecordingSink>;

    fn volume<'a>(analog: &MockAnalog, clock: &'a ManualClock, log: &'a RecordingSink) -> Volume<'a> {
        VolumeControl::new(analog.clone(), clock, log, VolumeConfig::default())
    }

    #[test]
    fn test_reading_is_oversampled_and_scaled() {
        let analog = MockAnalog::new(1023);
        let clock = ManualClock::new();
        let log = RecordingSink::new();
        let mut vol = volume(&analog, &clock, &log);
        let mut target = Target::running();
        vol.poll(&mut target);
        assert_eq!(analog.reads(), 12);
        assert_eq!(target.pushed, vec![95]);
    }

    #[test]
    fn test_readings_above_full_scale_are_limited() {
        let analog = MockAnalog::new(4095);
        let clock = ManualClock::new();
        let log = RecordingSink::new();
        let mut vol = volume(&analog, &clock, &log);
        let mut target = Target::running();
        vol.poll(&mut target);
        assert_eq!(target.pushed, vec![95]);
    }

    #[test]
    fn test_small_movements_are_ignored() {
        let analog = MockAnalog::new(0);
        let clock = ManualClock::new();
        let log = RecordingSink::new();
        let mut vol = volume(&analog, &clock, &log);
        let mut target = Target::running();

        // 12 × 21 >> 7 = 1, within hysteresis of 0
        analog.set(21);
        vol.poll(&mut target);
        assert!(target.pushed.is_empty());

        // 12 × 32 >> 7 = 3
        analog.set(32);
        vol.poll(&mut target);
        assert_eq!(target.pushed, vec![3]);
        assert_eq!(vol.position(), 3);
    }

    #[test]
    fn test_initialise_forces_push() {
        let analog = MockAnalog::new(0);
        let clock = ManualClock::new();
        let log = RecordingSink::new();
        let mut vol = volume(&analog, &clock, &log);
        let mut target = Target::running();
        vol.initialise(&mut target);
        assert_eq!(target.pushed, vec![0]);
    }

    #[test]
    fn test_nothing_happens_while_unpowered() {
        let analog = MockAnalog::new(1023);
        let clock = ManualClock::new();
        let log = RecordingSink::new();
        let mut vol = volume(&analog, &clock, &log);
        let mut target = Target::default();
        vol.poll(&mut target);
        assert_eq!(analog.reads(), 0);
        assert!(target.pushed.is_empty());
    }

    #[test]
    fn test_motor_pulse_runs_then_stops() {
        let analog = MockAnalog::new(0);
        let clock = ManualClock::new();
        let log = RecordingSink::new();
        let (a, b) = (MockPin::new(), MockPin::new());
        let mut vol = volume(&analog, &clock, &log).with_motor(a.clone(), b.clone());
        let mut target = Target::running();
        assert!(vol.motorised());

        vol.volume_up(&target);
        assert!(!a.is_high());
        assert!(b.is_high());
        assert_eq!(vol.motor(), Some(MotorDirection::Up));

        clock.advance_ms(119);
        vol.poll(&mut target);
        assert!(b.is_high());

        clock.advance_ms(1);
        vol.poll(&mut target);
        assert!(!a.is_high() && !b.is_high());
        assert_eq!(vol.motor(), None);
        assert!(log.contains("potentiometer stopped"));

        vol.volume_down(&target);
        assert!(a.is_high());
        assert!(!b.is_high());
        assert_eq!(vol.motor(), Some(MotorDirection::Down));
    }

    #[test]
    fn test_motor_needs_power_and_pins() {
        let analog = MockAnalog::new(0);
        let clock = ManualClock::new();
        let log = RecordingSink::new();
        let target = Target::default();

        let mut bare = volume(&analog, &clock, &log);
        bare.volume_up(&target);
        assert_eq!(bare.motor(), None);

        let (a, b) = (MockPin::new(), MockPin::new());
        let mut motorised = volume(&analog, &clock, &log).with_motor(a, b.clone());
        motorised.volume_up(&target);
        assert!(!b.is_high());
        assert_eq!(motorised.motor(), None);
    }
}
