//! Power sequencing and status polling for a fixed set of DACs
//!
//! The controller owns the bus, the devices and the board lines. It never
//! blocks: [`Controller::poll`] is called from the host's cooperative loop and
//! advances the sequence
//!
//! ```text
//! PoweredOff ──power_on()──► Settling ──settle delay──► initialisation pass(es)
//!     ▲                                                        │
//!     └──────────power_off()───────── Running / Degraded ◄─────┘
//! ```
//!
//! While running with every device healthy, each poll samples automute and
//! lock at most once per sample interval and raises an event when an
//! aggregate changes.

use embassy_time::Instant;
use embedded_hal::digital::{Error as _, OutputPin};
use platform::{Attenuation, Clock, LogSink, OutputLine, RegisterBus};
use sabre::{ChipType, DacDevice, DacError, Input};

use crate::config::ControllerConfig;
use crate::error::{check, ControlError};
use crate::event::{DeviceMask, Event, EventKind, Handler, Handlers, LockMask, MAX_DEVICES};

/// Per-device hook run after identification, between mute and unmute.
///
/// Typical use is chip-specific configuration such as automute timing. An
/// error resets the device, which then counts as failed.
pub type DeviceSetup<T, B, L> = fn(&mut T, &mut B, &L) -> Result<(), DacError>;

/// Coarse controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerState {
    /// Relay off, devices reset
    PoweredOff,
    /// Powered, waiting for the settle delay or the first poll after it
    Settling,
    /// Every device initialised; lock and automute are sampled
    Running,
    /// Sequence completed with failed devices; nothing is sampled
    Degraded,
}

/// Coordinates `N` DAC devices sharing one register bus.
pub struct Controller<B, L, P, C, T, const N: usize> {
    bus: B,
    log: L,
    clock: C,
    devices: [T; N],
    relay: OutputLine<P>,
    dac_reset: OutputLine<P>,
    config: ControllerConfig,
    handlers: Handlers,
    setup: Option<DeviceSetup<T, B, L>>,
    power: bool,
    initialised: bool,
    error_initialising: bool,
    automuted: bool,
    input: Input,
    powered_at: Instant,
    last_sample: Option<Instant>,
    previous_lock: Option<LockMask>,
}

impl<B, L, P, C, T, const N: usize> Controller<B, L, P, C, T, N>
where
    B: RegisterBus,
    L: LogSink,
    P: OutputPin,
    C: Clock,
    T: DacDevice,
{
    const FITS_LOCK_MASK: () = assert!(N <= MAX_DEVICES, "too many devices for the lock mask");

    /// Controller with no relay, no reset line and no handlers. Powered off.
    pub fn new(bus: B, log: L, clock: C, devices: [T; N], config: ControllerConfig) -> Self {
        let () = Self::FITS_LOCK_MASK;
        let powered_at = clock.now();
        Self {
            bus,
            log,
            clock,
            devices,
            relay: OutputLine::absent(),
            dac_reset: OutputLine::absent(),
            config,
            handlers: Handlers::new(),
            setup: None,
            power: false,
            initialised: false,
            error_initialising: false,
            automuted: false,
            input: Input::default(),
            powered_at,
            last_sample: None,
            previous_lock: None,
        }
    }

    /// Drive the power relay through `pin`. The relay starts off.
    #[must_use]
    pub fn with_power_relay(mut self, pin: P) -> Self {
        self.relay = OutputLine::new(pin);
        drive(&mut self.relay, false, &self.log, "power relay");
        self
    }

    /// Drive the DAC reset line through `pin`. The DACs start held in reset.
    #[must_use]
    pub fn with_dac_reset(mut self, pin: P) -> Self {
        self.dac_reset = OutputLine::new(pin);
        drive(&mut self.dac_reset, false, &self.log, "DAC reset");
        self
    }

    /// Install the per-device setup hook.
    pub fn set_device_setup(&mut self, setup: DeviceSetup<T, B, L>) {
        self.setup = Some(setup);
    }

    /// Register `handler` for `kind`, replacing any previous handler.
    pub fn on(&mut self, kind: EventKind, handler: Handler) {
        self.handlers.set(kind, handler);
    }

    /// Remove the handler for `kind`.
    pub fn clear_handler(&mut self, kind: EventKind) {
        self.handlers.clear(kind);
    }

    // ── Power ────────────────────────────────────────────────────────────────

    /// Switch the DAC supply on. Initialisation follows from
    /// [`poll`](Self::poll) once the settle delay has passed.
    pub fn power_on(&mut self) {
        if self.power {
            return;
        }
        self.fire(Event::BeforePowerOn);
        self.log.info(format_args!("power on"));
        drive(&mut self.relay, true, &self.log, "power relay");
        self.power = true;
        self.powered_at = self.clock.now();
        self.fire(Event::AfterPowerOn);
    }

    /// Mute, hold the DACs in reset and switch the supply off.
    ///
    /// Every device returns to uninitialised and the previous lock sample is
    /// forgotten, so the next power cycle reports lock afresh.
    pub fn power_off(&mut self) {
        if !self.power {
            return;
        }
        for device in &mut self.devices {
            if device.is_initialised() {
                // The supply is going away regardless.
                let _ = device.mute(&mut self.bus, &self.log);
            }
        }
        drive(&mut self.dac_reset, false, &self.log, "DAC reset");
        self.fire(Event::BeforePowerOff);
        drive(&mut self.relay, false, &self.log, "power relay");
        self.power = false;
        self.log.info(format_args!("power off"));

        self.log.warn(format_args!("resetting devices"));
        for device in &mut self.devices {
            device.reset(&self.log);
        }
        self.initialised = false;
        self.previous_lock = None;
        self.last_sample = None;
        self.fire(Event::AfterPowerOff);
    }

    /// Power off when on, on when off.
    pub fn toggle_power(&mut self) {
        self.log.info(format_args!("toggle power"));
        if self.power {
            self.power_off();
        } else {
            self.power_on();
        }
    }

    // ── Polling ──────────────────────────────────────────────────────────────

    /// Advance the sequence. Call regularly; returns without bus traffic when
    /// there is nothing to do.
    pub fn poll(&mut self) {
        if !self.power {
            return;
        }
        if !self.initialised {
            if self.clock.elapsed_since(self.powered_at) >= self.config.settle_delay {
                self.initialise_devices();
            }
            return;
        }
        if !self.all_initialised() {
            return;
        }
        let now = self.clock.now();
        if let Some(last) = self.last_sample {
            if self.clock.elapsed_since(last) < self.config.sample_interval {
                return;
            }
        }
        self.last_sample = Some(now);
        self.sample_automute();
        self.sample_lock();
    }

    fn initialise_devices(&mut self) {
        self.log.info(format_args!("initialising DACs"));
        self.error_initialising = false;
        drive(&mut self.dac_reset, true, &self.log, "DAC reset");

        for pass in 0..=self.config.init_retries {
            if self.all_initialised() {
                break;
            }
            if pass > 0 {
                self.log.warn(format_args!("retrying initialisation, pass {}", pass));
            }
            for device in &mut self.devices {
                if device.is_initialised() {
                    continue;
                }
                self.log.info(format_args!(
                    "initialising {} at 0x{:02X}",
                    device.name(),
                    device.address()
                ));
                if let Ok(chip) = bring_up(device, &mut self.bus, &self.log, self.setup, self.input) {
                    self.log.info(format_args!(
                        "found {} at 0x{:02X} after {} ms",
                        chip,
                        device.address(),
                        self.clock.elapsed_since(self.powered_at).as_millis()
                    ));
                }
            }
        }

        let failed = self.uninitialised_devices();
        for (index, device) in self.devices.iter().enumerate() {
            if failed.contains(index) {
                self.log.error(format_args!(
                    "{} failed to initialise after {} ms",
                    device.name(),
                    self.clock.elapsed_since(self.powered_at).as_millis()
                ));
            }
        }
        self.error_initialising = !failed.is_empty();
        self.initialised = true;
        if failed.is_empty() {
            self.log.info(format_args!("initialisation OK"));
            self.fire(Event::Initialised);
        } else {
            self.fire(Event::NotInitialised { failed });
        }
    }

    fn sample_automute(&mut self) {
        let mut automuted = N > 0;
        for device in &mut self.devices {
            match device.automuted(&mut self.bus, &self.log) {
                Ok(muted) => automuted &= muted,
                Err(err) => {
                    self.log.error(format_args!(
                        "{} error reading automute - {}",
                        device.name(),
                        err
                    ));
                    automuted = false;
                }
            }
        }
        if automuted != self.automuted {
            self.automuted = automuted;
            self.log.info(format_args!(
                "automute {}",
                if automuted { "on" } else { "off" }
            ));
            self.fire(Event::AutomuteChanged { automuted });
        }
    }

    fn sample_lock(&mut self) {
        let mut mask = LockMask::EMPTY;
        for (index, device) in self.devices.iter_mut().enumerate() {
            match device.locked(&mut self.bus, &self.log) {
                Ok(true) => mask.set_locked(index),
                Ok(false) => {}
                Err(err) => {
                    self.log.error(format_args!(
                        "{} error reading lock - {}",
                        device.name(),
                        err
                    ));
                    mask.set_read_error(index, N);
                }
            }
        }
        if self.previous_lock == Some(mask) {
            return;
        }
        self.previous_lock = Some(mask);

        for (index, device) in self.devices.iter().enumerate() {
            let state = if mask.is_locked(index) {
                "locked"
            } else if mask.read_failed(index, N) {
                "lock unreadable"
            } else {
                "not locked"
            };
            self.log.info(format_args!("{} DAC {}", device.name(), state));
        }
        self.fire(Event::from_lock(mask.status(N), mask));
    }

    // ── Commands ─────────────────────────────────────────────────────────────

    /// Mute every device. Only once the sequence completed without failures.
    pub fn mute(&mut self) -> Result<(), ControlError> {
        self.ensure_ready()?;
        self.log.info(format_args!("mute"));
        check(self.each_device(|device, bus, log| device.mute(bus, log)))
    }

    /// Unmute every device. Only once the sequence completed without failures.
    pub fn unmute(&mut self) -> Result<(), ControlError> {
        self.ensure_ready()?;
        self.log.info(format_args!("unmute"));
        check(self.each_device(|device, bus, log| device.unmute(bus, log)))
    }

    /// Route `input` on every device. Only while powered.
    ///
    /// Devices not yet initialised pick the input up during initialisation.
    pub fn select_input(&mut self, input: Input) -> Result<(), ControlError> {
        if !self.power {
            return Err(ControlError::NotPowered);
        }
        self.log.info(format_args!("{} input", input.label()));
        self.input = input;
        check(self.each_device(|device, bus, log| {
            if device.is_initialised() {
                device.select_input(bus, log, input)
            } else {
                Ok(())
            }
        }))
    }

    /// Switch to the other input.
    pub fn toggle_input(&mut self) -> Result<(), ControlError> {
        self.log.info(format_args!("toggle input"));
        self.select_input(self.input.toggled())
    }

    /// Apply `attenuation` to every device, clamped to each device's range.
    pub fn set_attenuation(&mut self, attenuation: u8) -> Result<(), ControlError> {
        let tenths = Attenuation::new(attenuation).decibels_x10();
        self.log.info(format_args!(
            "setting attenuation to {} (-{}.{} dB)",
            attenuation,
            tenths.wrapping_div(10),
            tenths.wrapping_rem(10)
        ));
        check(self.each_device(|device, bus, log| {
            let clamped = Attenuation::clamped(attenuation, device.max_attenuation());
            if clamped.get() != attenuation {
                log.debug(format_args!(
                    "{} attenuation limited to {}",
                    device.name(),
                    clamped.get()
                ));
            }
            device.set_attenuation(bus, log, clamped.get())
        }))
    }

    /// Bypass the bus on every device (debugging without hardware).
    pub fn set_no_i2c(&mut self, on: bool) {
        self.log.warn(format_args!(
            "I2C bypass {}",
            if on { "on" } else { "off" }
        ));
        for device in &mut self.devices {
            device.set_no_i2c(on);
        }
    }

    // ── State ────────────────────────────────────────────────────────────────

    /// Whether the supply is on.
    pub fn power(&self) -> bool {
        self.power
    }

    /// Whether the initialisation sequence has completed since power on,
    /// successfully or not.
    pub fn initialised(&self) -> bool {
        self.initialised
    }

    /// Whether the last sequence left devices uninitialised.
    pub fn error_initialising(&self) -> bool {
        self.error_initialising
    }

    /// Automute aggregate from the last sample.
    pub fn automuted(&self) -> bool {
        self.automuted
    }

    /// Last selected input.
    pub fn input(&self) -> Input {
        self.input
    }

    /// Coarse state.
    pub fn state(&self) -> ControllerState {
        if !self.power {
            ControllerState::PoweredOff
        } else if !self.initialised {
            ControllerState::Settling
        } else if self.error_initialising {
            ControllerState::Degraded
        } else {
            ControllerState::Running
        }
    }

    /// Timing and retry policy.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Devices in index order.
    pub fn devices(&self) -> &[T; N] {
        &self.devices
    }

    /// Device `index`.
    pub fn device(&self, index: usize) -> Option<&T> {
        self.devices.get(index)
    }

    /// Device `index`, mutably.
    pub fn device_mut(&mut self, index: usize) -> Option<&mut T> {
        self.devices.get_mut(index)
    }

    /// Shared bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Shared bus, mutably.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Log sink.
    pub fn log(&self) -> &L {
        &self.log
    }

    /// Requested relay level.
    pub fn relay_active(&self) -> bool {
        self.relay.is_active()
    }

    /// Requested DAC reset level (`true` = out of reset).
    pub fn dac_reset_active(&self) -> bool {
        self.dac_reset.is_active()
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn fire(&self, event: Event) {
        self.log
            .debug(format_args!("event: {}", event.kind().label()));
        self.handlers.dispatch(&event);
    }

    fn ensure_ready(&self) -> Result<(), ControlError> {
        if self.initialised && !self.error_initialising {
            Ok(())
        } else {
            Err(ControlError::NotReady)
        }
    }

    fn all_initialised(&self) -> bool {
        self.devices.iter().all(DacDevice::is_initialised)
    }

    fn uninitialised_devices(&self) -> DeviceMask {
        let mut mask = DeviceMask::EMPTY;
        for (index, device) in self.devices.iter().enumerate() {
            if !device.is_initialised() {
                mask.insert(index);
            }
        }
        mask
    }

    fn each_device<F>(&mut self, mut op: F) -> DeviceMask
    where
        F: FnMut(&mut T, &mut B, &L) -> Result<(), DacError>,
    {
        let mut failed = DeviceMask::EMPTY;
        for (index, device) in self.devices.iter_mut().enumerate() {
            if op(device, &mut self.bus, &self.log).is_err() {
                failed.insert(index);
            }
        }
        failed
    }
}

/// Initialise one device, then mute, run the setup hook, restore the input
/// and unmute. Any failure after identification resets the device.
fn bring_up<T, B, L>(
    device: &mut T,
    bus: &mut B,
    log: &L,
    setup: Option<DeviceSetup<T, B, L>>,
    input: Input,
) -> Result<ChipType, DacError>
where
    T: DacDevice,
    B: RegisterBus,
    L: LogSink,
{
    let chip = device.initialise(bus, log)?;
    if let Err(err) = configure(device, bus, log, setup, input) {
        log.error(format_args!("{} setup failed - {}", device.name(), err));
        device.reset(log);
        return Err(err);
    }
    Ok(chip)
}

fn configure<T, B, L>(
    device: &mut T,
    bus: &mut B,
    log: &L,
    setup: Option<DeviceSetup<T, B, L>>,
    input: Input,
) -> Result<(), DacError>
where
    T: DacDevice,
    B: RegisterBus,
    L: LogSink,
{
    device.mute(bus, log)?;
    match setup {
        Some(setup) => setup(device, bus, log)?,
        None => log.warn(format_args!("{} no device setup specified", device.name())),
    }
    if input != Input::default() {
        device.select_input(bus, log, input)?;
    }
    device.unmute(bus, log)
}

pub(crate) fn drive<P: OutputPin, L: LogSink>(line: &mut OutputLine<P>, active: bool, log: &L, what: &str) {
    let level = if active { "high" } else { "low" };
    match line.set_active(active) {
        Ok(()) if line.is_present() => log.debug(format_args!("{} {}", what, level)),
        Ok(()) => {}
        Err(err) => log.error(format_args!(
            "error driving {} {} - {}",
            what,
            level,
            err.kind()
        )),
    }
}
