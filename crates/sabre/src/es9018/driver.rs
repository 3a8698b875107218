//! ES9018 driver
//!
//! The ES9018 has no chip-ID register; a successful status read is taken as
//! identification. Control registers cannot be read back, so the shadow is the
//! record of chip content and writes are not verified.

use platform::{LogSink, RegisterBus};

use super::registers::*;
use crate::config::{ChannelMode, DacConfig};
use crate::device::{ChipType, DacDevice, Input};
use crate::error::DacError;
use crate::es9028::dpll_to_hz;
use crate::register_file::{Access, DeviceState, RegisterFile};

/// ES9018 DAC.
#[derive(Debug, Clone)]
pub struct Es9018 {
    regs: RegisterFile,
    config: DacConfig,
}

impl Es9018 {
    /// Device with the given static configuration. No bus activity.
    pub fn new(config: DacConfig) -> Self {
        Self {
            regs: RegisterFile::new(config.name, config.address.get(), Access::WriteOnly),
            config,
        }
    }

    /// Default configuration for this chip (80 MHz master clock).
    pub const fn default_config(name: &'static str) -> DacConfig {
        DacConfig::new(name).with_master_clock_hz(DEFAULT_MASTER_CLOCK_HZ)
    }

    /// Static configuration.
    pub fn config(&self) -> &DacConfig {
        &self.config
    }

    /// Whether the S/PDIF decoder sees valid frames.
    pub fn spdif_valid<B, L>(&mut self, bus: &mut B, log: &L) -> Result<bool, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        Ok(self.regs.read(bus, log, REG_STATUS)? & STATUS_SPDIF_VALID != 0)
    }

    /// Ratio between the master clock and the audio clock once locked.
    pub fn dpll_number<B, L>(&mut self, bus: &mut B, log: &L) -> Result<u32, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        let [r0, r1, r2, r3] = REG_DPLL;
        let bytes = [
            self.regs.read(bus, log, r0)?,
            self.regs.read(bus, log, r1)?,
            self.regs.read(bus, log, r2)?,
            self.regs.read(bus, log, r3)?,
        ];
        Ok(u32::from_le_bytes(bytes))
    }

    /// Sample rate in Hz.
    ///
    /// For S/PDIF the DPLL ratio is `rate × 2³² / clock`; for I²S it carries
    /// an extra factor of 64.
    pub fn sample_rate<B, L>(&mut self, bus: &mut B, log: &L) -> Result<u32, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        let dpll = self.dpll_number(bus, log)?;
        let shift = if self.spdif_valid(bus, log)? { 32 } else { 38 };
        Ok(dpll_to_hz(dpll, self.config.master_clock_hz, shift))
    }

    /// Automute trigger level. Only the low seven bits are used.
    pub fn set_automute_level<B, L>(&mut self, bus: &mut B, log: &L, level: u8) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        if level > AUTOMUTE_LEVEL_MASK {
            log.warn(format_args!(
                "{} automute level {} limited to 7 bits",
                self.regs.tag(),
                level
            ));
        }
        let current = self
            .regs
            .shadow(REG_INPUT)
            .map_or(INPUT_DEFAULT, |entry| entry.value);
        let value = (current & !AUTOMUTE_LEVEL_MASK) | (level & AUTOMUTE_LEVEL_MASK);
        self.regs.write(bus, log, REG_INPUT, value)
    }

    fn configure<B, L>(&mut self, bus: &mut B, log: &L) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        let mode = self.config.mode;
        log.info(format_args!("{} setting mode to {}", self.regs.tag(), mode.label()));
        let (routing, all_channels) = match mode {
            ChannelMode::EightChannel => (MODE_EIGHT_CHANNEL, true),
            ChannelMode::MonoLeft | ChannelMode::MonoRight | ChannelMode::Stereo => {
                (MODE_PAIRED, false)
            }
            ChannelMode::DualLeft | ChannelMode::DualRight => {
                log.error(format_args!(
                    "{} mode {} not supported",
                    self.regs.tag(),
                    mode.label()
                ));
                return Err(DacError::InvalidSetting);
            }
        };
        self.regs.write(bus, log, REG_MODE, routing)?;

        let phase = self.config.phase.channel_bits(all_channels);
        log.info(format_args!("{} setting phase {:#010b}", self.regs.tag(), phase));
        self.regs.write(bus, log, REG_PHASE, phase)
    }

    fn preset_defaults(&mut self) {
        for register in REG_ATTENUATION {
            self.regs.preset(register, 0);
        }
        for (register, value) in CONTROL_DEFAULTS {
            self.regs.preset(register, value);
        }
    }
}

impl DacDevice for Es9018 {
    fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    fn max_attenuation(&self) -> u8 {
        ATTENUATION_MAX
    }

    fn initialise<B, L>(&mut self, bus: &mut B, log: &L) -> Result<ChipType, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        log.info(format_args!("{} initialising", self.regs.tag()));
        self.regs.set_state(log, DeviceState::Initialising);

        let chip = if self.regs.no_i2c() {
            ChipType::Simulated
        } else {
            match self.regs.read(bus, log, REG_STATUS) {
                Ok(_) => ChipType::Es9018,
                Err(err) => {
                    log.error(format_args!(
                        "{} initialisation failed - {}",
                        self.regs.tag(),
                        err
                    ));
                    self.regs.reset(log);
                    return Err(err);
                }
            }
        };
        self.regs.set_chip(chip);
        self.preset_defaults();
        self.regs.set_state(log, DeviceState::Initialised);

        if let Err(err) = self.configure(bus, log) {
            log.error(format_args!(
                "{} initialisation failed - {}",
                self.regs.tag(),
                err
            ));
            self.regs.reset(log);
            return Err(err);
        }
        Ok(chip)
    }

    fn mute<B, L>(&mut self, bus: &mut B, log: &L) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        log.info(format_args!("{} mute", self.regs.tag()));
        self.regs.write_bits(bus, log, REG_MUTE, MUTE_ON)
    }

    fn unmute<B, L>(&mut self, bus: &mut B, log: &L) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        log.info(format_args!("{} unmute", self.regs.tag()));
        self.regs.write_bits(bus, log, REG_MUTE, MUTE_OFF)
    }

    fn locked<B, L>(&mut self, bus: &mut B, log: &L) -> Result<bool, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        Ok(self.regs.read(bus, log, REG_STATUS)? & STATUS_LOCK != 0)
    }

    fn automuted<B, L>(&mut self, bus: &mut B, log: &L) -> Result<bool, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        Ok(self.regs.read(bus, log, REG_STATUS)? & STATUS_AUTOMUTE != 0)
    }

    fn select_input<B, L>(&mut self, bus: &mut B, log: &L, input: Input) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        log.info(format_args!(
            "{} setting input to {}",
            self.regs.tag(),
            input.label()
        ));
        let pattern = match input {
            Input::Serial => INPUT_SERIAL,
            Input::Spdif => INPUT_SPDIF,
        };
        self.regs.write_bits(bus, log, REG_INPUT, pattern)
    }

    fn set_attenuation<B, L>(&mut self, bus: &mut B, log: &L, attenuation: u8) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        for register in REG_ATTENUATION {
            self.regs.write(bus, log, register, attenuation)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::config::{ChannelPhase, Phase};
    use platform::mocks::{BusOp, RecordingSink, SimBus};
    use platform::BusError;

    const ADDR: u8 = 0x48;

    fn bus() -> SimBus {
        let mut bus = SimBus::new();
        bus.add_device(ADDR);
        bus
    }

    fn ready(config: DacConfig) -> (Es9018, SimBus, RecordingSink) {
        let mut dac = Es9018::new(config);
        let mut bus = bus();
        let log = RecordingSink::new();
        dac.initialise(&mut bus, &log).unwrap();
        bus.clear_ops();
        (dac, bus, log)
    }

    #[test]
    fn test_status_read_identifies_chip() {
        let mut dac = Es9018::new(Es9018::default_config("left"));
        let mut bus = bus();
        let log = RecordingSink::new();
        assert_eq!(dac.initialise(&mut bus, &log).unwrap(), ChipType::Es9018);
        assert!(dac.is_initialised());
    }

    #[test]
    fn test_missing_chip_fails_initialisation() {
        let mut dac = Es9018::new(Es9018::default_config("left"));
        let mut bus = SimBus::new();
        let log = RecordingSink::new();
        assert_eq!(
            dac.initialise(&mut bus, &log),
            Err(DacError::Bus {
                register: REG_STATUS,
                source: BusError::AddressNack
            })
        );
        assert!(!dac.is_initialised());
    }

    #[test]
    fn test_eight_channel_mode_and_phase_written_without_reads() {
        let config = Es9018::default_config("left")
            .with_phase(ChannelPhase::new(Phase::AntiPhase, Phase::AntiPhase));
        let mut dac = Es9018::new(config);
        let mut bus = bus();
        let log = RecordingSink::new();
        dac.initialise(&mut bus, &log).unwrap();
        assert_eq!(
            bus.ops(),
            &[
                BusOp::Read { address: ADDR, register: REG_STATUS },
                BusOp::Write { address: ADDR, register: REG_MODE, value: MODE_EIGHT_CHANNEL },
                BusOp::Write { address: ADDR, register: REG_PHASE, value: 0xFF },
            ]
        );
    }

    #[test]
    fn test_paired_modes_only_phase_leading_channels() {
        let config = Es9018::default_config("right")
            .with_mode(ChannelMode::MonoRight)
            .with_phase(ChannelPhase::new(Phase::InPhase, Phase::AntiPhase));
        let (_dac, bus, _log) = ready(config);
        assert_eq!(bus.register(ADDR, REG_MODE), MODE_PAIRED);
        assert_eq!(bus.register(ADDR, REG_PHASE), 0x22);
    }

    #[test]
    fn test_dual_modes_are_rejected() {
        let config = Es9018::default_config("left").with_mode(ChannelMode::DualLeft);
        let mut dac = Es9018::new(config);
        let mut bus = bus();
        let log = RecordingSink::new();
        assert_eq!(dac.initialise(&mut bus, &log), Err(DacError::InvalidSetting));
        assert!(!dac.is_initialised());
    }

    #[test]
    fn test_mute_patches_shadowed_default() {
        let (mut dac, mut bus, log) = ready(Es9018::default_config("left"));
        dac.mute(&mut bus, &log).unwrap();
        dac.unmute(&mut bus, &log).unwrap();
        assert_eq!(
            bus.writes_to(ADDR),
            vec![(REG_MUTE, MUTE_DEFAULT | 1), (REG_MUTE, MUTE_DEFAULT)]
        );
    }

    #[test]
    fn test_every_control_register_is_shadowed() {
        let (mut dac, mut bus, log) = ready(Es9018::default_config("left"));
        for (register, value) in CONTROL_DEFAULTS {
            let entry = dac.registers().shadow(register).unwrap();
            // Mode and phase were rewritten by initialisation.
            if register != REG_MODE && register != REG_PHASE {
                assert_eq!(entry.value, value);
            }
        }

        // Patching one bit keeps the power-on content of the others.
        bus.set_register(ADDR, REG_DPLL_BANDWIDTH, 0b1000_0101);
        dac.write_register_bits(&mut bus, &log, REG_DPLL_BANDWIDTH, "******1*")
            .unwrap();
        assert_eq!(bus.register(ADDR, REG_DPLL_BANDWIDTH), 0b1000_0111);
        assert_eq!(bus.writes_to(ADDR), vec![(REG_DPLL_BANDWIDTH, 0b1000_0111)]);
    }

    #[test]
    fn test_input_select_uses_top_bit() {
        let (mut dac, mut bus, log) = ready(Es9018::default_config("left"));
        dac.select_input(&mut bus, &log, Input::Spdif).unwrap();
        assert_eq!(bus.register(ADDR, REG_INPUT), INPUT_DEFAULT | 0x80);
        dac.select_input(&mut bus, &log, Input::Serial).unwrap();
        assert_eq!(bus.register(ADDR, REG_INPUT), INPUT_DEFAULT);
    }

    #[test]
    fn test_attenuation_written_to_every_channel_once() {
        let (mut dac, mut bus, log) = ready(Es9018::default_config("left"));
        dac.set_attenuation(&mut bus, &log, 40).unwrap();
        dac.set_attenuation(&mut bus, &log, 40).unwrap();
        let writes = bus.writes_to(ADDR);
        assert_eq!(writes.len(), 8);
        assert!(writes.iter().all(|&(_, value)| value == 40));
    }

    #[test]
    fn test_automute_level_keeps_input_bit() {
        let (mut dac, mut bus, log) = ready(Es9018::default_config("left"));
        dac.select_input(&mut bus, &log, Input::Spdif).unwrap();
        dac.set_automute_level(&mut bus, &log, 0xFF).unwrap();
        assert_eq!(bus.register(ADDR, REG_INPUT), 0xFF);
        dac.set_automute_level(&mut bus, &log, 0x10).unwrap();
        assert_eq!(bus.register(ADDR, REG_INPUT), 0x90);
    }

    #[test]
    fn test_status_bits() {
        let (mut dac, mut bus, log) = ready(Es9018::default_config("left"));
        bus.set_register(ADDR, REG_STATUS, STATUS_LOCK | STATUS_SPDIF_VALID);
        assert!(dac.locked(&mut bus, &log).unwrap());
        assert!(!dac.automuted(&mut bus, &log).unwrap());
        assert!(dac.spdif_valid(&mut bus, &log).unwrap());
    }

    #[test]
    fn test_sample_rate_spdif_and_i2s() {
        let (mut dac, mut bus, log) = ready(Es9018::default_config("left"));
        let set_dpll = |bus: &mut SimBus, bytes: [u8; 4]| {
            for (register, value) in REG_DPLL.into_iter().zip(bytes) {
                bus.set_register(ADDR, register, value);
            }
        };

        // 44.1 kHz over S/PDIF, 80 MHz clock.
        set_dpll(&mut bus, [0x71, 0x20, 0x24, 0x00]);
        bus.set_register(ADDR, REG_STATUS, STATUS_SPDIF_VALID);
        assert_eq!(dac.sample_rate(&mut bus, &log).unwrap(), 44_100);

        // 44.1 kHz over I²S carries the extra factor of 64.
        set_dpll(&mut bus, [0x4F, 0x1F, 0x08, 0x09]);
        bus.set_register(ADDR, REG_STATUS, 0);
        assert_eq!(dac.sample_rate(&mut bus, &log).unwrap(), 44_100);
    }

    #[test]
    fn test_reset_requires_reinitialisation() {
        let (mut dac, mut bus, log) = ready(Es9018::default_config("left"));
        dac.reset(&log);
        assert_eq!(
            dac.mute(&mut bus, &log),
            Err(DacError::NotInitialised { register: REG_MUTE })
        );
        dac.initialise(&mut bus, &log).unwrap();
        bus.clear_ops();
        dac.mute(&mut bus, &log).unwrap();
        assert_eq!(bus.writes_to(ADDR), vec![(REG_MUTE, MUTE_DEFAULT | 1)]);
    }
}
