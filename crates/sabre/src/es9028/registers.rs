//! ES9028PRO / ES9038PRO register map (the subset this driver touches)
//!
//! Both parts share one register layout. Control registers read back, so
//! every write goes through the verified path of the register file.
//!
//! Patterns are most-significant bit first; `*` leaves a bit alone.

// ---------------------------------------------------------------------------
// Register addresses
// ---------------------------------------------------------------------------

/// System register: bit 0 = soft reset (self-clearing)
pub const REG_SYSTEM: u8 = 0;

/// Input selection: bits\[1:0\] = input_select
pub const REG_INPUT_SELECT: u8 = 1;

/// Automute time. 0 disables automute
pub const REG_AUTOMUTE_TIME: u8 = 4;

/// Automute level in -dB, bits\[6:0\]
pub const REG_AUTOMUTE_LEVEL: u8 = 5;

/// Filter bandwidth and system mute: bit 0 = mute all channels
pub const REG_MUTE: u8 = 7;

/// Channel mapping and volume control
///
/// - bit 2: stereo mode (1) or per-channel mapping via registers 38–41 (0)
/// - bit 1: every channel uses the channel 1 volume
pub const REG_CHANNEL_CONFIG: u8 = 15;

/// Channel 1 volume; drives all channels once "use channel 1" is set
pub const REG_VOLUME_1: u8 = 16;

/// DAC input mapping, two channels per register (high nibble first)
pub const REG_INPUT_MAP: [u8; 4] = [38, 39, 40, 41];

/// Channel polarity, one bit per channel (bit 0 = channel 1)
pub const REG_PHASE: u8 = 54;

/// Chip status (read-only)
///
/// - bits\[7:2\]: chip ID
/// - bit 1: automute
/// - bit 0: DPLL lock
pub const REG_CHIP_STATUS: u8 = 64;

/// DPLL ratio, least-significant byte first (read-only)
pub const REG_DPLL: [u8; 4] = [66, 67, 68, 69];

/// Input decoder status (read-only)
pub const REG_SIGNAL_STATUS: u8 = 100;

// ---------------------------------------------------------------------------
// Patterns and field values
// ---------------------------------------------------------------------------

/// REG_SYSTEM: request a soft reset
pub const SYSTEM_SOFT_RESET: u8 = 0b0000_0001;

/// REG_MUTE: mute
pub const MUTE_ON: &str = "*******1";
/// REG_MUTE: unmute
pub const MUTE_OFF: &str = "*******0";

/// REG_INPUT_SELECT: serial (I²S) input
pub const INPUT_SERIAL: &str = "******00";
/// REG_INPUT_SELECT: S/PDIF input
pub const INPUT_SPDIF: &str = "******01";

/// REG_CHANNEL_CONFIG: stereo mode
pub const STEREO_MODE: &str = "*****1**";
/// REG_CHANNEL_CONFIG: per-channel input mapping
pub const MAPPED_MODE: &str = "*****0**";
/// REG_CHANNEL_CONFIG: all channels use the channel 1 volume
pub const VOLUME_USE_CHANNEL_1: &str = "******1*";

/// REG_CHIP_STATUS: lock bit
pub const STATUS_LOCK: u8 = 0b0000_0001;
/// REG_CHIP_STATUS: automute bit
pub const STATUS_AUTOMUTE: u8 = 0b0000_0010;

/// Chip ID (REG_CHIP_STATUS >> 2) of the ES9028PRO
pub const CHIP_ID_ES9028PRO: u8 = 0b10_1000;
/// Chip ID (REG_CHIP_STATUS >> 2) of the ES9038PRO
pub const CHIP_ID_ES9038PRO: u8 = 0b10_1010;

/// REG_SIGNAL_STATUS: DoP decoder found a valid stream
pub const SIGNAL_DOP: u8 = 0b0000_1000;
/// REG_SIGNAL_STATUS: S/PDIF decoder found valid frames
pub const SIGNAL_SPDIF: u8 = 0b0000_0100;
/// REG_SIGNAL_STATUS: I²S decoder found valid clocks
pub const SIGNAL_I2S: u8 = 0b0000_0010;
/// REG_SIGNAL_STATUS: DSD decoder in use as fallback
pub const SIGNAL_DSD: u8 = 0b0000_0001;

/// Largest automute level (7-bit field)
pub const AUTOMUTE_LEVEL_MAX: u8 = 0x7F;

/// Largest attenuation value accepted by the volume registers
pub const ATTENUATION_MAX: u8 = 124;
