//! ES9018 (Sabre32 Reference) register map
//!
//! Control registers 0–25 are write-only. The driver keeps their content in
//! the shadow, seeded with the values below at initialisation. Status
//! registers 27–31 are read-only.

// ---------------------------------------------------------------------------
// Register addresses
// ---------------------------------------------------------------------------

/// Per-channel attenuation, channels 1–8
pub const REG_ATTENUATION: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

/// Input source and automute level
///
/// - bit 7: S/PDIF (1) or I²S/DSD (0)
/// - bits\[6:0\]: automute trigger level
pub const REG_INPUT: u8 = 8;

/// Mode control 2: bit 0 = mute
pub const REG_MUTE: u8 = 10;

/// Mode control 3: DPLL bandwidth and de-emphasis
pub const REG_DPLL_BANDWIDTH: u8 = 11;

/// Dither, rotator and notch delay
pub const REG_NOTCH_DELAY: u8 = 12;

/// Channel polarity, one bit per channel (bit 0 = channel 1)
pub const REG_PHASE: u8 = 13;

/// DAC source routing
pub const REG_MODE: u8 = 14;

/// Quantizer depth
pub const REG_QUANTIZER: u8 = 15;

/// Mode control 5: mono, OSF bypass, S/PDIF auto detection, FIR length
pub const REG_MODE_CONTROL_5: u8 = 17;

/// DAC B polarity
pub const REG_PHASE_B: u8 = 19;

/// DPLL mode control
pub const REG_DPLL_MODE: u8 = 25;

/// Status (read-only)
///
/// - bit 2: S/PDIF valid
/// - bit 1: automute
/// - bit 0: DPLL lock
pub const REG_STATUS: u8 = 27;

/// DPLL ratio, least-significant byte first (read-only)
pub const REG_DPLL: [u8; 4] = [28, 29, 30, 31];

// ---------------------------------------------------------------------------
// Default values and field patterns
// ---------------------------------------------------------------------------

/// REG_INPUT default: I²S/DSD, automute trigger 0x68
pub const INPUT_DEFAULT: u8 = 0x68;

/// REG_MUTE default: jitter reduction on, unmuted
pub const MUTE_DEFAULT: u8 = 0xCE;

/// Power-on content of every writable control register other than the
/// channel attenuations (which start at 0).
pub const CONTROL_DEFAULTS: [(u8, u8); 10] = [
    (REG_INPUT, INPUT_DEFAULT),
    (REG_MUTE, MUTE_DEFAULT),
    // lowest DPLL bandwidth, 44.1 kHz de-emphasis
    (REG_DPLL_BANDWIDTH, 0x85),
    // notch at MCLK/64
    (REG_NOTCH_DELAY, 0x1F),
    (REG_PHASE, 0x00),
    // Buffalo II routing, normal IIR bandwidth, fast roll-off
    (REG_MODE, MODE_PAIRED),
    // 6-bit quantizer
    (REG_QUANTIZER, 0x00),
    // S/PDIF auto detection and auto de-emphasis, 28 FIR coefficients
    (REG_MODE_CONTROL_5, 0x1C),
    (REG_PHASE_B, 0x00),
    (REG_DPLL_MODE, 0x00),
];

/// REG_MODE: each DAC plays its own input
pub const MODE_EIGHT_CHANNEL: u8 = 0x09;
/// REG_MODE: DAC3/4/7/8 copy DAC1/2/5/6
pub const MODE_PAIRED: u8 = 0xF9;

/// REG_MUTE: mute
pub const MUTE_ON: &str = "*******1";
/// REG_MUTE: unmute
pub const MUTE_OFF: &str = "*******0";

/// REG_INPUT: I²S / DSD input
pub const INPUT_SERIAL: &str = "0*******";
/// REG_INPUT: S/PDIF input
pub const INPUT_SPDIF: &str = "1*******";

/// REG_INPUT: automute level field
pub const AUTOMUTE_LEVEL_MASK: u8 = 0x7F;

/// REG_STATUS: lock bit
pub const STATUS_LOCK: u8 = 0b0000_0001;
/// REG_STATUS: automute bit
pub const STATUS_AUTOMUTE: u8 = 0b0000_0010;
/// REG_STATUS: S/PDIF valid bit
pub const STATUS_SPDIF_VALID: u8 = 0b0000_0100;

/// Largest attenuation value (full 8-bit range, 0.5 dB steps)
pub const ATTENUATION_MAX: u8 = 0xFF;

/// Master clock on the reference boards
pub const DEFAULT_MASTER_CLOCK_HZ: u32 = 80_000_000;
