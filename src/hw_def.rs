//! Register map and fixed values of the SEN0322

#[cfg(feature = "defmt")]
use defmt::Format;

/// I²C address, selected with the A0/A1 dial switch on the board
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum I2cAddr {
    /// A0 = 0, A1 = 0
    Addr00,
    /// A0 = 1, A1 = 0
    Addr10,
    /// A0 = 0, A1 = 1
    Addr01,
    /// A0 = 1, A1 = 1 (factory setting)
    #[default]
    Addr11,
}
impl I2cAddr {
    /// 7-bit bus address
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Addr00 => 0x70,
            Self::Addr10 => 0x71,
            Self::Addr01 => 0x72,
            Self::Addr11 => 0x73,
        }
    }
}

/// Device registers
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Register {
    /// 3 bytes: ones, tenths and hundredths of the raw sample
    OxygenData = 0x03,
    /// manual calibration point, 1 byte
    UserSet = 0x08,
    /// auto calibration key on legacy firmware, 1 byte
    AutoSetLegacy = 0x09,
    /// stored calibration key, 2 bytes little-endian
    Key = 0x0A,
    /// auto calibration key, 2 bytes little-endian
    AutoSet = 0x0C,
    /// probe lifespan status, 1 byte
    ProbeLife = 0x0E,
    /// firmware version, 1 byte
    Version = 0x0F,
}
impl Register {
    /// Register address on the device
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

/// Version register value reported by legacy firmware
pub const VERSION_LEGACY: u8 = 0xFF;
/// Version register value reported by current firmware
pub const VERSION_CURRENT: u8 = 0x01;

/// Raw probe lifespan value: probe exhausted
pub const PROBE_LIFE_EXHAUSTED: u8 = 0x00;
/// Raw probe lifespan value: probe normal
pub const PROBE_LIFE_NORMAL: u8 = 0x01;

/// Calibration key used while the device has no stored key (20.9 %vol air over 120)
pub const DEFAULT_KEY: f32 = 20.9 / 120.0;

/// Deepest smoothing window supported
pub const MAX_COLLECT: u8 = 100;

/// Settle time after reading the stored key
pub const KEY_READ_SETTLE_MS: u32 = 100;

/// Voltages closer to zero than this select manual calibration
pub const MANUAL_CALIBRATION_EPSILON: f32 = 0.000_001;
