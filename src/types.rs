use crate::fmt::{debug, warn};
use crate::hw_def::*;

use core::fmt;

#[cfg(feature="defmt")]
use defmt::Format;

/// SEN0322 blocking device driver
#[cfg(feature = "blocking")]
#[derive(Debug)]
pub struct Sen0322<I2C, Delay, Obs = NoopObserver> {
    pub(crate) i2c: I2C,
    pub(crate) delay: Delay,
    pub(crate) observer: Obs,
    pub(crate) state: State,
}

/// SEN0322 async device driver
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct Sen0322Async<I2C, Delay, Obs = NoopObserver> {
    pub(crate) i2c: I2C,
    pub(crate) delay: Delay,
    pub(crate) observer: Obs,
    pub(crate) state: State,
}

/// All possible errors in this crate
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, PartialEq)]
pub enum Error<E> {
    /// I²C transaction kept failing until the retry policy gave up
    TransportUnavailable {
        /// error reported by the bus on the last attempt
        error: E,
        /// number of attempts made
        attempts: u8,
    },
    /// Invalid input data provided
    InvalidInputData,
}
impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TransportUnavailable { error, attempts } => {
                write!(f, "I2C transport unavailable after {attempts} attempt(s): {error:?}")
            }
            Error::InvalidInputData => write!(f, "invalid input data"),
        }
    }
}
impl<E: fmt::Debug> core::error::Error for Error<E> {}

/// Firmware generation, detected once when the driver is created
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Version {
    /// early firmware: 8-bit calibration key, no probe lifespan register
    Legacy,
    /// firmware with the 16-bit calibration key and probe lifespan register
    Current,
    /// unrecognised version byte; treated like [`Version::Current`]
    Unknown(u8),
}
impl From<u8> for Version {
    fn from(raw: u8) -> Self {
        match raw {
            VERSION_LEGACY => Version::Legacy,
            VERSION_CURRENT => Version::Current,
            _ => Version::Unknown(raw),
        }
    }
}
impl Version {
    /// Whether the 16-bit auto calibration register and the probe lifespan register exist
    pub fn has_extended_registers(&self) -> bool {
        !matches!(self, Version::Legacy)
    }
}
impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Legacy => write!(f, "legacy (0x{VERSION_LEGACY:02X})"),
            Version::Current => write!(f, "current (0x{VERSION_CURRENT:02X})"),
            Version::Unknown(raw) => write!(f, "unknown (0x{raw:02X})"),
        }
    }
}

/// Probe lifespan as reported by the sensor
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProbeLifeStatus {
    /// legacy firmware has no probe lifespan register
    Unsupported,
    /// the probe is worn out and should be replaced
    Exhausted,
    /// the probe is fine
    Normal,
    /// any other value read from the device
    Unknown(u8),
}
impl From<u8> for ProbeLifeStatus {
    fn from(raw: u8) -> Self {
        match raw {
            PROBE_LIFE_EXHAUSTED => ProbeLifeStatus::Exhausted,
            PROBE_LIFE_NORMAL => ProbeLifeStatus::Normal,
            _ => ProbeLifeStatus::Unknown(raw),
        }
    }
}
impl ProbeLifeStatus {
    /// Byte read from the device, `None` when the register does not exist
    pub fn raw(&self) -> Option<u8> {
        match self {
            ProbeLifeStatus::Unsupported => None,
            ProbeLifeStatus::Exhausted => Some(PROBE_LIFE_EXHAUSTED),
            ProbeLifeStatus::Normal => Some(PROBE_LIFE_NORMAL),
            ProbeLifeStatus::Unknown(raw) => Some(*raw),
        }
    }
}

/// Convert the stored key register value to a calibration key
pub fn raw_key_to_key(raw: u16) -> f32 {
    if raw == 0 {
        DEFAULT_KEY
    } else {
        raw as f32 / 1000.0
    }
}

/// Combine the ones, tenths and hundredths bytes of the oxygen data register
pub fn raw_sample_to_value(raw: [u8; 3]) -> f32 {
    raw[0] as f32 + raw[1] as f32 / 10.0 + raw[2] as f32 / 100.0
}

/// Moving-average buffer, most recent sample first
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Debug)]
pub struct SmoothingWindow {
    samples: [f32; MAX_COLLECT as usize],
    len: u8,
}
impl Default for SmoothingWindow {
    fn default() -> Self {
        Self::new()
    }
}
impl SmoothingWindow {
    /// Empty window
    pub const fn new() -> Self {
        Self { samples: [0.0; MAX_COLLECT as usize], len: 0 }
    }

    /// Push a sample into a window `depth` deep and return the new average.
    ///
    /// `depth` is clamped to `1..=MAX_COLLECT`.  The populated count never exceeds `depth`, so
    /// reducing the depth between calls immediately narrows the average.
    pub fn push(&mut self, sample: f32, depth: u8) -> f32 {
        let depth = depth.clamp(1, MAX_COLLECT);
        self.samples.copy_within(0..(depth as usize - 1), 1);
        self.samples[0] = sample;
        self.len = (self.len + 1).min(depth);
        self.average().unwrap_or(sample)
    }

    /// Populated samples, most recent first
    pub fn samples(&self) -> &[f32] {
        &self.samples[..self.len as usize]
    }

    /// Number of populated samples
    pub fn len(&self) -> u8 {
        self.len
    }

    /// True before the first sample
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Arithmetic mean of the populated samples
    pub fn average(&self) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let sum: f64 = self.samples().iter().map(|s| *s as f64).sum();
        Some((sum / self.len as f64) as f32)
    }

    /// Forget all samples
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

/// Bounded retry with exponential backoff around each register transaction
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u8,
    initial_backoff_ms: u32,
    max_backoff_ms: u32,
}
impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 10, 1000)
    }
}
impl RetryPolicy {
    /// `max_attempts` of 0 is treated as 1
    pub const fn new(max_attempts: u8, initial_backoff_ms: u32, max_backoff_ms: u32) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    /// Give up on the first failure
    pub const fn none() -> Self {
        Self::new(1, 0, 0)
    }

    /// Change the number of attempts
    pub const fn with_max_attempts(self, max_attempts: u8) -> Self {
        Self::new(max_attempts, self.initial_backoff_ms, self.max_backoff_ms)
    }

    /// Change the backoff bounds
    pub const fn with_backoff_ms(self, initial_backoff_ms: u32, max_backoff_ms: u32) -> Self {
        Self::new(self.max_attempts, initial_backoff_ms, max_backoff_ms)
    }

    /// Total attempts per transaction
    pub const fn max_attempts(&self) -> u8 {
        self.max_attempts
    }

    /// Delay before the retry that follows failed attempt number `attempt` (1-based)
    pub fn backoff_ms(&self, attempt: u8) -> u32 {
        let shift = attempt.saturating_sub(1).min(31) as u32;
        self.initial_backoff_ms
            .checked_mul(1 << shift)
            .unwrap_or(u32::MAX)
            .min(self.max_backoff_ms)
    }
}

/// One failed bus attempt
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TransportFailure {
    /// 7-bit device address
    pub address: u8,
    /// register being accessed
    pub register: Register,
    /// 1-based attempt number
    pub attempt: u8,
    /// true when no further attempt will be made
    pub final_attempt: bool,
}

/// Gets told about every failed bus attempt, e.g. to run a bus scan or count errors
pub trait BusObserver {
    /// Called after each failed attempt, before any backoff delay
    fn transport_error(&mut self, failure: TransportFailure);
}

/// Observer that ignores everything
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;
impl BusObserver for NoopObserver {
    fn transport_error(&mut self, _failure: TransportFailure) {}
}
impl<F: FnMut(TransportFailure)> BusObserver for F {
    fn transport_error(&mut self, failure: TransportFailure) {
        self(failure)
    }
}

/// Bytes to write for a calibration request
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum CalibrationWrite {
    /// absolute calibration point in tenths of %vol
    Manual(u8),
    /// 8-bit key for legacy firmware
    AutoLegacy(u8),
    /// 16-bit key
    Auto(u16),
}
impl CalibrationWrite {
    /// Encode `calibrate(vol, mv)` for the given firmware, `None` for non-finite input
    pub(crate) fn new(version: Version, vol: f32, mv: f32) -> Option<Self> {
        if !vol.is_finite() || !mv.is_finite() {
            return None;
        }
        if libm::fabsf(mv) < MANUAL_CALIBRATION_EPSILON {
            let point = libm::roundf(vol * 10.0);
            if !point.is_finite() {
                return None;
            }
            // low byte of the rounded point, two's complement for negatives
            let mut low = libm::fmodf(point, 256.0);
            if low < 0.0 {
                low += 256.0;
            }
            return Some(CalibrationWrite::Manual(low as u8));
        }
        let key = libm::roundf((vol / mv) * 1000.0);
        if !key.is_finite() {
            return None;
        }
        Some(match version {
            Version::Legacy => CalibrationWrite::AutoLegacy(key.clamp(0.0, u8::MAX as f32) as u8),
            _ => CalibrationWrite::Auto(key.clamp(0.0, u16::MAX as f32) as u16),
        })
    }

    pub(crate) fn register(&self) -> Register {
        match self {
            CalibrationWrite::Manual(_) => Register::UserSet,
            CalibrationWrite::AutoLegacy(_) => Register::AutoSetLegacy,
            CalibrationWrite::Auto(_) => Register::AutoSet,
        }
    }

    /// Payload and its length
    pub(crate) fn payload(&self) -> ([u8; 2], usize) {
        match self {
            CalibrationWrite::Manual(b) | CalibrationWrite::AutoLegacy(b) => ([*b, 0], 1),
            CalibrationWrite::Auto(key) => (key.to_le_bytes(), 2),
        }
    }
}

/// Register transfer performed by the retry loop
pub(crate) enum Transfer<'a> {
    Read(&'a mut [u8]),
    Write(&'a [u8]),
}

/// Bus-independent driver state shared by the blocking and async drivers
#[derive(Debug)]
pub(crate) struct State {
    pub(crate) i2c_addr: I2cAddr,
    pub(crate) retry: RetryPolicy,
    pub(crate) version: Version,
    pub(crate) key: f32,
    pub(crate) window: SmoothingWindow,
}
impl State {
    pub(crate) fn new(i2c_addr: I2cAddr, retry: RetryPolicy, raw_version: u8) -> Self {
        let version = Version::from(raw_version);
        debug!("sen0322: detected firmware version {}", version);
        Self {
            i2c_addr,
            retry,
            version,
            key: DEFAULT_KEY,
            window: SmoothingWindow::new(),
        }
    }

    /// Report a failed attempt; `Ok` holds the backoff before the next one.
    pub(crate) fn on_failure<E, O: BusObserver>(
        i2c_addr: I2cAddr,
        retry: &RetryPolicy,
        observer: &mut O,
        register: Register,
        attempt: u8,
        error: E,
    ) -> Result<u32, Error<E>> {
        let final_attempt = attempt >= retry.max_attempts();
        warn!(
            "sen0322: transfer to register 0x{:02x} failed (attempt {}/{})",
            register.addr(),
            attempt,
            retry.max_attempts()
        );
        observer.transport_error(TransportFailure {
            address: i2c_addr.as_u8(),
            register,
            attempt,
            final_attempt,
        });
        if final_attempt {
            Err(Error::TransportUnavailable { error, attempts: attempt })
        } else {
            Ok(retry.backoff_ms(attempt))
        }
    }

    pub(crate) fn check_collect<E>(collect: u8) -> Result<(), Error<E>> {
        if collect == 0 || collect > MAX_COLLECT {
            warn!("sen0322: collect count {} outside 1..={}", collect, MAX_COLLECT);
            return Err(Error::InvalidInputData);
        }
        Ok(())
    }

    pub(crate) fn set_key(&mut self, raw: [u8; 2]) {
        self.key = raw_key_to_key(u16::from_le_bytes(raw));
        debug!("sen0322: calibration key {}", self.key);
    }

    pub(crate) fn record_sample(&mut self, raw: [u8; 3], collect: u8) -> f32 {
        let concentration = self.key * raw_sample_to_value(raw);
        self.window.push(concentration, collect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn zero_key_register_uses_default() {
        assert_eq!(raw_key_to_key(0), 20.9 / 120.0);
        assert!(approx(raw_key_to_key(1000), 1.0));
        assert!(approx(raw_key_to_key(0xFFFF), 65.535));
    }

    #[test]
    fn raw_sample_digits() {
        assert!(approx(raw_sample_to_value([20, 5, 0]), 20.5));
        assert!(approx(raw_sample_to_value([0, 9, 9]), 0.99));
    }

    #[test]
    fn version_classification() {
        assert_eq!(Version::from(0xFF), Version::Legacy);
        assert_eq!(Version::from(0x01), Version::Current);
        assert_eq!(Version::from(0x02), Version::Unknown(0x02));
        assert!(!Version::Legacy.has_extended_registers());
        assert!(Version::Unknown(0x00).has_extended_registers());
    }

    #[test]
    fn probe_life_passes_raw_through() {
        assert_eq!(ProbeLifeStatus::from(0), ProbeLifeStatus::Exhausted);
        assert_eq!(ProbeLifeStatus::from(1), ProbeLifeStatus::Normal);
        assert_eq!(ProbeLifeStatus::from(7).raw(), Some(7));
        assert_eq!(ProbeLifeStatus::Unsupported.raw(), None);
    }

    #[test]
    fn window_saturates_at_depth() {
        let mut window = SmoothingWindow::new();
        assert_eq!(window.average(), None);
        assert!(approx(window.push(1.0, 3), 1.0));
        assert!(approx(window.push(2.0, 3), 1.5));
        assert!(approx(window.push(3.0, 3), 2.0));
        assert!(approx(window.push(4.0, 3), 3.0));
        assert_eq!(window.len(), 3);
        assert_eq!(window.samples(), &[4.0, 3.0, 2.0]);
    }

    #[test]
    fn window_shrinks_with_depth() {
        let mut window = SmoothingWindow::new();
        for s in 1..=10 {
            window.push(s as f32, 10);
        }
        assert_eq!(window.len(), 10);
        assert!(approx(window.push(11.0, 2), 10.5));
        assert_eq!(window.len(), 2);
        // growing again keeps the shifted history contiguous
        assert!(approx(window.push(12.0, 4), 11.0));
        assert_eq!(window.samples(), &[12.0, 11.0, 10.0]);
    }

    #[test]
    fn window_full_depth() {
        let mut window = SmoothingWindow::new();
        for _ in 0..150 {
            window.push(2.0, MAX_COLLECT);
        }
        assert_eq!(window.len(), MAX_COLLECT);
        assert!(approx(window.average().unwrap(), 2.0));
        window.clear();
        assert!(window.is_empty());
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.backoff_ms(1), 10);
        assert_eq!(policy.backoff_ms(2), 20);
        assert_eq!(policy.backoff_ms(7), 640);
        assert_eq!(policy.backoff_ms(8), 1000);
        assert_eq!(policy.backoff_ms(200), 1000);
        assert_eq!(RetryPolicy::new(0, 5, 5).max_attempts(), 1);
        assert_eq!(RetryPolicy::none().with_max_attempts(4).max_attempts(), 4);
    }

    #[test]
    fn manual_calibration_encoding() {
        let write = CalibrationWrite::new(Version::Current, 20.9, 0.0).unwrap();
        assert_eq!(write, CalibrationWrite::Manual(209));
        assert_eq!(write.register(), Register::UserSet);
        assert_eq!(write.payload(), ([209, 0], 1));
        // 30.0 %vol -> 300 -> low byte only
        assert_eq!(
            CalibrationWrite::new(Version::Legacy, 30.0, 0.0000001),
            Some(CalibrationWrite::Manual((300 & 0xFF) as u8))
        );
    }

    #[test]
    fn manual_calibration_keeps_low_byte_of_large_points() {
        // 1e10 is a multiple of 256
        assert_eq!(CalibrationWrite::new(Version::Current, 1.0e9, 0.0), Some(CalibrationWrite::Manual(0)));
        assert_eq!(CalibrationWrite::new(Version::Current, 25.7, 0.0), Some(CalibrationWrite::Manual(1)));
        // -1 & 0xFF
        assert_eq!(CalibrationWrite::new(Version::Current, -0.1, 0.0), Some(CalibrationWrite::Manual(0xFF)));
        assert_eq!(CalibrationWrite::new(Version::Current, -25.6, 0.0), Some(CalibrationWrite::Manual(0)));
    }

    #[test]
    fn auto_calibration_encoding() {
        assert_eq!(
            CalibrationWrite::new(Version::Legacy, 20.9, 120.0),
            Some(CalibrationWrite::AutoLegacy(174))
        );
        assert_eq!(
            CalibrationWrite::new(Version::Legacy, 20.9, 10.0),
            Some(CalibrationWrite::AutoLegacy(255))
        );
        let write = CalibrationWrite::new(Version::Current, 20.9, 10.0).unwrap();
        assert_eq!(write.register(), Register::AutoSet);
        let (bytes, len) = write.payload();
        assert_eq!(len, 2);
        assert_eq!(u16::from_le_bytes(bytes), 2090);
        assert_eq!(
            CalibrationWrite::new(Version::Unknown(3), 20.9, 10.0),
            Some(CalibrationWrite::Auto(2090))
        );
    }

    #[test]
    fn calibration_rejects_non_finite() {
        assert_eq!(CalibrationWrite::new(Version::Current, f32::NAN, 0.0), None);
        assert_eq!(CalibrationWrite::new(Version::Current, 20.9, f32::INFINITY), None);
        assert_eq!(CalibrationWrite::new(Version::Current, f32::MAX, 1e-3), None);
        assert_eq!(CalibrationWrite::new(Version::Legacy, f32::MAX, 0.0), None);
    }

    #[test]
    fn collect_bounds() {
        assert_eq!(State::check_collect::<()>(0), Err(Error::InvalidInputData));
        assert_eq!(State::check_collect::<()>(101), Err(Error::InvalidInputData));
        assert_eq!(State::check_collect::<()>(1), Ok(()));
        assert_eq!(State::check_collect::<()>(100), Ok(()));
    }
}
