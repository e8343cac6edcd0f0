use crate::fmt::trace;
use crate::hw_def::*;
use crate::types::*;

use embedded_hal::{delay::DelayNs, i2c::I2c};

impl<I2C, Delay, E> Sen0322<I2C, Delay, NoopObserver>
where
    I2C: I2c<Error = E>,
    Delay: DelayNs,
{
    /// Create a new SEN0322 driver instance with the default retry policy.
    ///
    /// Reads the version register to detect the firmware generation.
    pub fn new(i2c: I2C, delay: Delay, i2c_addr: I2cAddr) -> Result<Self, Error<E>> {
        Self::with_policy(i2c, delay, i2c_addr, RetryPolicy::default(), NoopObserver)
    }
}

impl<I2C, Delay, Obs, E> Sen0322<I2C, Delay, Obs>
where
    I2C: I2c<Error = E>,
    Delay: DelayNs,
    Obs: BusObserver,
{
    /// Create a new SEN0322 driver instance with an explicit retry policy and failure observer
    pub fn with_policy(
        mut i2c: I2C,
        mut delay: Delay,
        i2c_addr: I2cAddr,
        retry: RetryPolicy,
        mut observer: Obs,
    ) -> Result<Self, Error<E>> {
        let mut buf = [0u8; 1];
        let mut attempt = 0;
        loop {
            attempt += 1;
            trace!("sen0322::with_policy(): read 1 byte(s) from 0x{:02x}", Register::Version.addr());
            match i2c.write_read(i2c_addr.as_u8(), &[Register::Version.addr()], &mut buf) {
                Ok(()) => break,
                Err(e) => {
                    let backoff = State::on_failure(i2c_addr, &retry, &mut observer, Register::Version, attempt, e)?;
                    delay.delay_ms(backoff);
                }
            }
        }
        Ok(Self {
            i2c,
            delay,
            observer,
            state: State::new(i2c_addr, retry, buf[0]),
        })
    }

    /// Destroy the driver and hand back the bus and delay
    pub fn release(self) -> (I2C, Delay) {
        (self.i2c, self.delay)
    }

    fn transfer(&mut self, register: Register, mut transfer: Transfer<'_>) -> Result<(), Error<E>> {
        let addr = self.state.i2c_addr.as_u8();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match &mut transfer {
                Transfer::Read(buf) => {
                    trace!("sen0322::transfer(): read {} byte(s) from 0x{:02x}", buf.len(), register.addr());
                    self.i2c.write_read(addr, &[register.addr()], buf)
                }
                Transfer::Write(bytes) => {
                    trace!("sen0322::transfer(): write {} byte(s) to 0x{:02x}", bytes.len(), register.addr());
                    let mut frame = [0u8; 3];
                    frame[0] = register.addr();
                    frame[1..=bytes.len()].copy_from_slice(bytes);
                    self.i2c.write(addr, &frame[..=bytes.len()])
                }
            };
            match result {
                Ok(()) => return Ok(()),
                Err(e) => {
                    let backoff = State::on_failure(
                        self.state.i2c_addr,
                        &self.state.retry,
                        &mut self.observer,
                        register,
                        attempt,
                        e,
                    )?;
                    self.delay.delay_ms(backoff);
                }
            }
        }
    }

    /// Firmware generation detected at construction
    pub fn version(&self) -> Version {
        self.state.version
    }

    /// Calibration key from the last refresh
    pub fn calibration_key(&self) -> f32 {
        self.state.key
    }

    /// Samples currently held for smoothing
    pub fn window(&self) -> &SmoothingWindow {
        &self.state.window
    }

    /// Read the stored calibration key and keep it for subsequent conversions
    pub fn read_flash_calibration(&mut self) -> Result<f32, Error<E>> {
        let mut raw = [0u8; 2];
        self.transfer(Register::Key, Transfer::Read(&mut raw))?;
        self.delay.delay_ms(KEY_READ_SETTLE_MS);
        self.state.set_key(raw);
        Ok(self.state.key)
    }

    /// Calibrate against a known concentration.
    ///
    /// `vol` is the oxygen concentration in %vol.  With `mv` (the probe output in mV at that
    /// concentration) equal to zero, `vol` is stored as an absolute calibration point.
    pub fn calibrate(&mut self, vol: f32, mv: f32) -> Result<(), Error<E>> {
        let write = CalibrationWrite::new(self.state.version, vol, mv).ok_or(Error::InvalidInputData)?;
        let (bytes, len) = write.payload();
        self.transfer(write.register(), Transfer::Write(&bytes[..len]))
    }

    /// Oxygen concentration in %vol, averaged over the last `collect` readings (1..=100)
    pub fn oxygen_concentration(&mut self, collect: u8) -> Result<f32, Error<E>> {
        State::check_collect(collect)?;
        self.read_flash_calibration()?;
        let mut raw = [0u8; 3];
        self.transfer(Register::OxygenData, Transfer::Read(&mut raw))?;
        Ok(self.state.record_sample(raw, collect))
    }

    /// Probe lifespan; no bus traffic on legacy firmware
    pub fn probe_life_status(&mut self) -> Result<ProbeLifeStatus, Error<E>> {
        if !self.state.version.has_extended_registers() {
            return Ok(ProbeLifeStatus::Unsupported);
        }
        let mut raw = [0u8; 1];
        self.transfer(Register::ProbeLife, Transfer::Read(&mut raw))?;
        Ok(ProbeLifeStatus::from(raw[0]))
    }

    /// Read the raw version register
    pub fn read_version(&mut self) -> Result<u8, Error<E>> {
        let mut raw = [0u8; 1];
        self.transfer(Register::Version, Transfer::Read(&mut raw))?;
        Ok(raw[0])
    }

    /// Uncalibrated probe current in µA
    pub fn raw_current(&mut self) -> Result<f32, Error<E>> {
        let mut raw = [0u8; 3];
        self.transfer(Register::OxygenData, Transfer::Read(&mut raw))?;
        Ok(raw_sample_to_value(raw))
    }
}
