//! Print the probe lifespan status once per second.
//!
//! Set the A0/A1 dial switch to match `ADDRESS` (both on: 0x73).

use linux_embedded_hal::{Delay, I2cdev};
use sen0322::{I2cAddr, ProbeLifeStatus, RetryPolicy, Sen0322, TransportFailure};
use std::thread;
use std::time::Duration;

const ADDRESS: I2cAddr = I2cAddr::Addr11;
const PERIOD: Duration = Duration::from_secs(1);

fn main() {
    let device = I2cdev::new("/dev/i2c-1").expect("could not open i2c device");

    let mut sensor = Sen0322::with_policy(
        device,
        Delay,
        ADDRESS,
        RetryPolicy::default().with_max_attempts(5).with_backoff_ms(100, 1000),
        |failure: TransportFailure| {
            eprintln!(
                "no answer from 0x{:02X} (register {:?}, attempt {})",
                failure.address, failure.register, failure.attempt
            )
        },
    )
    .expect("sensor not found");

    // legacy firmware has no probe lifespan register
    loop {
        match sensor.probe_life_status() {
            Ok(ProbeLifeStatus::Exhausted) => {
                println!("The sensor probe is abnormal! It is recommended to replace the sensor probe.")
            }
            Ok(ProbeLifeStatus::Normal) => println!("The sensor probe is normal!"),
            Ok(ProbeLifeStatus::Unsupported) => println!("This sensor version does not support this function!"),
            Ok(ProbeLifeStatus::Unknown(_)) => {}
            Err(e) => eprintln!("error: {e}"),
        }
        thread::sleep(PERIOD);
    }
}
