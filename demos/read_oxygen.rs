use linux_embedded_hal::{Delay, I2cdev};
use sen0322::{I2cAddr, Sen0322};
use std::thread;
use std::time::Duration;

/// Readings averaged per result, 1..=100
const COLLECT: u8 = 10;
const PERIOD: Duration = Duration::from_secs(1);

fn main() {
    let device = I2cdev::new("/dev/i2c-1").expect("could not open i2c device");
    let mut sensor = Sen0322::new(device, Delay, I2cAddr::Addr11).expect("sensor not found");
    println!("firmware: {}", sensor.version());

    loop {
        match sensor.oxygen_concentration(COLLECT) {
            Ok(vol) => println!("oxygen concentration is {vol:.2} %vol"),
            Err(e) => eprintln!("error: {e}"),
        }
        thread::sleep(PERIOD);
    }
}
