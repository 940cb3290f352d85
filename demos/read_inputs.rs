//! Read the first inputs of a Fatek PLC and switch an output.
//!
//! ```text
//! cargo run --example read_inputs -- /dev/ttyUSB0
//! cargo run --example read_inputs -- socket://192.168.1.50:500
//! ```

use std::time::Duration;

use fatek_port0::{
    DiscreteAction, DriverConfig, SerialSettings, SharedStream, Station, control_discrete,
    open_link, read_discrete_states,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyUSB0".to_owned());

    println!("Fatek Port 0 on {port}");
    println!("====================\n");

    let link = open_link(&port, &SerialSettings::default())?;
    let stream = SharedStream::new(
        link,
        DriverConfig {
            retry_count: 3,
            timeout: Duration::from_secs(1),
            ..DriverConfig::default()
        },
    );
    let station = Station::default();

    for (discrete, on) in read_discrete_states(&stream, station, "X0".parse()?, 12)? {
        println!("{discrete}: {}", if on { "on" } else { "off" });
    }

    control_discrete(&stream, station, "Y0".parse()?, DiscreteAction::Set)?;
    println!("\nY0 set");

    Ok(())
}
