use std::env;

use dps_psu::{clock::StdClock, psu::Dps};
use inquire::Select;
use serialport::SerialPort;

// Configuration constants - adjust these for your setup
const BAUD_RATE: u32 = 9600;
// Reads block at most this long, the client polls `bytes_to_read` before reading anyway.
const SERIAL_TIMEOUT_MS: u64 = 300;
const OUTPUT_VOLTAGE_V: f32 = 5.0;
const CURRENT_LIMIT_A: f32 = 0.1;
const STABILIZATION_DELAY_MS: u64 = 1000;

pub struct PortWrapper(Box<dyn SerialPort>);

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::NotConnected => embedded_io::ErrorKind::NotConnected,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            std::io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::ReadReady for PortWrapper {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        self.0
            .bytes_to_read()
            .map(|pending| pending > 0)
            .map_err(|err| IoError(err.into()))
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

fn main() {
    env_logger::init();

    // Get serial port from command line arg or interactive selection.
    // Bluetooth modules show up as e.g. /dev/rfcomm0 once bound.
    let port_name = env::args().nth(1).unwrap_or_else(|| {
        let ports = serialport::available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();

        Select::new("Select a serial port:", port_names)
            .prompt()
            .expect("Failed to select port")
    });

    println!("Using port: {}", port_name);

    let port = serialport::new(&port_name, BAUD_RATE)
        .timeout(std::time::Duration::from_millis(SERIAL_TIMEOUT_MS))
        .open()
        .expect("Failed to open serial port");

    let mut psu = Dps::new(StdClock::new());
    psu.connect(PortWrapper(port))
        .expect("Failed to read initial state");

    println!("{:#?}", psu.snapshot());

    psu.set_voltage(OUTPUT_VOLTAGE_V).unwrap();
    println!("Set output voltage to {}V", psu.voltage_set());

    psu.set_current(CURRENT_LIMIT_A).unwrap();
    println!("Set current limit to {}A", psu.current_set());

    psu.set_power_state(true).unwrap();
    println!("Output enabled");

    std::thread::sleep(std::time::Duration::from_millis(STABILIZATION_DELAY_MS));

    psu.refresh().unwrap();
    println!(
        "Measured: {:.2}V {:.3}A {:.2}W (input {}V)",
        psu.voltage_out(),
        psu.current_out(),
        psu.power_out(),
        psu.input_voltage()
    );

    psu.toggle_power_state().unwrap();
    println!("Output is now {:?}", psu.power_state());

    // Hand the port back before exiting.
    drop(psu.close());
}
