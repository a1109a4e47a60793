//! Example that runs on Linux using a serial-USB-adapter.
use std::{
    convert::Infallible,
    env, io,
    time::{Duration, Instant},
};

use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;

use esp_at_wifi::{
    serial::{SerialPort as EspSerialPort, SerialTransport},
    transport::{self as esp, TransportConfig},
    wifi::{Adapter, MessageKind},
};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

// Timer frequency in Hz
const TIMER_HZ: u32 = 1000;

fn main() {
    env_logger::init();

    // Parse args
    let args: Vec<String> = env::args().collect();
    if args.len() != 7 {
        println!("Usage: {} <path-to-serial> <baudrate> <ssid> <psk> <remote-ip> <remote-port>", args[0]);
        println!("Example: {} /dev/ttyUSB0 115200 mywifi hellopasswd123 10.0.0.1 5000", args[0]);
        println!("\nNote: To run the example with debug logging, run it like this:");
        println!("\n  RUST_LOG=trace cargo run --example linux --features log -- /dev/ttyUSB0 115200 mywifi hellopasswd123 10.0.0.1 5000");
        std::process::exit(1);
    }
    let dev = &args[1];
    let baud_rate: u32 = args[2].parse().expect("Invalid baud rate");
    let ssid = &args[3];
    let psk = &args[4];
    let remote_ip = &args[5];
    let remote_port: u16 = args[6].parse().expect("Invalid port");

    println!("Starting (dev={}, baud={:?})...", dev, baud_rate);

    // Open serial port
    let port = serialport::new(dev, baud_rate)
        .data_bits(DataBits::Eight)
        .flow_control(FlowControl::None)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .timeout(Duration::from_millis(500))
        .open()
        .expect("Could not open serial port");

    let transport: SerialTransport<_, _, TIMER_HZ> = SerialTransport::new(Uart { port }, SysTimer::new());
    let mut adapter: Adapter<_, _, TIMER_HZ> = Adapter::new(transport, SysTimer::new());

    // Pins are handled by the USB adapter
    println!("Restarting module...");
    if !adapter.initialize(0, 0, baud_rate) {
        panic!("Module is not responding");
    }

    // Join WIFI access point
    println!("Join WiFi \"{}\"...", ssid);
    adapter.attach(ssid, psk).expect("Invalid credentials");
    if !adapter.is_attached(None) {
        panic!("Could not join WiFi \"{}\"", ssid);
    }
    println!("Joined {:?}", adapter.attached_ssid());

    // Send a single UDP message
    println!("Sending message to {}:{}...", remote_ip, remote_port);
    let _ = adapter.send(MessageKind::Udp, remote_ip, remote_port, b"hello from esp-at-wifi");
    if adapter.send_ok() {
        println!("Message sent!");
    } else {
        println!("Sending message failed");
    }

    adapter.detach();
}

/// Serial port wrapper implementing the embedded-io traits
struct Uart {
    port: Box<dyn SerialPort>,
}

impl embedded_io::ErrorType for Uart {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Read for Uart {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match io::Read::read(&mut self.port, buf) {
            Ok(count) => Ok(count),
            Err(e) if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => {
                log::error!("Serial read error: {}", e);
                Err(embedded_io::ErrorKind::Other)
            }
        }
    }
}

impl embedded_io::ReadReady for Uart {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        self.port
            .bytes_to_read()
            .map(|count| count > 0)
            .map_err(|_| embedded_io::ErrorKind::Other)
    }
}

impl embedded_io::Write for Uart {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        io::Write::write(&mut self.port, buf).map_err(|_| embedded_io::ErrorKind::Other)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        io::Write::flush(&mut self.port).map_err(|_| embedded_io::ErrorKind::Other)
    }
}

impl EspSerialPort for Uart {
    fn set_config(&mut self, config: &TransportConfig) {
        let framing = config.framing;

        let data_bits = match framing.data_bits {
            esp::DataBits::Five => DataBits::Five,
            esp::DataBits::Six => DataBits::Six,
            esp::DataBits::Seven => DataBits::Seven,
            esp::DataBits::Eight => DataBits::Eight,
        };
        let parity = match framing.parity {
            esp::Parity::None => Parity::None,
            esp::Parity::Odd => Parity::Odd,
            esp::Parity::Even => Parity::Even,
        };
        let stop_bits = match framing.stop_bits {
            esp::StopBits::One => StopBits::One,
            esp::StopBits::OneAndHalf | esp::StopBits::Two => StopBits::Two,
        };
        let flow_control = match framing.flow_control {
            esp::FlowControl::None => FlowControl::None,
            _ => FlowControl::Hardware,
        };

        let result = self
            .port
            .set_baud_rate(config.baud_rate)
            .and_then(|_| self.port.set_data_bits(data_bits))
            .and_then(|_| self.port.set_parity(parity))
            .and_then(|_| self.port.set_stop_bits(stop_bits))
            .and_then(|_| self.port.set_flow_control(flow_control));

        if let Err(e) = result {
            log::error!("Unable to configure serial port: {}", e);
        }
    }

    fn set_rx_buffer_size(&mut self, size: usize) {
        // Buffer is managed by the OS driver
        log::debug!("Receive buffer size of {} bytes requested", size);
    }
}

/// Millisecond timer on top of the system clock
struct SysTimer {
    epoch: Instant,
    deadline: Instant,
}

impl SysTimer {
    fn new() -> Self {
        let now = Instant::now();
        Self { epoch: now, deadline: now }
    }
}

impl Timer<TIMER_HZ> for SysTimer {
    type Error = Infallible;

    fn now(&mut self) -> TimerInstantU32<TIMER_HZ> {
        // Wraps after ~49 days
        TimerInstantU32::from_ticks(self.epoch.elapsed().as_millis() as u32)
    }

    fn start(&mut self, duration: TimerDurationU32<TIMER_HZ>) -> Result<(), Self::Error> {
        self.deadline = Instant::now() + Duration::from_millis(duration.to_millis().into());
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), Self::Error> {
        self.deadline = Instant::now();
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        if Instant::now() >= self.deadline {
            return Ok(());
        }

        Err(nb::Error::WouldBlock)
    }
}
