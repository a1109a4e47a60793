//! # Serial transport for embedded-io peripherals
//!
//! [SerialTransport] implements [Transport] for any UART which implements the [embedded_io]
//! traits. Setting baud rate and buffer sizes is not covered by [embedded_io], so the peripheral
//! needs to implement [SerialPort] additionally.
use crate::transport::{Line, Transport, TransportConfig, TransportError, LINE_SIZE};
use embedded_io::{Read, ReadReady, Write};
use fugit::TimerDurationU32;
use fugit_timer::Timer;
use heapless::Vec;

/// Peripheral specific configuration of the serial line
pub trait SerialPort {
    /// Applies baud rate and framing
    fn set_config(&mut self, config: &TransportConfig);

    /// Sets the size of the hardware/driver receive buffer
    fn set_rx_buffer_size(&mut self, size: usize);
}

/// Line based transport on top of a serial peripheral
pub struct SerialTransport<S, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> {
    serial: S,

    /// Timer used for timeout measurement
    timer: T,

    /// Max. waiting time for a single line or byte
    read_timeout: TimerDurationU32<TIMER_HZ>,

    /// Bytes of the currently assembled line
    buffer: Vec<u8, LINE_SIZE>,

    /// Set after an overflow, remaining bytes are dropped up to the next LF
    skip_line: bool,
}

impl<S, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> SerialTransport<S, T, TIMER_HZ>
where
    S: Read + Write + ReadReady + SerialPort,
{
    pub fn new(serial: S, timer: T) -> Self {
        Self {
            serial,
            timer,
            read_timeout: TimerDurationU32::millis(5_000),
            buffer: Vec::new(),
            skip_line: false,
        }
    }

    /// Sets the timeout for receiving a line in ms
    pub fn set_read_timeout_ms(&mut self, timeout: u32) {
        self.read_timeout = TimerDurationU32::millis(timeout);
    }

    /// Releases the serial peripheral and timer
    pub fn release(self) -> (S, T) {
        (self.serial, self.timer)
    }

    /// Returns the next received byte, or None if no byte is available yet
    fn next_byte(&mut self) -> Result<Option<u8>, TransportError> {
        if !self.serial.read_ready().map_err(|_| TransportError::Read)? {
            return Ok(None);
        }

        let mut byte = [0x0; 1];
        match self.serial.read(&mut byte) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(byte[0])),
            Err(_) => Err(TransportError::Read),
        }
    }

    /// Blocks until the next byte was received or the timer expired
    fn await_byte(&mut self) -> Result<u8, TransportError> {
        loop {
            if let Some(byte) = self.next_byte()? {
                return Ok(byte);
            }

            match self.timer.wait() {
                Ok(_) => return Err(TransportError::Timeout),
                Err(error) => match error {
                    nb::Error::Other(_) => return Err(TransportError::Timer),
                    nb::Error::WouldBlock => {}
                },
            }
        }
    }

    /// Converts the assembled bytes to a line and resets the buffer
    fn take_line(&mut self) -> Result<Line, TransportError> {
        let bytes = core::mem::take(&mut self.buffer);
        Line::from_utf8(bytes).map_err(|_| TransportError::Decode)
    }
}

impl<S, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> Transport for SerialTransport<S, T, TIMER_HZ>
where
    S: Read + Write + ReadReady + SerialPort,
{
    fn configure(&mut self, config: &TransportConfig) {
        self.serial.set_config(config);
    }

    /// Any partial line left by a previous timeout is dropped, as it can not belong to the response.
    fn write_line(&mut self, text: &str) -> Result<(), TransportError> {
        self.buffer.clear();

        self.serial.write_all(text.as_bytes()).map_err(|_| TransportError::Write)?;
        self.serial.write_all(b"\r\n").map_err(|_| TransportError::Write)?;
        self.serial.flush().map_err(|_| TransportError::Write)
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.serial.write_all(data).map_err(|_| TransportError::Write)?;
        self.serial.flush().map_err(|_| TransportError::Write)
    }

    /// Lines consisting only of whitespace (e.g. the blank line in front of most responses) are skipped.
    fn read_line(&mut self) -> Result<Line, TransportError> {
        self.timer.start(self.read_timeout).map_err(|_| TransportError::Timer)?;

        loop {
            let byte = self.await_byte()?;
            if self.skip_line {
                self.skip_line = byte != b'\n';
                continue;
            }

            match byte {
                b'\n' => {
                    let line = self.take_line()?;
                    if !line.trim().is_empty() {
                        return Ok(line);
                    }
                }
                b'\r' => {}
                byte => {
                    if self.buffer.push(byte).is_err() {
                        self.buffer.clear();
                        self.skip_line = true;
                        return Err(TransportError::Overflow);
                    }
                }
            }
        }
    }

    fn read_until_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        self.buffer.clear();
        self.skip_line = false;
        self.timer.start(self.read_timeout).map_err(|_| TransportError::Timer)?;

        while self.await_byte()? != byte {}
        Ok(())
    }

    fn set_receive_buffer_size(&mut self, size: usize) {
        self.serial.set_rx_buffer_size(size);
    }

    fn discard_buffered(&mut self) {
        self.buffer.clear();
        self.skip_line = false;

        let mut scratch = [0x0; 32];
        while let Ok(true) = self.serial.read_ready() {
            match self.serial.read(&mut scratch) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    }
}
