//! # Serial transport
//!
//! The session is decoupled from the concrete serial peripheral by the [Transport] trait. The
//! transport owns line framing, buffering and the read timeout. A timeout is reported as
//! [TransportError::Timeout] and always treated as a non-matching response by the session.
use heapless::String;

/// Baud rate the module is forced to during the reset sequence
pub const RESET_BAUD_RATE: u32 = 115_200;

/// Required size of the receive buffer in bytes.
///
/// The module answers status queries with bursts of several lines. Smaller buffers lead to
/// dropped bytes and therefore to lost terminator lines.
pub const RECEIVE_BUFFER_SIZE: usize = 254;

/// Max. length of a single response line
pub const LINE_SIZE: usize = RECEIVE_BUFFER_SIZE;

/// Single decoded response line, without CR/LF
pub type Line = String<LINE_SIZE>;

/// Number of data bits per character
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl DataBits {
    pub fn count(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

/// Parity bit mode
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Number of stop bits
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StopBits {
    One,
    OneAndHalf,
    Two,
}

/// Hardware flow control mode
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Rts,
    Cts,
    RtsCts,
}

/// Character framing of the serial line
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BitFraming {
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

impl Default for BitFraming {
    /// 8 data bits, no parity, 1 stop bit, no flow control
    fn default() -> Self {
        Self {
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }
}

/// Serial line parameters
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TransportConfig {
    /// TX pin of the host MCU, connected to RX of the module
    pub tx_pin: u8,

    /// RX pin of the host MCU, connected to TX of the module
    pub rx_pin: u8,

    pub baud_rate: u32,

    pub framing: BitFraming,
}

impl TransportConfig {
    pub fn new(tx_pin: u8, rx_pin: u8, baud_rate: u32) -> Self {
        Self {
            tx_pin,
            rx_pin,
            baud_rate,
            framing: BitFraming::default(),
        }
    }

    /// Returns a copy with the given baud rate
    pub fn with_baud_rate(&self, baud_rate: u32) -> Self {
        Self { baud_rate, ..*self }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new(0, 0, RESET_BAUD_RATE)
    }
}

/// Transport level failures
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// No (complete) line or byte was received within the read timeout
    Timeout,

    /// Received line exceeds [LINE_SIZE]
    Overflow,

    /// Received line is not valid UTF-8
    Decode,

    /// Upstream serial read error
    Read,

    /// Upstream serial write error
    Write,

    /// Upstream timer error
    Timer,
}

#[cfg(feature = "defmt")]
impl defmt::Format for TransportError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            TransportError::Timeout => defmt::write!(f, "TransportError::Timeout"),
            TransportError::Overflow => defmt::write!(f, "TransportError::Overflow"),
            TransportError::Decode => defmt::write!(f, "TransportError::Decode"),
            TransportError::Read => defmt::write!(f, "TransportError::Read"),
            TransportError::Write => defmt::write!(f, "TransportError::Write"),
            TransportError::Timer => defmt::write!(f, "TransportError::Timer"),
        }
    }
}

/// Byte oriented serial line with buffered line reading
pub trait Transport {
    /// Applies baud rate and framing. Calling it repeatedly with the same config has no further effect.
    fn configure(&mut self, config: &TransportConfig);

    /// Writes the given text followed by CRLF
    fn write_line(&mut self, text: &str) -> Result<(), TransportError>;

    /// Writes the given bytes as they are
    fn write_raw(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Blocks until the next non-empty line was received. CR/LF is stripped.
    ///
    /// Overlong lines result in [TransportError::Overflow], the remainder of such a line is not
    /// returned by the following call.
    fn read_line(&mut self) -> Result<Line, TransportError>;

    /// Drops incoming bytes until the given byte was received
    fn read_until_byte(&mut self, byte: u8) -> Result<(), TransportError>;

    /// Sets the size of the receive buffer
    fn set_receive_buffer_size(&mut self, size: usize);

    /// Discards all buffered but not yet consumed bytes
    fn discard_buffered(&mut self);
}
