//! # WIFI station client
//!
//! Joining a network and sending single TCP/UDP messages is supported. The connection state is
//! never cached but queried from the module on each call.
//!
//! Joining and sending do not report the outcome of the network operation directly. Instead the
//! state gets polled by [Adapter::is_attached] and [Adapter::send_ok].
//!
//! ## Example
//!
//! ````
//! # use esp_at_wifi::example::{ExampleTimer, ExampleTransport};
//! # use esp_at_wifi::wifi::{Adapter, MessageKind};
//! #
//! let mut adapter: Adapter<_, _, 1_000_000> = Adapter::new(ExampleTransport::default(), ExampleTimer::default());
//! adapter.initialize(4, 5, 115_200);
//!
//! // Joining the network and checking the result
//! adapter.attach("test_wifi", "secret").unwrap();
//! assert!(adapter.is_attached(None));
//!
//! // Sending a single UDP message
//! let _ = adapter.send(MessageKind::Udp, "10.0.0.1", 5000, b"hallo!");
//! assert!(adapter.send_ok());
//! ````
use crate::commands::{
    AccessPointConnectCommand, AccessPointDisconnectCommand, AccessPointStatusCommand, CloseConnectionCommand,
    CommandErrorHandler, ConnectCommand, TransmissionModeCommand, TransmissionPrepareCommand, WifiModeCommand,
};
use crate::session::{self, MatchMode, Session, NO_ACCESS_POINT, OK};
use crate::transport::{Line, Transport, TransportConfig};
use atat::AtatCmd;
use core::fmt::Write;
use core::net::SocketAddr;
use fugit_timer::Timer;
use heapless::String;

/// Protocol of a single message
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Tcp,
    Udp,
}

impl MessageKind {
    /// Connection type literal of CIPSTART command
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Tcp => "TCP",
            MessageKind::Udp => "UDP",
        }
    }
}

/// Possible errors when joining an access point
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JoinError {
    /// Setting WIFI mode to station was not confirmed
    ModeError,

    /// Join command could not be written
    ConnectError,

    /// Given SSD is longer then the max. size of 32 chars
    InvalidSSDLength,

    /// Given password is longer then the max. size of 63 chars
    InvalidPasswordLength,

    /// SSID or password contains a double quote, which can not be embedded in the join command
    InvalidCharacter,
}

#[cfg(feature = "defmt")]
impl defmt::Format for JoinError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            JoinError::ModeError => defmt::write!(f, "JoinError::ModeError"),
            JoinError::ConnectError => defmt::write!(f, "JoinError::ConnectError"),
            JoinError::InvalidSSDLength => defmt::write!(f, "JoinError::InvalidSSDLength"),
            JoinError::InvalidPasswordLength => defmt::write!(f, "JoinError::InvalidPasswordLength"),
            JoinError::InvalidCharacter => defmt::write!(f, "JoinError::InvalidCharacter"),
        }
    }
}

/// First failed step of [Adapter::send]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SendError {
    /// Remote address is longer then 64 chars or contains a double quote
    InvalidAddress,

    /// CIPMODE command for disabling transparent transmission failed
    TransmissionModeError,

    /// CIPSTART command failed
    ConnectError,

    /// CIPSEND command could not be written
    PrepareError,

    /// Send prompt was not received
    PromptError,

    /// Payload could not be written or transmission was not confirmed
    TransmissionError,

    /// CIPCLOSE command failed
    CloseError,
}

#[cfg(feature = "defmt")]
impl defmt::Format for SendError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            SendError::InvalidAddress => defmt::write!(f, "SendError::InvalidAddress"),
            SendError::TransmissionModeError => defmt::write!(f, "SendError::TransmissionModeError"),
            SendError::ConnectError => defmt::write!(f, "SendError::ConnectError"),
            SendError::PrepareError => defmt::write!(f, "SendError::PrepareError"),
            SendError::PromptError => defmt::write!(f, "SendError::PromptError"),
            SendError::TransmissionError => defmt::write!(f, "SendError::TransmissionError"),
            SendError::CloseError => defmt::write!(f, "SendError::CloseError"),
        }
    }
}

/// One-slot mailbox holding the outcome of the last send operation
///
/// Gets overwritten by each send and cleared when read.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SendStatus {
    failed: bool,
}

impl SendStatus {
    /// Stores the outcome of a send operation
    pub fn record(&mut self, result: &Result<(), SendError>) {
        self.failed = result.is_err();
    }

    /// Marks the pending send operation as failed until proven otherwise
    pub fn mark_pending(&mut self) {
        self.failed = true;
    }

    /// Returns false and clears the failure if the last send failed, otherwise true
    pub fn take_ok(&mut self) -> bool {
        if self.failed {
            self.failed = false;
            return false;
        }

        true
    }
}

/// WIFI network adapter
pub struct Adapter<T: Transport, D: Timer<TIMER_HZ>, const TIMER_HZ: u32> {
    /// AT command session
    pub(crate) session: Session<T, D, TIMER_HZ>,

    /// Outcome of the last send operation
    status: SendStatus,
}

impl<T: Transport, D: Timer<TIMER_HZ>, const TIMER_HZ: u32> Adapter<T, D, TIMER_HZ> {
    /// Creates a new adapter. Transport gets configured by [Adapter::initialize].
    pub fn new(transport: T, timer: D) -> Self {
        Self {
            session: Session::new(transport, timer),
            status: SendStatus::default(),
        }
    }

    /// Restarts the module and configures the serial line with the given pins and baud rate.
    /// May be the first call after power-on.
    ///
    /// Returns true if the module is responding after restart.
    pub fn initialize(&mut self, tx_pin: u8, rx_pin: u8, baud_rate: u32) -> bool {
        self.session.configure(TransportConfig::new(tx_pin, rx_pin, baud_rate));
        let ready = self.session.reset_and_rebaud(baud_rate);

        if !ready {
            warn!("Module did not respond after restart");
        }

        ready
    }

    /// Joins the given access point.
    ///
    /// The join outcome (OK, FAIL or ERROR) is not returned, it needs to be checked by [Adapter::is_attached].
    /// Errors are only returned for invalid credentials or if station mode was not accepted.
    pub fn attach(&mut self, ssid: &str, password: &str) -> Result<(), JoinError> {
        let command = AccessPointConnectCommand::new(ssid, password)?;
        self.expect(WifiModeCommand::station_mode())?;

        self.session.send_command(&command).map_err(|_| JoinError::ConnectError)?;
        let mut outcome = Line::new();
        self.session.receive_until(|line| {
            if session::is_terminator(line) {
                let _ = outcome.push_str(line);
                return true;
            }

            false
        });

        debug!("Join finished by {}", outcome.as_str());
        Ok(())
    }

    /// Returns true if the module is joined to an access point
    ///
    /// The SSID argument is accepted for compatibility, but does not filter by network name.
    /// Use [Adapter::attached_ssid] for checking the network name.
    pub fn is_attached(&mut self, _ssid: Option<&str>) -> bool {
        let lines = self.session.send_and_collect(&AccessPointStatusCommand);
        is_attached_response(&lines)
    }

    /// Returns the SSID of the joined access point
    pub fn attached_ssid(&mut self) -> Option<String<32>> {
        let lines = self.session.send_and_collect(&AccessPointStatusCommand);
        if !is_attached_response(&lines) {
            return None;
        }

        lines.iter().find_map(|line| parse_ssid(line.as_str()))
    }

    /// Disconnects from the current access point. The result is ignored.
    pub fn detach(&mut self) {
        let _ = self.session.expect_ok(&AccessPointDisconnectCommand);
    }

    /// Sends a single message to the given remote: connects, transmits the payload and closes the connection.
    ///
    /// The outcome is stored and can be polled by [Adapter::send_ok]. Any failing step skips all following steps.
    pub fn send(&mut self, kind: MessageKind, address: &str, port: u16, message: &[u8]) -> Result<(), SendError> {
        self.status.mark_pending();
        let result = self.transmit(kind, address, port, message);

        if let Err(error) = &result {
            debug!("Sending message failed: {:?}", error);
        }

        self.status.record(&result);
        result
    }

    /// Same as [Adapter::send], but takes a socket address
    pub fn send_to(&mut self, kind: MessageKind, remote: SocketAddr, message: &[u8]) -> Result<(), SendError> {
        let mut address: String<64> = String::new();
        if write!(address, "{}", remote.ip()).is_err() {
            self.status.record(&Err(SendError::InvalidAddress));
            return Err(SendError::InvalidAddress);
        }

        self.send(kind, address.as_str(), remote.port(), message)
    }

    /// Returns false if the last send operation failed. Reading clears the failure.
    pub fn send_ok(&mut self) -> bool {
        self.status.take_ok()
    }

    /// Returns the outcome mailbox of the last send operation without clearing it
    pub fn status(&self) -> SendStatus {
        self.status
    }

    /// Sets the time waited for the module to reboot in ms
    pub fn set_settle_time_ms(&mut self, settle_time: u32) {
        self.session.set_settle_time_ms(settle_time);
    }

    /// Releases the transport and timer
    pub fn release(self) -> (T, D) {
        self.session.release()
    }

    fn transmit(&mut self, kind: MessageKind, address: &str, port: u16, message: &[u8]) -> Result<(), SendError> {
        let connect = ConnectCommand::new(kind, address, port)?;

        self.expect(TransmissionModeCommand::normal())?;
        self.expect(connect)?;

        self.session
            .send_command(&TransmissionPrepareCommand::new(message.len()))
            .map_err(|_| SendError::PrepareError)?;

        if !self.session.await_prompt() {
            return Err(SendError::PromptError);
        }

        self.session.write_payload(message).map_err(|_| SendError::TransmissionError)?;
        if !self.await_send_confirmation() {
            return Err(SendError::TransmissionError);
        }

        self.expect(CloseConnectionCommand)
    }

    /// Waits for a line ending with OK, e.g. "SEND OK"
    fn await_send_confirmation(&mut self) -> bool {
        let mut confirmed = false;

        self.session.receive_until(|line| {
            if session::matches(line, OK, MatchMode::Suffix) {
                confirmed = true;
                return true;
            }

            session::matches(line, session::ERROR, MatchMode::Exact) || session::matches(line, session::FAIL, MatchMode::Suffix)
        });

        confirmed
    }

    /// Sends a command and maps the error if the command was not answered by OK
    fn expect<Cmd: AtatCmd + CommandErrorHandler>(
        &mut self,
        command: Cmd,
    ) -> Result<(), <Cmd as CommandErrorHandler>::Error> {
        if !self.session.expect_ok(&command) {
            return Err(<Cmd as CommandErrorHandler>::ERROR);
        }

        Ok(())
    }
}

/// Checks the trailing lines of CWJAP? response
fn is_attached_response(lines: &[Line]) -> bool {
    if lines.len() < 2 {
        return false;
    }

    let last = lines[lines.len() - 1].as_str();
    let second_last = lines[lines.len() - 2].as_str();

    !session::matches(second_last, NO_ACCESS_POINT, MatchMode::Exact) && session::matches(last, OK, MatchMode::Exact)
}

/// Parses the SSID of a '+CWJAP:"<ssid>",...' line
fn parse_ssid(line: &str) -> Option<String<32>> {
    let remainder = line.strip_prefix("+CWJAP:\"")?;
    let end = remainder.find('"')?;

    String::try_from(&remainder[..end]).ok()
}
