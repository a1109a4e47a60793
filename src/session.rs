//! # AT command session
//!
//! Every exchange with the module is a command followed by a scan for a terminator line. The
//! session never reads a fixed number of lines and never retries on its own.
//!
//! Responses are classified by [matches]. Terminators are matched exactly, except where the
//! module appends its verdict to another token (e.g. `SEND OK`), which is matched by suffix.
use crate::commands::{DisableEchoCommand, RestartCommand, UartConfigCommand};
use crate::transport::{BitFraming, Line, Transport, TransportConfig, TransportError, RECEIVE_BUFFER_SIZE, RESET_BAUD_RATE};
use atat::AtatCmd;
use fugit::TimerDurationU32;
use fugit_timer::Timer;
use heapless::Vec;

/// Success terminator
pub const OK: &str = "OK";

/// Generic failure terminator
pub const ERROR: &str = "ERROR";

/// Failure terminator, e.g. on joining an access point
pub const FAIL: &str = "FAIL";

/// Station status response if not joined to any access point
pub const NO_ACCESS_POINT: &str = "No AP";

/// Max. number of lines kept by [Session::send_and_collect]
pub const COLLECT_CAPACITY: usize = 8;

/// Max. encoded command length incl. CRLF
const COMMAND_BUFFER_SIZE: usize = 192;

/// Result of writing a command, without awaiting any response
pub type Ack = Result<(), TransportError>;

/// Comparison mode of a received line
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatchMode {
    /// Line is equal to the expected token
    Exact,

    /// Line ends with the expected token
    Suffix,
}

/// Compares a received line with the expected token
pub fn matches(line: &str, expected: &str, mode: MatchMode) -> bool {
    match mode {
        MatchMode::Exact => line == expected,
        MatchMode::Suffix => line.ends_with(expected),
    }
}

/// Returns true if the line terminates a command response (OK, ERROR or FAIL)
pub fn is_terminator(line: &str) -> bool {
    matches(line, OK, MatchMode::Exact) || is_failure(line)
}

/// Returns true if the line signals a rejected command (ERROR or FAIL)
pub fn is_failure(line: &str) -> bool {
    matches(line, ERROR, MatchMode::Exact) || matches(line, FAIL, MatchMode::Exact)
}

/// Half-duplex command/response session with the module
///
/// All operations take `&mut self`, so at most one command is outstanding at any time.
pub struct Session<T: Transport, D: Timer<TIMER_HZ>, const TIMER_HZ: u32> {
    /// Serial line
    pub(crate) transport: T,

    /// Timer used for the settle delay after restart
    pub(crate) timer: D,

    /// Time the module needs for rebooting
    settle_time: TimerDurationU32<TIMER_HZ>,

    /// Currently applied transport configuration
    config: TransportConfig,
}

impl<T: Transport, D: Timer<TIMER_HZ>, const TIMER_HZ: u32> Session<T, D, TIMER_HZ> {
    /// Creates a new session. The transport is not configured until [Session::configure] or
    /// [Session::reset_and_rebaud] gets called.
    pub fn new(transport: T, timer: D) -> Self {
        Self {
            transport,
            timer,
            settle_time: TimerDurationU32::millis(1_500),
            config: TransportConfig::default(),
        }
    }

    /// Applies the given configuration to the transport
    pub fn configure(&mut self, config: TransportConfig) {
        debug!("Configuring transport with {} baud", config.baud_rate);
        self.transport.configure(&config);
        self.config = config;
    }

    /// Returns the currently applied transport configuration
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Writes the command without awaiting any response
    pub fn send_command<Cmd: AtatCmd>(&mut self, command: &Cmd) -> Ack {
        let mut buffer = [0x0; COMMAND_BUFFER_SIZE];
        let length = command.write(&mut buffer);

        let encoded = core::str::from_utf8(&buffer[..length]).map_err(|_| TransportError::Write)?;
        let text = encoded.trim_end_matches("\r\n");
        trace!("Sending command {}", text);

        self.transport.write_line(text)
    }

    /// Sends the command and returns true if it was answered by OK. ERROR, FAIL or a timeout result in false.
    pub fn expect_ok<Cmd: AtatCmd>(&mut self, command: &Cmd) -> bool {
        if let Err(error) = self.send_command(command) {
            warn!("Unable to send command: {:?}", error);
            return false;
        }

        self.await_line(OK, MatchMode::Exact)
    }

    /// Sends the command and returns all lines up to and including the terminator.
    ///
    /// If more then [COLLECT_CAPACITY] lines are received, the oldest lines are dropped, so that
    /// the trailing lines are always available.
    pub fn send_and_collect<Cmd: AtatCmd>(&mut self, command: &Cmd) -> Vec<Line, COLLECT_CAPACITY> {
        let mut lines = Vec::new();

        if let Err(error) = self.send_command(command) {
            warn!("Unable to send command: {:?}", error);
            return lines;
        }

        self.receive_until(|line| {
            if lines.is_full() {
                lines.remove(0);
            }

            if let Ok(owned) = Line::try_from(line) {
                let _ = lines.push(owned);
            }

            is_terminator(line)
        });

        lines
    }

    /// Reads lines until the predicate returns true for a line. Returns false, if the transport
    /// timed out or failed before. Undecodable or overlong lines are skipped.
    pub fn receive_until<F: FnMut(&str) -> bool>(&mut self, mut predicate: F) -> bool {
        loop {
            match self.transport.read_line() {
                Ok(line) => {
                    trace!("Received line {}", line.as_str());

                    if predicate(line.as_str()) {
                        return true;
                    }
                }
                Err(TransportError::Timeout) => {
                    warn!("Timeout while waiting for response");
                    return false;
                }
                Err(error @ (TransportError::Decode | TransportError::Overflow)) => {
                    debug!("Skipping malformed response line: {:?}", error);
                }
                Err(error) => {
                    warn!("Transport error while waiting for response: {:?}", error);
                    return false;
                }
            }
        }
    }

    /// Reads lines until the expected token matches (true) or the command was rejected (false)
    pub fn await_line(&mut self, expected: &str, mode: MatchMode) -> bool {
        let mut matched = false;

        self.receive_until(|line| {
            if matches(line, expected, mode) {
                matched = true;
                return true;
            }

            is_failure(line)
        });

        if !matched {
            debug!("Expected {} was not received", expected);
        }

        matched
    }

    /// Blocks until the '>' send prompt was received
    pub fn await_prompt(&mut self) -> bool {
        match self.transport.read_until_byte(b'>') {
            Ok(()) => true,
            Err(error) => {
                warn!("Send prompt not received: {:?}", error);
                false
            }
        }
    }

    /// Writes raw payload data, used after the send prompt
    pub fn write_payload(&mut self, data: &[u8]) -> Ack {
        trace!("Writing {} bytes of payload", data.len());
        self.transport.write_raw(data)
    }

    /// Brings the module into a known state and switches to the given baud rate:
    ///
    /// 1. UART forced to 115200 8N1 without flow control
    /// 2. Restart of the module
    /// 3. Settle delay of 1500 ms
    /// 4. Transport reconfigured to target baud rate, receive buffer enlarged, stale bytes discarded
    /// 5. Command echo disabled, which needs to be acknowledged by OK
    ///
    /// Returns true if the module responded to the final command.
    pub fn reset_and_rebaud(&mut self, target_baud: u32) -> bool {
        let reset_config = TransportConfig {
            baud_rate: RESET_BAUD_RATE,
            framing: BitFraming::default(),
            ..self.config
        };
        self.configure(reset_config);

        if let Err(error) = self.send_command(&UartConfigCommand::new(&reset_config)) {
            warn!("Unable to force UART configuration: {:?}", error);
        }

        if let Err(error) = self.send_command(&RestartCommand) {
            warn!("Unable to send restart command: {:?}", error);
        }

        if self.delay(self.settle_time).is_err() {
            error!("Settle delay failed, module may not be ready");
            return false;
        }

        self.configure(reset_config.with_baud_rate(target_baud));
        self.transport.set_receive_buffer_size(RECEIVE_BUFFER_SIZE);
        self.transport.discard_buffered();

        self.expect_ok(&DisableEchoCommand)
    }

    /// Blocks for the given duration
    fn delay(&mut self, duration: TimerDurationU32<TIMER_HZ>) -> Result<(), TransportError> {
        self.timer.start(duration).map_err(|_| TransportError::Timer)?;
        nb::block!(self.timer.wait()).map_err(|_| TransportError::Timer)
    }

    /// Sets the time waited for the module to reboot in ms
    pub fn set_settle_time_ms(&mut self, settle_time: u32) {
        self.settle_time = TimerDurationU32::millis(settle_time);
    }

    /// Releases the transport and timer
    pub fn release(self) -> (T, D) {
        (self.transport, self.timer)
    }
}
