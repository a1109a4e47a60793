use crate::responses::NoResponse;
use crate::transport::{FlowControl, Parity, StopBits, TransportConfig};
use crate::wifi::{JoinError, MessageKind, SendError};
use atat::atat_derive::AtatCmd;
use atat::heapless::String;
use core::str::FromStr;

/// Max. length of the remote host passed to CIPSTART
pub const MAX_HOST_LENGTH: usize = 64;

/// Trait for mapping a rejected command to the error of the calling operation
pub trait CommandErrorHandler {
    type Error;

    /// Error returned when the command was not answered by OK
    const ERROR: Self::Error;
}

/// Sets the UART configuration of the module
///
/// Note: The configuration gets stored in flash and survives a restart.
#[derive(Clone, AtatCmd)]
#[at_cmd("+UART", NoResponse, timeout_ms = 1_000)]
pub struct UartConfigCommand {
    #[at_arg(position = 0)]
    baud_rate: u32,

    /// 5-8 data bits
    #[at_arg(position = 1)]
    data_bits: u8,

    /// 1: 1 bit, 2: 1.5 bit, 3: 2 bits
    #[at_arg(position = 2)]
    stop_bits: u8,

    /// 0: None, 1: Odd, 2: Even
    #[at_arg(position = 3)]
    parity: u8,

    /// 0: disabled, 1: RTS, 2: CTS, 3: RTS + CTS
    #[at_arg(position = 4)]
    flow_control: u8,
}

impl UartConfigCommand {
    pub fn new(config: &TransportConfig) -> Self {
        let framing = config.framing;

        Self {
            baud_rate: config.baud_rate,
            data_bits: framing.data_bits.count(),
            stop_bits: match framing.stop_bits {
                StopBits::One => 1,
                StopBits::OneAndHalf => 2,
                StopBits::Two => 3,
            },
            parity: match framing.parity {
                Parity::None => 0,
                Parity::Odd => 1,
                Parity::Even => 2,
            },
            flow_control: match framing.flow_control {
                FlowControl::None => 0,
                FlowControl::Rts => 1,
                FlowControl::Cts => 2,
                FlowControl::RtsCts => 3,
            },
        }
    }
}

/// Restarts the module
#[derive(Clone, AtatCmd)]
#[at_cmd("+RST", NoResponse, timeout_ms = 1_000)]
pub struct RestartCommand;

/// Disables echoing of received commands
#[derive(Clone, AtatCmd)]
#[at_cmd("E0", NoResponse, timeout_ms = 1_000)]
pub struct DisableEchoCommand;

/// Sets the WIFI mode
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWMODE", NoResponse, timeout_ms = 1_000)]
pub struct WifiModeCommand {
    /// WIFI mode:
    ///     1: Station mode.
    ///     2: SoftAP mode.
    ///     3: SoftAP+Station mode.
    #[at_arg(position = 0)]
    mode: u8,
}

impl WifiModeCommand {
    pub fn station_mode() -> Self {
        Self { mode: 1 }
    }
}

impl CommandErrorHandler for WifiModeCommand {
    type Error = JoinError;
    const ERROR: Self::Error = JoinError::ModeError;
}

/// Command for joining the given WIFI access point
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWJAP", NoResponse, timeout_ms = 20_000)]
pub struct AccessPointConnectCommand {
    /// The SSID of the target access point
    #[at_arg(position = 0)]
    ssid: String<32>,

    /// The password/key of the target access point
    #[at_arg(position = 1)]
    password: String<64>,
}

impl AccessPointConnectCommand {
    /// Validates the credentials. The values are embedded as quoted strings, so double quotes are rejected.
    pub fn new(ssid: &str, password: &str) -> Result<Self, JoinError> {
        if ssid.len() > 32 {
            return Err(JoinError::InvalidSSDLength);
        }

        if password.len() > 63 {
            return Err(JoinError::InvalidPasswordLength);
        }

        if ssid.contains('"') || password.contains('"') {
            return Err(JoinError::InvalidCharacter);
        }

        Ok(Self {
            ssid: String::from_str(ssid).map_err(|_| JoinError::InvalidSSDLength)?,
            password: String::from_str(password).map_err(|_| JoinError::InvalidPasswordLength)?,
        })
    }
}

/// Queries the currently joined access point
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWJAP?", NoResponse, timeout_ms = 1_000)]
pub struct AccessPointStatusCommand;

/// Disconnects from the current access point
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWQAP", NoResponse, timeout_ms = 1_000)]
pub struct AccessPointDisconnectCommand;

/// Sets the transmission mode
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPMODE", NoResponse, timeout_ms = 1_000)]
pub struct TransmissionModeCommand {
    /// 0: normal mode, 1: transparent transmission (only single connection mode)
    #[at_arg(position = 0)]
    mode: u8,
}

impl TransmissionModeCommand {
    /// Disables transparent transmission
    pub fn normal() -> Self {
        Self { mode: 0 }
    }
}

impl CommandErrorHandler for TransmissionModeCommand {
    type Error = SendError;
    const ERROR: Self::Error = SendError::TransmissionModeError;
}

/// Establish TCP Connection or UDP Transmission
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSTART", NoResponse, timeout_ms = 5_000)]
pub struct ConnectCommand {
    /// Connection type, TCP or UDP
    #[at_arg(position = 0)]
    connection_type: String<3>,

    /// Remote IP address or domain name
    #[at_arg(position = 1)]
    remote_host: String<MAX_HOST_LENGTH>,

    /// Remote port
    #[at_arg(position = 2)]
    port: u16,
}

impl ConnectCommand {
    pub fn new(kind: MessageKind, remote_host: &str, port: u16) -> Result<Self, SendError> {
        if remote_host.contains('"') {
            return Err(SendError::InvalidAddress);
        }

        Ok(Self {
            connection_type: String::from_str(kind.as_str()).map_err(|_| SendError::InvalidAddress)?,
            remote_host: String::from_str(remote_host).map_err(|_| SendError::InvalidAddress)?,
            port,
        })
    }
}

impl CommandErrorHandler for ConnectCommand {
    type Error = SendError;
    const ERROR: Self::Error = SendError::ConnectError;
}

/// Announces the length of the following payload. Module answers by '>' prompt.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSEND", NoResponse, timeout_ms = 1_000)]
pub struct TransmissionPrepareCommand {
    /// Payload length in bytes
    #[at_arg(position = 0)]
    length: usize,
}

impl TransmissionPrepareCommand {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

/// Closes the current connection
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPCLOSE", NoResponse, timeout_ms = 1_000)]
pub struct CloseConnectionCommand;

impl CommandErrorHandler for CloseConnectionCommand {
    type Error = SendError;
    const ERROR: Self::Error = SendError::CloseError;
}
