//! # ESP-AT WiFi driver
//!
//! Blocking driver for ESP8285/ESP8266 co-processors running the ESP-AT firmware. The module is
//! attached over a serial line and controlled by a strict command/response protocol: exactly one
//! AT command is outstanding at any time.
//!
//! * [session::Session] frames commands and scans the response lines for terminators
//! * [wifi::Adapter] sequences session calls into joining networks and sending datagrams
//! * [transport::Transport] is the serial line consumed by the session, [serial::SerialTransport]
//!   implements it for any [embedded_io] serial peripheral
#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

#[macro_use]
mod fmt;

pub(crate) mod commands;
pub(crate) mod responses;
pub mod serial;
pub mod session;
pub mod transport;
pub mod wifi;

#[cfg(feature = "examples")]
pub mod example;

#[cfg(test)]
mod tests;
