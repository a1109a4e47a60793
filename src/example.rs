//! Mocks for doc examples
use crate::transport::{Line, Transport, TransportConfig, TransportError};
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;
use heapless::Deque;

/// Scripted reply of [ExampleTransport]
#[derive(Copy, Clone)]
enum Reply {
    Line(&'static str),
    Prompt,
}

/// Transport mock answering like a module which is joined to `test_wifi`
#[derive(Default)]
pub struct ExampleTransport {
    replies: Deque<Reply, 8>,
}

impl ExampleTransport {
    fn reply(&mut self, replies: &[Reply]) {
        self.replies.clear();

        for reply in replies {
            let _ = self.replies.push_back(*reply);
        }
    }
}

impl Transport for ExampleTransport {
    fn configure(&mut self, _config: &TransportConfig) {}

    fn write_line(&mut self, text: &str) -> Result<(), TransportError> {
        match text {
            "AT+UART=115200,8,1,0,0" | "AT+RST" => self.reply(&[]),
            "AT+CWJAP=\"test_wifi\",\"secret\"" => self.reply(&[
                Reply::Line("WIFI CONNECTED"),
                Reply::Line("WIFI GOT IP"),
                Reply::Line("OK"),
            ]),
            "AT+CWJAP?" => self.reply(&[
                Reply::Line("+CWJAP:\"test_wifi\",\"10:fe:ed:05:ba:50\",6,-52"),
                Reply::Line("OK"),
            ]),
            "AT+CIPSTART=\"UDP\",\"10.0.0.1\",5000" => self.reply(&[Reply::Line("CONNECT"), Reply::Line("OK")]),
            _ if text.starts_with("AT+CIPSEND=") => self.reply(&[Reply::Line("OK"), Reply::Prompt]),
            _ => self.reply(&[Reply::Line("OK")]),
        }

        Ok(())
    }

    fn write_raw(&mut self, _data: &[u8]) -> Result<(), TransportError> {
        self.reply(&[Reply::Line("SEND OK")]);
        Ok(())
    }

    fn read_line(&mut self) -> Result<Line, TransportError> {
        while let Some(reply) = self.replies.pop_front() {
            if let Reply::Line(line) = reply {
                return Line::try_from(line).map_err(|_| TransportError::Overflow);
            }
        }

        Err(TransportError::Timeout)
    }

    fn read_until_byte(&mut self, _byte: u8) -> Result<(), TransportError> {
        while let Some(reply) = self.replies.pop_front() {
            if let Reply::Prompt = reply {
                return Ok(());
            }
        }

        Err(TransportError::Timeout)
    }

    fn set_receive_buffer_size(&mut self, _size: usize) {}

    fn discard_buffered(&mut self) {
        self.replies.clear();
    }
}

/// Timer mock, which expires immediately
#[derive(Default)]
pub struct ExampleTimer {}

impl Timer<1_000_000> for ExampleTimer {
    type Error = u32;

    fn now(&mut self) -> TimerInstantU32<1000000> {
        TimerInstantU32::from_ticks(0)
    }

    fn start(&mut self, _duration: TimerDurationU32<1000000>) -> Result<(), Self::Error> {
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        Ok(())
    }
}
