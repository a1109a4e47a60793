use crate::serial::SerialPort;
use crate::transport::{Line, Transport, TransportConfig, TransportError};
use core::convert::Infallible;
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer as FugitTimer;
use mockall::mock;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Interaction with the mocked transport (or timer), recorded in call order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Configure(TransportConfig),
    Line(String),
    Raw(Vec<u8>),
    ReceiveBufferSize(usize),
    Discard,
    Delay(u32),
}

/// Scripted module output
#[derive(Copy, Clone, Debug)]
pub enum Reply {
    Line(&'static str),
    /// '>' send prompt
    Prompt,
    /// Read timeout without any data
    Timeout,
}

/// Transport mock returning the scripted replies in the same order as inserted
pub struct MockTransport {
    events: Arc<Mutex<Vec<Event>>>,
    replies: VecDeque<Reply>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(vec![])),
            replies: VecDeque::new(),
        }
    }

    /// Shared handle to the event log, e.g. for recording timer calls
    pub fn events(&self) -> Arc<Mutex<Vec<Event>>> {
        self.events.clone()
    }

    /// Adds mocked response lines
    pub fn add_lines(&mut self, lines: &[&'static str]) {
        for line in lines {
            self.replies.push_back(Reply::Line(line));
        }
    }

    /// Simulates a plain OK response
    pub fn add_ok_response(&mut self) {
        self.add_lines(&["OK"]);
    }

    /// Simulates a general error response
    pub fn add_error_response(&mut self) {
        self.add_lines(&["ERROR"]);
    }

    /// Simulates the send prompt
    pub fn add_prompt(&mut self) {
        self.replies.push_back(Reply::Prompt);
    }

    /// Simulates a read timeout
    pub fn add_timeout(&mut self) {
        self.replies.push_back(Reply::Timeout);
    }

    /// Returns the number of replies not consumed yet
    pub fn pending_replies(&self) -> usize {
        self.replies.len()
    }

    /// Returns a copy of all recorded events
    pub fn get_events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Returns a copy of the sent commands
    pub fn get_commands(&self) -> Vec<String> {
        self.get_events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Line(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    /// Returns a copy of raw written data
    pub fn get_raw_data(&self) -> Vec<Vec<u8>> {
        self.get_events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Raw(data) => Some(data),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl Transport for MockTransport {
    fn configure(&mut self, config: &TransportConfig) {
        self.record(Event::Configure(*config));
    }

    fn write_line(&mut self, text: &str) -> Result<(), TransportError> {
        self.record(Event::Line(text.to_string()));
        Ok(())
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.record(Event::Raw(data.to_vec()));
        Ok(())
    }

    fn read_line(&mut self) -> Result<Line, TransportError> {
        loop {
            match self.replies.pop_front() {
                Some(Reply::Line(line)) => return Ok(Line::try_from(line).unwrap()),
                Some(Reply::Prompt) => continue,
                Some(Reply::Timeout) | None => return Err(TransportError::Timeout),
            }
        }
    }

    fn read_until_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        assert_eq!(b'>', byte);

        loop {
            match self.replies.pop_front() {
                Some(Reply::Prompt) => return Ok(()),
                Some(Reply::Line(_)) => continue,
                Some(Reply::Timeout) | None => return Err(TransportError::Timeout),
            }
        }
    }

    fn set_receive_buffer_size(&mut self, size: usize) {
        self.record(Event::ReceiveBufferSize(size));
    }

    fn discard_buffered(&mut self) {
        self.record(Event::Discard);
    }
}

/// Serial peripheral mock. On each flush the next scripted response gets available for reading.
pub struct MockSerial {
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
    pub config: Option<TransportConfig>,
    pub rx_buffer_size: Option<usize>,
    responses: VecDeque<Vec<u8>>,
}

impl MockSerial {
    pub fn new() -> Self {
        Self {
            rx: VecDeque::new(),
            tx: vec![],
            config: None,
            rx_buffer_size: None,
            responses: VecDeque::new(),
        }
    }

    /// Makes the given bytes available for reading instantly
    pub fn add_rx(&mut self, data: &[u8]) {
        self.rx.extend(data.iter());
    }

    /// Makes the given bytes available for reading after the next flush
    pub fn add_response(&mut self, data: &[u8]) {
        self.responses.push_back(data.to_vec());
    }

    pub fn get_tx_as_string(&self) -> String {
        String::from_utf8(self.tx.clone()).unwrap()
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = Infallible;
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut count = 0;

        while count < buf.len() {
            match self.rx.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }

        Ok(count)
    }
}

impl embedded_io::ReadReady for MockSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.rx.is_empty())
    }
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.tx.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if let Some(response) = self.responses.pop_front() {
            self.rx.extend(response);
        }

        Ok(())
    }
}

impl SerialPort for MockSerial {
    fn set_config(&mut self, config: &TransportConfig) {
        self.config = Some(*config);
    }

    fn set_rx_buffer_size(&mut self, size: usize) {
        self.rx_buffer_size = Some(size);
    }
}

mock! {
    pub Timer{}

    impl FugitTimer<1_000_000> for Timer {
        type Error = u32;

        fn now(&mut self) -> TimerInstantU32<1000000>;
        fn start(&mut self, duration: TimerDurationU32<1000000>) -> Result<(), u32>;
        fn cancel(&mut self) -> Result<(), u32>;
        fn wait(&mut self) -> nb::Result<(), u32>;
    }
}

impl MockTimer {
    /// Timer which expires instantly
    pub fn expiring() -> Self {
        let mut timer = MockTimer::new();
        timer.expect_start().returning(|_| Ok(()));
        timer.expect_wait().returning(|| Ok(()));
        timer
    }

    /// Timer which records each started duration (in ms) as [Event::Delay] and expires instantly
    pub fn recording(events: Arc<Mutex<Vec<Event>>>) -> Self {
        let mut timer = MockTimer::new();
        timer.expect_start().returning(move |duration| {
            events.lock().unwrap().push(Event::Delay(duration.to_millis()));
            Ok(())
        });
        timer.expect_wait().returning(|| Ok(()));
        timer
    }
}
