//! We use this mocking module in unit tests to emulate the device's byte channel.

use crate::{
    checksum::compute_checksum,
    clock::{Clock, Instant, Millis},
    frame::{FRAME_LEN, Frame, REPLY_BUFFER_LEN},
};

const BUFFER_LEN: usize = 512;
const MAX_PENDING_REPLIES: usize = 32;

/// Our mock type used to emulate a serial port.
pub struct MockSerial {
    /// Buffer to store data written to the mock serial port
    write_buffer: heapless::Vec<u8, BUFFER_LEN>,
    /// Buffer containing pre-configured response data to be read
    read_buffer: heapless::Vec<u8, BUFFER_LEN>,
    /// Current position in the read buffer
    read_position: usize,
    /// End of the data the device has sent so far
    available: usize,
    /// End offsets of scripted replies, each sent in answer to one write
    pending_replies: heapless::Deque<usize, MAX_PENDING_REPLIES>,
    /// Number of successful `write` calls
    writes: usize,
    /// Writes start failing once this many have succeeded
    fail_after_writes: Option<usize>,
    /// Flag to simulate write errors
    should_error_on_write: bool,
    /// Flag to simulate read errors
    should_error_on_read: bool,
    /// Flag to simulate the port's own read timeout firing
    should_time_out_on_read: bool,
    /// Flag to simulate the remote end hanging up
    closed: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum MockSerialError {
    /// Simulated timeout error
    #[error("simulated timeout")]
    Timeout,
    /// Simulated buffer overflow
    #[error("simulated buffer overflow")]
    BufferOverflow,
    /// Generic simulated error for testing
    #[error("simulated error")]
    SimulatedError,
    /// Would block - no data available
    #[error("would block")]
    WouldBlock,
}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
            MockSerialError::WouldBlock => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_write || self.fail_after_writes.is_some_and(|n| self.writes >= n) {
            return Err(MockSerialError::SimulatedError);
        }

        self.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockSerialError::BufferOverflow)?;
        self.writes += 1;
        if let Some(end) = self.pending_replies.pop_front() {
            self.available = end;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }
        if self.should_time_out_on_read {
            return Err(MockSerialError::Timeout);
        }

        if self.read_position >= self.available {
            if self.closed {
                return Ok(0);
            }
            return Err(MockSerialError::WouldBlock);
        }

        let available_bytes = self.available - self.read_position;
        let bytes_to_read = core::cmp::min(buf.len(), available_bytes);

        buf[..bytes_to_read].copy_from_slice(
            &self.read_buffer[self.read_position..self.read_position + bytes_to_read],
        );

        self.read_position += bytes_to_read;
        Ok(bytes_to_read)
    }
}

impl embedded_io::ReadReady for MockSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        // Errors and hang-ups surface from `read`, so report ready for them.
        Ok(self.should_error_on_read
            || self.should_time_out_on_read
            || self.closed
            || self.read_position < self.available)
    }
}

impl MockSerial {
    /// Create a new MockSerial instance with empty buffers
    pub fn new() -> Self {
        Self {
            write_buffer: heapless::Vec::new(),
            read_buffer: heapless::Vec::new(),
            read_position: 0,
            available: 0,
            pending_replies: heapless::Deque::new(),
            writes: 0,
            fail_after_writes: None,
            should_error_on_write: false,
            should_error_on_read: false,
            should_time_out_on_read: false,
            closed: false,
        }
    }

    /// Replace all scripted data with a single reply to the next write
    pub fn set_read_data(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        self.read_buffer.clear();
        self.read_position = 0;
        self.available = 0;
        self.pending_replies.clear();
        self.queue_read_data(data)
    }

    /// Script a reply which becomes readable once the write before it has been made
    pub fn queue_read_data(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        self.read_buffer
            .extend_from_slice(data)
            .map_err(|_| MockSerialError::BufferOverflow)?;
        self.pending_replies
            .push_back(self.read_buffer.len())
            .map_err(|_| MockSerialError::BufferOverflow)
    }

    /// Make data readable right away, as if it arrived late for an earlier request.
    ///
    /// Any replies still waiting for a write are released along with it.
    pub fn inject_read_data(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        self.read_buffer
            .extend_from_slice(data)
            .map_err(|_| MockSerialError::BufferOverflow)?;
        self.pending_replies.clear();
        self.available = self.read_buffer.len();
        Ok(())
    }

    /// Queue a valid read reply carrying `values`.
    pub fn queue_read_reply(&mut self, device: u8, values: &[u16]) {
        let reply = read_reply(device, values);
        self.queue_read_data(&reply).unwrap();
    }

    /// Queue the echo the device sends back for a write request.
    pub fn queue_write_echo(&mut self, request: &Frame) {
        self.queue_read_data(request).unwrap();
    }

    /// Get a reference to the data that was written to this mock serial port
    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    /// Iterate over the written data as request frames
    pub fn written_frames(&self) -> impl Iterator<Item = &[u8]> {
        self.write_buffer.chunks(FRAME_LEN)
    }

    /// Clear the write buffer
    pub fn clear_written_data(&mut self) {
        self.write_buffer.clear();
    }

    /// Number of scripted bytes that have not been read yet, sent or not
    pub fn unread_len(&self) -> usize {
        self.read_buffer.len() - self.read_position
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }

    /// Let `count` more writes succeed, then fail every write after that
    pub fn fail_after_writes(&mut self, count: usize) {
        self.fail_after_writes = Some(self.writes + count);
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&mut self, should_error: bool) {
        self.should_error_on_read = should_error;
    }

    /// Configure whether read operations should fail with a timeout
    pub fn set_read_timeout(&mut self, should_time_out: bool) {
        self.should_time_out_on_read = should_time_out;
    }

    /// Simulate the remote end closing the channel once queued data runs out
    pub fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
    }
}

/// Build a valid read reply frame carrying `values`.
pub fn read_reply(device: u8, values: &[u16]) -> heapless::Vec<u8, REPLY_BUFFER_LEN> {
    let mut reply = heapless::Vec::new();
    reply.push(device).unwrap();
    reply.push(0x03).unwrap();
    reply.push((values.len() * 2) as u8).unwrap();
    for value in values {
        reply.extend_from_slice(&value.to_be_bytes()).unwrap();
    }
    let (lo, hi) = compute_checksum(&reply);
    reply.push(lo).unwrap();
    reply.push(hi).unwrap();
    reply
}

/// Fake clock: time only moves when something waits on it.
#[derive(Debug, Default)]
pub struct MockClock {
    now_ms: u64,
    /// Number of `delay` calls
    pub delays: usize,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Milliseconds waited so far.
    pub fn elapsed_ms(&self) -> u64 {
        self.now_ms
    }
}

impl Clock for MockClock {
    fn now(&mut self) -> Instant {
        Instant::from_ticks(self.now_ms)
    }

    fn delay(&mut self, duration: Millis) {
        self.delays += 1;
        self.now_ms += duration.ticks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, ReadReady, Write};

    #[test]
    fn test_write_multiple_times() {
        let mut mock = MockSerial::new();

        mock.write(b"Hello, ").unwrap();
        mock.write(b"World!").unwrap();

        assert_eq!(mock.written_data(), b"Hello, World!");
    }

    #[test]
    fn test_write_buffer_overflow() {
        let mut mock = MockSerial::new();
        let large_data = [0u8; BUFFER_LEN + 1];

        let result = mock.write(&large_data);
        assert!(matches!(result, Err(MockSerialError::BufferOverflow)));
    }

    #[test]
    fn test_read_multiple_calls() {
        let mut mock = MockSerial::new();
        mock.inject_read_data(b"Hello World").unwrap();

        let mut buffer1 = [0u8; 5];
        let mut buffer2 = [0u8; 6];

        assert_eq!(mock.read(&mut buffer1).unwrap(), 5);
        assert_eq!(mock.read(&mut buffer2).unwrap(), 6);
        assert_eq!(&buffer1, b"Hello");
        assert_eq!(&buffer2, b" World");
    }

    #[test]
    fn test_replies_released_by_writes() {
        let mut mock = MockSerial::new();
        mock.queue_read_data(b"Hi").unwrap();
        mock.queue_read_data(b"Yo").unwrap();
        assert!(!mock.read_ready().unwrap());

        mock.write(b"?").unwrap();
        assert!(mock.read_ready().unwrap());

        let mut buffer = [0u8; 10];
        assert_eq!(mock.read(&mut buffer).unwrap(), 2);
        assert_eq!(&buffer[..2], b"Hi");
        assert!(!mock.read_ready().unwrap());
        assert_eq!(mock.unread_len(), 2);
        assert!(matches!(
            mock.read(&mut buffer),
            Err(MockSerialError::WouldBlock)
        ));

        mock.write(b"?").unwrap();
        assert_eq!(mock.read(&mut buffer).unwrap(), 2);
        assert_eq!(&buffer[..2], b"Yo");
    }

    #[test]
    fn test_injected_data_is_ready_at_once() {
        let mut mock = MockSerial::new();
        mock.inject_read_data(b"late").unwrap();
        assert!(mock.read_ready().unwrap());

        mock.queue_read_data(b"next").unwrap();
        let mut buffer = [0u8; 10];
        assert_eq!(mock.read(&mut buffer).unwrap(), 4);
        assert_eq!(&buffer[..4], b"late");
        assert!(!mock.read_ready().unwrap());
    }

    #[test]
    fn test_closed_reads_zero() {
        let mut mock = MockSerial::new();
        mock.set_closed(true);

        let mut buffer = [0u8; 4];
        assert!(mock.read_ready().unwrap());
        assert_eq!(mock.read(&mut buffer).unwrap(), 0);
    }

    #[test]
    fn test_fail_after_writes() {
        let mut mock = MockSerial::new();
        mock.write(b"a").unwrap();
        mock.fail_after_writes(2);

        assert!(mock.write(b"b").is_ok());
        assert!(mock.write(b"c").is_ok());
        assert!(matches!(
            mock.write(b"d"),
            Err(MockSerialError::SimulatedError)
        ));
        assert_eq!(mock.written_data(), b"abc");
    }

    #[test]
    fn test_read_error_simulation() {
        let mut mock = MockSerial::new();
        mock.set_read_data(b"test data").unwrap();
        mock.set_read_error(true);

        let mut buffer = [0u8; 10];
        assert!(matches!(
            mock.read(&mut buffer),
            Err(MockSerialError::SimulatedError)
        ));
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(
            MockSerialError::Timeout.kind(),
            embedded_io::ErrorKind::TimedOut
        ));
        assert!(matches!(
            MockSerialError::BufferOverflow.kind(),
            embedded_io::ErrorKind::OutOfMemory
        ));
        assert!(matches!(
            MockSerialError::SimulatedError.kind(),
            embedded_io::ErrorKind::Other
        ));
    }

    #[test]
    fn test_read_reply_helper() {
        let reply = read_reply(0x01, &[0x1234]);
        assert_eq!(reply.as_slice(), &[0x01, 0x03, 0x02, 0x12, 0x34, 0xB5, 0x33]);
    }

    #[test]
    fn test_mock_clock() {
        let mut clock = MockClock::new();
        clock.delay(Millis::from_ticks(100));
        clock.delay(Millis::from_ticks(5));
        assert_eq!(clock.elapsed_ms(), 105);
        assert_eq!(clock.delays, 2);
        assert_eq!(clock.now().ticks(), 105);
    }
}
