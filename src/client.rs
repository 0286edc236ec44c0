//! One request/reply exchange at a time over a byte transport.

use embedded_io::{Error as _, ErrorKind, Read, ReadReady, Write};
use log::{debug, trace, warn};

use crate::{
    clock::{Clock, Millis},
    config::Timing,
    error::{Contract, ReplyFault, TransactionError, TransactionResult},
    frame::{
        self, EXCEPTION_REPLY_LEN, Frame, FunctionCode, MAX_REGISTERS_PER_READ, REPLY_BUFFER_LEN,
        Registers,
    },
};

/// Performs write-register and read-registers transactions against a single device.
///
/// The transport is any interface which implements [embedded_io::Read],
/// [embedded_io::Write] and [embedded_io::ReadReady]. `ReadReady` is what lets the
/// client give up on a silent device once the reply deadline passes instead of
/// blocking forever.
pub struct RegisterClient<S, C> {
    interface: Option<S>,
    clock: C,
    device_address: u8,
    timing: Timing,
}

impl<S, C> RegisterClient<S, C>
where
    S: Read + Write + ReadReady,
    C: Clock,
{
    /// Create a client with no transport connected yet.
    pub fn new(clock: C, device_address: u8, timing: Timing) -> Self {
        Self {
            interface: None,
            clock,
            device_address,
            timing,
        }
    }

    /// Take ownership of an open transport.
    pub fn connect(&mut self, interface: S) -> TransactionResult<(), S::Error> {
        if self.interface.is_some() {
            return Err(Contract::AlreadyConnected.into());
        }
        debug!("Transport connected, device address {:#04x}", self.device_address);
        self.interface = Some(interface);
        Ok(())
    }

    /// Release the transport and hand it back, if one was connected.
    pub fn close(&mut self) -> Option<S> {
        let interface = self.interface.take();
        if interface.is_some() {
            debug!("Transport closed");
        }
        interface
    }

    pub fn is_connected(&self) -> bool {
        self.interface.is_some()
    }

    /// Borrow the connected transport.
    pub fn transport(&self) -> Option<&S> {
        self.interface.as_ref()
    }

    pub fn transport_mut(&mut self) -> Option<&mut S> {
        self.interface.as_mut()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn device_address(&self) -> u8 {
        self.device_address
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Block on the clock for `duration`. Zero durations are skipped.
    pub fn wait(&mut self, duration: Millis) {
        if duration.ticks() > 0 {
            self.clock.delay(duration);
        }
    }

    /// Write to a single register of the PSU.
    ///
    /// The device echoes the request back, anything else is rejected as a malformed reply.
    pub fn write_register(
        &mut self,
        register: impl Into<u16>,
        value: u16,
    ) -> TransactionResult<(), S::Error> {
        let register = register.into();
        let request = frame::build_write_frame(self.device_address, register, value);

        let mut reply = [0u8; REPLY_BUFFER_LEN];
        let received = self.exchange(&request, FunctionCode::WriteRegister.reply_len(1), &mut reply)?;

        let outcome = frame::validate_write_reply(&request, &reply[..received]);
        self.wait(self.timing.command_interval);
        outcome
            .inspect_err(|fault| warn!("Write of register {register:#04x} rejected: {fault}"))?;

        debug!("Wrote {value} to register {register:#04x}");
        Ok(())
    }

    /// Read `count` consecutive registers starting at `start`.
    ///
    /// The device can only return up to [`MAX_REGISTERS_PER_READ`] registers per read,
    /// asking for more fails before anything is sent.
    pub fn read_registers(
        &mut self,
        start: impl Into<u8>,
        count: usize,
    ) -> TransactionResult<Registers, S::Error> {
        let start = start.into();
        if count == 0 {
            return Err(Contract::NoRegisters.into());
        }
        if count > MAX_REGISTERS_PER_READ {
            return Err(Contract::TooManyRegisters { requested: count }.into());
        }

        let request = frame::build_read_frame(self.device_address, start, count as u8);

        let mut reply = [0u8; REPLY_BUFFER_LEN];
        let expected = FunctionCode::ReadRegisters.reply_len(count);
        let received = self.exchange(&request, expected, &mut reply)?;

        let outcome = frame::decode_read_reply(self.device_address, &reply[..received], count);
        self.wait(self.timing.command_interval);
        let values = outcome
            .inspect_err(|fault| warn!("Read of register {start:#04x} rejected: {fault}"))?;

        debug!("Read register {start:#04x}..+{count}: {values:?}");
        Ok(values)
    }

    /// Read a single register from the PSU.
    pub fn read_register(&mut self, register: impl Into<u8>) -> TransactionResult<u16, S::Error> {
        let values = self.read_registers(register, 1)?;
        values
            .first()
            .copied()
            .ok_or(TransactionError::MalformedReply(ReplyFault::Truncated {
                expected: 1,
                received: 0,
            }))
    }

    /// Send `request` and collect the reply into `reply`, returning its length.
    ///
    /// Input left over from an earlier exchange, such as a reply which arrived after
    /// its deadline, is discarded before the request goes out. Reads stop at
    /// `expected` bytes, or at [`EXCEPTION_REPLY_LEN`] once the function code shows
    /// an exception.
    fn exchange(
        &mut self,
        request: &Frame,
        expected: usize,
        reply: &mut [u8; REPLY_BUFFER_LEN],
    ) -> TransactionResult<usize, S::Error> {
        let interface = self.interface.as_mut().ok_or(Contract::NotConnected)?;

        discard_stale_input(interface)?;

        trace!("Write to port: {request:02x?}");
        interface
            .write_all(request)
            .map_err(TransactionError::Transport)?;
        interface.flush().map_err(TransactionError::Transport)?;

        let deadline = self.clock.now() + self.timing.reply_deadline;
        let mut needed = expected;
        let mut received = 0;

        while received < needed {
            if !interface.read_ready().map_err(TransactionError::Transport)? {
                if self.clock.now() >= deadline {
                    if received == 0 {
                        warn!("No reply before the deadline");
                        return Err(TransactionError::Timeout);
                    }
                    warn!("Reply stalled after {received} of {needed} bytes");
                    return Err(ReplyFault::Truncated {
                        expected: needed,
                        received,
                    }
                    .into());
                }
                self.clock.delay(self.timing.poll_interval);
                continue;
            }

            // Function code first, it decides how long the reply is.
            let end = if received < 2 { 2 } else { needed };
            match interface.read(&mut reply[received..end]) {
                Ok(0) => {
                    warn!("Channel closed after {received} of {needed} bytes");
                    return Err(ReplyFault::Truncated {
                        expected: needed,
                        received,
                    }
                    .into());
                }
                Ok(count) => received += count,
                Err(err) if matches!(err.kind(), ErrorKind::TimedOut) => {
                    return Err(TransactionError::Timeout);
                }
                Err(err) => return Err(TransactionError::Transport(err)),
            }

            if received >= 2 && frame::is_exception(reply[1]) {
                needed = EXCEPTION_REPLY_LEN;
            }
        }

        trace!("Read from port: {:02x?}", &reply[..received]);
        Ok(received)
    }
}

/// Read and drop whatever is already waiting on the transport.
fn discard_stale_input<S>(interface: &mut S) -> TransactionResult<(), S::Error>
where
    S: Read + ReadReady,
{
    let mut scratch = [0u8; REPLY_BUFFER_LEN];
    let mut discarded = 0;

    while interface.read_ready().map_err(TransactionError::Transport)? {
        match interface.read(&mut scratch) {
            // Closed channel, the reply read will report it.
            Ok(0) => break,
            Ok(count) => {
                trace!("Discard from port: {:02x?}", &scratch[..count]);
                discarded += count;
            }
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut) => break,
            Err(err) => return Err(TransactionError::Transport(err)),
        }
    }

    if discarded > 0 {
        warn!("Discarded {discarded} stale bytes before sending a request");
    }
    Ok(())
}
