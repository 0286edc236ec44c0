//! Encoding of request frames and validation/decoding of device replies.
//!
//! Every request is exactly [`FRAME_LEN`] bytes:
//!
//! | byte | content                     |
//! |------|-----------------------------|
//! | 0    | device address              |
//! | 1    | function code               |
//! | 2, 3 | register address (hi, lo)   |
//! | 4, 5 | value / register count      |
//! | 6, 7 | checksum (lo, hi)           |
//!
//! Replies are 8 bytes for a write (an echo of the request), `5 + 2n` bytes for a
//! read of `n` registers and 5 bytes for an exception.

use crate::{
    checksum::{checksum_matches, compute_checksum},
    error::ReplyFault,
};

/// Length of every request frame.
pub const FRAME_LEN: usize = 8;
/// Size of the buffer replies are received into.
pub const REPLY_BUFFER_LEN: usize = 10;
/// The device only returns values for up to this many registers per read.
pub const MAX_REGISTERS_PER_READ: usize = 2;
/// `[address, function | 0x80, code, crc lo, crc hi]`
pub const EXCEPTION_REPLY_LEN: usize = 5;

const EXCEPTION_FLAG: u8 = 0x80;
/// Address, function code and byte count precede the values of a read reply.
const READ_HEADER_LEN: usize = 3;

pub type Frame = [u8; FRAME_LEN];

/// Raw register values decoded from one read reply.
pub type Registers = heapless::Vec<u16, MAX_REGISTERS_PER_READ>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionCode {
    ReadRegisters = 0x03,
    WriteRegister = 0x06,
}

impl FunctionCode {
    /// Length of a successful reply to this function.
    pub const fn reply_len(self, count: usize) -> usize {
        match self {
            FunctionCode::ReadRegisters => READ_HEADER_LEN + 2 * count + 2,
            FunctionCode::WriteRegister => FRAME_LEN,
        }
    }

    /// Function code byte used by the device to flag an exception reply.
    pub const fn exception_code(self) -> u8 {
        self as u8 | EXCEPTION_FLAG
    }
}

impl From<FunctionCode> for u8 {
    fn from(value: FunctionCode) -> Self {
        value as u8
    }
}

/// Whether a function code byte carries the exception flag.
pub const fn is_exception(function: u8) -> bool {
    function & EXCEPTION_FLAG != 0
}

/// Split a 16 bit value into `(high, low)` bytes.
pub const fn split_word(value: u16) -> (u8, u8) {
    ((value / 256) as u8, (value % 256) as u8)
}

/// Append the checksum to the six byte frame body.
fn seal(body: [u8; FRAME_LEN - 2]) -> Frame {
    let (crc_lo, crc_hi) = compute_checksum(&body);
    [
        body[0], body[1], body[2], body[3], body[4], body[5], crc_lo, crc_hi,
    ]
}

/// Build a write-single-register request.
pub fn build_write_frame(device: u8, register: u16, value: u16) -> Frame {
    let (reg_hi, reg_lo) = split_word(register);
    let (data_hi, data_lo) = split_word(value);
    seal([
        device,
        FunctionCode::WriteRegister.into(),
        reg_hi,
        reg_lo,
        data_hi,
        data_lo,
    ])
}

/// Build a read-registers request.
///
/// Register addresses on these devices fit in one byte, so the high byte of the
/// start address is always zero.
pub fn build_read_frame(device: u8, start: u8, count: u8) -> Frame {
    seal([
        device,
        FunctionCode::ReadRegisters.into(),
        0x00,
        start,
        0x00,
        count,
    ])
}

/// Turn an exception reply into [`ReplyFault::Exception`].
///
/// Returns `Ok(())` if `reply` is not an exception reply at all.
fn check_exception(function: FunctionCode, reply: &[u8]) -> Result<(), ReplyFault> {
    match reply.get(1) {
        Some(&code) if is_exception(code) => {
            if code != function.exception_code() {
                return Err(ReplyFault::UnexpectedFunction {
                    expected: function.into(),
                    received: code,
                });
            }
            if reply.len() < EXCEPTION_REPLY_LEN {
                return Err(ReplyFault::Truncated {
                    expected: EXCEPTION_REPLY_LEN,
                    received: reply.len(),
                });
            }
            if !checksum_matches(&reply[..EXCEPTION_REPLY_LEN]) {
                return Err(ReplyFault::BadChecksum);
            }
            Err(ReplyFault::Exception(reply[2]))
        }
        _ => Ok(()),
    }
}

/// Validate the common part of a reply and return the frame with any trailing bytes cut off.
fn checked_frame(
    device: u8,
    function: FunctionCode,
    reply: &[u8],
    expected: usize,
) -> Result<&[u8], ReplyFault> {
    check_exception(function, reply)?;

    if reply.len() < expected {
        return Err(ReplyFault::Truncated {
            expected,
            received: reply.len(),
        });
    }
    let frame = &reply[..expected];

    if !checksum_matches(frame) {
        return Err(ReplyFault::BadChecksum);
    }
    if frame[0] != device {
        return Err(ReplyFault::UnexpectedAddress {
            expected: device,
            received: frame[0],
        });
    }
    if frame[1] != u8::from(function) {
        return Err(ReplyFault::UnexpectedFunction {
            expected: function.into(),
            received: frame[1],
        });
    }
    Ok(frame)
}

/// Validate a read reply and extract `count` big-endian register values from it.
///
/// # Panics
///
/// If `count` exceeds [`MAX_REGISTERS_PER_READ`].
pub fn decode_read_reply(device: u8, reply: &[u8], count: usize) -> Result<Registers, ReplyFault> {
    assert!(count <= MAX_REGISTERS_PER_READ);

    let function = FunctionCode::ReadRegisters;
    let frame = checked_frame(device, function, reply, function.reply_len(count))?;

    let byte_count = frame[2] as usize;
    if byte_count != 2 * count {
        return Err(ReplyFault::ByteCountMismatch {
            expected: 2 * count,
            received: byte_count,
        });
    }

    let mut values = Registers::new();
    for pair in frame[READ_HEADER_LEN..READ_HEADER_LEN + byte_count].chunks_exact(2) {
        // Cannot overflow, count was checked above.
        let _ = values.push(u16::from_be_bytes([pair[0], pair[1]]));
    }
    Ok(values)
}

/// Validate the device's echo of a write request.
pub fn validate_write_reply(request: &Frame, reply: &[u8]) -> Result<(), ReplyFault> {
    let function = FunctionCode::WriteRegister;
    let frame = checked_frame(request[0], function, reply, function.reply_len(1))?;

    if frame != request.as_slice() {
        return Err(ReplyFault::EchoMismatch);
    }
    Ok(())
}
