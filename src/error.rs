//! Our error types for the DPS power supplies.

use thiserror::Error as ThisError;

use crate::types::RefreshStage;

/// Result of a device-level operation (see [`crate::psu::Dps`]).
pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Result of a single register transaction (see [`crate::client::RegisterClient`]).
pub type TransactionResult<T, I> = core::result::Result<T, TransactionError<I>>;

/// The caller asked for something the client refuses to put on the wire.
#[derive(ThisError, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contract {
    /// The device only answers reads of up to two registers.
    #[error("{requested} registers requested, at most 2 may be read at once")]
    TooManyRegisters { requested: usize },
    #[error("a read must request at least one register")]
    NoRegisters,
    #[error("no transport is connected")]
    NotConnected,
    #[error("a transport is already connected")]
    AlreadyConnected,
    /// A physical value does not fit the 16 bit register once scaled.
    #[error("value out of range for the register")]
    ValueOutOfRange,
}

/// Ways a device reply can fail validation.
#[derive(ThisError, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFault {
    #[error("reply truncated, expected {expected} bytes but got {received}")]
    Truncated { expected: usize, received: usize },
    #[error("reply checksum mismatch")]
    BadChecksum,
    #[error("reply from address {received:#04x}, expected {expected:#04x}")]
    UnexpectedAddress { expected: u8, received: u8 },
    #[error("reply function code {received:#04x}, expected {expected:#04x}")]
    UnexpectedFunction { expected: u8, received: u8 },
    #[error("reply byte count {received}, expected {expected}")]
    ByteCountMismatch { expected: usize, received: usize },
    /// A write must be answered with an exact echo of the request.
    #[error("write reply does not echo the request")]
    EchoMismatch,
    /// The device answered with a Modbus exception frame.
    #[error("device exception code {0:#04x}")]
    Exception(u8),
}

/// Failure of a single write-register or read-registers exchange.
#[derive(ThisError, Debug)]
pub enum TransactionError<I: embedded_io::Error> {
    #[error("contract violation: {0}")]
    ContractViolation(Contract),
    #[error("transport failure: {0:?}")]
    Transport(I),
    #[error("timed out waiting for the device to reply")]
    Timeout,
    #[error("malformed reply: {0}")]
    MalformedReply(ReplyFault),
}

/// Custom error type for DPS power supply communications.
#[derive(ThisError, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("{0}")]
    Transaction(TransactionError<I>),
    /// A cache refresh stopped partway. Stages before `failed` hold new values,
    /// `failed` and the stages after it still hold the previous ones.
    #[error("refresh stopped at {failed:?}: {cause}")]
    PartialRefresh {
        failed: RefreshStage,
        cause: TransactionError<I>,
    },
}

impl<I: embedded_io::Error> TransactionError<I> {
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, TransactionError::ContractViolation(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransactionError::Timeout)
    }
}

impl<I: embedded_io::Error> Error<I> {
    /// The transaction failure underneath this error.
    pub fn transaction(&self) -> &TransactionError<I> {
        match self {
            Error::Transaction(err) => err,
            Error::PartialRefresh { cause, .. } => cause,
        }
    }

    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::Transaction(err) if err.is_contract_violation())
    }

    pub fn is_timeout(&self) -> bool {
        self.transaction().is_timeout()
    }
}

impl<I: embedded_io::Error> From<Contract> for TransactionError<I> {
    fn from(err: Contract) -> Self {
        TransactionError::ContractViolation(err)
    }
}

impl<I: embedded_io::Error> From<ReplyFault> for TransactionError<I> {
    fn from(err: ReplyFault) -> Self {
        TransactionError::MalformedReply(err)
    }
}

impl<I: embedded_io::Error> From<TransactionError<I>> for Error<I> {
    fn from(err: TransactionError<I>) -> Self {
        Error::Transaction(err)
    }
}

impl<I: embedded_io::Error> From<Contract> for Error<I> {
    fn from(err: Contract) -> Self {
        Error::Transaction(TransactionError::ContractViolation(err))
    }
}
