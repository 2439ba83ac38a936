//! Error types for ATR decoding and validation

use thiserror::Error;

/// Result type for ATR operations
pub type Result<T> = std::result::Result<T, AtrError>;

/// Error conditions detected while validating an ATR
///
/// Every variant corresponds to one ISO/IEC 7816-3 rule; construction of an
/// [`Atr`](crate::Atr) either succeeds completely or fails with exactly one
/// of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AtrError {
    /// TA1 encodes a reserved clock-rate conversion factor
    #[error("Invalid Fi: {0}")]
    InvalidFi(String),

    /// TA1 encodes a reserved bit-rate adjustment factor
    #[error("Invalid Di: {0}")]
    InvalidDi(String),

    /// Bits that ISO 7816-3 reserves as zero are set
    #[error("Reserved bits set: {0}")]
    ReservedBits(String),

    /// TC2 carries an invalid waiting-time integer
    #[error("Invalid waiting-time integer: {0}")]
    InvalidWaitingInteger(String),

    /// The first TA for T=1 carries an invalid information field size
    #[error("Invalid IFSC: {0}")]
    InvalidIfsc(String),

    /// The first TB for T=1 carries an invalid block-waiting-time integer
    #[error("Invalid BWI: {0}")]
    InvalidBwi(String),

    /// The first TA for T=15 carries reserved or empty operating-class bits
    #[error("Invalid operating classes: {0}")]
    InvalidOperatingClass(String),

    /// The interface-byte chain announces more bytes than were supplied
    #[error("Truncated interface-byte chain: {0}")]
    TruncatedChain(String),

    /// Fewer bytes remain than the declared historical-byte count
    #[error("Insufficient historical bytes: {0}")]
    InsufficientHistoricalBytes(String),

    /// A protocol other than T=0 is offered but no TCK byte follows
    #[error("Missing checksum: {0}")]
    MissingChecksum(String),

    /// The TCK byte does not balance the exclusive-or of the message
    #[error("Checksum mismatch: {0}")]
    ChecksumMismatch(String),

    /// Bytes remain after the checksum (or historical bytes) were consumed
    #[error("Trailing bytes: {0}")]
    TrailingBytes(String),
}

impl AtrError {
    /// Create a new InvalidFi error
    pub fn invalid_fi(msg: impl Into<String>) -> Self {
        AtrError::InvalidFi(msg.into())
    }

    /// Create a new InvalidDi error
    pub fn invalid_di(msg: impl Into<String>) -> Self {
        AtrError::InvalidDi(msg.into())
    }

    /// Create a new ReservedBits error
    pub fn reserved_bits(msg: impl Into<String>) -> Self {
        AtrError::ReservedBits(msg.into())
    }

    /// Create a new InvalidWaitingInteger error
    pub fn invalid_waiting_integer(msg: impl Into<String>) -> Self {
        AtrError::InvalidWaitingInteger(msg.into())
    }

    /// Create a new InvalidIfsc error
    pub fn invalid_ifsc(msg: impl Into<String>) -> Self {
        AtrError::InvalidIfsc(msg.into())
    }

    /// Create a new InvalidBwi error
    pub fn invalid_bwi(msg: impl Into<String>) -> Self {
        AtrError::InvalidBwi(msg.into())
    }

    /// Create a new InvalidOperatingClass error
    pub fn invalid_operating_class(msg: impl Into<String>) -> Self {
        AtrError::InvalidOperatingClass(msg.into())
    }

    /// Create a new TruncatedChain error
    pub fn truncated_chain(msg: impl Into<String>) -> Self {
        AtrError::TruncatedChain(msg.into())
    }

    /// Create a new InsufficientHistoricalBytes error
    pub fn insufficient_historical_bytes(msg: impl Into<String>) -> Self {
        AtrError::InsufficientHistoricalBytes(msg.into())
    }

    /// Create a new MissingChecksum error
    pub fn missing_checksum(msg: impl Into<String>) -> Self {
        AtrError::MissingChecksum(msg.into())
    }

    /// Create a new ChecksumMismatch error
    pub fn checksum_mismatch(msg: impl Into<String>) -> Self {
        AtrError::ChecksumMismatch(msg.into())
    }

    /// Create a new TrailingBytes error
    pub fn trailing_bytes(msg: impl Into<String>) -> Self {
        AtrError::TrailingBytes(msg.into())
    }
}
