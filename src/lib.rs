//! # ISO/IEC 7816-3 ATR Parser
//!
//! A Rust library for decoding and validating the Answer-To-Reset (ATR)
//! message a smart card sends after power-up.
//!
//! The ATR is a self-describing, variable-length chain of optional
//! "interface bytes" followed by historical bytes and, for protocols other
//! than T=0, a checksum. This library provides:
//!
//! - Incremental byte acquisition from a reader (no look-ahead needed)
//! - Structural decoding and ISO-mandated validation
//! - Derivation of the timing and protocol parameters (Fi/Di/FMax, ETU,
//!   guard and waiting times, IFSC, redundancy code, operating classes)
//!   needed by a card-communication stack
//!
//! ## Features
//!
//! - `serde`: Enable serialization/deserialization support for the derived
//!   parameter types
//!
//! ## Example
//!
//! ```
//! use iso7816_atr::Atr;
//!
//! // Minimal direct-convention ATR: T=0, no interface bytes
//! let atr = Atr::new(vec![0x3B, 0x00])?;
//! assert_eq!(atr.fi(), 372);
//! assert_eq!(atr.di(), 1);
//! assert!(atr.historical_bytes().is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod chain;
pub mod core;
pub mod error;
pub mod message;
pub mod receive;
pub mod timing;

pub use crate::core::{ClockStop, Descriptor, IfChar, OperatingClasses, RedundancyCode, SpecificMode};
pub use crate::error::{AtrError, Result};
pub use crate::message::Atr;
pub use crate::receive::receive;
pub use crate::timing::Seconds;

/// ISO/IEC 7816-3 constants
pub mod spec {
    /// TS value for the direct convention, the only convention supported
    pub const DIRECT_CONVENTION: u8 = 0x3B;

    /// Upper bound on the byte length of an ATR (interface bytes,
    /// historical bytes and TCK combined)
    pub const MAX_ATR_LENGTH: usize = 32;

    /// Maximum number of historical bytes (4-bit count in T0)
    pub const MAX_HISTORICAL_BYTES: usize = 15;

    /// TA1 value assumed when the byte is absent (Fi = 372, Di = 1)
    pub const DEFAULT_TA1: u8 = 0x11;

    /// Waiting-time integer assumed when TC2 is absent
    pub const DEFAULT_WI: u8 = 10;

    /// First-TB-for-T=1 value assumed when absent (BWI = 4, CWI = 13)
    pub const DEFAULT_T1_TB: u8 = 0x4D;

    /// Information field size for the card assumed when the first TA for
    /// T=1 is absent
    pub const DEFAULT_IFSC: usize = 32;

    /// First-TA-for-T=15 value assumed when absent (clock stop not
    /// supported, class A only)
    pub const DEFAULT_T15_TA: u8 = 0x01;

    /// Reference clock-rate conversion factor Fd used by the BWT formula
    pub const REFERENCE_CLOCK_RATE: u32 = 372;
}
