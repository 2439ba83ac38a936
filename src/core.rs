//! Core types and lookup tables for ATR decoding

use bitfield::bitfield;
use std::ops::{BitAnd, BitOr};

/// Interface-byte category
///
/// Each descriptor byte announces with one presence bit per category which
/// interface bytes follow it. The discriminants are the presence-bit masks
/// within a descriptor byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IfChar {
    /// Category A (TA): clock and bit-rate parameters
    A = 0x10,
    /// Category B (TB): programming / waiting-time parameters
    B = 0x20,
    /// Category C (TC): guard-time and redundancy parameters
    C = 0x40,
    /// Category D (TD): chain continuation and protocol number
    D = 0x80,
}

impl IfChar {
    /// All categories in chain order (the order their bytes appear after a
    /// descriptor)
    pub const ALL: [IfChar; 4] = [IfChar::A, IfChar::B, IfChar::C, IfChar::D];

    /// Presence-bit mask of this category within a descriptor byte
    pub fn mask(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for IfChar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IfChar::A => write!(f, "A"),
            IfChar::B => write!(f, "B"),
            IfChar::C => write!(f, "C"),
            IfChar::D => write!(f, "D"),
        }
    }
}

bitfield! {
    /// A descriptor byte (T0 or TDi)
    ///
    /// The upper four bits flag which interface bytes follow; the lower four
    /// bits carry the historical-byte count (T0) or a protocol number (TDi).
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Descriptor(u8);
    impl Debug;
    /// Low nibble: protocol number for TDi, historical-byte count for T0
    pub u8, low_nibble, _: 3, 0;
    /// TA follows
    pub ta_present, _: 4;
    /// TB follows
    pub tb_present, _: 5;
    /// TC follows
    pub tc_present, _: 6;
    /// TD follows (the chain continues)
    pub td_present, _: 7;
}

impl Descriptor {
    /// Wrap a raw descriptor byte
    pub fn new(byte: u8) -> Self {
        Descriptor(byte)
    }

    /// The raw byte value
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether the interface byte of the given category follows this
    /// descriptor
    pub fn present(self, c: IfChar) -> bool {
        match c {
            IfChar::A => self.ta_present(),
            IfChar::B => self.tb_present(),
            IfChar::C => self.tc_present(),
            IfChar::D => self.td_present(),
        }
    }

    /// Number of interface bytes announced by this descriptor (0 to 4)
    pub fn interface_count(self) -> usize {
        (self.0 & 0xf0).count_ones() as usize
    }
}

/// Clock-stop capability indicated by the first TA for T=15
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClockStop {
    /// The card does not support clock stop
    NotSupported,
    /// Clock must be stopped at state L
    Low,
    /// Clock must be stopped at state H
    High,
    /// Either state is acceptable
    NoPreference,
}

impl ClockStop {
    /// Decode the two clock-stop bits (bits 8 and 7 of the first TA for
    /// T=15)
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => ClockStop::NotSupported,
            1 => ClockStop::Low,
            2 => ClockStop::High,
            _ => ClockStop::NoPreference,
        }
    }
}

/// Set of operating-voltage classes supported by the card
///
/// Backed by the low three bits of the first TA for T=15; combine with `|`
/// and test membership with [`contains`](OperatingClasses::contains).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OperatingClasses(u8);

impl OperatingClasses {
    /// Class A (5 V)
    pub const A: OperatingClasses = OperatingClasses(0x01);
    /// Class B (3 V)
    pub const B: OperatingClasses = OperatingClasses(0x02);
    /// Class C (1.8 V)
    pub const C: OperatingClasses = OperatingClasses(0x04);

    /// Build a set from the low three bits of an interface byte
    pub fn from_bits(bits: u8) -> Self {
        OperatingClasses(bits & 0x07)
    }

    /// Whether every class in `other` is in this set
    pub fn contains(self, other: OperatingClasses) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw bit representation
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for OperatingClasses {
    type Output = OperatingClasses;

    fn bitor(self, rhs: OperatingClasses) -> OperatingClasses {
        OperatingClasses(self.0 | rhs.0)
    }
}

impl BitAnd for OperatingClasses {
    type Output = OperatingClasses;

    fn bitand(self, rhs: OperatingClasses) -> OperatingClasses {
        OperatingClasses(self.0 & rhs.0)
    }
}

/// Block redundancy scheme offered for T=1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RedundancyCode {
    /// Longitudinal redundancy check (1 byte)
    Lrc,
    /// Cyclic redundancy check (2 bytes)
    Crc,
}

/// Specific-mode request carried by TA2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpecificMode {
    /// Protocol the card wants to use right away
    pub protocol: u8,
    /// Whether the card is capable of changing the negotiation mode
    pub change_capable: bool,
    /// Whether etu duration is defined by implicit card knowledge instead
    /// of Fi/Di
    pub implicit_divider: bool,
}

/// Clock-rate conversion factors indexed by the high nibble of TA1; 0 marks
/// an RFU code
pub const FI_LOOKUP: [u32; 16] = [
    372, 372, 558, 744, 1116, 1488, 1860, 0, 0, 512, 768, 1024, 1536, 2048, 0, 0,
];

/// Maximum supported clock frequencies in Hz, indexed like [`FI_LOOKUP`]
pub const FMAX_LOOKUP: [u32; 16] = [
    4_000_000, 5_000_000, 6_000_000, 8_000_000, 12_000_000, 16_000_000, 20_000_000, 0, 0,
    5_000_000, 7_500_000, 10_000_000, 15_000_000, 20_000_000, 0, 0,
];

/// Bit-rate adjustment factors indexed by the low nibble of TA1; 0 marks an
/// RFU code
pub const DI_LOOKUP: [u32; 16] = [0, 1, 2, 4, 8, 16, 32, 64, 12, 20, 0, 0, 0, 0, 0, 0];
