//! Timing derivation per ISO/IEC 7816-3, 7.1 and 11.4
//!
//! All durations are returned in seconds. The queries take the current
//! physical-layer parameters (clock-rate conversion factor F, bit-rate
//! adjustment factor D, clock frequency in Hz) because a guard or waiting
//! time depends on what the reader is actually running, not only on what
//! the card indicated.

use crate::core::IfChar;
use crate::message::Atr;
use crate::spec;

/// A duration in seconds
pub type Seconds = f64;

/// Elementary time unit for the given parameters, the bit duration all
/// other times are multiples of
fn etu(f: u32, d: u32, frequency: u32) -> Seconds {
    f as f64 / d as f64 / frequency as f64
}

impl Atr {
    /// Guard time (GT): minimum delay between two characters sent in
    /// opposite directions (PPS and T=0)
    ///
    /// The N extra etus from TC1 count in the indicated etu (Fi, Di) when a
    /// T=15 descriptor is present, in the current etu otherwise, so the
    /// result mixes units and is returned as absolute time.
    pub fn guard_time(&self, f: u32, d: u32, frequency: u32) -> Seconds {
        let tc1 = self.interface_byte(IfChar::C, 1).unwrap_or(0x00);
        let n = if tc1 == 255 { 0 } else { tc1 } as f64;
        let current = etu(f, d, frequency);
        let base = if self.protocol_offered(15) {
            etu(self.fi(), self.di(), frequency)
        } else {
            current
        };
        12.0 * current + n * base
    }

    /// Waiting time (WT): maximum delay between two consecutive characters
    /// (T=0)
    pub fn waiting_time(&self, frequency: u32) -> Seconds {
        let wi = self.interface_byte(IfChar::C, 2).unwrap_or(spec::DEFAULT_WI);
        wi as f64 * 960.0 * self.fi() as f64 / frequency as f64
    }

    /// Character guard time (CGT) for T=1
    ///
    /// The TC1 escape value 255 selects the reduced 11 etu frame; any other
    /// value yields the plain guard time.
    pub fn character_guard_time(&self, f: u32, d: u32, frequency: u32) -> Seconds {
        let tc1 = self.interface_byte(IfChar::C, 1).unwrap_or(0x00);
        if tc1 == 255 {
            11.0 * etu(f, d, frequency)
        } else {
            self.guard_time(f, d, frequency)
        }
    }

    /// Block guard time (BGT) for T=1: 22 etu between characters sent in
    /// opposite directions
    pub fn block_guard_time(&self, f: u32, d: u32, frequency: u32) -> Seconds {
        22.0 * etu(f, d, frequency)
    }

    /// Character waiting time (CWT) for T=1, from the CWI nibble of the
    /// first TB for T=1
    pub fn character_waiting_time(&self, f: u32, d: u32, frequency: u32) -> Seconds {
        let tb = self
            .first_for_protocol(IfChar::B, 1)
            .unwrap_or(spec::DEFAULT_T1_TB);
        let cwi = (tb & 0x0f) as u32;
        (11.0 + (1u64 << cwi) as f64) * etu(f, d, frequency)
    }

    /// Block waiting time (BWT) for T=1, from the BWI nibble of the first
    /// TB for T=1
    ///
    /// The additive term measures absolute elapsed time and therefore uses
    /// the reference conversion factor 372 rather than the caller's F.
    pub fn block_waiting_time(&self, f: u32, d: u32, frequency: u32) -> Seconds {
        let tb = self
            .first_for_protocol(IfChar::B, 1)
            .unwrap_or(spec::DEFAULT_T1_TB);
        let bwi = (tb >> 4) as u32;
        let additional =
            (1u64 << bwi) as f64 * 960.0 * spec::REFERENCE_CLOCK_RATE as f64 / frequency as f64;
        11.0 * etu(f, d, frequency) + additional
    }
}
