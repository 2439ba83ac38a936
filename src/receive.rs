//! Incremental byte acquisition of an ATR from a transport
//!
//! The ATR carries no length prefix; how many bytes it has only becomes
//! known while reading it. This module drives a caller-supplied read
//! callback one exactly-sized request at a time: the 2-byte TS/T0 prefix,
//! then per chain link as many bytes as the previous descriptor announces,
//! then the declared historical bytes and, when a protocol other than T=0
//! is offered, the TCK byte. It never requests a byte it does not know to
//! exist.

use crate::core::{Descriptor, IfChar};
use crate::spec;

/// Read a complete ATR from `recv`.
///
/// `recv` is called with a buffer it must fill entirely from the transport,
/// returning `false` on failure (closed reader, timeout). Any failed read,
/// a convention byte other than 0x3B or an ATR exceeding the ISO length
/// bound yields `None`; no partial result is ever returned.
///
/// No structural validation happens here beyond the length bookkeeping the
/// chain demands; feed the returned bytes to
/// [`Atr::new`](crate::Atr::new) for that.
pub fn receive<F>(mut recv: F) -> Option<Vec<u8>>
where
    F: FnMut(&mut [u8]) -> bool,
{
    let mut buffer = [0u8; spec::MAX_ATR_LENGTH];

    if !recv(&mut buffer[..2]) {
        return None;
    }
    if buffer[0] != spec::DIRECT_CONVENTION {
        return None;
    }
    let mut td = Descriptor::new(buffer[1]);
    let historical_count = td.low_nibble() as usize;
    let mut filled = 2usize;

    let mut needs_tck = false;
    loop {
        let block = td.interface_count();
        if block == 0 {
            break;
        }
        if filled + block > buffer.len() {
            return None;
        }
        if !recv(&mut buffer[filled..filled + block]) {
            return None;
        }
        filled += block;

        // with category D set, the block ends in the next descriptor
        td = if td.present(IfChar::D) {
            Descriptor::new(buffer[filled - 1])
        } else {
            Descriptor::new(0)
        };
        if td.low_nibble() != 0 {
            needs_tck = true;
        }
    }

    if filled + historical_count > buffer.len() {
        return None;
    }
    if !recv(&mut buffer[filled..filled + historical_count]) {
        return None;
    }
    filled += historical_count;

    if needs_tck {
        if filled + 1 > buffer.len() {
            return None;
        }
        if !recv(&mut buffer[filled..filled + 1]) {
            return None;
        }
        filled += 1;
    }

    Some(buffer[..filled].to_vec())
}
