//! Traversal of the self-describing interface-byte chain
//!
//! An ATR interleaves descriptor bytes (T0, TD1, TD2, ...) with the
//! interface bytes they announce. Each descriptor flags with four presence
//! bits which of the categories A, B, C and D follow it; a set category-D
//! bit means the last of those bytes is the next descriptor. The traversal
//! here is the single routine behind both the construction-time validation
//! pass and all later field lookups.

use crate::core::{Descriptor, IfChar};
use crate::error::{AtrError, Result};
use std::collections::HashMap;

/// Walk the interface-byte chain of `chain`, which must start at the first
/// descriptor byte (T0, i.e. the ATR without its convention byte).
///
/// `visit` is invoked once per present interface byte, in chain order, with
/// the category, the link index of the descriptor announcing it (starting
/// at 0 for T0) and the byte value. An error returned by `visit` aborts the
/// walk and is passed through.
///
/// On success the returned offset is the index of the first byte after the
/// chain, where the historical bytes begin.
pub fn iterate<F>(chain: &[u8], mut visit: F) -> Result<usize>
where
    F: FnMut(IfChar, usize, u8) -> Result<()>,
{
    if chain.is_empty() {
        return Err(AtrError::truncated_chain("initial descriptor byte missing"));
    }

    let mut pos = 0;
    let mut link = 0;
    loop {
        let td = Descriptor::new(chain[pos]);
        let mut cursor = pos;
        for c in IfChar::ALL {
            if !td.present(c) {
                continue;
            }
            cursor += 1;
            let value = *chain.get(cursor).ok_or_else(|| {
                AtrError::truncated_chain(format!(
                    "descriptor at link {link} announces bytes past the end of the input"
                ))
            })?;
            visit(c, link, value)?;
        }
        if !td.present(IfChar::D) {
            return Ok(cursor + 1);
        }
        // the category-D byte just visited is the next descriptor
        pos = cursor;
        link += 1;
    }
}

/// Walk the chain like [`iterate`], additionally classifying every
/// notification as global or protocol-specific.
///
/// Interface bytes of link 0 and 1 and all category-D bytes are global and
/// go to `global(category, link, value)`. Bytes of link 2 onward go to
/// `specific(protocol, category, occurrence, value)`, where `protocol` is
/// the low nibble of the preceding descriptor and `occurrence` counts, from
/// 0, how often that (protocol, category) pair has appeared so far.
pub fn iterate_classified<G, S>(chain: &[u8], mut global: G, mut specific: S) -> Result<usize>
where
    G: FnMut(IfChar, usize, u8) -> Result<()>,
    S: FnMut(u8, IfChar, usize, u8) -> Result<()>,
{
    let mut occurrences: HashMap<(u8, IfChar), usize> = HashMap::new();
    let mut protocol = 0u8;

    iterate(chain, |c, link, value| {
        if c == IfChar::D {
            protocol = Descriptor::new(value).low_nibble();
        }
        if c == IfChar::D || link < 2 {
            global(c, link, value)
        } else {
            let count = occurrences.entry((protocol, c)).or_insert(0);
            let occurrence = *count;
            *count += 1;
            specific(protocol, c, occurrence, value)
        }
    })
}
