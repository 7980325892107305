//! Order-preserving key codec
//!
//! Row layout inside a field's namespace:
//!
//! ```text
//! key   = encode(value) ":" decimal(doc_id)
//! value = decimal(doc_id)
//! ```
//!
//! `encode` is chosen per [`ValueCategory`] so that plain byte comparison of
//! keys matches the value order:
//!
//! - Integer: little-endian bytes reversed to big-endian, then the most
//!   significant bit of the first byte flipped. Negative values sort before
//!   non-negative ones; order within each sign is preserved.
//! - Float: IEEE bits mapped to an unsigned total order (negative values have
//!   every bit flipped, non-negative values only the sign bit), big-endian.
//!   `-0.0` is folded into `+0.0`.
//! - Textual: identity. Each delimiter-separated token becomes its own row.
//!
//! Raw numeric values are always little-endian and exactly `width` bytes.

use super::field::ValueCategory;
use crate::table::DocId;

/// Separator between encoded value and document id.
pub const KEY_SEPARATOR: u8 = b':';

/// The byte right after [`KEY_SEPARATOR`]. `encode(v) ";"` is greater than
/// every row key of value `v` and smaller than every row key of a larger value.
const SEPARATOR_SUCCESSOR: u8 = KEY_SEPARATOR + 1;

impl ValueCategory {
    /// Whether `raw` has the shape this category expects. Always false for
    /// a width the codec does not implement (integers 1/2/4/8, floats 4/8).
    pub fn accepts(&self, raw: &[u8]) -> bool {
        let supported = match self {
            ValueCategory::Integer { width } => matches!(width, 1 | 2 | 4 | 8),
            ValueCategory::Float { width } => matches!(width, 4 | 8),
            ValueCategory::Textual { .. } => return true,
        };
        supported && self.width() == Some(raw.len())
    }

    /// Encodes one raw value. Returns `None` when a numeric value has the
    /// wrong width.
    pub fn encode(&self, raw: &[u8]) -> Option<Vec<u8>> {
        if !self.accepts(raw) {
            return None;
        }
        Some(match self {
            ValueCategory::Integer { .. } => encode_integer(raw),
            ValueCategory::Float { width } => encode_float(raw, *width),
            ValueCategory::Textual { .. } => raw.to_vec(),
        })
    }

    /// Moves a raw boundary by `delta` adjacent values.
    ///
    /// Integers step by one; floats step to the neighbouring representable
    /// value. Textual values are returned unchanged. Returns `None` when the
    /// value has the wrong width or the step leaves the domain.
    pub fn adjust_boundary(&self, raw: &[u8], delta: i8) -> Option<Vec<u8>> {
        if !self.accepts(raw) {
            return None;
        }
        match self {
            ValueCategory::Integer { width } => adjust_integer(raw, *width, delta),
            ValueCategory::Float { width } => adjust_float(raw, *width, delta),
            ValueCategory::Textual { .. } => Some(raw.to_vec()),
        }
    }
}

fn encode_integer(raw: &[u8]) -> Vec<u8> {
    let mut out: Vec<u8> = raw.iter().rev().copied().collect();
    if let Some(first) = out.first_mut() {
        *first ^= 0x80;
    }
    out
}

/// Sign-extends a little-endian integer of `raw.len()` bytes.
fn read_signed(raw: &[u8]) -> i64 {
    let negative = raw.last().map_or(false, |b| b & 0x80 != 0);
    let mut buf = if negative { [0xFF; 8] } else { [0; 8] };
    buf[..raw.len()].copy_from_slice(raw);
    i64::from_le_bytes(buf)
}

fn signed_range(width: usize) -> (i64, i64) {
    if width >= 8 {
        (i64::MIN, i64::MAX)
    } else {
        let bits = (width * 8) as u32;
        (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
    }
}

fn adjust_integer(raw: &[u8], width: usize, delta: i8) -> Option<Vec<u8>> {
    let (min, max) = signed_range(width);
    let adjusted = read_signed(raw).checked_add(delta as i64)?;
    if adjusted < min || adjusted > max {
        return None;
    }
    Some(adjusted.to_le_bytes()[..width].to_vec())
}

/// Maps raw float bits to an unsigned key whose integer order is the float
/// order. Works on the low `width * 8` bits of a u64.
fn float_to_ordered(raw: &[u8], width: usize) -> u64 {
    let (bits, sign) = match width {
        4 => {
            let bits = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            let bits = if bits == 0x8000_0000 { 0 } else { bits };
            (bits as u64, 1u64 << 31)
        }
        _ => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(raw);
            let bits = u64::from_le_bytes(buf);
            let bits = if bits == 1 << 63 { 0 } else { bits };
            (bits, 1u64 << 63)
        }
    };
    let mask = if width == 4 { u32::MAX as u64 } else { u64::MAX };
    if bits & sign != 0 {
        !bits & mask
    } else {
        bits ^ sign
    }
}

fn ordered_to_float(ordered: u64, width: usize) -> Vec<u8> {
    let (sign, mask) = if width == 4 {
        (1u64 << 31, u32::MAX as u64)
    } else {
        (1u64 << 63, u64::MAX)
    };
    let bits = if ordered & sign != 0 {
        ordered ^ sign
    } else {
        !ordered & mask
    };
    if width == 4 {
        (bits as u32).to_le_bytes().to_vec()
    } else {
        bits.to_le_bytes().to_vec()
    }
}

fn encode_float(raw: &[u8], width: usize) -> Vec<u8> {
    let ordered = float_to_ordered(raw, width);
    if width == 4 {
        (ordered as u32).to_be_bytes().to_vec()
    } else {
        ordered.to_be_bytes().to_vec()
    }
}

fn adjust_float(raw: &[u8], width: usize, delta: i8) -> Option<Vec<u8>> {
    let (max, sign) = if width == 4 {
        (u32::MAX as u64, 1u64 << 31)
    } else {
        (u64::MAX, 1u64 << 63)
    };
    let ordered = float_to_ordered(raw, width);
    let mut stepped = if delta >= 0 {
        ordered.checked_add(delta as u64).filter(|v| *v <= max)?
    } else {
        ordered.checked_sub(delta.unsigned_abs() as u64)?
    };
    // `sign - 1` is the image of -0.0, which never appears in a key.
    if stepped == sign - 1 {
        stepped = if delta >= 0 { sign } else { stepped - 1 };
    }
    Some(ordered_to_float(stepped, width))
}

/// Splits a textual value into its non-empty tokens.
pub fn tokens(raw: &[u8], delimiter: u8) -> impl Iterator<Item = &[u8]> {
    raw.split(move |b| *b == delimiter)
        .filter(|token| !token.is_empty())
}

/// Row key for one encoded value.
pub fn row_key(encoded: &[u8], doc_id: DocId) -> Vec<u8> {
    let mut key = prefix_key(encoded);
    key.extend_from_slice(doc_id.to_string().as_bytes());
    key
}

/// Row value: the decimal document id.
pub fn row_value(doc_id: DocId) -> Vec<u8> {
    doc_id.to_string().into_bytes()
}

/// Every row key a document contributes for `raw`.
///
/// Numeric values contribute one row; textual values one row per token.
/// Returns `None` when a numeric value has the wrong width.
pub fn row_keys(category: &ValueCategory, raw: &[u8], doc_id: DocId) -> Option<Vec<Vec<u8>>> {
    match category {
        ValueCategory::Textual { delimiter } => Some(
            tokens(raw, *delimiter)
                .map(|token| row_key(token, doc_id))
                .collect(),
        ),
        _ => Some(vec![row_key(&category.encode(raw)?, doc_id)]),
    }
}

/// `encoded ":"`: the first possible key of a value, also the prefix shared
/// by all of its rows.
pub fn prefix_key(encoded: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(encoded.len() + 1 + 20);
    key.extend_from_slice(encoded);
    key.push(KEY_SEPARATOR);
    key
}

/// `encoded ";"`: the exclusive scan end that still covers every row of
/// `encoded` itself.
pub fn range_end_key(encoded: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(encoded.len() + 1);
    key.extend_from_slice(encoded);
    key.push(SEPARATOR_SUCCESSOR);
    key
}

/// Parses a decimal document id. Rejects empty input and anything that is
/// not pure ASCII digits.
pub fn parse_doc_id(bytes: &[u8]) -> Option<DocId> {
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(bytes).ok()?.parse().ok()
}
