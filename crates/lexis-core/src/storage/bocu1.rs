//! BOCU-1: Binary Ordered Compression for Unicode.
//!
//! Each code point is encoded as the difference from a "previous" value that
//! tracks the current script block, so runs of text in one small script cost
//! one byte per character. Code points up to U+0020 are written directly and
//! reset the state (except space).
//!
//! Two properties matter for trie keys:
//!
//! - byte order of encoded strings equals code point order of the originals
//! - the encoding of a prefix is a byte prefix of the encoding of the whole
//!   string, since each byte depends only on preceding characters

use lexis_common::utils::error::{FormatError, Result};

const ASCII_PREV: i32 = 0x40;
const MIN: i32 = 0x21;
const MIDDLE: i32 = 0x90;
const RESET: u8 = 0xff;

const TRAIL_CONTROLS_COUNT: i32 = 20;
const TRAIL_BYTE_OFFSET: i32 = MIN - TRAIL_CONTROLS_COUNT;
const TRAIL_COUNT: i32 = (0xff - MIN + 1) + TRAIL_CONTROLS_COUNT;

const SINGLE: i32 = 64;
const LEAD_2: i32 = 43;
const LEAD_3: i32 = 3;

const REACH_POS_1: i32 = SINGLE - 1;
const REACH_NEG_1: i32 = -SINGLE;
const REACH_POS_2: i32 = REACH_POS_1 + LEAD_2 * TRAIL_COUNT;
const REACH_NEG_2: i32 = REACH_NEG_1 - LEAD_2 * TRAIL_COUNT;
const REACH_POS_3: i32 = REACH_POS_2 + LEAD_3 * TRAIL_COUNT * TRAIL_COUNT;
const REACH_NEG_3: i32 = REACH_NEG_2 - LEAD_3 * TRAIL_COUNT * TRAIL_COUNT;

const START_POS_2: i32 = MIDDLE + REACH_POS_1 + 1;
const START_POS_3: i32 = START_POS_2 + LEAD_2;
const START_POS_4: i32 = START_POS_3 + LEAD_3;
const START_NEG_2: i32 = MIDDLE + REACH_NEG_1;
const START_NEG_3: i32 = START_NEG_2 - LEAD_2;

/// Trail values below `TRAIL_CONTROLS_COUNT` use these C0 control bytes.
/// The controls with line-ending or framing meaning are skipped.
const TRAIL_TO_BYTE: [u8; TRAIL_CONTROLS_COUNT as usize] = [
    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18,
    0x19, 0x1c, 0x1d, 0x1e, 0x1f,
];

/// Inverse of [`TRAIL_TO_BYTE`] for bytes 0x00..=0x20; -1 is not a trail byte.
const BYTE_TO_TRAIL: [i8; 0x21] = [
    -1, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, -1, -1, -1, -1, -1, -1, -1, -1, -1, 0x06, 0x07,
    0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, -1, -1, 0x10, 0x11, 0x12, 0x13, -1,
];

/// New "previous" value after encoding `c`.
///
/// Lands in the middle of the 128-block of small scripts, and in fixed spots
/// for Hiragana, CJK Unihan, and Hangul so that the next difference is small.
fn next_prev(c: i32) -> i32 {
    match c {
        0x3040..=0x309f => 0x3070,
        0x4e00..=0x9fa5 => 0x4e00 - REACH_NEG_2,
        0xac00..=0xd7a3 => (0xd7a3 + 0xac00) / 2,
        _ => (c & !0x7f) + ASCII_PREV,
    }
}

/// Splits `n` into quotient and a non-negative remainder.
#[inline]
fn neg_div_mod(n: i32, d: i32) -> (i32, i32) {
    (n.div_euclid(d), n.rem_euclid(d))
}

#[inline]
fn trail_to_byte(t: i32) -> u8 {
    if t >= TRAIL_CONTROLS_COUNT {
        (t + TRAIL_BYTE_OFFSET) as u8
    } else {
        TRAIL_TO_BYTE[t as usize]
    }
}

#[inline]
fn byte_to_trail(b: u8) -> Option<i32> {
    if i32::from(b) >= MIN {
        Some(i32::from(b) - TRAIL_BYTE_OFFSET)
    } else {
        let t = BYTE_TO_TRAIL[b as usize];
        (t >= 0).then_some(i32::from(t))
    }
}

/// Number of bytes a difference encodes to.
#[inline]
fn diff_len(diff: i32) -> usize {
    if diff >= REACH_NEG_1 {
        if diff <= REACH_POS_1 {
            1
        } else if diff <= REACH_POS_2 {
            2
        } else if diff <= REACH_POS_3 {
            3
        } else {
            4
        }
    } else if diff >= REACH_NEG_2 {
        2
    } else if diff >= REACH_NEG_3 {
        3
    } else {
        4
    }
}

fn pack_diff(mut diff: i32, out: &mut Vec<u8>) {
    let (lead, count) = if diff >= REACH_NEG_1 {
        if diff <= REACH_POS_1 {
            out.push((MIDDLE + diff) as u8);
            return;
        } else if diff <= REACH_POS_2 {
            diff -= REACH_POS_1 + 1;
            (START_POS_2, 1)
        } else if diff <= REACH_POS_3 {
            diff -= REACH_POS_2 + 1;
            (START_POS_3, 2)
        } else {
            diff -= REACH_POS_3 + 1;
            (START_POS_4, 3)
        }
    } else if diff >= REACH_NEG_2 {
        diff -= REACH_NEG_1;
        (START_NEG_2, 1)
    } else if diff >= REACH_NEG_3 {
        diff -= REACH_NEG_2;
        (START_NEG_3, 2)
    } else {
        diff -= REACH_NEG_3;
        (START_NEG_3 - LEAD_3, 3)
    };

    // Trail digits come out least significant first.
    let mut trail = [0u8; 3];
    for slot in trail[..count].iter_mut() {
        let (q, m) = neg_div_mod(diff, TRAIL_COUNT);
        *slot = trail_to_byte(m);
        diff = q;
    }
    out.push((lead + diff) as u8);
    out.extend(trail[..count].iter().rev());
}

/// Encodes `s`, appending to `out`.
pub fn encode_into(s: &str, out: &mut Vec<u8>) {
    let mut prev = ASCII_PREV;
    for ch in s.chars() {
        let c = ch as i32;
        if c <= 0x20 {
            if c != 0x20 {
                prev = ASCII_PREV;
            }
            out.push(c as u8);
            continue;
        }
        pack_diff(c - prev, out);
        prev = next_prev(c);
    }
}

/// Encodes `s` into a new buffer.
#[must_use]
pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    encode_into(s, &mut out);
    out
}

/// Length of the encoding of `s`, without producing it.
#[must_use]
pub fn encoded_len(s: &str) -> usize {
    let mut prev = ASCII_PREV;
    let mut len = 0;
    for ch in s.chars() {
        let c = ch as i32;
        if c <= 0x20 {
            if c != 0x20 {
                prev = ASCII_PREV;
            }
            len += 1;
            continue;
        }
        len += diff_len(c - prev);
        prev = next_prev(c);
    }
    len
}

fn corrupt(message: impl Into<String>) -> lexis_common::Error {
    FormatError::corrupt("BOCU-1 key", message).into()
}

/// Decodes a BOCU-1 byte string.
///
/// # Errors
///
/// Returns [`FormatError::Corrupt`] for truncated sequences, invalid trail
/// bytes, or differences that land outside the Unicode scalar values.
pub fn decode(bytes: &[u8]) -> Result<String> {
    let mut out = String::with_capacity(bytes.len());
    let mut prev = ASCII_PREV;
    let mut iter = bytes.iter().copied();

    while let Some(b) = iter.next() {
        let lead = i32::from(b);
        if lead <= 0x20 {
            if lead != 0x20 {
                prev = ASCII_PREV;
            }
            out.push(char::from(b));
            continue;
        }
        if b == RESET {
            prev = ASCII_PREV;
            continue;
        }

        let (mut diff, count) = if (START_NEG_2..START_POS_2).contains(&lead) {
            (lead - MIDDLE, 0)
        } else if lead >= START_NEG_2 {
            if lead < START_POS_3 {
                ((lead - START_POS_2) * TRAIL_COUNT + REACH_POS_1 + 1, 1)
            } else if lead < START_POS_4 {
                (
                    (lead - START_POS_3) * TRAIL_COUNT * TRAIL_COUNT + REACH_POS_2 + 1,
                    2,
                )
            } else {
                (REACH_POS_3 + 1, 3)
            }
        } else if lead >= START_NEG_3 {
            ((lead - START_NEG_2) * TRAIL_COUNT + REACH_NEG_1, 1)
        } else if lead > MIN {
            (
                (lead - START_NEG_3) * TRAIL_COUNT * TRAIL_COUNT + REACH_NEG_2,
                2,
            )
        } else {
            (-TRAIL_COUNT * TRAIL_COUNT * TRAIL_COUNT + REACH_NEG_3, 3)
        };

        for remaining in (0..count).rev() {
            let trail = iter.next().ok_or_else(|| corrupt("truncated sequence"))?;
            let t = byte_to_trail(trail)
                .ok_or_else(|| corrupt(format!("invalid trail byte {trail:#04x}")))?;
            diff += match remaining {
                0 => t,
                1 => t * TRAIL_COUNT,
                _ => t * TRAIL_COUNT * TRAIL_COUNT,
            };
        }

        let c = prev + diff;
        let ch = u32::try_from(c)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| corrupt(format!("code point {c:#x} out of range")))?;
        out.push(ch);
        prev = next_prev(c);
    }
    Ok(out)
}
