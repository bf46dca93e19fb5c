//! Duration extraction straight from RIFF/WAVE header bytes.
//!
//! Only four fields are trusted: the `RIFF` magic, the sample rate and byte rate
//! inside the `fmt ` block, and the payload size of the `data` block. Anything
//! structurally surprising yields [`ParsedDuration::Unknown`] rather than an error;
//! duration is enrichment for the published document, nothing depends on it.

use std::fmt;

/// Canonical PCM WAVE header length: RIFF descriptor, 24-byte `fmt ` block, `data` header.
pub const MIN_HEADER_LEN: usize = 44;

/// Durations above this are treated as a mis-parse, not a long recording.
pub const MAX_PLAUSIBLE_SECONDS: f64 = 3600.0;

const RIFF_MAGIC: &[u8; 4] = b"RIFF";
const FMT_MARKER: &[u8; 4] = b"fmt ";
const DATA_MARKER: &[u8; 4] = b"data";

// Offsets relative to the start of the `fmt ` marker.
const SAMPLE_RATE_OFFSET: usize = 12;
const BYTE_RATE_OFFSET: usize = 16;
// Relative to the start of the `data` marker.
const DATA_SIZE_OFFSET: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownReason {
    TooShort,
    BadMagic,
    NoFormatBlock,
    NoDataBlock,
    NonPositive,
    OutOfRange,
}

impl UnknownReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnknownReason::TooShort => "too-short",
            UnknownReason::BadMagic => "bad-magic",
            UnknownReason::NoFormatBlock => "no-format-block",
            UnknownReason::NoDataBlock => "no-data-block",
            UnknownReason::NonPositive => "non-positive",
            UnknownReason::OutOfRange => "out-of-range",
        }
    }
}

impl fmt::Display for UnknownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDuration {
    Known { seconds: u32 },
    Unknown(UnknownReason),
}

impl ParsedDuration {
    pub fn seconds(&self) -> Option<u32> {
        match self {
            ParsedDuration::Known { seconds } => Some(*seconds),
            ParsedDuration::Unknown(_) => None,
        }
    }
}

/// Parse the duration of a WAVE container held in `bytes`.
pub fn parse(bytes: &[u8]) -> ParsedDuration {
    use ParsedDuration::Unknown;

    if bytes.len() < MIN_HEADER_LEN {
        return Unknown(UnknownReason::TooShort);
    }
    if &bytes[..4] != RIFF_MAGIC {
        return Unknown(UnknownReason::BadMagic);
    }

    let fmt_at = match find_marker(bytes, FMT_MARKER, 0) {
        Some(pos) => pos,
        None => return Unknown(UnknownReason::NoFormatBlock),
    };
    // The data block follows the format block; scanning past the marker keeps
    // a stray "data" inside fmt's payload from matching.
    let data_at = match find_marker(bytes, DATA_MARKER, fmt_at + FMT_MARKER.len()) {
        Some(pos) => pos,
        None => return Unknown(UnknownReason::NoDataBlock),
    };

    let sample_rate = match read_u32_le(bytes, fmt_at + SAMPLE_RATE_OFFSET) {
        Some(v) => v,
        None => return Unknown(UnknownReason::NoFormatBlock),
    };
    let byte_rate = match read_u32_le(bytes, fmt_at + BYTE_RATE_OFFSET) {
        Some(v) => v,
        None => return Unknown(UnknownReason::NoFormatBlock),
    };
    let data_size = match read_u32_le(bytes, data_at + DATA_SIZE_OFFSET) {
        Some(v) => v,
        None => return Unknown(UnknownReason::NoDataBlock),
    };

    if sample_rate == 0 || byte_rate == 0 || data_size == 0 {
        return Unknown(UnknownReason::NonPositive);
    }

    let duration = f64::from(data_size) / f64::from(byte_rate);
    if duration <= 0.0 || duration > MAX_PLAUSIBLE_SECONDS {
        return Unknown(UnknownReason::OutOfRange);
    }

    ParsedDuration::Known {
        seconds: duration.round() as u32,
    }
}

fn find_marker(bytes: &[u8], marker: &[u8; 4], from: usize) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(marker.len())
        .position(|w| w == marker)
        .map(|pos| pos + from)
}

fn read_u32_le(bytes: &[u8], at: usize) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(raw))
}
