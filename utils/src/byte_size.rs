use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// A byte count that can be parsed from user strings such as `"512kb"`, `"1mib"` or `"25 MB"`.
///
/// Decimal suffixes (`kb`, `mb`, `gb`) are powers of 1000; binary suffixes (`kib`, `mib`, `gib`)
/// are powers of 1024.  A bare number is a count of bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteSize(u64);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot parse {0:?} as a byte size")]
pub struct ByteSizeParseError(String);

impl ByteSize {
    pub const fn new(n_bytes: u64) -> Self {
        Self(n_bytes)
    }

    pub const fn kib(n: u64) -> Self {
        Self(n * KIB)
    }

    pub const fn mib(n: u64) -> Self {
        Self(n * MIB)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ByteSize {
    fn from(n_bytes: u64) -> Self {
        Self(n_bytes)
    }
}

impl FromStr for ByteSize {
    type Err = ByteSizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let split = lowered
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(lowered.len());
        let (number, unit) = lowered.split_at(split);

        let multiplier = match unit.trim() {
            "" | "b" => 1,
            "k" | "kb" => 1000,
            "m" | "mb" => 1000 * 1000,
            "g" | "gb" => 1000 * 1000 * 1000,
            "kib" => KIB,
            "mib" => MIB,
            "gib" => GIB,
            _ => return Err(ByteSizeParseError(s.to_owned())),
        };

        let value: f64 = number.parse().map_err(|_| ByteSizeParseError(s.to_owned()))?;
        if !value.is_finite() || value < 0.0 {
            return Err(ByteSizeParseError(s.to_owned()));
        }

        Ok(Self((value * multiplier as f64).round() as u64))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0;
        if n >= GIB && n % GIB == 0 {
            write!(f, "{} GiB", n / GIB)
        } else if n >= MIB && n % MIB == 0 {
            write!(f, "{} MiB", n / MIB)
        } else if n >= KIB && n % KIB == 0 {
            write!(f, "{} KiB", n / KIB)
        } else {
            write!(f, "{n} bytes")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_binary_and_decimal_units() {
        assert_eq!("1mib".parse::<ByteSize>().unwrap(), ByteSize::mib(1));
        assert_eq!("25 MiB".parse::<ByteSize>().unwrap(), ByteSize::mib(25));
        assert_eq!("512kb".parse::<ByteSize>().unwrap(), ByteSize::new(512_000));
        assert_eq!("1.5kib".parse::<ByteSize>().unwrap(), ByteSize::new(1536));
        assert_eq!("4096".parse::<ByteSize>().unwrap(), ByteSize::new(4096));
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<ByteSize>().is_err());
        assert!("ten mb".parse::<ByteSize>().is_err());
        assert!("5 parsecs".parse::<ByteSize>().is_err());
    }

    #[test]
    fn display_uses_largest_exact_unit() {
        assert_eq!(ByteSize::mib(25).to_string(), "25 MiB");
        assert_eq!(ByteSize::kib(3).to_string(), "3 KiB");
        assert_eq!(ByteSize::new(1000).to_string(), "1000 bytes");
    }
}
