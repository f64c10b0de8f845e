//! `VERSION` register decoding.
//!
//! The IP reports `major << 16 | minor`. A bus with nothing behind it reads
//! all-zeros on the lightweight bridge, and all-ones when the bridge is held
//! in reset, so both values mean "no calculator present".

use std::fmt;

/// Decoded IP version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IpVersion {
    /// Major revision (upper half-word).
    pub major: u16,
    /// Minor revision (lower half-word).
    pub minor: u16,
}

impl IpVersion {
    /// Decode a raw `VERSION` word. `None` when no device answers.
    pub const fn from_register(word: u32) -> Option<Self> {
        if !is_present(word) {
            return None;
        }
        Some(Self {
            major: (word >> 16) as u16,
            minor: (word & 0xFFFF) as u16,
        })
    }

    /// Raw register encoding.
    pub const fn to_register(self) -> u32 {
        (self.major as u32) << 16 | self.minor as u32
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{:04x}", self.major, self.minor)
    }
}

/// `VERSION` word indicates a device behind the bridge.
pub const fn is_present(word: u32) -> bool {
    word != 0 && word != u32::MAX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_version() {
        let v = IpVersion::from_register(0x0001_0001).unwrap();
        assert_eq!(v, IpVersion { major: 1, minor: 1 });
        assert_eq!(v.to_register(), 0x0001_0001);
        assert_eq!(v.to_string(), "v1.0001");
    }

    #[test]
    fn absent_device() {
        assert_eq!(IpVersion::from_register(0), None);
        assert_eq!(IpVersion::from_register(u32::MAX), None);
    }
}
