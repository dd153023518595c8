//! Windows security identifiers.
//!
//! On disk a SID is a small binary structure: a one-byte revision, a
//! subauthority count, a 48-bit big-endian identifier authority and the
//! subauthorities as little-endian dwords. Off disk it is the familiar
//! `S-R-A-S...` text form.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error produced when parsing the textual SID form.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SidParseError {
    /// The string does not start with `S-`.
    #[error("missing `S-` prefix")]
    MissingPrefix,
    /// The revision component is not a valid 8-bit number.
    #[error("invalid revision")]
    InvalidRevision,
    /// The authority component is not a valid 48-bit number.
    #[error("invalid authority")]
    InvalidAuthority,
    /// A subauthority component is not a valid 32-bit number.
    #[error("invalid subauthority")]
    InvalidSubAuthority,
}

/// A structured security identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sid {
    /// The revision of the SID, 1 in practice.
    pub revision: u8,
    /// The identifier authority, a 48-bit value.
    pub authority: u64,
    /// The subauthorities following the fixed part.
    pub sub_authorities: Vec<u32>,
}

impl Sid {
    /// Size of the fixed part of the binary form.
    pub const HEADER_LENGTH: usize = 8;

    /// Decodes a SID from its binary form.
    ///
    /// Returns `None` when the input is shorter than the fixed part or than
    /// the declared subauthority count requires. Trailing bytes are ignored.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::HEADER_LENGTH {
            return None;
        }
        let count = usize::from(bytes[1]);
        if bytes.len() < Self::HEADER_LENGTH + count * 4 {
            return None;
        }
        let mut authority = 0u64;
        for &byte in &bytes[2..8] {
            authority = (authority << 8) | u64::from(byte);
        }
        let sub_authorities = bytes[8..8 + count * 4]
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Some(Self {
            revision: bytes[0],
            authority,
            sub_authorities,
        })
    }

    /// Encodes the SID into its binary form.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::HEADER_LENGTH + self.sub_authorities.len() * 4);
        out.push(self.revision);
        out.push(self.sub_authorities.len() as u8);
        out.extend_from_slice(&self.authority.to_be_bytes()[2..8]);
        for sub in &self.sub_authorities {
            out.extend_from_slice(&sub.to_le_bytes());
        }
        out
    }
}

impl FromStr for Sid {
    type Err = SidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix("S-").ok_or(SidParseError::MissingPrefix)?;
        let mut parts = rest.split('-');
        let revision = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or(SidParseError::InvalidRevision)?;
        let authority = parts
            .next()
            .and_then(|p| p.parse::<u64>().ok())
            .ok_or(SidParseError::InvalidAuthority)?;
        if authority >= 1 << 48 {
            return Err(SidParseError::InvalidAuthority);
        }
        let mut sub_authorities = Vec::new();
        for part in parts {
            sub_authorities.push(
                part.parse::<u32>()
                    .map_err(|_| SidParseError::InvalidSubAuthority)?,
            );
        }
        Ok(Self {
            revision,
            authority,
            sub_authorities,
        })
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}-{}", self.revision, self.authority)?;
        for sub in &self.sub_authorities {
            write!(f, "-{sub}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_round_trip() {
        let text = "S-1-5-21-1004336348-1177238915-682003330-512";
        let sid: Sid = text.parse().unwrap();
        assert_eq!(sid.revision, 1);
        assert_eq!(sid.authority, 5);
        assert_eq!(
            sid.sub_authorities,
            [21, 1_004_336_348, 1_177_238_915, 682_003_330, 512]
        );
        assert_eq!(sid.to_string(), text);
    }

    #[test]
    fn no_subauthorities() {
        let sid: Sid = "S-1-5".parse().unwrap();
        assert!(sid.sub_authorities.is_empty());
        assert_eq!(sid.to_string(), "S-1-5");
    }

    #[test]
    fn binary_layout() {
        let sid: Sid = "S-1-5-18".parse().unwrap();
        let bytes = sid.to_bytes();
        // revision, count, 48-bit big-endian authority, little-endian subs
        assert_eq!(bytes, [1, 1, 0, 0, 0, 0, 0, 5, 18, 0, 0, 0]);
        assert_eq!(Sid::from_bytes(&bytes), Some(sid));
    }

    #[test]
    fn binary_rejects_short_input() {
        assert_eq!(Sid::from_bytes(&[1, 0, 0]), None);
        // declares two subauthorities but carries only one
        assert_eq!(
            Sid::from_bytes(&[1, 2, 0, 0, 0, 0, 0, 5, 18, 0, 0, 0]),
            None
        );
    }

    #[test]
    fn binary_ignores_trailing_bytes() {
        let mut bytes = "S-1-5-18".parse::<Sid>().unwrap().to_bytes();
        bytes.extend_from_slice(&[0, 0, 0]); // alignment padding
        let sid = Sid::from_bytes(&bytes).unwrap();
        assert_eq!(sid.to_string(), "S-1-5-18");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!("".parse::<Sid>(), Err(SidParseError::MissingPrefix));
        assert_eq!("X-1-5".parse::<Sid>(), Err(SidParseError::MissingPrefix));
        assert_eq!("S-abc-5".parse::<Sid>(), Err(SidParseError::InvalidRevision));
        assert_eq!("S-1".parse::<Sid>(), Err(SidParseError::InvalidAuthority));
        assert_eq!(
            "S-1-5-x".parse::<Sid>(),
            Err(SidParseError::InvalidSubAuthority)
        );
    }

    #[test]
    fn authority_is_48_bit() {
        let sid: Sid = "S-1-281474976710655".parse().unwrap();
        assert_eq!(sid.authority, (1 << 48) - 1);
        assert_eq!(&sid.to_bytes()[2..8], &[0xFF; 6]);
        assert_eq!(
            "S-1-281474976710656".parse::<Sid>(),
            Err(SidParseError::InvalidAuthority)
        );
    }
}
