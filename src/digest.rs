//! Integrity digests used to detect channel corruption.
//!
//! Every frame and every reply carries a fixed-width digest.  The digest is a
//! corruption detector only: nothing here authenticates the peer.  Which
//! function is used is a configuration choice ([`DigestKind`]); both peers
//! must agree on it because the width determines the frame layout.
//!
//! | Kind       | Width | Notes                                       |
//! |------------|-------|---------------------------------------------|
//! | `internet` | 2     | RFC 1071 one's-complement sum.  Cheap, weak. |
//! | `crc32`    | 4     | CRC-32/ISO-HDLC.                            |
//! | `sha256`   | 16    | SHA-256 truncated to 128 bits.              |
//! | `blake3`   | 16    | BLAKE3 truncated to 128 bits (default).     |

use std::fmt;
use std::str::FromStr;

use crc::{Crc, CRC_32_ISO_HDLC};
use sha2::{Digest as _, Sha256};

/// Widest digest any [`DigestKind`] produces.
pub const MAX_DIGEST_LEN: usize = 16;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Selects the digest function protecting frames and replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestKind {
    Internet,
    Crc32,
    Sha256,
    #[default]
    Blake3,
}

impl DigestKind {
    /// Number of digest bytes on the wire (`D`).
    pub const fn width(self) -> usize {
        match self {
            Self::Internet => 2,
            Self::Crc32 => 4,
            Self::Sha256 | Self::Blake3 => 16,
        }
    }

    /// Digest of `data`, exactly [`width`](Self::width) bytes long.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Internet => internet_checksum(data).to_be_bytes().to_vec(),
            Self::Crc32 => CRC32.checksum(data).to_be_bytes().to_vec(),
            Self::Sha256 => Sha256::digest(data)[..self.width()].to_vec(),
            Self::Blake3 => blake3::hash(data).as_bytes()[..self.width()].to_vec(),
        }
    }

    /// `true` when `claimed` is the digest of `data`.
    pub fn verify(self, data: &[u8], claimed: &[u8]) -> bool {
        claimed.len() == self.width() && self.digest(data) == claimed
    }
}

impl fmt::Display for DigestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Internet => "internet",
            Self::Crc32 => "crc32",
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        };
        f.write_str(name)
    }
}

impl FromStr for DigestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "internet" => Ok(Self::Internet),
            "crc32" => Ok(Self::Crc32),
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(format!(
                "unknown digest `{other}` (expected internet, crc32, sha256 or blake3)"
            )),
        }
    }
}

/// Compute the Internet checksum (RFC 1071) over `data`.
///
/// Sum consecutive 16-bit big-endian words, fold the carry, return the
/// one's-complement.
fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut words = data.chunks_exact(2);

    for word in &mut words {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
    }
    // Odd trailing byte: pad with a zero byte on the right.
    if let [last] = words.remainder() {
        sum += u32::from(*last) << 8;
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }

    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [DigestKind; 4] = [
        DigestKind::Internet,
        DigestKind::Crc32,
        DigestKind::Sha256,
        DigestKind::Blake3,
    ];

    #[test]
    fn digest_has_declared_width() {
        for kind in ALL {
            assert_eq!(kind.digest(b"HELLOWORLD").len(), kind.width(), "{kind}");
            assert_eq!(kind.digest(b"").len(), kind.width(), "{kind}");
            assert!(kind.width() <= MAX_DIGEST_LEN);
        }
    }

    #[test]
    fn digest_is_deterministic() {
        for kind in ALL {
            assert_eq!(kind.digest(b"abc"), kind.digest(b"abc"));
        }
    }

    #[test]
    fn single_bit_flip_changes_digest() {
        let data = b"the quick brown fox".to_vec();
        for kind in ALL {
            let original = kind.digest(&data);
            for bit in 0..data.len() * 8 {
                let mut flipped = data.clone();
                flipped[bit / 8] ^= 1 << (bit % 8);
                assert_ne!(kind.digest(&flipped), original, "{kind} missed bit {bit}");
            }
        }
    }

    #[test]
    fn internet_checksum_matches_rfc1071_example() {
        // RFC 1071 §3: words 0001 f203 f4f5 f6f7 sum to ddf2 (before complement).
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(internet_checksum(&data), !0xddf2u16);
    }

    #[test]
    fn internet_checksum_pads_odd_length() {
        assert_eq!(internet_checksum(&[0xab]), internet_checksum(&[0xab, 0x00]));
    }

    #[test]
    fn verify_rejects_wrong_length() {
        let kind = DigestKind::Blake3;
        let d = kind.digest(b"x");
        assert!(kind.verify(b"x", &d));
        assert!(!kind.verify(b"x", &d[..8]));
    }

    #[test]
    fn parse_and_display_agree() {
        for kind in ALL {
            assert_eq!(kind.to_string().parse::<DigestKind>(), Ok(kind));
        }
        assert_eq!("SHA256".parse::<DigestKind>(), Ok(DigestKind::Sha256));
        assert!("md4".parse::<DigestKind>().is_err());
    }

    #[test]
    fn default_is_128_bit() {
        assert_eq!(DigestKind::default().width(), 16);
    }
}
