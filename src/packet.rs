//! Wire-format definitions for frames and replies.
//!
//! Every datagram the sender emits is a data frame (or the FIN frame) and
//! every datagram the receiver emits is a reply.  This module is responsible
//! for:
//! - Defining the on-wire binary layout of both.
//! - Serialising a payload into a frame, refusing payloads larger than the
//!   configured maximum (there is no length field on the wire).
//! - Parsing raw bytes back, returning errors for short, oversized or
//!   corrupted input.
//!
//! No I/O happens here; this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.  `D` is the width of the
//! configured [`DigestKind`].
//!
//! ```text
//!  frame:  +-------------------+-----------+---------------------+
//!          | digest(seq‖data)  |    seq    |  payload ...        |
//!          |      D bytes      |  2 bytes  |  ≤ max_payload      |
//!          +-------------------+-----------+---------------------+
//!
//!  reply:  +-----------+-------------------+
//!          |   field   |   digest(field)   |
//!          |  2 bytes  |      D bytes      |
//!          +-----------+-------------------+
//! ```
//!
//! The reply field is either the acknowledged sequence number echoed
//! verbatim, [`FIN_SEQ`], or the [`NAK`] sentinel.

use thiserror::Error;

use crate::digest::DigestKind;

/// Width of the sequence-number field.
pub const SEQ_LEN: usize = 2;

/// Width of the reply field.
pub const REPLY_FIELD_LEN: usize = 2;

/// Reserved sequence value carried by the end-of-stream frame.
pub const FIN_SEQ: u16 = 0xfffe;

/// Reserved reply value meaning "frame rejected, send it again".
pub const NAK: u16 = 0xffff;

/// Largest usable sequence modulus; keeps `[0, M)` disjoint from the
/// reserved values above.
pub const MAX_SEQ_MODULUS: u16 = FIN_SEQ;

/// Largest datagram payload UDP can carry over IPv4.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Successor of `seq` in a sequence space of size `modulus`.
#[inline]
pub fn next_seq(seq: u16, modulus: u16) -> u16 {
    ((u32::from(seq) + 1) % u32::from(modulus)) as u16
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// A validated frame: sequence number plus the payload it protects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub seq: u16,
    pub payload: Vec<u8>,
}

impl Segment {
    /// `true` for the end-of-stream frame.
    pub fn is_fin(&self) -> bool {
        self.seq == FIN_SEQ
    }
}

/// A frame split at its fixed offsets but not yet checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSegment<'a> {
    pub claimed_digest: &'a [u8],
    pub seq: u16,
    pub payload: &'a [u8],
    /// The digest-covered region (`seq ‖ payload`).
    covered: &'a [u8],
}

impl RawSegment<'_> {
    /// Recompute the digest and compare it against the claimed one.
    pub fn verify(&self, digest: DigestKind) -> Result<(), PacketError> {
        if digest.verify(self.covered, self.claimed_digest) {
            Ok(())
        } else {
            Err(PacketError::ChecksumFailed)
        }
    }
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// What the receiver says about the frame it just saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Frame `seq` (or [`FIN_SEQ`]) was accepted.
    Ack(u16),
    /// Frame failed validation.
    Nak,
}

impl Reply {
    fn field(self) -> u16 {
        match self {
            Self::Ack(seq) => seq,
            Self::Nak => NAK,
        }
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Frame and reply serialiser for one digest / payload / modulus setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    digest: DigestKind,
    max_payload: usize,
    seq_modulus: u16,
}

impl Codec {
    pub fn new(digest: DigestKind, max_payload: usize, seq_modulus: u16) -> Self {
        Self {
            digest,
            max_payload,
            seq_modulus,
        }
    }

    pub fn digest(&self) -> DigestKind {
        self.digest
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    pub fn seq_modulus(&self) -> u16 {
        self.seq_modulus
    }

    /// Bytes in front of the payload: digest plus sequence field.
    pub fn header_len(&self) -> usize {
        self.digest.width() + SEQ_LEN
    }

    /// Serialise a data frame.
    pub fn encode_segment(&self, seq: u16, payload: &[u8]) -> Result<Vec<u8>, PacketError> {
        if payload.len() > self.max_payload {
            return Err(PacketError::PayloadTooLarge {
                len: payload.len(),
                max: self.max_payload,
            });
        }
        if seq >= self.seq_modulus && seq != FIN_SEQ {
            return Err(PacketError::InvalidSequence(seq));
        }

        let d = self.digest.width();
        let mut buf = vec![0u8; d + SEQ_LEN + payload.len()];
        buf[d..d + SEQ_LEN].copy_from_slice(&seq.to_be_bytes());
        buf[d + SEQ_LEN..].copy_from_slice(payload);

        let digest = self.digest.digest(&buf[d..]);
        buf[..d].copy_from_slice(&digest);
        Ok(buf)
    }

    /// Serialise the end-of-stream frame.
    pub fn encode_fin(&self) -> Vec<u8> {
        let d = self.digest.width();
        let mut buf = vec![0u8; d + SEQ_LEN];
        buf[d..].copy_from_slice(&FIN_SEQ.to_be_bytes());
        let digest = self.digest.digest(&buf[d..]);
        buf[..d].copy_from_slice(&digest);
        buf
    }

    /// Split `buf` at the fixed header offsets without validating it.
    pub fn parse<'a>(&self, buf: &'a [u8]) -> Result<RawSegment<'a>, PacketError> {
        let d = self.digest.width();
        if buf.len() < d + SEQ_LEN {
            return Err(PacketError::BufferTooShort);
        }
        let (claimed_digest, covered) = buf.split_at(d);
        Ok(RawSegment {
            claimed_digest,
            seq: u16::from_be_bytes([covered[0], covered[1]]),
            payload: &covered[SEQ_LEN..],
            covered,
        })
    }

    /// Parse and fully validate a frame.
    ///
    /// Returns [`Err`] if:
    /// - `buf` is shorter than the header,
    /// - the digest does not verify,
    /// - the payload exceeds the configured maximum, or
    /// - the sequence number lies outside `[0, M)` and is not [`FIN_SEQ`]
    ///   (a FIN must also carry no payload).
    pub fn decode_segment(&self, buf: &[u8]) -> Result<Segment, PacketError> {
        let raw = self.parse(buf)?;
        raw.verify(self.digest)?;

        if raw.payload.len() > self.max_payload {
            return Err(PacketError::PayloadTooLarge {
                len: raw.payload.len(),
                max: self.max_payload,
            });
        }
        let valid_seq = raw.seq < self.seq_modulus || (raw.seq == FIN_SEQ && raw.payload.is_empty());
        if !valid_seq {
            return Err(PacketError::InvalidSequence(raw.seq));
        }

        Ok(Segment {
            seq: raw.seq,
            payload: raw.payload.to_vec(),
        })
    }

    /// Serialise a reply.
    pub fn encode_reply(&self, reply: Reply) -> Vec<u8> {
        let field = reply.field().to_be_bytes();
        let mut buf = Vec::with_capacity(REPLY_FIELD_LEN + self.digest.width());
        buf.extend_from_slice(&field);
        buf.extend_from_slice(&self.digest.digest(&field));
        buf
    }

    /// Parse and validate a reply.
    pub fn decode_reply(&self, buf: &[u8]) -> Result<Reply, PacketError> {
        let expected_len = REPLY_FIELD_LEN + self.digest.width();
        if buf.len() < expected_len {
            return Err(PacketError::BufferTooShort);
        }
        if buf.len() != expected_len {
            return Err(PacketError::LengthMismatch);
        }

        let (field, claimed) = buf.split_at(REPLY_FIELD_LEN);
        if !self.digest.verify(field, claimed) {
            return Err(PacketError::ChecksumFailed);
        }

        match u16::from_be_bytes([field[0], field[1]]) {
            NAK => Ok(Reply::Nak),
            seq => Ok(Reply::Ack(seq)),
        }
    }
}

/// Errors that can arise when building or parsing a datagram.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Buffer shorter than the fixed header size.
    #[error("buffer too short to contain a header")]
    BufferTooShort,
    /// Reply datagram longer than a reply.
    #[error("datagram length does not match the reply layout")]
    LengthMismatch,
    /// Digest did not match recomputed value.
    #[error("digest verification failed")]
    ChecksumFailed,
    #[error("payload of {len} bytes exceeds the {max}-byte maximum")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("sequence number {0} is outside the sequence space")]
    InvalidSequence(u16),
}
