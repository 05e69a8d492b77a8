//! # Frame Header & Reassembly
//!
//! ```text
//! ┌──────────┬───────────────────────┬──────────────────────────┐
//! │ type (1) │ payload length (2 LE) │ payload (length bytes)   │
//! └──────────┴───────────────────────┴──────────────────────────┘
//! ```
//!
//! TCP delivers a byte stream, not frames. [`FrameDecoder`] keeps a per-session
//! accumulator and cuts it into whole frames:
//!
//! ```text
//! AwaitingHeader ──3 bytes──▶ AwaitingBody ──payload──▶ (frame) ──▶ AwaitingHeader
//!        │
//!        └── length > max ──▶ Skipping ──drained──▶ AwaitingHeader
//! ```

use jot_shared::{HEADER_SIZE, MAX_PAYLOAD_SIZE};

/// The 3-byte frame header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// Message type (0-9 control, 10-255 application).
    pub message_type: u8,
    /// Exact number of payload bytes following the header.
    pub payload_len: u16,
}

impl FrameHeader {
    /// Encoded size of the header.
    pub const SIZE: usize = HEADER_SIZE;

    /// Creates a header.
    #[must_use]
    pub const fn new(message_type: u8, payload_len: u16) -> Self {
        Self {
            message_type,
            payload_len,
        }
    }

    /// Parses a header from the front of `bytes`, if enough bytes are present.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [message_type, lo, hi, ..] => Some(Self::new(
                *message_type,
                u16::from_le_bytes([*lo, *hi]),
            )),
            _ => None,
        }
    }

    /// Encodes the header.
    #[must_use]
    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let [lo, hi] = self.payload_len.to_le_bytes();
        [self.message_type, lo, hi]
    }

    /// Total frame size (header + payload).
    #[inline]
    #[must_use]
    pub fn frame_len(self) -> usize {
        HEADER_SIZE + usize::from(self.payload_len)
    }

    /// True when the payload cannot fit one cursor arena.
    #[inline]
    #[must_use]
    pub fn is_oversized(self) -> bool {
        usize::from(self.payload_len) > MAX_PAYLOAD_SIZE
    }
}

/// Framing state of a [`FrameDecoder`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecodeState {
    /// Waiting for 3 header bytes.
    #[default]
    AwaitingHeader,
    /// Header parsed, waiting for the full payload.
    AwaitingBody(FrameHeader),
    /// Discarding the payload of an oversized frame.
    Skipping {
        /// Payload bytes still to discard.
        remaining: usize,
    },
}

/// Output of [`FrameDecoder::next_event`].
#[derive(Debug, PartialEq, Eq)]
pub enum FrameEvent<'a> {
    /// One complete frame, header included.
    Frame(&'a [u8]),
    /// A header announcing an unacceptable payload; its payload is skipped.
    Oversized(FrameHeader),
}

/// Per-connection byte accumulator and framing state machine.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Buffered bytes; everything before `start` is consumed.
    buffer: Vec<u8>,
    /// Offset of the first unconsumed byte.
    start: usize,
    /// Current framing state.
    state: DecodeState,
}

impl FrameDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transport delivery.
    pub fn push(&mut self, bytes: &[u8]) {
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.start = 0;
        }
        self.buffer.extend_from_slice(bytes);
    }

    /// Cuts the next complete frame out of the accumulator.
    ///
    /// Returns `None` once more bytes are needed.
    pub fn next_event(&mut self) -> Option<FrameEvent<'_>> {
        loop {
            let available = self.buffer.len() - self.start;

            match self.state {
                DecodeState::AwaitingHeader => {
                    let header = FrameHeader::parse(&self.buffer[self.start..])?;
                    if header.is_oversized() {
                        self.start += HEADER_SIZE;
                        self.state = DecodeState::Skipping {
                            remaining: usize::from(header.payload_len),
                        };
                        return Some(FrameEvent::Oversized(header));
                    }
                    self.state = DecodeState::AwaitingBody(header);
                }
                DecodeState::AwaitingBody(header) => {
                    let frame_len = header.frame_len();
                    if available < frame_len {
                        return None;
                    }
                    let frame_start = self.start;
                    self.start += frame_len;
                    self.state = DecodeState::AwaitingHeader;
                    return Some(FrameEvent::Frame(&self.buffer[frame_start..self.start]));
                }
                DecodeState::Skipping { remaining } => {
                    let skipped = remaining.min(available);
                    self.start += skipped;
                    if skipped < remaining {
                        self.state = DecodeState::Skipping {
                            remaining: remaining - skipped,
                        };
                        return None;
                    }
                    self.state = DecodeState::AwaitingHeader;
                }
            }
        }
    }

    /// Current framing state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Unconsumed bytes held in the accumulator.
    #[inline]
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len() - self.start
    }

    /// Drops all buffered bytes, keeping the allocation.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.start = 0;
        self.state = DecodeState::AwaitingHeader;
    }
}
