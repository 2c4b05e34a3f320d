//! Response framing, chunking and collector-side reassembly.
//!
//! A response is `{command echo: u16 LE, payload length: u16 LE, payload}`.
//! It is sent as consecutive notifications of at most `MTU - 3` bytes with
//! no per-chunk framing; the receiver concatenates notifications until it
//! holds `payload length + 4` bytes.
//!
//! | Command | Payload |
//! |---|---|
//! | `GetAllResetData` | encoded store (`diagnostics::wire`), empty when no records |
//! | `GetNumResets` | one byte, the record count |

use diagnostics::wire::{self, EncodeError};
use diagnostics::CrashStore;
use heapless::Vec;
use thiserror_no_std::Error;

use crate::command::Command;
use crate::config::{ATT_OVERHEAD, MAX_RESPONSE_LEN, RESPONSE_HEADER_SIZE};

/// Bytes of response that fit one notification at `mtu`.
///
/// Never zero, so a transfer always makes progress even with a bogus MTU.
pub fn chunk_budget(mtu: u16) -> usize {
    usize::from(mtu.saturating_sub(ATT_OVERHEAD)).max(1)
}

/// A fully built response buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    command: Command,
    bytes: Vec<u8, MAX_RESPONSE_LEN>,
}

impl Response {
    /// Build the response to `command` from the current store contents.
    pub fn build(command: Command, store: &CrashStore) -> Result<Self, EncodeError> {
        let mut bytes: Vec<u8, MAX_RESPONSE_LEN> = Vec::new();
        let payload_len = match command {
            Command::GetAllResetData => wire::encoded_len(store),
            Command::GetNumResets => 1,
        };
        let payload_len = u16::try_from(payload_len).map_err(|_| EncodeError::BufferFull)?;

        put(&mut bytes, &command.echo().to_le_bytes())?;
        put(&mut bytes, &payload_len.to_le_bytes())?;
        match command {
            Command::GetAllResetData => wire::encode_store(store, &mut bytes)?,
            Command::GetNumResets => put(&mut bytes, &[store.reset_count()])?,
        }

        Ok(Self { command, bytes })
    }

    /// The command this response answers.
    pub const fn command(&self) -> Command {
        self.command
    }

    /// Header plus payload, in bytes.
    pub fn total_len(&self) -> usize {
        self.bytes.len()
    }

    /// Payload length as written in the header.
    pub fn payload_len(&self) -> usize {
        self.bytes.len().saturating_sub(RESPONSE_HEADER_SIZE)
    }

    /// The whole response.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Next chunk starting at `offset`, at most `budget` bytes.
    ///
    /// Empty once `offset` reaches the end.
    pub fn chunk(&self, offset: usize, budget: usize) -> &[u8] {
        let end = offset.saturating_add(budget).min(self.bytes.len());
        self.bytes.get(offset..end).unwrap_or(&[])
    }
}

fn put<const N: usize>(out: &mut Vec<u8, N>, bytes: &[u8]) -> Result<(), EncodeError> {
    out.extend_from_slice(bytes)
        .map_err(|_| EncodeError::BufferFull)
}

// ─────────────────────────────────────────────────────────────────────────────
// Collector side
// ─────────────────────────────────────────────────────────────────────────────

/// Reassembly failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AssembleError {
    /// The header names an unknown command.
    #[error("unknown command echo {0:#06x}")]
    UnknownCommand(u16),
    /// The header announces more payload than any response can carry.
    #[error("announced payload of {0} bytes is too large")]
    LengthTooLarge(u16),
    /// A chunk carries bytes past the announced end.
    #[error("chunk overruns the announced length")]
    Overrun,
    /// A chunk arrived after the response was complete.
    #[error("response already complete")]
    AlreadyComplete,
}

/// Concatenates notifications back into one response.
#[derive(Debug, Default)]
pub struct ResponseAssembler {
    bytes: Vec<u8, MAX_RESPONSE_LEN>,
}

impl ResponseAssembler {
    /// An empty assembler.
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Append one notification.
    ///
    /// Returns `true` once the response is complete.
    pub fn push(&mut self, chunk: &[u8]) -> Result<bool, AssembleError> {
        if self.is_complete() {
            return Err(AssembleError::AlreadyComplete);
        }
        // A rejected chunk leaves the bytes received so far untouched.
        let mut combined = self.bytes.clone();
        combined
            .extend_from_slice(chunk)
            .map_err(|_| AssembleError::Overrun)?;
        check_header(&combined)?;
        if expected_len(&combined).is_some_and(|expected| combined.len() > expected) {
            return Err(AssembleError::Overrun);
        }
        self.bytes = combined;
        Ok(self.is_complete())
    }

    fn echo(&self) -> Option<u16> {
        header_field(&self.bytes, 0)
    }

    fn expected_len(&self) -> Option<usize> {
        expected_len(&self.bytes)
    }

    /// Returns `true` once header and full payload have arrived.
    pub fn is_complete(&self) -> bool {
        self.expected_len() == Some(self.bytes.len())
    }

    /// The echoed command, once the header has arrived.
    pub fn command(&self) -> Option<Command> {
        self.echo().and_then(|echo| Command::try_from(echo).ok())
    }

    /// The payload, once complete.
    pub fn payload(&self) -> Option<&[u8]> {
        if self.is_complete() {
            self.bytes.get(RESPONSE_HEADER_SIZE..)
        } else {
            None
        }
    }

    /// Bytes received so far, header included.
    pub fn received(&self) -> usize {
        self.bytes.len()
    }

    /// Forget everything received.
    pub fn reset(&mut self) {
        self.bytes.clear();
    }
}

fn header_field(bytes: &[u8], at: usize) -> Option<u16> {
    let lo = *bytes.get(at)?;
    let hi = *bytes.get(at.checked_add(1)?)?;
    Some(u16::from_le_bytes([lo, hi]))
}

fn expected_len(bytes: &[u8]) -> Option<usize> {
    header_field(bytes, 2).map(|len| usize::from(len).saturating_add(RESPONSE_HEADER_SIZE))
}

fn check_header(bytes: &[u8]) -> Result<(), AssembleError> {
    if let Some(echo) = header_field(bytes, 0) {
        Command::try_from(echo).map_err(|_| AssembleError::UnknownCommand(echo))?;
    }
    if let Some(len) = header_field(bytes, 2) {
        if usize::from(len) > MAX_RESPONSE_LEN.saturating_sub(RESPONSE_HEADER_SIZE) {
            return Err(AssembleError::LengthTooLarge(len));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_budget() {
        assert_eq!(chunk_budget(23), 20);
        assert_eq!(chunk_budget(247), 244);
        assert_eq!(chunk_budget(0), 1, "never stalls on a zero budget");
    }

    #[test]
    fn test_num_resets_response() {
        let store = CrashStore::new();
        let response = Response::build(Command::GetNumResets, &store).unwrap();
        assert_eq!(response.as_bytes(), &[0x02, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_empty_store_is_header_only() {
        let store = CrashStore::new();
        let response = Response::build(Command::GetAllResetData, &store).unwrap();
        assert_eq!(response.as_bytes(), &[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(response.payload_len(), 0);
    }

    #[test]
    fn test_chunks_cover_response() {
        let store = CrashStore::new();
        let response = Response::build(Command::GetNumResets, &store).unwrap();
        assert_eq!(response.chunk(0, 3), &[0x02, 0x00, 0x01]);
        assert_eq!(response.chunk(3, 3), &[0x00, 0x00]);
        assert!(response.chunk(5, 3).is_empty());
    }

    #[test]
    fn test_assembler_across_chunks() {
        let mut assembler = ResponseAssembler::new();
        assert_eq!(assembler.push(&[0x02, 0x00]), Ok(false));
        assert_eq!(assembler.push(&[0x01, 0x00]), Ok(false));
        assert_eq!(assembler.push(&[0x03]), Ok(true));
        assert_eq!(assembler.command(), Some(Command::GetNumResets));
        assert_eq!(assembler.payload(), Some(&[0x03_u8][..]));
    }

    #[test]
    fn test_assembler_rejects_overrun() {
        let mut assembler = ResponseAssembler::new();
        assert_eq!(
            assembler.push(&[0x02, 0x00, 0x01, 0x00, 0x03, 0x04]),
            Err(AssembleError::Overrun)
        );
    }

    #[test]
    fn test_assembler_rejects_unknown_command() {
        let mut assembler = ResponseAssembler::new();
        assert_eq!(assembler.push(&[0x07, 0x00]), Err(AssembleError::UnknownCommand(7)));
    }

    #[test]
    fn test_assembler_rejects_chunk_after_completion() {
        let mut assembler = ResponseAssembler::new();
        assembler.push(&[0x01, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(assembler.push(&[0x00]), Err(AssembleError::AlreadyComplete));
    }

    #[test]
    fn test_rejected_chunk_leaves_assembler_usable() {
        let mut assembler = ResponseAssembler::new();
        assert_eq!(assembler.push(&[0x07, 0x00]), Err(AssembleError::UnknownCommand(7)));
        assert_eq!(assembler.received(), 0);

        assert_eq!(assembler.push(&[0x02, 0x00, 0x01, 0x00]), Ok(false));
        assert_eq!(assembler.push(&[0x03, 0x04]), Err(AssembleError::Overrun));
        assert_eq!(assembler.received(), 4);
        assert_eq!(assembler.push(&[0x03]), Ok(true));
        assert_eq!(assembler.payload(), Some(&[0x03_u8][..]));
    }
}
