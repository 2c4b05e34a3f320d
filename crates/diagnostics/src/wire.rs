//! Byte layout of an exported crash store.
//!
//! Little-endian and packed, independent of the in-memory `repr(C)` layout:
//!
//! ```text
//! header  (2 bytes)   last_reset_reason: u8, reset_count: u8
//! record  (63 bytes)  valid: u8, epoch: u32, handler: u8,
//!                     frame: 8 × u32 (r0 r1 r2 r3 r12 lr pc xpsr),
//!                     call_trace_len: u8, call_trace: CALL_DEPTH × u32
//! ```
//!
//! Only the valid prefix of the records array is encoded, so the payload
//! is `2 + reset_count × 63` bytes. A store with no records encodes to
//! an empty payload ("nothing to report").

use heapless::Vec;
use thiserror_no_std::Error;

use crate::config::{CALL_DEPTH, MAX_RECORDS};
use crate::frame::{FaultHandlerKind, StackFrame, FRAME_WORDS};
use crate::reset::ResetReason;
use crate::store::{CrashStore, FaultRecord};

/// Size of the store header on the wire.
pub const HEADER_SIZE: usize = 2;

/// Size of one record on the wire.
pub const RECORD_SIZE: usize = 1 + 4 + 1 + FRAME_WORDS * 4 + 1 + CALL_DEPTH * 4;

/// Largest possible encoded store.
pub const MAX_STORE_SIZE: usize = HEADER_SIZE + MAX_RECORDS * RECORD_SIZE;

const _: () = assert!(RECORD_SIZE == 63);

/// Output buffer too small for the encoded store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// The buffer ran out of space.
    #[error("encode buffer full")]
    BufferFull,
}

/// Failure to decode an exported store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// The payload ended inside a field.
    #[error("payload truncated")]
    Truncated,
    /// The reset-reason byte is not a known reason.
    #[error("unknown reset reason {0}")]
    BadResetReason(u8),
    /// A record's handler byte is not a known handler.
    #[error("unknown fault handler {0}")]
    BadHandler(u8),
    /// More records than the store can hold.
    #[error("record count {0} exceeds capacity")]
    TooManyRecords(u8),
    /// A record claims more trace entries than it has slots.
    #[error("call trace length {0} exceeds depth")]
    BadTraceLength(u8),
    /// Bytes left over after the last record.
    #[error("{0} trailing bytes")]
    TrailingBytes(usize),
}

/// Number of payload bytes [`encode_store`] produces for `store`.
pub fn encoded_len(store: &CrashStore) -> usize {
    match store.reset_count() {
        0 => 0,
        count => HEADER_SIZE.saturating_add(usize::from(count).saturating_mul(RECORD_SIZE)),
    }
}

/// Append the encoded valid prefix of `store` to `out`.
pub fn encode_store<const N: usize>(
    store: &CrashStore,
    out: &mut Vec<u8, N>,
) -> Result<(), EncodeError> {
    if store.reset_count() == 0 {
        return Ok(());
    }
    put(out, &[store.last_reset_reason() as u8, store.reset_count()])?;
    for record in store.records() {
        encode_record(record, out)?;
    }
    Ok(())
}

fn encode_record<const N: usize>(
    record: &FaultRecord,
    out: &mut Vec<u8, N>,
) -> Result<(), EncodeError> {
    put(out, &[record.valid_byte()])?;
    put(out, &record.epoch().to_le_bytes())?;
    put(out, &[record.handler_code()])?;
    for word in record.frame().to_words() {
        put(out, &word.to_le_bytes())?;
    }
    let trace_len = u8::try_from(record.call_trace_len()).unwrap_or(u8::MAX);
    put(out, &[trace_len])?;
    for word in record.call_trace_slots() {
        put(out, &word.to_le_bytes())?;
    }
    Ok(())
}

fn put<const N: usize>(out: &mut Vec<u8, N>, bytes: &[u8]) -> Result<(), EncodeError> {
    out.extend_from_slice(bytes).map_err(|_| EncodeError::BufferFull)
}

/// One decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    /// The record's `valid` flag.
    pub valid: bool,
    /// Epoch at capture time.
    pub epoch: u32,
    /// Entry point that captured the fault.
    pub handler: FaultHandlerKind,
    /// Exception frame.
    pub frame: StackFrame,
    /// All trace slots, unused ones zero.
    pub call_trace: [u32; CALL_DEPTH],
    /// Number of meaningful trace slots.
    pub call_trace_len: usize,
}

impl DecodedRecord {
    /// The meaningful trace entries.
    pub fn trace(&self) -> &[u32] {
        self.call_trace.get(..self.call_trace_len).unwrap_or(&[])
    }

    fn from_record(record: &FaultRecord) -> Self {
        Self {
            valid: record.is_valid(),
            epoch: record.epoch(),
            handler: record.handler().unwrap_or(FaultHandlerKind::HardFault),
            frame: *record.frame(),
            call_trace: *record.call_trace_slots(),
            call_trace_len: record.call_trace_len(),
        }
    }
}

/// A decoded store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedStore {
    /// Reason of the reset that preceded the export.
    pub last_reset_reason: ResetReason,
    /// The valid records, oldest first.
    pub records: Vec<DecodedRecord, MAX_RECORDS>,
}

impl DecodedStore {
    /// Decoded view of an in-memory store, as a collector would see it.
    pub fn from_store(store: &CrashStore) -> Self {
        let mut records = Vec::new();
        for record in store.records() {
            // records() never yields more than MAX_RECORDS entries
            let _ = records.push(DecodedRecord::from_record(record));
        }
        Self {
            last_reset_reason: store.last_reset_reason(),
            records,
        }
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.bytes.len() < n {
            return Err(DecodeError::Truncated);
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        self.take(1)?.first().copied().ok_or(DecodeError::Truncated)
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let bytes: [u8; 4] = self
            .take(4)?
            .try_into()
            .map_err(|_| DecodeError::Truncated)?;
        Ok(u32::from_le_bytes(bytes))
    }
}

/// Decode a payload produced by [`encode_store`].
///
/// An empty payload means the store had no records; it decodes to `None`.
pub fn decode_store(payload: &[u8]) -> Result<Option<DecodedStore>, DecodeError> {
    if payload.is_empty() {
        return Ok(None);
    }
    let mut reader = Reader { bytes: payload };

    let reason = reader.u8()?;
    let last_reset_reason = ResetReason::try_from(reason).map_err(DecodeError::BadResetReason)?;
    let count = reader.u8()?;
    if usize::from(count) > MAX_RECORDS {
        return Err(DecodeError::TooManyRecords(count));
    }

    let mut records = Vec::new();
    for _ in 0..count {
        let record = decode_record(&mut reader)?;
        records
            .push(record)
            .map_err(|_| DecodeError::TooManyRecords(count))?;
    }

    if !reader.bytes.is_empty() {
        return Err(DecodeError::TrailingBytes(reader.bytes.len()));
    }

    Ok(Some(DecodedStore {
        last_reset_reason,
        records,
    }))
}

fn decode_record(reader: &mut Reader<'_>) -> Result<DecodedRecord, DecodeError> {
    let valid = reader.u8()? != 0;
    let epoch = reader.u32()?;
    let handler_code = reader.u8()?;
    let handler = FaultHandlerKind::try_from(handler_code).map_err(DecodeError::BadHandler)?;

    let mut words = [0_u32; FRAME_WORDS];
    for word in &mut words {
        *word = reader.u32()?;
    }

    let trace_len = reader.u8()?;
    if usize::from(trace_len) > CALL_DEPTH {
        return Err(DecodeError::BadTraceLength(trace_len));
    }
    let mut call_trace = [0_u32; CALL_DEPTH];
    for slot in &mut call_trace {
        *slot = reader.u32()?;
    }

    Ok(DecodedRecord {
        valid,
        epoch,
        handler,
        frame: StackFrame::from_words(words),
        call_trace,
        call_trace_len: usize::from(trace_len),
    })
}
