//! Chunked transfer of large background images.
//!
//! Payloads up to [`DIRECT_SEND_LIMIT`] travel in a single event; larger
//! ones are split into [`CHUNK_SIZE`] pieces behind a transfer-start
//! announcement. Anything over [`MAX_BACKGROUND_BYTES`] is rejected before
//! it touches the wire.

use crate::error::{ProtocolError, ProtocolResult};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Size of each chunk in bytes.
pub const CHUNK_SIZE: usize = 512 * 1024;

/// Largest payload sent as a single direct event.
pub const DIRECT_SEND_LIMIT: usize = 1024 * 1024;

/// Hard upper bound on background payloads; larger ones are rejected.
pub const MAX_BACKGROUND_BYTES: usize = 5 * 1024 * 1024;

/// Delay between consecutive chunk sends.
pub const CHUNK_PACING: Duration = Duration::from_millis(100);

/// How long a partial transfer is retained before it is discarded.
pub const TRANSFER_TTL: Duration = Duration::from_secs(30);

/// Largest chunk count any accepted payload can need. Announcements over
/// this are rejected before any buffer is allocated, since `total_chunks`
/// arrives from the wire.
pub const MAX_TRANSFER_CHUNKS: u32 =
    ((MAX_BACKGROUND_BYTES + CHUNK_SIZE - 1) / CHUNK_SIZE) as u32;

/// How a background payload should travel, decided by its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPath {
    /// Small enough for a single event.
    Direct,
    /// Split into a chunked transfer.
    Chunked,
}

impl SendPath {
    /// Picks the path for a payload of `len` bytes, or an error when the
    /// payload exceeds the hard limit.
    pub fn for_len(len: usize) -> ProtocolResult<Self> {
        if len > MAX_BACKGROUND_BYTES {
            return Err(ProtocolError::PayloadTooLarge {
                len,
                max: MAX_BACKGROUND_BYTES,
            });
        }
        if len <= DIRECT_SEND_LIMIT {
            Ok(SendPath::Direct)
        } else {
            Ok(SendPath::Chunked)
        }
    }
}

/// Generates a unique id for a new chunked transfer.
pub fn new_transfer_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Splits a payload into pieces of at most [`CHUNK_SIZE`] bytes,
/// preserving order.
///
/// Cuts land on `char` boundaries, so a multibyte character never
/// straddles two chunks and reassembly restores the payload byte for
/// byte.
pub fn split_payload(payload: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = payload;
    while !rest.is_empty() {
        let mut end = CHUNK_SIZE.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk.to_string());
        rest = tail;
    }
    chunks
}

struct PendingTransfer {
    chunks: Vec<Option<String>>,
    received: u32,
    bytes: usize,
    started_at: Instant,
}

/// Reassembles chunked transfers, keyed by transfer id.
///
/// Transfers that never finish are dropped by [`expire_stale`], which the
/// owner calls on its own schedule; completion and expiry both release the
/// buffered chunks.
///
/// [`expire_stale`]: ChunkAssembler::expire_stale
pub struct ChunkAssembler {
    transfers: HashMap<String, PendingTransfer>,
    ttl: Duration,
}

impl Default for ChunkAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkAssembler {
    /// Creates an assembler with the default [`TRANSFER_TTL`].
    pub fn new() -> Self {
        Self::with_ttl(TRANSFER_TTL)
    }

    /// Creates an assembler with a custom time-to-live for partial
    /// transfers.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            transfers: HashMap::new(),
            ttl,
        }
    }

    /// Registers a new transfer announced with `total_chunks` pieces.
    pub fn begin(&mut self, transfer_id: &str, total_chunks: u32) -> ProtocolResult<()> {
        if total_chunks > MAX_TRANSFER_CHUNKS {
            return Err(ProtocolError::TooManyChunks {
                transfer_id: transfer_id.to_string(),
                total_chunks,
                max: MAX_TRANSFER_CHUNKS,
            });
        }
        if self.transfers.contains_key(transfer_id) {
            return Err(ProtocolError::DuplicateTransfer {
                transfer_id: transfer_id.to_string(),
            });
        }
        self.transfers.insert(
            transfer_id.to_string(),
            PendingTransfer {
                chunks: vec![None; total_chunks as usize],
                received: 0,
                bytes: 0,
                started_at: Instant::now(),
            },
        );
        Ok(())
    }

    /// Accepts one chunk. Returns the reassembled payload once the final
    /// chunk lands and every piece is present.
    ///
    /// A duplicate chunk index is overwritten silently; the sender paces
    /// chunks sequentially, so a retry simply rewrites the same bytes.
    pub fn accept(
        &mut self,
        transfer_id: &str,
        chunk_index: u32,
        chunk: String,
        is_last_chunk: bool,
    ) -> ProtocolResult<Option<String>> {
        let pending = self.transfers.get_mut(transfer_id).ok_or_else(|| {
            ProtocolError::UnknownTransfer {
                transfer_id: transfer_id.to_string(),
            }
        })?;

        let total = pending.chunks.len() as u32;
        if chunk_index >= total {
            return Err(ProtocolError::ChunkIndexOutOfRange {
                index: chunk_index,
                total,
            });
        }

        let slot = &mut pending.chunks[chunk_index as usize];
        match slot.as_ref() {
            Some(old) => pending.bytes -= old.len(),
            None => pending.received += 1,
        }
        pending.bytes += chunk.len();
        *slot = Some(chunk);

        if pending.bytes > MAX_BACKGROUND_BYTES {
            let len = pending.bytes;
            self.transfers.remove(transfer_id);
            return Err(ProtocolError::PayloadTooLarge {
                len,
                max: MAX_BACKGROUND_BYTES,
            });
        }

        if !is_last_chunk {
            return Ok(None);
        }

        let missing = total - pending.received;
        if missing > 0 {
            self.transfers.remove(transfer_id);
            return Err(ProtocolError::IncompleteTransfer {
                transfer_id: transfer_id.to_string(),
                missing,
            });
        }

        let pending = self
            .transfers
            .remove(transfer_id)
            .ok_or_else(|| ProtocolError::UnknownTransfer {
                transfer_id: transfer_id.to_string(),
            })?;
        Ok(Some(pending.chunks.into_iter().flatten().collect()))
    }

    /// Drops transfers older than the time-to-live, returning how many
    /// were discarded.
    pub fn expire_stale(&mut self) -> usize {
        let ttl = self.ttl;
        let before = self.transfers.len();
        self.transfers
            .retain(|_, pending| pending.started_at.elapsed() < ttl);
        before - self.transfers.len()
    }

    /// Number of transfers currently in flight.
    pub fn pending(&self) -> usize {
        self.transfers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn send_path_thresholds() {
        assert_eq!(SendPath::for_len(0).unwrap(), SendPath::Direct);
        assert_eq!(SendPath::for_len(DIRECT_SEND_LIMIT).unwrap(), SendPath::Direct);
        assert_eq!(
            SendPath::for_len(DIRECT_SEND_LIMIT + 1).unwrap(),
            SendPath::Chunked
        );
        assert!(SendPath::for_len(MAX_BACKGROUND_BYTES + 1).is_err());
    }

    #[test]
    fn split_produces_full_chunks_then_remainder() {
        let payload = "x".repeat(CHUNK_SIZE * 2 + 17);
        let chunks = split_payload(&payload);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), CHUNK_SIZE);
        assert_eq!(chunks[1].len(), CHUNK_SIZE);
        assert_eq!(chunks[2].len(), 17);
    }

    #[test]
    fn multibyte_payload_splits_on_char_boundaries() {
        let payload = "€".repeat(CHUNK_SIZE / 3 + 10);
        let chunks = split_payload(&payload);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= CHUNK_SIZE);
        }
        let reassembled: String = chunks.concat();
        assert_eq!(reassembled, payload);
    }

    #[test]
    fn oversized_announcement_is_rejected() {
        let mut assembler = ChunkAssembler::new();
        let err = assembler.begin("t1", u32::MAX).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::TooManyChunks {
                total_chunks: u32::MAX,
                ..
            }
        ));
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn accumulated_bytes_over_the_limit_abort_the_transfer() {
        let mut assembler = ChunkAssembler::new();
        assembler.begin("t1", MAX_TRANSFER_CHUNKS).unwrap();
        let oversized = "x".repeat(MAX_BACKGROUND_BYTES / 3 + 1);
        for index in 0..3 {
            let result = assembler.accept("t1", index, oversized.clone(), false);
            if index < 2 {
                assert!(result.unwrap().is_none());
            } else {
                assert!(matches!(
                    result.unwrap_err(),
                    ProtocolError::PayloadTooLarge { .. }
                ));
            }
        }
        // The aborted transfer releases its buffers.
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn assembles_in_order() {
        let mut assembler = ChunkAssembler::new();
        assembler.begin("t1", 3).unwrap();
        assert!(assembler.accept("t1", 0, "aaa".into(), false).unwrap().is_none());
        assert!(assembler.accept("t1", 1, "bbb".into(), false).unwrap().is_none());
        let payload = assembler.accept("t1", 2, "ccc".into(), true).unwrap();
        assert_eq!(payload.as_deref(), Some("aaabbbccc"));
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn duplicate_begin_is_rejected() {
        let mut assembler = ChunkAssembler::new();
        assembler.begin("t1", 2).unwrap();
        assert!(matches!(
            assembler.begin("t1", 2),
            Err(ProtocolError::DuplicateTransfer { .. })
        ));
    }

    #[test]
    fn chunk_without_start_is_rejected() {
        let mut assembler = ChunkAssembler::new();
        assert!(matches!(
            assembler.accept("ghost", 0, "x".into(), false),
            Err(ProtocolError::UnknownTransfer { .. })
        ));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut assembler = ChunkAssembler::new();
        assembler.begin("t1", 2).unwrap();
        assert!(matches!(
            assembler.accept("t1", 2, "x".into(), false),
            Err(ProtocolError::ChunkIndexOutOfRange { index: 2, total: 2 })
        ));
    }

    #[test]
    fn last_chunk_with_gaps_aborts_the_transfer() {
        let mut assembler = ChunkAssembler::new();
        assembler.begin("t1", 3).unwrap();
        assembler.accept("t1", 0, "a".into(), false).unwrap();
        let err = assembler.accept("t1", 2, "c".into(), true).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::IncompleteTransfer { missing: 1, .. }
        ));
        // The aborted transfer no longer accepts chunks.
        assert!(assembler.accept("t1", 1, "b".into(), false).is_err());
    }

    #[test]
    fn stale_transfers_expire() {
        let mut assembler = ChunkAssembler::with_ttl(Duration::ZERO);
        assembler.begin("t1", 2).unwrap();
        assert_eq!(assembler.expire_stale(), 1);
        assert_eq!(assembler.pending(), 0);
    }

    proptest! {
        #[test]
        fn split_then_assemble_restores_payload(len in 1usize..(CHUNK_SIZE * 3)) {
            // Mixed ASCII and multibyte characters, so cuts can land
            // mid-character if splitting ignores boundaries.
            let payload: String = "data:image/png;base64,é€𝄞"
                .chars()
                .cycle()
                .take(len)
                .collect();
            let chunks = split_payload(&payload);
            let total = chunks.len() as u32;

            let mut assembler = ChunkAssembler::new();
            assembler.begin("t", total).unwrap();
            let mut result = None;
            for (index, chunk) in chunks.into_iter().enumerate() {
                let last = index as u32 == total - 1;
                result = assembler.accept("t", index as u32, chunk, last).unwrap();
            }
            prop_assert_eq!(result.as_deref(), Some(payload.as_str()));
        }
    }
}
