//! Engine options and the auto-tuner.

use std::path::PathBuf;
use std::thread::available_parallelism;

use crate::config::{CHUNK_ALIGN, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE, TARGET_CHUNKS_PER_WORKER};
use crate::secret::Secret;

/// A validated request to encrypt or decrypt one file. Produced by the CLI
/// layer; consumed by the engine.
pub struct Options {
    pub input: PathBuf,
    pub output: PathBuf,
    pub passphrase: Secret<Vec<u8>>,
    /// Plaintext chunk size in bytes. `0` means auto-tune from the input
    /// size.
    pub chunk_size: u32,
    /// Worker thread count. `0` means one per logical CPU.
    pub workers: usize,
}

/// Options after auto-adjustment, ready to drive a pipeline.
pub(crate) struct Tuned {
    pub chunk_size: u32,
    pub workers: usize,
}

impl Options {
    /// Resolves the auto fields against the input size.
    ///
    /// Workers default to the logical CPU count (just one on small
    /// machines). An auto chunk size targets roughly
    /// [`TARGET_CHUNKS_PER_WORKER`] chunks per worker, clamped and aligned.
    /// Workers are then capped to the number of chunks that will actually
    /// exist.
    pub(crate) fn tuned(&self, input_size: Option<u64>) -> Tuned {
        let mut workers = self.workers;
        if workers == 0 {
            let cpus = available_parallelism().map_or(1, |n| n.get());
            workers = if cpus <= 2 { 1 } else { cpus };
        }

        let mut chunk_size = self.chunk_size;
        if chunk_size == 0 {
            chunk_size = match input_size {
                Some(size) if size > 0 => pick_chunk_size(size, workers),
                _ => DEFAULT_CHUNK_SIZE,
            };
        }

        if let Some(size) = input_size {
            if size > 0 {
                let chunks = size.div_ceil(u64::from(chunk_size));
                if (workers as u64) > chunks {
                    workers = chunks.max(1) as usize;
                }
            }
        }

        Tuned { chunk_size, workers }
    }
}

fn pick_chunk_size(file_size: u64, workers: usize) -> u32 {
    let target_chunks = (workers as u64).max(1) * TARGET_CHUNKS_PER_WORKER;
    let mut chunk = file_size / target_chunks;

    chunk = chunk.clamp(u64::from(MIN_CHUNK_SIZE), u64::from(MAX_CHUNK_SIZE));

    // Round up to the alignment boundary; stays within bounds because both
    // bounds are themselves 64-KiB multiples.
    let align = u64::from(CHUNK_ALIGN);
    chunk = chunk.div_ceil(align) * align;

    chunk as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(chunk_size: u32, workers: usize) -> Options {
        Options {
            input: PathBuf::from("in"),
            output: PathBuf::from("out"),
            passphrase: Secret::new(b"pw".to_vec()),
            chunk_size,
            workers,
        }
    }

    #[test]
    fn test_workers_default_to_at_least_one() {
        let tuned = options(0, 0).tuned(Some(1));
        assert!(tuned.workers >= 1);
    }

    #[test]
    fn test_explicit_values_pass_through() {
        let tuned = options(4096, 3).tuned(None);
        assert_eq!(tuned.chunk_size, 4096);
        assert_eq!(tuned.workers, 3);
    }

    #[test]
    fn test_auto_chunk_unknown_size_uses_default() {
        let tuned = options(0, 4).tuned(None);
        assert_eq!(tuned.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_auto_chunk_clamps_to_minimum() {
        // 1 MiB across 4 workers targets 128 chunks of 8 KiB; the floor wins.
        let tuned = options(0, 4).tuned(Some(1024 * 1024));
        assert_eq!(tuned.chunk_size, MIN_CHUNK_SIZE);
    }

    #[test]
    fn test_auto_chunk_clamps_to_maximum() {
        // 10 GiB across 8 workers targets 40 MiB chunks; the ceiling wins.
        let tuned = options(0, 8).tuned(Some(10 * 1024 * 1024 * 1024));
        assert_eq!(tuned.chunk_size, MAX_CHUNK_SIZE);
    }

    #[test]
    fn test_auto_chunk_is_aligned() {
        let tuned = options(0, 4).tuned(Some(300 * 1024 * 1024));
        assert_eq!(tuned.chunk_size % CHUNK_ALIGN, 0);
        assert!(tuned.chunk_size >= MIN_CHUNK_SIZE);
        assert!(tuned.chunk_size <= MAX_CHUNK_SIZE);
    }

    #[test]
    fn test_workers_capped_to_chunk_count() {
        // A one-byte file is a single chunk.
        let tuned = options(0, 16).tuned(Some(1));
        assert_eq!(tuned.workers, 1);

        // Three chunks of 4096.
        let tuned = options(4096, 16).tuned(Some(3 * 4096));
        assert_eq!(tuned.workers, 3);
    }

    #[test]
    fn test_empty_input_keeps_requested_workers() {
        let tuned = options(4096, 2).tuned(Some(0));
        assert_eq!(tuned.workers, 2);
        assert_eq!(tuned.chunk_size, 4096);
    }
}
