//! The decrypt pipeline.
//!
//! The reader streams `len || ciphertext` records sequentially, feeding the
//! container MAC as bytes are consumed (read order is index order, so no
//! separate collector is needed), and dispatches each ciphertext to the
//! opener pool. Openers authenticate, decrypt, and scatter plaintext into
//! the temporary file at `index × chunk_size`. The stored tag at the tail is
//! compared in constant time before the result is promoted; plaintext that
//! was already written stays behind the never-renamed temporary on failure.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use byteorder::{ByteOrder, LittleEndian};
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::cipher::aead::AesGcm;
use crate::cipher::derive::MasterKey;
use crate::cipher::mac::MacStream;
use crate::cipher::nonce::{chunk_aad, chunk_nonce};
use crate::config::{HEADER_LEN, MAC_LEN, NONCE_BASE_LEN, PREALLOC_AHEAD, PREALLOC_STRIDE, TAG_LEN};
use crate::engine::cancel::Cancel;
use crate::engine::io::{open_input, write_all_at, TempFile};
use crate::error::{EngineError, Result};
use crate::header::Header;
use crate::options::Options;

struct OpenJob {
    index: u32,
    ciphertext: Vec<u8>,
}

pub fn decrypt(opts: &Options) -> Result<()> {
    let mut input = open_input(&opts.input)?;
    let file_size = input.metadata()?.len();
    let header = Header::read_from(&mut input)?;
    let tuned = opts.tuned(Some(file_size));
    tracing::debug!(workers = tuned.workers, chunk_size = header.chunk_size(), "decrypt options");

    let data_end = file_size.saturating_sub(MAC_LEN as u64);
    if data_end < HEADER_LEN as u64 {
        // Too short to hold the trailing tag: a truncated container.
        tracing::debug!(file_size, "container too short for trailing tag");
        return Err(EngineError::AuthFailure);
    }

    let key = MasterKey::derive(opts.passphrase.expose(), header.salt())?;
    let aead = AesGcm::new(&key)?;
    let mut mac = MacStream::new(&key)?;
    mac.update(header.as_bytes());
    let header_digest = header.digest();

    let temp = TempFile::create(&opts.output)?;
    let max_end = AtomicU64::new(0);
    let cancel = Cancel::new();
    let (job_tx, job_rx) = bounded::<OpenJob>(tuned.workers * 2);
    let chunk_size = header.chunk_size();
    let nonce_base = *header.nonce_base();

    let verified = thread::scope(|scope| {
        for _ in 0..tuned.workers {
            let job_rx = job_rx.clone();
            let aead = &aead;
            let out = temp.file();
            let nonce_base = &nonce_base;
            let header_digest = &header_digest;
            let max_end = &max_end;
            let cancel = &cancel;
            scope.spawn(move || open_worker(job_rx, aead, out, nonce_base, header_digest, chunk_size, max_end, cancel));
        }
        drop(job_rx);

        // The reader doubles as the MAC collector: its read order is index
        // order by construction.
        read_records(&mut input, temp.file(), mac, job_tx, chunk_size, data_end, &cancel)
    });

    if let Some(err) = cancel.into_first() {
        return Err(err);
    }
    verified?;

    // Trim any preallocation overshoot down to the real plaintext size.
    let end = max_end.load(Ordering::Acquire);
    temp.file().set_len(end)?;
    temp.persist()?;

    tracing::debug!(plaintext_bytes = end, "decryption finished");
    Ok(())
}

/// Streams records into the MAC and the job channel, then checks the stored
/// tag against the computed one.
fn read_records(
    input: &mut File,
    out: &File,
    mut mac: MacStream,
    jobs: Sender<OpenJob>,
    chunk_size: u32,
    data_end: u64,
    cancel: &Cancel,
) -> Result<()> {
    let mut reader = BufReader::with_capacity(chunk_size as usize * 2, &mut *input);
    let mut pos = HEADER_LEN as u64;
    let mut index: u32 = 0;
    let mut prealloc = 0u64;

    while pos < data_end {
        if cancel.is_tripped() {
            return Ok(());
        }
        if index == u32::MAX {
            cancel.set();
            return Err(EngineError::NonceWouldWrap);
        }

        let mut len_buf = [0u8; 4];
        if let Err(e) = reader.read_exact(&mut len_buf) {
            cancel.set();
            return Err(truncation_error(e));
        }
        pos += 4;
        mac.update(&len_buf);

        let len = LittleEndian::read_u32(&len_buf) as usize;
        if len < TAG_LEN || len > chunk_size as usize + TAG_LEN {
            cancel.set();
            return Err(EngineError::BadRecord(format!("chunk length {len} out of range")));
        }

        let mut ciphertext = vec![0u8; len];
        if let Err(e) = reader.read_exact(&mut ciphertext) {
            cancel.set();
            return Err(truncation_error(e));
        }
        pos += len as u64;
        mac.update(&ciphertext);

        if jobs.send(OpenJob { index, ciphertext }).is_err() {
            // All workers exited; the pipeline is cancelling.
            return Ok(());
        }

        // Pre-grow the output in coarse strides so filesystems that
        // zero-fill on extension do it in large steps. Best effort; the
        // overshoot is truncated at finalization.
        if index % PREALLOC_STRIDE == 0 {
            let target = (u64::from(index) + PREALLOC_AHEAD) * u64::from(chunk_size);
            if target > prealloc {
                let _ = out.set_len(target);
                prealloc = target;
            }
        }

        index += 1;
    }

    // Close the job channel so the openers can drain while the tag check
    // runs.
    drop(jobs);

    let mut stored = [0u8; MAC_LEN];
    if let Err(e) = reader.read_exact(&mut stored) {
        cancel.set();
        return Err(truncation_error(e));
    }

    match mac.verify(&stored) {
        Ok(()) => Ok(()),
        Err(e) => {
            cancel.set();
            Err(e)
        }
    }
}

/// A short read inside the data region means the container was cut short;
/// that is tampering as far as the caller is concerned. Real device errors
/// keep their identity.
fn truncation_error(e: std::io::Error) -> EngineError {
    if e.kind() == ErrorKind::UnexpectedEof {
        EngineError::AuthFailure
    } else {
        EngineError::Io(e)
    }
}

#[allow(clippy::too_many_arguments)]
fn open_worker(
    jobs: Receiver<OpenJob>,
    aead: &AesGcm,
    out: &File,
    nonce_base: &[u8; NONCE_BASE_LEN],
    header_digest: &[u8; 32],
    chunk_size: u32,
    max_end: &AtomicU64,
    cancel: &Cancel,
) {
    for job in jobs.iter() {
        if cancel.is_tripped() {
            return;
        }

        let nonce = chunk_nonce(nonce_base, job.index);
        let aad = chunk_aad(header_digest, job.index);
        let plaintext = match aead.open(&nonce, &aad, &job.ciphertext) {
            Ok(pt) => pt,
            Err(e) => {
                tracing::debug!(index = job.index, "chunk rejected by authentication");
                cancel.fail(e);
                return;
            }
        };

        let offset = u64::from(job.index) * u64::from(chunk_size);
        if let Err(e) = write_all_at(out, &plaintext, offset) {
            cancel.fail(EngineError::Io(e));
            return;
        }

        max_end.fetch_max(offset + plaintext.len() as u64, Ordering::AcqRel);
    }
}
