//! The encrypt pipeline.
//!
//! One reader thread chops the input into fixed-size chunks and assigns each
//! its index and absolute output offset (computable up front because every
//! record's size is `4 + plaintext + 16`). Sealer threads encrypt and
//! scatter framed records into the temporary file with positioned writes,
//! in whatever order they finish. The collector folds the same frames into
//! the container MAC strictly in index order, then the tag lands at the
//! first free offset and the temporary is renamed into place.

use std::fs::File;
use std::thread;

use byteorder::{ByteOrder, LittleEndian};
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::cipher::aead::AesGcm;
use crate::cipher::derive::{random_bytes, MasterKey};
use crate::cipher::mac::MacStream;
use crate::cipher::nonce::{chunk_aad, chunk_nonce};
use crate::config::{HEADER_LEN, MAC_LEN, MAX_CHUNK_SIZE, NONCE_BASE_LEN, TAG_LEN};
use crate::engine::cancel::Cancel;
use crate::engine::io::{open_input, read_full, write_all_at, TempFile};
use crate::engine::sequencer::Sequencer;
use crate::error::{EngineError, Result};
use crate::header::Header;
use crate::options::Options;

struct SealJob {
    index: u32,
    plaintext: Vec<u8>,
    /// Absolute container offset where this record's frame lands.
    offset: u64,
}

struct SealedFrame {
    index: u32,
    /// The framed record: `len(4, LE) || ciphertext`.
    frame: Vec<u8>,
}

pub fn encrypt(opts: &Options) -> Result<()> {
    let mut input = open_input(&opts.input)?;
    let input_size = input.metadata().ok().map(|m| m.len());
    let tuned = opts.tuned(input_size);
    if tuned.chunk_size == 0 || tuned.chunk_size > MAX_CHUNK_SIZE {
        return Err(EngineError::Config(format!("chunk size {} out of range", tuned.chunk_size)));
    }
    tracing::debug!(workers = tuned.workers, chunk_size = tuned.chunk_size, "encrypt options");

    let salt = random_bytes()?;
    let nonce_base = random_bytes()?;
    let header = Header::new(salt, nonce_base, tuned.chunk_size);

    let key = MasterKey::derive(opts.passphrase.expose(), &salt)?;
    let aead = AesGcm::new(&key)?;
    let mut mac = MacStream::new(&key)?;

    let temp = TempFile::create(&opts.output)?;
    write_all_at(temp.file(), header.as_bytes(), 0)?;
    mac.update(header.as_bytes());
    let header_digest = header.digest();

    let (job_tx, job_rx) = bounded::<SealJob>(tuned.workers * 2);
    let (frame_tx, frame_rx) = bounded::<SealedFrame>(tuned.workers * 2);
    let cancel = Cancel::new();
    let chunk_size = tuned.chunk_size as usize;

    let reader_result = thread::scope(|scope| {
        let reader = {
            let input = &mut input;
            let cancel = &cancel;
            scope.spawn(move || read_chunks(input, chunk_size, job_tx, cancel))
        };

        for _ in 0..tuned.workers {
            let job_rx = job_rx.clone();
            let frame_tx = frame_tx.clone();
            let aead = &aead;
            let out = temp.file();
            let nonce_base = &nonce_base;
            let header_digest = &header_digest;
            let cancel = &cancel;
            scope.spawn(move || seal_worker(job_rx, frame_tx, aead, out, nonce_base, header_digest, cancel));
        }
        drop(frame_tx);
        drop(job_rx);

        // Collector: fold completed frames into the MAC in index order.
        // Out-of-order completions wait in the sequencer.
        let mut pending = Sequencer::new(0);
        for sealed in frame_rx.iter() {
            for frame in pending.push(sealed.index, sealed.frame) {
                mac.update(&frame);
            }
        }
        debug_assert!(pending.is_drained() || cancel.is_tripped());

        match reader.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    });

    if let Some(err) = cancel.into_first() {
        return Err(err);
    }
    let data_end = reader_result?;

    let tag = mac.finalize();
    write_all_at(temp.file(), &tag, data_end)?;
    temp.persist()?;

    tracing::debug!(container_bytes = data_end + MAC_LEN as u64, "encryption finished");
    Ok(())
}

/// Reads fixed-size plaintext chunks sequentially and hands them to the
/// sealers. Returns the offset one past the last record, where the MAC tag
/// belongs.
fn read_chunks(input: &mut File, chunk_size: usize, jobs: Sender<SealJob>, cancel: &Cancel) -> Result<u64> {
    let mut buf = vec![0u8; chunk_size];
    let mut index: u32 = 0;
    let mut offset = HEADER_LEN as u64;

    loop {
        if cancel.is_tripped() {
            return Ok(offset);
        }

        let n = match read_full(input, &mut buf) {
            Ok(n) => n,
            Err(e) => {
                cancel.set();
                return Err(EngineError::Io(e));
            }
        };
        if n == 0 {
            return Ok(offset);
        }
        if index == u32::MAX {
            cancel.set();
            return Err(EngineError::NonceWouldWrap);
        }

        let job = SealJob { index, plaintext: buf[..n].to_vec(), offset };
        if jobs.send(job).is_err() {
            // All workers exited; the pipeline is cancelling.
            return Ok(offset);
        }

        offset += 4 + n as u64 + TAG_LEN as u64;
        index += 1;

        // A short read means the input ended.
        if n < chunk_size {
            return Ok(offset);
        }
    }
}

fn seal_worker(
    jobs: Receiver<SealJob>,
    frames: Sender<SealedFrame>,
    aead: &AesGcm,
    out: &File,
    nonce_base: &[u8; NONCE_BASE_LEN],
    header_digest: &[u8; 32],
    cancel: &Cancel,
) {
    for job in jobs.iter() {
        if cancel.is_tripped() {
            return;
        }

        let nonce = chunk_nonce(nonce_base, job.index);
        let aad = chunk_aad(header_digest, job.index);
        let ciphertext = match aead.seal(&nonce, &aad, &job.plaintext) {
            Ok(ct) => ct,
            Err(e) => {
                cancel.fail(e);
                return;
            }
        };

        // One owned frame serves both the positioned write and the MAC
        // fold, so the collector never touches a buffer another record
        // could be reusing.
        let mut frame = vec![0u8; 4 + ciphertext.len()];
        LittleEndian::write_u32(&mut frame[..4], ciphertext.len() as u32);
        frame[4..].copy_from_slice(&ciphertext);

        if let Err(e) = write_all_at(out, &frame, job.offset) {
            cancel.fail(EngineError::Io(e));
            return;
        }

        if frames.send(SealedFrame { index: job.index, frame }).is_err() {
            return;
        }
    }
}
