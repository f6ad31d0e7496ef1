//! File plumbing for the pipelines: input opening, full-buffer reads,
//! portable positioned writes, and the remove-on-failure temporary output.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::config::TEMP_SUFFIX;
use crate::error::Result;

pub fn open_input(path: &Path) -> Result<File> {
    Ok(File::open(path)?)
}

/// Reads until `buf` is full or the stream ends; returns the bytes read.
/// A short count therefore always means end of input.
pub fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Writes the whole buffer at an absolute offset without touching the file
/// cursor. Safe to call from multiple threads as long as the offset ranges
/// are disjoint.
#[cfg(unix)]
pub fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(windows)]
pub fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        let written = file.seek_write(buf, offset)?;
        if written == 0 {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "seek_write wrote 0 bytes"));
        }
        buf = &buf[written..];
        offset += written as u64;
    }
    Ok(())
}

/// The temporary sibling the pipelines write into.
///
/// Created as `<target>.part` with owner-only permissions, truncating any
/// stale leftover. Dropping the guard removes the file; `persist` closes it
/// and renames it over the target, so a finished file only ever appears at
/// the target path atomically.
pub struct TempFile {
    file: Option<File>,
    path: PathBuf,
    target: PathBuf,
    promoted: bool,
}

impl TempFile {
    pub fn create(target: &Path) -> Result<Self> {
        let mut name = OsString::from(target.as_os_str());
        name.push(TEMP_SUFFIX);
        let path = PathBuf::from(name);

        let mut opts = OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }
        let file = opts.open(&path)?;

        Ok(Self { file: Some(file), path, target: target.to_path_buf(), promoted: false })
    }

    #[inline]
    pub fn file(&self) -> &File {
        // Some until persist() consumes the guard.
        self.file.as_ref().expect("temp file already persisted")
    }

    /// Closes the handle and renames the temporary over the target. The
    /// rename stays within the target's directory, so it is atomic on every
    /// platform we care about.
    pub fn persist(mut self) -> Result<()> {
        drop(self.file.take());
        fs::rename(&self.path, &self.target)?;
        self.promoted = true;
        Ok(())
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.promoted {
            drop(self.file.take());
            let _ = fs::remove_file(&self.path);
        }
    }
}
