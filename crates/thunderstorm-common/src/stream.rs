//! Byte streams
//!
//! Storage-agnostic I/O used by the markup documents and resource references.
//! Two backends are provided: a file on disk and an in-memory buffer. A
//! `StreamCache` keeps whole files in memory keyed by path so repeated loads
//! of the same document hit the disk once.
//!
//! Text files are UTF-16LE and must start with the `0xFEFF` signature.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

/// Signature every unicode text file starts with
pub const UNICODE_SIGNATURE: u16 = 0xFEFF;

// ============================================================================
// Open Modes
// ============================================================================

/// Requested access to a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    fn readable(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    fn writable(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }
}

/// What to do when the file does or does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Fail if the file does not exist
    OpenExisting,
    /// Create or truncate
    CreateAlways,
    /// Open if present, create otherwise
    OpenAlways,
}

/// Origin for `Stream::set_position`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Begin,
    Current,
    End,
}

// ============================================================================
// Stream trait
// ============================================================================

/// A seekable byte stream that knows where it came from
pub trait Stream: Read + Write + Seek {
    /// Path used in error messages (a label for in-memory streams)
    fn path(&self) -> &Path;

    /// Total size in bytes; the position is left unchanged
    fn size(&mut self) -> Result<u64> {
        let path = self.path().to_path_buf();
        let read_err = |source| Error::FileRead { path: path.clone(), source };
        let pos = self.stream_position().map_err(read_err)?;
        let end = self.seek(SeekFrom::End(0)).map_err(read_err)?;
        self.seek(SeekFrom::Start(pos)).map_err(read_err)?;
        Ok(end)
    }

    fn position(&mut self) -> Result<u64> {
        let path = self.path().to_path_buf();
        self.stream_position()
            .map_err(|source| Error::FileRead { path, source })
    }

    fn set_position(&mut self, offset: i64, origin: Origin) -> Result<u64> {
        let target = match origin {
            Origin::Begin => {
                let start = u64::try_from(offset).map_err(|_| {
                    Error::InvalidParam(format!("negative offset {offset} from stream begin"))
                })?;
                SeekFrom::Start(start)
            }
            Origin::Current => SeekFrom::Current(offset),
            Origin::End => SeekFrom::End(offset),
        };
        let path = self.path().to_path_buf();
        self.seek(target)
            .map_err(|source| Error::FileRead { path, source })
    }
}

// ============================================================================
// File backend
// ============================================================================

/// A file on disk
#[derive(Debug)]
pub struct FileStream {
    path: PathBuf,
    file: File,
}

impl FileStream {
    pub fn open(path: impl AsRef<Path>, access: Access, disposition: Disposition) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if disposition == Disposition::CreateAlways && !access.writable() {
            return Err(Error::InvalidParam(format!(
                "cannot create {} without write access",
                path.display()
            )));
        }

        let mut options = OpenOptions::new();
        options.read(access.readable()).write(access.writable());
        match disposition {
            Disposition::OpenExisting => {}
            Disposition::CreateAlways => {
                options.create(true).truncate(true);
            }
            Disposition::OpenAlways => {
                options.create(true);
            }
        }

        let file = options.open(&path).map_err(|source| Error::FileOpen {
            path: path.clone(),
            source,
        })?;
        tracing::trace!("Opened {} ({:?}, {:?})", path.display(), access, disposition);
        Ok(Self { path, file })
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for FileStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for FileStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl Stream for FileStream {
    fn path(&self) -> &Path {
        &self.path
    }
}

// ============================================================================
// Memory backend
// ============================================================================

/// An in-memory byte buffer
#[derive(Debug, Clone, Default)]
pub struct MemoryStream {
    path: PathBuf,
    cursor: Cursor<Vec<u8>>,
}

impl MemoryStream {
    /// Empty stream labelled with `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::from_bytes(path, Vec::new())
    }

    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            cursor: Cursor::new(bytes),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.cursor.get_ref()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.cursor.into_inner()
    }
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl Stream for MemoryStream {
    fn path(&self) -> &Path {
        &self.path
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Read into `buf` until it is full or the stream ends; returns bytes read
pub fn read_fill<S: Stream + ?Sized>(stream: &mut S, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match stream.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(Error::FileRead {
                    path: stream.path().to_path_buf(),
                    source,
                })
            }
        }
    }
    Ok(total)
}

/// Read everything from the current position to the end
pub fn read_to_end<S: Stream + ?Sized>(stream: &mut S) -> Result<Vec<u8>> {
    let remaining = stream.size()?.saturating_sub(stream.position()?);
    let len = usize::try_from(remaining)
        .map_err(|_| Error::MemAlloc(format!("{remaining} bytes do not fit in memory")))?;
    let mut buf = vec![0u8; len];
    let read = read_fill(stream, &mut buf)?;
    buf.truncate(read);
    Ok(buf)
}

pub fn write_all<S: Stream + ?Sized>(stream: &mut S, bytes: &[u8]) -> Result<()> {
    stream.write_all(bytes).map_err(|source| Error::FileWrite {
        path: stream.path().to_path_buf(),
        source,
    })
}

/// Consume the 2-byte unicode signature.
///
/// Returns `false` when the stream is too short or starts with anything else.
pub fn read_unicode_signature<S: Stream + ?Sized>(stream: &mut S) -> Result<bool> {
    match stream.read_u16::<LittleEndian>() {
        Ok(sig) => Ok(sig == UNICODE_SIGNATURE),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(source) => Err(Error::FileRead {
            path: stream.path().to_path_buf(),
            source,
        }),
    }
}

pub fn write_unicode_signature<S: Stream + ?Sized>(stream: &mut S) -> Result<()> {
    stream
        .write_u16::<LittleEndian>(UNICODE_SIGNATURE)
        .map_err(|source| Error::FileWrite {
            path: stream.path().to_path_buf(),
            source,
        })
}

/// Decode the rest of the stream as UTF-16LE text
pub fn read_utf16_to_end<S: Stream + ?Sized>(stream: &mut S) -> Result<String> {
    let bytes = read_to_end(stream)?;
    decode_utf16le(stream.path(), &bytes)
}

/// Encode `text` as UTF-16LE and write it at the current position
pub fn write_utf16<S: Stream + ?Sized>(stream: &mut S, text: &str) -> Result<()> {
    write_all(stream, &encode_utf16le(text))
}

pub fn encode_utf16le(text: &str) -> Vec<u8> {
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut bytes = vec![0u8; units.len() * 2];
    LittleEndian::write_u16_into(&units, &mut bytes);
    bytes
}

pub fn decode_utf16le(path: &Path, bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Error::FileFormat {
            path: path.to_path_buf(),
            reason: format!("odd byte count {} in UTF-16 text", bytes.len()),
        });
    }
    let mut units = vec![0u16; bytes.len() / 2];
    LittleEndian::read_u16_into(bytes, &mut units);
    String::from_utf16(&units).map_err(|e| Error::FileFormat {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

// ============================================================================
// Stream cache
// ============================================================================

/// Whole-file cache keyed by path
#[derive(Debug, Default)]
pub struct StreamCache {
    entries: HashMap<PathBuf, Rc<[u8]>>,
}

impl StreamCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` for reading, from memory if it was loaded before
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<MemoryStream> {
        let path = path.as_ref();
        if let Some(data) = self.entries.get(path) {
            tracing::trace!("Stream cache hit: {}", path.display());
            return Ok(MemoryStream::from_bytes(path, data.to_vec()));
        }

        let mut file = FileStream::open(path, Access::Read, Disposition::OpenExisting)?;
        let data: Rc<[u8]> = read_to_end(&mut file)?.into();
        tracing::debug!("Stream cache: loaded {} ({} bytes)", path.display(), data.len());
        self.entries.insert(path.to_path_buf(), Rc::clone(&data));
        Ok(MemoryStream::from_bytes(path, data.to_vec()))
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.entries.contains_key(path.as_ref())
    }

    /// Drop a cached file so the next `open` rereads it
    pub fn invalidate(&mut self, path: impl AsRef<Path>) -> bool {
        self.entries.remove(path.as_ref()).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
