//! Resource references
//!
//! Save files and materials refer to other resources by name instead of
//! embedding them. A reference is stored as:
//!
//! ```text
//! u32 LE   length in UTF-16 units
//! u16 LE[] name, relative to the working directory when it lies below it
//! ```

use std::env;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thunderstorm_common::stream::{decode_utf16le, encode_utf16le, read_fill, write_all};
use thunderstorm_common::{Error, Result, Stream};

/// `path` relative to the working directory, or unchanged if it is not below it
pub fn relative_to_cwd(path: &Path) -> PathBuf {
    env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
}

/// Absolute form of a stored name
pub fn resolve_from_cwd(name: &Path) -> PathBuf {
    if name.is_absolute() {
        return name.to_path_buf();
    }
    match env::current_dir() {
        Ok(cwd) => cwd.join(name),
        Err(_) => name.to_path_buf(),
    }
}

pub fn write_reference<S: Stream + ?Sized>(stream: &mut S, name: &Path) -> Result<()> {
    let stored = relative_to_cwd(name);
    let text = stored.to_string_lossy();
    let units = text.encode_utf16().count();
    let len = u32::try_from(units)
        .map_err(|_| Error::InvalidParam(format!("resource name of {units} units is too long")))?;

    stream
        .write_u32::<LittleEndian>(len)
        .map_err(|source| Error::FileWrite {
            path: stream.path().to_path_buf(),
            source,
        })?;
    write_all(stream, &encode_utf16le(&text))
}

/// Read a reference written by `write_reference`, resolved against the
/// working directory
pub fn deserialize_instance<S: Stream + ?Sized>(stream: &mut S) -> Result<PathBuf> {
    let path = stream.path().to_path_buf();
    let len = stream
        .read_u32::<LittleEndian>()
        .map_err(|source| Error::FileRead {
            path: path.clone(),
            source,
        })?;

    let byte_len = len as usize * 2;
    let remaining = stream.size()?.saturating_sub(stream.position()?);
    if byte_len as u64 > remaining {
        return Err(Error::FileFormat {
            path,
            reason: format!("resource name of {len} units runs past the end of the stream"),
        });
    }

    let mut bytes = vec![0u8; byte_len];
    read_fill(stream, &mut bytes)?;
    let name = decode_utf16le(&path, &bytes)?;
    Ok(resolve_from_cwd(Path::new(&name)))
}
