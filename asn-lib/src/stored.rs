//! helpers over blobs already stored on disk
//!
//! a stored object is the unit exactly as it was received: header,
//! envelope and content. These helpers read pieces of it back without
//! decoding the whole envelope.

use crate::{
    blob::{NAME_LEN_OFFSET, TIME_OFFSET},
    EncrPub, Timestamp,
};
use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::Path,
};

/// time of the stored blob at `path`
pub fn blob_time<P: AsRef<Path>>(path: P) -> io::Result<Timestamp> {
    let mut file = File::open(path)?;
    blob_time_of(&mut file)
}

/// time of the stored blob, the position of `object` is left after the time
pub fn blob_time_of<F: Read + Seek>(mut object: F) -> io::Result<Timestamp> {
    object.seek(SeekFrom::Start(TIME_OFFSET))?;
    Timestamp::read_from(object)
}

/// position `object` at the first byte of the content and return that offset
pub fn seek_content<F: Read + Seek>(mut object: F) -> io::Result<u64> {
    object.seek(SeekFrom::Start(NAME_LEN_OFFSET))?;
    let mut len = [0; 1];
    object.read_exact(&mut len)?;
    object.seek(SeekFrom::Current(len[0] as i64))
}

/// the content of the stored blob at `path`
pub fn read_content<P: AsRef<Path>>(path: P) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    seek_content(&mut file)?;

    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    Ok(content)
}

/// the content of the stored blob at `path` as a list of public keys
///
/// trailing bytes not making a whole key are ignored.
pub fn read_key_list<P: AsRef<Path>>(path: P) -> io::Result<Vec<EncrPub>> {
    let mut file = File::open(path)?;
    let offset = seek_content(&mut file)?;
    let size = file.metadata()?.len();

    let count = size.saturating_sub(offset) / EncrPub::SIZE as u64;
    let mut keys = Vec::with_capacity(count as usize);
    for _ in 0..count {
        keys.push(EncrPub::read_from(&mut file)?);
    }

    Ok(keys)
}
