use crate::{
    id::{is_deleted, unflag_deleted},
    Id, Version,
};
use std::io::{self, Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("short read: expected {expected} bytes, read {read}")]
    ShortRead { expected: usize, read: usize },

    #[error("cannot read the frame header")]
    Io(#[source] io::Error),
}

/// the two bytes prefixing every unit on the wire and every stored object
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Header {
    /// version of the unit
    pub version: Version,
    /// internal identifier resolved with the table of `version`
    ///
    /// the byte is resolved as read: a unit carrying the deletion flag
    /// is [`Id::Unknown`] (see [`Header::stored_id`]).
    pub id: Id,
    /// the identifier byte carried the deletion flag
    pub deleted: bool,
    /// the identifier byte as read, flag included
    pub raw: u8,
}

impl Header {
    pub const SIZE: usize = Version::SIZE + 1;

    /// read exactly [`Header::SIZE`] bytes and resolve the identifier
    ///
    /// a version newer than [`Version::LATEST`] resolves to
    /// [`Id::Incompatible`], a byte not defined for the version resolves
    /// to [`Id::Unknown`], so does a byte carrying the deletion flag. It
    /// is up to the caller to reject those.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, FrameError> {
        let mut bytes = [0; Self::SIZE];
        let mut read = 0;

        while read < Self::SIZE {
            match reader.read(&mut bytes[read..]) {
                Ok(0) => {
                    return Err(FrameError::ShortRead {
                        expected: Self::SIZE,
                        read,
                    })
                }
                Ok(n) => read += n,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(FrameError::Io(error)),
            }
        }

        let version = Version::from_u8(bytes[0]);
        let raw = bytes[1];

        Ok(Self {
            version,
            id: Id::from_wire(raw, version),
            deleted: is_deleted(raw),
            raw,
        })
    }

    /// identifier of a stored object, the deletion flag ignored
    ///
    /// only stored objects are flagged for deletion, a flagged unit
    /// received from a peer is not a valid unit.
    pub fn stored_id(&self) -> Id {
        Id::from_wire(unflag_deleted(self.raw), self.version)
    }

    /// write the latest version followed by the wire byte of `id`
    pub fn write_to<W: Write>(id: Id, mut writer: W) -> io::Result<u64> {
        let version = Version::LATEST;
        writer.write_all(&[version.to_u8(), id.to_wire(version)])?;
        Ok(Self::SIZE as u64)
    }

    /// the header of `id` as bytes
    pub fn bytes(id: Id) -> [u8; Self::SIZE] {
        let version = Version::LATEST;
        [version.to_u8(), id.to_wire(version)]
    }
}
