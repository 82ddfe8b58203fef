use asn_lib::{FrameError, Header};
use bytes::Bytes;
use rand_core::{OsRng, RngCore as _};
use std::{
    fs::{self, File},
    io::{self, Read, Seek, SeekFrom, Write as _},
    path::Path,
};

/// one received unit: the frame header and its body
///
/// the unit is read like a file. Reading moves the position forward,
/// [`Pdu::rewind`] brings it back to the header so the whole unit can
/// be read again (to compute its [`Sum`](asn_lib::Sum) for example).
/// Dropping the unit releases it.
#[derive(Clone, PartialEq, Eq)]
pub struct Pdu {
    bytes: Bytes,
    position: usize,
}

impl Pdu {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            position: 0,
        }
    }

    /// read the frame header of the unit
    pub fn header(&mut self) -> Result<Header, FrameError> {
        Header::read_from(self)
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// the bytes of the unit not read yet
    pub fn remaining(&self) -> &[u8] {
        &self.bytes[self.position..]
    }

    /// every byte of the unit, whatever the position
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_ref()
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// persist the whole unit at `path`
    ///
    /// the unit is first written in a uniquely named file next to `path`
    /// then renamed: `path` never holds a partially written unit and two
    /// concurrent saves of the same unit leave one complete copy.
    pub fn save_as<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no file name"))?;
        let temporary = path.with_file_name(format!(".{}.{:016x}", file_name, OsRng.next_u64()));

        let written = File::create(&temporary).and_then(|mut file| {
            file.write_all(self.as_bytes())?;
            file.sync_all()
        });

        match written.and_then(|()| fs::rename(&temporary, path)) {
            Ok(()) => Ok(()),
            Err(error) => {
                let _ = fs::remove_file(&temporary);
                Err(error)
            }
        }
    }
}

impl From<Vec<u8>> for Pdu {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for Pdu {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Read for Pdu {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.remaining().read(buf)?;
        self.position += n;
        Ok(n)
    }
}

impl Seek for Pdu {
    fn seek(&mut self, position: SeekFrom) -> io::Result<u64> {
        let position = match position {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(offset) => (self.len() as i64).checked_add(offset).map(|o| o as u64),
            SeekFrom::Current(offset) => (self.position as i64)
                .checked_add(offset)
                .map(|o| o as u64),
        };

        match position {
            Some(position) if position <= self.len() as u64 => {
                self.position = position as usize;
                Ok(position)
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek outside of the unit",
            )),
        }
    }
}

impl std::fmt::Debug for Pdu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pdu")
            .field("len", &self.len())
            .field("position", &self.position)
            .finish()
    }
}
