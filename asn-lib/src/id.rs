use crate::Version;
use std::{
    fmt::{self, Formatter},
    fs::OpenOptions,
    io::{self, Read as _, Seek as _, SeekFrom, Write as _},
    path::Path,
};
use thiserror::Error;

/// number of identifier slots in every version's table
pub const MAX_ID: usize = 16;

/// top bit of the identifier byte: the object is a tombstone
pub const DELETED: u8 = 0x80;

/// byte offset of the identifier in a frame or a stored object
///
/// the identifier immediately follows the version byte, whatever
/// the version is.
pub const ID_OFFSET: u64 = Version::SIZE as u64;

/// internal, version independent identifier
///
/// the values are stable across protocol revisions, what goes on the
/// wire is the per version byte returned by [`Id::to_wire`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum Id {
    Raw = 0,

    AckReq = 1,
    ExecReq = 2,
    LoginReq = 3,
    PauseReq = 4,
    QuitReq = 5,
    RedirectReq = 6,
    ResumeReq = 7,

    Blob = 8,
    Index = 9,

    /// the frame is of a version newer than [`Version::LATEST`]
    Incompatible = 11,
    /// the byte is not defined in the table of the frame's version
    Unknown = 12,
}

/// wire bytes of version 0
mod v0 {
    pub const ACK_REQ: u8 = 1;
    pub const EXEC_REQ: u8 = 2;
    pub const LOGIN_REQ: u8 = 3;
    pub const PAUSE_REQ: u8 = 4;
    pub const QUIT_REQ: u8 = 5;
    pub const REDIRECT_REQ: u8 = 6;
    pub const RESUME_REQ: u8 = 7;
    pub const BLOB: u8 = 8;
    pub const INDEX: u8 = 9;
}

const WIRE_TO_ID: [[Id; MAX_ID]; Version::COUNT] = [[
    Id::Raw,
    Id::AckReq,
    Id::ExecReq,
    Id::LoginReq,
    Id::PauseReq,
    Id::QuitReq,
    Id::RedirectReq,
    Id::ResumeReq,
    Id::Blob,
    Id::Index,
    Id::Raw,
    Id::Raw,
    Id::Raw,
    Id::Raw,
    Id::Raw,
    Id::Raw,
]];

const ID_TO_WIRE: [[u8; MAX_ID]; Version::COUNT] = [[
    0,
    v0::ACK_REQ,
    v0::EXEC_REQ,
    v0::LOGIN_REQ,
    v0::PAUSE_REQ,
    v0::QUIT_REQ,
    v0::REDIRECT_REQ,
    v0::RESUME_REQ,
    v0::BLOB,
    v0::INDEX,
    0,
    0,
    0,
    0,
    0,
    0,
]];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("identifier table of version {version} is inconsistent at slot {slot:#04x}")]
pub struct TableError {
    pub version: Version,
    pub slot: usize,
}

impl Id {
    /// identifiers that can be placed on the wire
    pub const DEFINED: [Self; 9] = [
        Self::AckReq,
        Self::ExecReq,
        Self::LoginReq,
        Self::PauseReq,
        Self::QuitReq,
        Self::RedirectReq,
        Self::ResumeReq,
        Self::Blob,
        Self::Index,
    ];

    /// resolve the wire byte of the given version into the internal [`Id`]
    ///
    /// a byte carrying the deletion flag is outside of the table and
    /// resolves to [`Id::Unknown`]. The flag is only meaningful on stored
    /// objects: mask it out to read their identifier (see [`unflag_deleted`]).
    pub fn from_wire(byte: u8, version: Version) -> Self {
        if !version.is_supported() {
            return Self::Incompatible;
        }

        let slot = byte as usize;
        if slot >= MAX_ID {
            return Self::Unknown;
        }

        match WIRE_TO_ID[version.index()][slot] {
            Self::Raw => Self::Unknown,
            id => id,
        }
    }

    /// the wire byte of this identifier for the given version
    ///
    /// versions newer than [`Version::LATEST`] are clamped. Identifiers
    /// without a wire representation in that version map to the reserved
    /// `0` slot, which never resolves back.
    pub fn to_wire(self, version: Version) -> u8 {
        let version = version.clamp();
        let slot = self as usize;

        if slot >= MAX_ID {
            0
        } else {
            ID_TO_WIRE[version.index()][slot]
        }
    }

    /// `true` for the objects that can be stored in the repository
    pub fn is_object(self) -> bool {
        matches!(self, Self::Blob | Self::Index)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "Raw",
            Self::AckReq => "AckReq",
            Self::ExecReq => "ExecReq",
            Self::LoginReq => "LoginReq",
            Self::PauseReq => "PauseReq",
            Self::QuitReq => "QuitReq",
            Self::RedirectReq => "RedirectReq",
            Self::ResumeReq => "ResumeReq",
            Self::Blob => "Blob",
            Self::Index => "Index",
            Self::Incompatible => "Incompatible",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// check every forward mapping of every version has a consistent inverse
pub fn validate_tables() -> Result<(), TableError> {
    for index in 0..Version::COUNT {
        let version = Version::from_u8(index as u8);

        for (byte, id) in WIRE_TO_ID[index].iter().enumerate() {
            if *id != Id::Raw && ID_TO_WIRE[index][*id as usize] as usize != byte {
                return Err(TableError {
                    version,
                    slot: byte,
                });
            }
        }

        for (slot, byte) in ID_TO_WIRE[index].iter().enumerate() {
            let byte = *byte as usize;
            if byte != 0 && (byte >= MAX_ID || WIRE_TO_ID[index][byte] as usize != slot) {
                return Err(TableError { version, slot });
            }
        }
    }

    Ok(())
}

/// true if the identifier byte carries the deletion flag
#[inline]
pub fn is_deleted(byte: u8) -> bool {
    byte & DELETED != 0
}

#[inline]
pub fn flag_deleted(byte: u8) -> u8 {
    byte | DELETED
}

#[inline]
pub fn unflag_deleted(byte: u8) -> u8 {
    byte & !DELETED
}

/// flag the stored object at `path` for deletion by the garbage collector
///
/// only the identifier byte is rewritten in place. Flagging an object
/// already flagged does not write anything.
pub fn flag_deletion<P: AsRef<Path>>(path: P) -> io::Result<()> {
    rewrite_id(path.as_ref(), flag_deleted)
}

/// clear the deletion flag of the stored object at `path`
pub fn unflag_deletion<P: AsRef<Path>>(path: P) -> io::Result<()> {
    rewrite_id(path.as_ref(), unflag_deleted)
}

/// check the deletion flag of the stored object at `path`
pub fn is_deleted_file<P: AsRef<Path>>(path: P) -> io::Result<bool> {
    let mut file = OpenOptions::new().read(true).open(path)?;
    let mut byte = [0; 1];

    file.seek(SeekFrom::Start(ID_OFFSET))?;
    file.read_exact(&mut byte)?;

    Ok(is_deleted(byte[0]))
}

fn rewrite_id(path: &Path, rewrite: fn(u8) -> u8) -> io::Result<()> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let mut byte = [0; 1];

    file.seek(SeekFrom::Start(ID_OFFSET))?;
    file.read_exact(&mut byte)?;

    let rewritten = rewrite(byte[0]);
    if rewritten != byte[0] {
        file.seek(SeekFrom::Start(ID_OFFSET))?;
        file.write_all(&[rewritten])?;
    }

    Ok(())
}
