use crate::{permission::Denied, session::State};
use asn_lib::{BlobError, BoxError, EncrPub, FrameError, Id, Version};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Malformed frame")]
    Frame(#[from] FrameError),

    #[error("Malformed blob")]
    Blob(#[from] BlobError),

    #[error("Cannot open the sealed unit")]
    Box(#[from] BoxError),

    #[error("Malformed {id} request")]
    Request {
        id: Id,
        #[source]
        source: io::Error,
    },

    #[error("Unsupported protocol version {0}")]
    Incompatible(Version),

    #[error("Unknown identifier {0:#04x}")]
    UnknownId(u8),

    #[error("{0} is not a request the server handles")]
    Unsupported(Id),

    #[error("{id} is not valid while the session is {state}")]
    InvalidState { id: Id, state: State },

    #[error("The session is quitting")]
    Quitting,

    #[error("Cannot authenticate the login of {login}")]
    AuthenticationFailed { login: EncrPub },

    #[error("Permission denied")]
    PermissionDenied(#[from] Denied),

    #[error("No key exchange happened on this session")]
    MissingKeyExchange,

    #[error("I/O error")]
    Io(#[from] io::Error),
}

/// classification of the [`SessionError`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// the unit cannot be decoded, it is discarded
    MalformedFrame,
    /// the unit is of a version newer than ours
    VersionIncompatible,
    /// the identifier is not defined in the unit's version
    UnknownIdentifier,
    /// the login is denied, the peer may try again
    AuthenticationFailure,
    /// the blob is not persisted
    PermissionDenied,
    /// the request is not valid in the current state of the session
    InvalidState,
    Io,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Frame(_) | Self::Blob(_) | Self::Box(_) | Self::Request { .. } => {
                ErrorKind::MalformedFrame
            }
            Self::Incompatible(_) => ErrorKind::VersionIncompatible,
            Self::UnknownId(_) | Self::Unsupported(_) => ErrorKind::UnknownIdentifier,
            Self::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailure,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::InvalidState { .. } | Self::Quitting | Self::MissingKeyExchange => {
                ErrorKind::InvalidState
            }
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// the connection cannot continue after this error
    ///
    /// once a sealed unit cannot be opened the counters of the two ends
    /// are out of step: nothing else can be opened.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Box(_) | Self::MissingKeyExchange | Self::Quitting)
    }
}
