use crate::Pdu;
use asn_lib::{AuthSec, AuthSig, EncrPub, Header, Id, Nonce, Requester};
use bytes::{BufMut as _, Bytes, BytesMut};
use std::io::{self, Read};

/// body of a login request
///
/// the peer claims its login key and proves it with a signature of the
/// key's own bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub requester: Requester,
    pub login: EncrPub,
    pub signature: AuthSig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    Success = 0,
    Failure = 1,
}

/// acknowledgment of a request
///
/// ```text
/// [version:1][id:1][requester:8][status:1][payload]
/// ```
///
/// the payload of the acknowledgment of a rekeying request (login or
/// resume) is the new public key of the server and the nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub requester: Requester,
    pub status: Status,
    pub payload: Bytes,
}

impl LoginRequest {
    pub const SIZE: usize = Requester::SIZE + EncrPub::SIZE + AuthSig::SIZE;

    /// sign `login` with the peer's signing secret
    pub fn new(requester: Requester, login: EncrPub, auth: &AuthSec) -> Self {
        Self {
            requester,
            login,
            signature: auth.sign(login.as_ref()),
        }
    }

    /// read the body, the frame header already consumed
    pub fn read_from<R: Read>(mut reader: R) -> io::Result<Self> {
        let requester = Requester::read_from(&mut reader)?;
        let login = EncrPub::read_from(&mut reader)?;
        let signature = AuthSig::read_from(&mut reader)?;

        Ok(Self {
            requester,
            login,
            signature,
        })
    }

    pub fn to_pdu(&self) -> Pdu {
        let mut bytes = BytesMut::with_capacity(Header::SIZE + Self::SIZE);
        bytes.put_slice(&Header::bytes(Id::LoginReq));
        bytes.put_slice(self.requester.as_ref());
        bytes.put_slice(self.login.as_ref());
        bytes.put_slice(self.signature.as_ref());

        Pdu::new(bytes.freeze())
    }
}

/// a request carrying nothing but its requester (pause, resume, quit)
pub fn request(id: Id, requester: Requester) -> Pdu {
    let mut bytes = BytesMut::with_capacity(Header::SIZE + Requester::SIZE);
    bytes.put_slice(&Header::bytes(id));
    bytes.put_slice(requester.as_ref());

    Pdu::new(bytes.freeze())
}

impl Status {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// any non zero status is a failure
    pub fn from_u8(status: u8) -> Self {
        if status == 0 {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

impl Ack {
    pub const MIN_SIZE: usize = Requester::SIZE + 1;

    pub fn success(requester: Requester) -> Self {
        Self {
            requester,
            status: Status::Success,
            payload: Bytes::new(),
        }
    }

    pub fn failure(requester: Requester) -> Self {
        Self {
            requester,
            status: Status::Failure,
            payload: Bytes::new(),
        }
    }

    /// successful acknowledgment of a rekey
    pub fn rekey(requester: Requester, public: &EncrPub, nonce: &Nonce) -> Self {
        let mut payload = BytesMut::with_capacity(EncrPub::SIZE + Nonce::SIZE);
        payload.put_slice(public.as_ref());
        payload.put_slice(nonce.as_ref());

        Self {
            requester,
            status: Status::Success,
            payload: payload.freeze(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// the new public key and nonce of a rekey acknowledgment
    pub fn rekeyed(&self) -> Option<(EncrPub, Nonce)> {
        if self.payload.len() != EncrPub::SIZE + Nonce::SIZE {
            return None;
        }

        let mut payload = self.payload.as_ref();
        let public = EncrPub::read_from(&mut payload).ok()?;
        let nonce = Nonce::read_from(&mut payload).ok()?;
        Some((public, nonce))
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut bytes = BytesMut::with_capacity(Header::SIZE + Self::MIN_SIZE + self.payload.len());
        bytes.put_slice(&Header::bytes(Id::AckReq));
        bytes.put_slice(self.requester.as_ref());
        bytes.put_u8(self.status.to_u8());
        bytes.put_slice(self.payload.as_ref());

        bytes.freeze()
    }

    /// read the body, the frame header already consumed
    pub fn read_from<R: Read>(mut reader: R) -> io::Result<Self> {
        let requester = Requester::read_from(&mut reader)?;
        let mut status = [0; 1];
        reader.read_exact(&mut status)?;
        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;

        Ok(Self {
            requester,
            status: Status::from_u8(status[0]),
            payload: Bytes::from(payload),
        })
    }
}
