/*!
# ASN protocol primitives

everything a peer of the ASN network needs to read and write what goes on
the wire and in the repositories:

* the versioned identifier tables ([`Id`], [`Version`]) and the deletion
  flag of stored objects (see [`id::flag_deletion`]);
* the frame [`Header`] prefixing every unit;
* the [`Blob`] envelope and its content address, the [`Sum`];
* the keys, signatures and the [`CryptoBox`] of a session.
*/

#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

#[macro_use]
mod macros;

mod auth;
pub mod blob;
mod crypto_box;
mod frame;
pub mod id;
mod keys;
mod pool;
mod requester;
pub mod stored;
mod sum;
mod time;
mod version;

pub use self::{
    auth::{AuthPub, AuthSec, AuthSig},
    blob::{Blob, BlobError, Content, Mark},
    crypto_box::{BoxError, CryptoBox, Generation},
    frame::{FrameError, Header},
    id::Id,
    keys::{encr_keypair, EncrPub, EncrSec, Nonce},
    pool::{Pool, Recycle},
    requester::Requester,
    sum::{Sum, SumWriter, Sums},
    time::Timestamp,
    version::Version,
};
