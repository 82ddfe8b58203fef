use crate::{EncrPub, EncrSec, Nonce};
use cryptoxide::{blake2b::Blake2b, chacha20poly1305::ChaCha20Poly1305, digest::Digest as _};
use std::fmt::{self, Formatter};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

const CONTEXT: &[u8] = b"asn box";
const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;

/// tag distinguishing the derivations of a session's boxes
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Generation(u8);

/// symmetric authenticated encryption context of a session
///
/// both ends of a session derive the same pair of directional keys:
/// what one end seals with its sending key the other end opens with its
/// receiving key. Every message moves the direction's counter forward so
/// a sealed message can only be opened once and in order.
#[derive(Clone, PartialEq, Eq)]
pub struct CryptoBox {
    generation: Generation,
    tx: Direction,
    rx: Direction,
}

#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
struct Direction {
    key: [u8; KEY_SIZE],
    counter: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoxError {
    #[error("sealed message is shorter than its authentication tag")]
    Truncated,

    #[error("cannot authenticate the sealed message")]
    Authentication,

    #[error("no more messages can be sealed or opened with this box")]
    Exhausted,
}

impl Generation {
    /// box of the key exchange preceding the login
    pub const KEY_EXCHANGE: Self = Self(1);
    /// box installed by every rekey
    pub const REKEY: Self = Self(2);

    pub const fn to_u8(self) -> u8 {
        self.0
    }
}

impl CryptoBox {
    pub const TAG_SIZE: usize = 16;

    /// derive the box shared with `peer`
    ///
    /// `public` is the public half of `secret`. The peer derives the
    /// matching box with the arguments mirrored: same generation and
    /// nonce, our public key as its `peer`.
    pub fn new(
        generation: Generation,
        nonce: &Nonce,
        peer: &EncrPub,
        public: &EncrPub,
        secret: &EncrSec,
    ) -> Self {
        let mut shared = secret.exchange(peer);

        let (low, high) = if public < peer {
            (public, peer)
        } else {
            (peer, public)
        };

        let mut hasher = Blake2b::new_keyed(2 * KEY_SIZE, &shared);
        hasher.input(CONTEXT);
        hasher.input(&[generation.to_u8()]);
        hasher.input(nonce.as_ref());
        hasher.input(low.as_ref());
        hasher.input(high.as_ref());

        let mut keys = [0; 2 * KEY_SIZE];
        hasher.result(&mut keys);

        let mut low_to_high = [0; KEY_SIZE];
        let mut high_to_low = [0; KEY_SIZE];
        low_to_high.copy_from_slice(&keys[..KEY_SIZE]);
        high_to_low.copy_from_slice(&keys[KEY_SIZE..]);

        shared.zeroize();
        keys.zeroize();

        let (tx, rx) = if public < peer {
            (low_to_high, high_to_low)
        } else {
            (high_to_low, low_to_high)
        };

        Self {
            generation,
            tx: Direction::new(tx),
            rx: Direction::new(rx),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// encrypt and authenticate `message`, the tag is appended
    pub fn seal(&mut self, message: &[u8]) -> Result<Vec<u8>, BoxError> {
        let nonce = self.tx.next()?;
        let mut context = ChaCha20Poly1305::new(&self.tx.key, &nonce, &[]);

        let mut sealed = vec![0; message.len() + Self::TAG_SIZE];
        let (output, tag) = sealed.split_at_mut(message.len());
        context.encrypt(message, output, tag);

        Ok(sealed)
    }

    /// authenticate and decrypt a message sealed by the peer
    ///
    /// the receiving counter only moves forward if the message is authentic.
    pub fn open(&mut self, sealed: &[u8]) -> Result<Vec<u8>, BoxError> {
        if sealed.len() < Self::TAG_SIZE {
            return Err(BoxError::Truncated);
        }

        let nonce = self.rx.peek()?;
        let mut context = ChaCha20Poly1305::new(&self.rx.key, &nonce, &[]);

        let (input, tag) = sealed.split_at(sealed.len() - Self::TAG_SIZE);
        let mut message = vec![0; input.len()];
        if !context.decrypt(input, &mut message, tag) {
            return Err(BoxError::Authentication);
        }

        self.rx.counter += 1;
        Ok(message)
    }
}

impl Direction {
    fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key, counter: 0 }
    }

    fn peek(&self) -> Result<[u8; NONCE_SIZE], BoxError> {
        if self.counter == u64::MAX {
            return Err(BoxError::Exhausted);
        }

        let mut nonce = [0; NONCE_SIZE];
        nonce[4..].copy_from_slice(&self.counter.to_be_bytes());
        Ok(nonce)
    }

    fn next(&mut self) -> Result<[u8; NONCE_SIZE], BoxError> {
        let nonce = self.peek()?;
        self.counter += 1;
        Ok(nonce)
    }
}

impl fmt::Debug for CryptoBox {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoBox")
            .field("generation", &self.generation)
            .field("sent", &self.tx.counter)
            .field("received", &self.rx.counter)
            .finish()
    }
}
