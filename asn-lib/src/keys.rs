use cryptoxide::curve25519::{curve25519, curve25519_base};
use rand_core::{CryptoRng, RngCore};
use std::{
    convert::TryFrom,
    fmt::{self, Formatter},
    str::FromStr,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

fixed_bytes!(
    /// public half of an encryption key pair
    ///
    /// Identifies peers (their login key) and ephemeral session ends.
    /// Only this half is ever transmitted.
    EncrPub,
    32
);

fixed_bytes!(
    /// 32 random bytes, fresh for every (re)key of a session
    Nonce,
    32
);

/// secret half of an encryption key pair
///
/// the bytes are zeroed when the key is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct EncrSec([u8; 32]);

/// generate a new random encryption key pair
pub fn encr_keypair<RNG>(rng: &mut RNG) -> (EncrPub, EncrSec)
where
    RNG: RngCore + CryptoRng,
{
    let secret = EncrSec::generate(rng);
    (secret.public(), secret)
}

impl Nonce {
    pub fn generate<RNG>(rng: &mut RNG) -> Self
    where
        RNG: RngCore + CryptoRng,
    {
        let mut nonce = [0; Self::SIZE];
        rng.fill_bytes(&mut nonce);
        Self::from_bytes(nonce)
    }
}

impl EncrPub {
    /// the first 8 hexadecimal characters, enough to tell keys apart in logs
    pub fn short(&self) -> String {
        hex::encode(&self.as_bytes()[..4])
    }
}

impl EncrSec {
    pub const SIZE: usize = 32;

    pub fn generate<RNG>(rng: &mut RNG) -> Self
    where
        RNG: RngCore + CryptoRng,
    {
        let mut secret = Self([0; Self::SIZE]);
        rng.fill_bytes(&mut secret.0);
        secret
    }

    pub fn public(&self) -> EncrPub {
        EncrPub::from_bytes(curve25519_base(&self.0))
    }

    /// X25519 shared secret with the peer's public key
    pub(crate) fn exchange(&self, peer: &EncrPub) -> [u8; 32] {
        curve25519(&self.0, peer.as_bytes())
    }
}

impl fmt::Display for EncrSec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for EncrSec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EncrSec").field(&"...").finish()
    }
}

impl FromStr for EncrSec {
    type Err = hex::FromHexError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut secret = Self([0; Self::SIZE]);
        hex::decode_to_slice(s, &mut secret.0)?;
        Ok(secret)
    }
}

impl TryFrom<String> for EncrSec {
    type Error = hex::FromHexError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EncrSec> for String {
    fn from(secret: EncrSec) -> Self {
        secret.to_string()
    }
}

impl serde::Serialize for EncrSec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for EncrSec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
