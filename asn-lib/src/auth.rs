use cryptoxide::ed25519;
use rand_core::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

fixed_bytes!(
    /// public signing key, verifies [`AuthSig`]s
    AuthPub,
    32
);

fixed_bytes!(
    /// authentication signature
    ///
    /// At login a peer signs its own login public key bytes with the
    /// signing secret matching the [`AuthPub`] known by the server.
    AuthSig,
    64
);

/// signing secret of a peer
///
/// the server never holds one, clients use it to sign their login.
/// The key pair is zeroed when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct AuthSec {
    keypair: [u8; 64],
    #[zeroize(skip)]
    public: AuthPub,
}

impl AuthSig {
    /// check the signature of `message` against the signing key
    ///
    /// returns `false` for malformed keys or signatures.
    pub fn verify(&self, key: &AuthPub, message: &[u8]) -> bool {
        ed25519::verify(message, key.as_bytes(), self.as_bytes())
    }
}

impl AuthSec {
    pub fn generate<RNG>(rng: &mut RNG) -> Self
    where
        RNG: RngCore + CryptoRng,
    {
        let mut seed = [0; 32];
        rng.fill_bytes(&mut seed);

        let (keypair, public) = ed25519::keypair(&seed);

        seed.zeroize();

        Self {
            keypair,
            public: AuthPub::from_bytes(public),
        }
    }

    pub fn public(&self) -> AuthPub {
        self.public
    }

    pub fn sign(&self, message: &[u8]) -> AuthSig {
        AuthSig::from_bytes(ed25519::signature(message, &self.keypair))
    }
}
