use crate::Handle;
use anyhow::{bail, Context as _, Result};
use asn_lib::{encr_keypair, CryptoBox, EncrPub, EncrSec, Generation, Nonce, Version};
use rand_core::{CryptoRng, RngCore};
use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _};

/// first message of a connection, sent by the client
///
/// composed of the [`Version`] of the client, its ephemeral public key
/// and the nonce of the key exchange box.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub struct Hello([u8; Self::SIZE]);

/// accept the hello of a client
pub struct Accepting<I, O> {
    reader: I,
    writer: O,
}

/// connection accepted by the server
pub struct Accepted<I, O> {
    pub handle: Handle<I, O>,
    /// ephemeral public key of the client
    pub ephemeral: EncrPub,
    /// key exchange box, opens the login of the client
    pub crypto_box: CryptoBox,
}

/// connection opened by a client
pub struct Opened<I, O> {
    pub handle: Handle<I, O>,
    /// our ephemeral key pair, the server derives every box with the
    /// public half
    pub ephemeral: EncrPub,
    pub secret: EncrSec,
    /// key exchange box, seals our login
    pub crypto_box: CryptoBox,
}

impl Hello {
    pub const SIZE: usize = Version::SIZE + EncrPub::SIZE + Nonce::SIZE;

    pub fn new(version: Version, ephemeral: &EncrPub, nonce: &Nonce) -> Self {
        let mut bytes = [0; Self::SIZE];
        bytes[0] = version.to_u8();
        bytes[Version::SIZE..Version::SIZE + EncrPub::SIZE].copy_from_slice(ephemeral.as_ref());
        bytes[Version::SIZE + EncrPub::SIZE..].copy_from_slice(nonce.as_ref());
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self(bytes)
    }

    pub fn version(&self) -> Version {
        Version::from_u8(self.0[0])
    }

    pub fn ephemeral(&self) -> EncrPub {
        let mut key = [0; EncrPub::SIZE];
        key.copy_from_slice(&self.0[Version::SIZE..Version::SIZE + EncrPub::SIZE]);
        EncrPub::from_bytes(key)
    }

    pub fn nonce(&self) -> Nonce {
        let mut nonce = [0; Nonce::SIZE];
        nonce.copy_from_slice(&self.0[Version::SIZE + EncrPub::SIZE..]);
        Nonce::from_bytes(nonce)
    }
}

impl AsRef<[u8]> for Hello {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<I, O> Accepting<I, O>
where
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    pub(crate) fn new(reader: I, writer: O) -> Self {
        Self { reader, writer }
    }

    /// receive the hello and reply with our version
    ///
    /// `public` and `secret` are the long term encryption keys of the
    /// server, the client knows the public half.
    ///
    /// # Errors
    ///
    /// fails on IO errors or if the client's version is not supported.
    pub async fn accept(self, public: &EncrPub, secret: &EncrSec) -> Result<Accepted<I, O>> {
        let Self {
            mut reader,
            mut writer,
        } = self;

        let mut bytes = [0; Hello::SIZE];
        reader
            .read_exact(&mut bytes)
            .await
            .context("Cannot receive the hello")?;
        let hello = Hello::from_bytes(bytes);

        if !hello.version().is_supported() {
            bail!("Unsupported version {:?}", hello.version());
        }

        let ephemeral = hello.ephemeral();
        let crypto_box = CryptoBox::new(
            Generation::KEY_EXCHANGE,
            &hello.nonce(),
            &ephemeral,
            public,
            secret,
        );

        writer
            .write_all(&[Version::LATEST.to_u8()])
            .await
            .context("Cannot reply to the hello")?;

        tracing::debug!(ephemeral = %ephemeral.short(), "hello accepted");

        Ok(Accepted {
            handle: Handle::new(reader, writer),
            ephemeral,
            crypto_box,
        })
    }
}

pub(crate) async fn open<I, O, RNG>(
    mut rng: RNG,
    server: &EncrPub,
    mut reader: I,
    mut writer: O,
) -> Result<Opened<I, O>>
where
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
    RNG: RngCore + CryptoRng,
{
    let (ephemeral, secret) = encr_keypair(&mut rng);
    let nonce = Nonce::generate(&mut rng);
    let hello = Hello::new(Version::LATEST, &ephemeral, &nonce);

    writer
        .write_all(hello.as_ref())
        .await
        .context("Cannot send the hello")?;

    let mut reply = [0; Version::SIZE];
    reader
        .read_exact(&mut reply)
        .await
        .context("Cannot receive the reply to the hello")?;
    let version = Version::from_u8(reply[0]);

    if !version.is_supported() {
        bail!("Unsupported version {:?}", version);
    }

    let crypto_box = CryptoBox::new(
        Generation::KEY_EXCHANGE,
        &nonce,
        server,
        &ephemeral,
        &secret,
    );

    Ok(Opened {
        handle: Handle::new(reader, writer),
        ephemeral,
        secret,
        crypto_box,
    })
}
