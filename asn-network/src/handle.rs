use crate::{
    codec::{FrameDecoder, FrameEncoder},
    hello::{self, Accepting, Opened},
};
use anyhow::{Context as _, Result};
use asn_lib::EncrPub;
use bytes::{Bytes, BytesMut};
use futures::prelude::*;
use rand_core::{CryptoRng, RngCore};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};

/// bidirectional handle of a connection, after the hello
///
/// the frames received and sent are sealed units: the handle does not
/// know the box, the session owns it.
pub struct Handle<I, O> {
    reader: FramedRead<I, FrameDecoder>,
    writer: FramedWrite<O, FrameEncoder>,
}

impl<I, O> Handle<I, O>
where
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    pub(crate) fn new(reader: I, writer: O) -> Self {
        Self {
            reader: FramedRead::new(reader, FrameDecoder::new()),
            writer: FramedWrite::new(writer, FrameEncoder),
        }
    }

    /// prepare accepting the hello of the peer connected to the streams
    pub fn accept(reader: I, writer: O) -> Accepting<I, O> {
        Accepting::new(reader, writer)
    }

    /// send our hello to the server owning the `server` key and wait
    /// for its reply
    pub async fn open<RNG>(rng: RNG, server: &EncrPub, reader: I, writer: O) -> Result<Opened<I, O>>
    where
        RNG: RngCore + CryptoRng,
    {
        hello::open(rng, server, reader, writer).await
    }

    /// split the handle into its reading and writing halves
    pub fn split(self) -> (FramedRead<I, FrameDecoder>, FramedWrite<O, FrameEncoder>) {
        (self.reader, self.writer)
    }

    /// send one sealed unit
    pub async fn send(&mut self, frame: Bytes) -> Result<()> {
        self.writer
            .send(frame)
            .await
            .context("Cannot send the frame to the peer")
    }

    /// receive the next sealed unit, `None` once the peer closed the connection
    pub async fn receive(&mut self) -> Option<Result<BytesMut>> {
        self.reader
            .next()
            .await
            .map(|result| result.context("Invalid frame received from peer"))
    }
}
