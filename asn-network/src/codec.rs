/*!
# length prefixed frames

once the hello is exchanged every unit travels sealed in a frame:

```text
[length:2][sealed unit:length]
```

the codec does not open or seal the units, the session does: the box
changes on every rekey and the acknowledgment of a rekey still travels
under the previous box.
*/

use asn_lib::CryptoBox;
use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

const MIN_FRAME_LENGTH: usize = CryptoBox::TAG_SIZE;
pub const MAX_FRAME_LENGTH: usize = u16::MAX as usize - HEAD_LENGTH;
const HEAD_LENGTH: usize = std::mem::size_of::<u16>();

/// [tokio codec] decoding the sealed frames
///
/// [tokio codec]: tokio_util::codec
pub struct FrameDecoder {
    decode_state: State,
}

/// [tokio codec] encoding the sealed frames
///
/// [tokio codec]: tokio_util::codec
#[derive(Default)]
pub struct FrameEncoder;

/// state of the data being read
///
/// initially we expect the [`State::Head`] which is a pre-determined
/// size and contains the size of the data to read.
enum State {
    Data(usize),
    Head,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            decode_state: State::Head,
        }
    }

    fn decode_head(&mut self, src: &mut BytesMut) -> io::Result<Option<usize>> {
        if src.len() < HEAD_LENGTH {
            return Ok(None);
        }

        let n = src.get_u16() as usize;

        if n < MIN_FRAME_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "frame is too short",
            ));
        }

        if n > MAX_FRAME_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "frame is too long",
            ));
        }

        src.reserve(n);

        Ok(Some(n))
    }

    fn decode_data(&mut self, n: usize, src: &mut BytesMut) -> Option<BytesMut> {
        if src.len() < n {
            None
        } else {
            Some(src.split_to(n))
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameDecoder {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let n = match self.decode_state {
            State::Head => match self.decode_head(src)? {
                Some(n) => {
                    self.decode_state = State::Data(n);
                    n
                }
                None => return Ok(None),
            },
            State::Data(n) => n,
        };

        match self.decode_data(n, src) {
            Some(data) => {
                self.decode_state = State::Head;
                src.reserve(HEAD_LENGTH);
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }
}

impl Encoder<Bytes> for FrameEncoder {
    type Error = io::Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let n = item.len();

        if n > MAX_FRAME_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "frame is too long",
            ));
        }

        if n < MIN_FRAME_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "frame is too short",
            ));
        }

        dst.reserve(HEAD_LENGTH + n);
        dst.put_u16(n as u16);
        dst.extend_from_slice(item.as_ref());

        Ok(())
    }
}
