use crate::{
    frame::Header, pool::Recycle, EncrPub, Id, Sum, SumWriter, Sums, Timestamp,
};
use rand_core::{OsRng, RngCore as _};
use std::io::{self, Read, Write};
use thiserror::Error;

/// marker following the header of every blob
pub const MAGIC: &[u8; 8] = b"asnmagic";
/// random bytes diversifying otherwise identical envelopes
pub const SALT_SIZE: usize = 32;

/// offset of the envelope, right after the frame header
pub const BLOB_OFFSET: u64 = Header::SIZE as u64;
/// offset of the timestamp in a stored object
pub const TIME_OFFSET: u64 =
    BLOB_OFFSET + (MAGIC.len() + SALT_SIZE + 2 * EncrPub::SIZE) as u64;
/// offset of the name length in a stored object
pub const NAME_LEN_OFFSET: u64 = TIME_OFFSET + Timestamp::SIZE as u64;

/// envelope of a named, timestamped content object
///
/// on the wire and on disk a blob is:
///
/// ```text
/// [version:1][id:1][magic:8][salt:32][owner:32][author:32][time:8][name len:1][name][content]
/// ```
///
/// the content length is given by the enclosing frame (or the file size).
/// Blobs are never modified once written, they are only flagged for
/// deletion (see [`flag_deletion`](crate::id::flag_deletion)).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Blob {
    pub owner: EncrPub,
    pub author: EncrPub,
    pub time: Timestamp,
    pub name: String,
}

/// location mark of a key, one of the blob content kinds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Mark {
    pub key: EncrPub,
    /// latitude in micro degrees
    pub lat: i32,
    /// longitude in micro degrees
    pub lon: i32,
}

/// the content written after the envelope
pub enum Content<'a> {
    Mark(&'a Mark),
    Sums(&'a Sums),
    Bytes(&'a [u8]),
    Text(&'a str),
    /// copied verbatim until the end of the reader
    Stream(&'a mut dyn Read),
}

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("not magic")]
    NotMagic { consumed: u64 },

    #[error("short read after {consumed} bytes of blob envelope")]
    ShortRead { consumed: u64 },

    #[error("blob name is not valid UTF-8")]
    InvalidName { consumed: u64 },

    #[error("cannot read blob envelope after {consumed} bytes")]
    Io {
        consumed: u64,
        #[source]
        source: io::Error,
    },
}

struct Counted<R> {
    inner: R,
    count: u64,
}

impl Blob {
    pub const MAX_NAME: usize = u8::MAX as usize;

    /// new blob timed now
    pub fn new(owner: EncrPub, author: EncrPub, name: impl Into<String>) -> Self {
        Self {
            owner,
            author,
            time: Timestamp::now(),
            name: name.into(),
        }
    }

    /// decode a blob envelope, the frame header already consumed
    pub fn decode<R: Read>(reader: R) -> Result<Self, BlobError> {
        let mut blob = Self::default();
        blob.read_from(reader)?;
        Ok(blob)
    }

    /// read the envelope that follows the frame header
    ///
    /// the content is left in the reader. Returns the number of bytes
    /// consumed; on error the number of bytes consumed so far is in
    /// the error (see [`BlobError::consumed`]).
    pub fn read_from<R: Read>(&mut self, reader: R) -> Result<u64, BlobError> {
        let mut reader = Counted {
            inner: reader,
            count: 0,
        };

        let mut magic = [0; MAGIC.len()];
        reader.fill(&mut magic)?;
        if &magic != MAGIC {
            return Err(BlobError::NotMagic {
                consumed: reader.count,
            });
        }

        let mut salt = [0; SALT_SIZE];
        reader.fill(&mut salt)?;

        let mut key = [0; EncrPub::SIZE];
        reader.fill(&mut key)?;
        self.owner = EncrPub::from_bytes(key);
        reader.fill(&mut key)?;
        self.author = EncrPub::from_bytes(key);

        let mut time = [0; Timestamp::SIZE];
        reader.fill(&mut time)?;
        self.time = Timestamp::from_be_bytes(time);

        let mut len = [0; 1];
        reader.fill(&mut len)?;
        let mut name = vec![0; len[0] as usize];
        reader.fill(&mut name)?;
        self.name = String::from_utf8(name).map_err(|_| BlobError::InvalidName {
            consumed: reader.count,
        })?;

        Ok(reader.count)
    }

    /// write the whole unit (header, envelope and content) and return its
    /// [`Sum`] along the number of bytes written
    ///
    /// the sum covers every byte written, the header included.
    pub fn write_and_sum<W: Write>(&self, writer: W, content: Content<'_>) -> io::Result<(Sum, u64)> {
        if self.name.len() > Self::MAX_NAME {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "blob name longer than 255 bytes",
            ));
        }

        let mut salt = [0; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);

        let mut writer = SumWriter::new(writer);

        Header::write_to(Id::Blob, &mut writer)?;
        writer.write_all(MAGIC)?;
        writer.write_all(&salt)?;
        self.owner.write_to(&mut writer)?;
        self.author.write_to(&mut writer)?;
        self.time.write_to(&mut writer)?;
        writer.write_all(&[self.name.len() as u8])?;
        writer.write_all(self.name.as_bytes())?;
        content.write_to(&mut writer)?;
        writer.flush()?;

        let (sum, n, _) = writer.finish();
        Ok((sum, n))
    }

    /// file name of the blob: its time and abbreviated sum
    pub fn file_name(&self, sum: &Sum) -> String {
        derive_name(self.time, sum)
    }
}

impl Recycle for Blob {
    fn recycle(&mut self) {
        self.owner = EncrPub::default();
        self.author = EncrPub::default();
        self.time = Timestamp::default();
        self.name.clear();
    }
}

/// `<time in nanoseconds, 16 hexadecimal digits>_<first 16 hexadecimal digits of the sum>`
///
/// names sort by time, the sum tells apart blobs of the same nanosecond.
pub fn derive_name(time: Timestamp, sum: &Sum) -> String {
    let sum = hex::encode(&sum.as_bytes()[..8]);
    format!("{:016x}_{}", time.as_nanos(), sum)
}

impl Mark {
    pub const SIZE: usize = EncrPub::SIZE + 2 * std::mem::size_of::<i32>();

    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<u64> {
        self.key.write_to(&mut writer)?;
        writer.write_all(&self.lat.to_be_bytes())?;
        writer.write_all(&self.lon.to_be_bytes())?;
        Ok(Self::SIZE as u64)
    }

    pub fn read_from<R: Read>(mut reader: R) -> io::Result<Self> {
        let key = EncrPub::read_from(&mut reader)?;
        let mut coordinate = [0; 4];
        reader.read_exact(&mut coordinate)?;
        let lat = i32::from_be_bytes(coordinate);
        reader.read_exact(&mut coordinate)?;
        let lon = i32::from_be_bytes(coordinate);

        Ok(Self { key, lat, lon })
    }
}

impl<'a> Content<'a> {
    pub fn write_to<W: Write>(self, mut writer: W) -> io::Result<u64> {
        match self {
            Self::Mark(mark) => mark.write_to(writer),
            Self::Sums(sums) => sums.write_to(writer),
            Self::Bytes(bytes) => writer.write_all(bytes).map(|()| bytes.len() as u64),
            Self::Text(text) => writer
                .write_all(text.as_bytes())
                .map(|()| text.len() as u64),
            Self::Stream(reader) => io::copy(reader, &mut writer),
        }
    }
}

impl BlobError {
    /// number of bytes consumed before the error
    pub fn consumed(&self) -> u64 {
        match self {
            Self::NotMagic { consumed }
            | Self::ShortRead { consumed }
            | Self::InvalidName { consumed }
            | Self::Io { consumed, .. } => *consumed,
        }
    }
}

impl<R: Read> Counted<R> {
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), BlobError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(BlobError::ShortRead {
                        consumed: self.count,
                    })
                }
                Ok(n) => {
                    filled += n;
                    self.count += n as u64;
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(BlobError::Io {
                        consumed: self.count,
                        source,
                    })
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{encr_keypair, Version};

    fn keys() -> (EncrPub, EncrPub) {
        let (owner, _) = encr_keypair(&mut OsRng);
        let (author, _) = encr_keypair(&mut OsRng);
        (owner, author)
    }

    fn blob(name: &str) -> Blob {
        let (owner, author) = keys();
        Blob {
            owner,
            author,
            time: Timestamp::from_nanos(1_700_000_000_000_000_000),
            name: name.to_owned(),
        }
    }

    #[test]
    fn layout() {
        let blob = blob("note");
        let mut bytes = Vec::new();

        let (_, n) = blob
            .write_and_sum(&mut bytes, Content::Bytes(b"hello"))
            .unwrap();

        assert_eq!(n, bytes.len() as u64);
        assert_eq!(bytes[0], Version::LATEST.to_u8());
        assert_eq!(bytes[1], Id::Blob.to_wire(Version::LATEST));
        assert_eq!(&bytes[2..10], MAGIC);
        assert_eq!(&bytes[42..74], blob.owner.as_ref());
        assert_eq!(&bytes[74..106], blob.author.as_ref());
        assert_eq!(TIME_OFFSET, 106);
        assert_eq!(&bytes[106..114], &blob.time.to_be_bytes());
        assert_eq!(NAME_LEN_OFFSET, 114);
        assert_eq!(bytes[114], 4);
        assert_eq!(&bytes[115..119], b"note");
        assert_eq!(&bytes[119..], b"hello");
    }

    #[test]
    fn decode_what_was_written() {
        let blob = blob("note");
        let mut bytes = Vec::new();

        let (sum, _) = blob
            .write_and_sum(&mut bytes, Content::Text("hello"))
            .unwrap();

        let mut reader = &bytes[..];
        let header = Header::read_from(&mut reader).unwrap();
        assert_eq!(header.id, Id::Blob);

        let mut decoded = Blob::default();
        let consumed = decoded.read_from(&mut reader).unwrap();

        assert_eq!(decoded, blob);
        assert_eq!(consumed, NAME_LEN_OFFSET + 1 + 4 - BLOB_OFFSET);
        assert_eq!(reader, b"hello");
        assert_eq!(Sum::of_bytes(&bytes), sum);
    }

    #[test]
    fn salt_makes_sums_differ() {
        let blob = blob("");
        let (sum1, _) = blob.write_and_sum(io::sink(), Content::Bytes(b"")).unwrap();
        let (sum2, _) = blob.write_and_sum(io::sink(), Content::Bytes(b"")).unwrap();

        assert_ne!(sum1, sum2);
    }

    #[test]
    fn empty_name() {
        let blob = blob("");
        let mut bytes = Vec::new();
        blob.write_and_sum(&mut bytes, Content::Bytes(b"x")).unwrap();

        let decoded = Blob::decode(&bytes[Header::SIZE..]).unwrap();
        assert_eq!(decoded.name, "");
        assert_eq!(decoded, blob);
    }

    #[test]
    fn name_too_long() {
        let blob = blob(&"n".repeat(256));

        assert!(blob
            .write_and_sum(io::sink(), Content::Bytes(b""))
            .is_err());
    }

    #[test]
    fn not_magic() {
        let bytes = [b'x'; 200];

        let error = Blob::decode(&bytes[..]).unwrap_err();
        assert!(matches!(error, BlobError::NotMagic { consumed: 8 }));
    }

    #[test]
    fn short_read_reports_consumed() {
        let blob = blob("note");
        let mut bytes = Vec::new();
        blob.write_and_sum(&mut bytes, Content::Bytes(b"")).unwrap();

        let truncated = &bytes[Header::SIZE..50];
        let error = Blob::decode(truncated).unwrap_err();

        assert!(matches!(error, BlobError::ShortRead { .. }));
        assert_eq!(error.consumed(), truncated.len() as u64);
    }

    #[test]
    fn content_kinds() {
        let (key, _) = keys();
        let mark = Mark {
            key,
            lat: 37_774_900,
            lon: -122_419_400,
        };
        let sums = Sums(vec![Sum::of_bytes(b"a")]);
        let mut stream: &[u8] = b"streamed";

        let mut bytes = Vec::new();
        assert_eq!(Content::Mark(&mark).write_to(&mut bytes).unwrap(), Mark::SIZE as u64);
        assert_eq!(Mark::read_from(&bytes[..]).unwrap(), mark);

        assert_eq!(Content::Sums(&sums).write_to(io::sink()).unwrap(), Sum::SIZE as u64);
        assert_eq!(Content::Text("text").write_to(io::sink()).unwrap(), 4);

        let mut copied = Vec::new();
        assert_eq!(Content::Stream(&mut stream).write_to(&mut copied).unwrap(), 8);
        assert_eq!(copied, b"streamed");
    }

    #[test]
    fn file_name() {
        let blob = blob("");
        let sum: Sum = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\
                        0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"
            .parse()
            .unwrap();

        assert_eq!(blob.file_name(&sum), "17979cfe362a0000_0123456789abcdef");
    }

    #[test]
    fn recycle_clears_everything() {
        let mut blob = blob("secret name");
        blob.recycle();

        assert_eq!(blob, Blob::default());
    }
}
