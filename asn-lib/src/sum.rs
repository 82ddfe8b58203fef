use cryptoxide::{digest::Digest as _, sha2::Sha512};
use std::io::{self, Read, Write};

fixed_bytes!(
    /// SHA-512 digest of a transmitted unit, used as its content address
    ///
    /// The sum covers every byte of the unit, the version and identifier
    /// header included: two uploads with the same sum are the same object.
    Sum,
    64
);

/// a list of [`Sum`], one of the blob content kinds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sums(pub Vec<Sum>);

/// writer forwarding everything to the destination and to a running
/// SHA-512 at the same time
///
/// only the bytes the destination accepted are hashed.
pub struct SumWriter<W> {
    inner: W,
    hasher: Sha512,
    written: u64,
}

impl Sum {
    /// compute the sum of everything left in the reader
    pub fn of<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut writer = SumWriter::new(io::sink());
        io::copy(&mut reader, &mut writer)?;
        let (sum, _, _) = writer.finish();
        Ok(sum)
    }

    /// compute the sum of the given bytes
    pub fn of_bytes(bytes: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha512::new();
        hasher.input(bytes.as_ref());

        let mut sum = [0; Self::SIZE];
        hasher.result(&mut sum);
        Self::from_bytes(sum)
    }
}

impl Sums {
    /// write the sums one after the other
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<u64> {
        let mut n = 0;
        for sum in self.0.iter() {
            n += sum.write_to(&mut writer)?;
        }
        Ok(n)
    }

    /// read sums until the end of the reader
    ///
    /// a trailing partial sum is an error.
    pub fn read_from<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        if bytes.len() % Sum::SIZE != 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "truncated list of sums",
            ));
        }

        let sums = bytes
            .chunks_exact(Sum::SIZE)
            .map(|chunk| {
                let mut sum = [0; Sum::SIZE];
                sum.copy_from_slice(chunk);
                Sum::from_bytes(sum)
            })
            .collect();

        Ok(Self(sums))
    }
}

impl<W: Write> SumWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha512::new(),
            written: 0,
        }
    }

    /// number of bytes written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// finalize the digest, returns the sum, the number of bytes written
    /// and the destination
    pub fn finish(mut self) -> (Sum, u64, W) {
        let mut sum = [0; Sum::SIZE];
        self.hasher.result(&mut sum);
        (Sum::from_bytes(sum), self.written, self.inner)
    }
}

impl<W: Write> Write for SumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.input(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tee_matches_direct_sum() {
        let data = b"version, identifier and everything else";

        let mut writer = SumWriter::new(Vec::new());
        writer.write_all(&data[..7]).unwrap();
        writer.write_all(&data[7..]).unwrap();
        let (sum, n, output) = writer.finish();

        assert_eq!(n, data.len() as u64);
        assert_eq!(output, data.to_vec());
        assert_eq!(sum, Sum::of_bytes(&data[..]));
        assert_eq!(sum, Sum::of(&data[..]).unwrap());
    }

    #[test]
    fn sha512_of_empty_input() {
        let expected: Sum = "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce\
                             47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
            .parse()
            .unwrap();

        assert_eq!(Sum::of_bytes(b""), expected);
    }

    #[test]
    fn sums_list() {
        let sums = Sums(vec![Sum::of_bytes(b"a"), Sum::of_bytes(b"b")]);

        let mut bytes = Vec::new();
        assert_eq!(sums.write_to(&mut bytes).unwrap(), 2 * Sum::SIZE as u64);
        assert_eq!(Sums::read_from(&bytes[..]).unwrap(), sums);

        assert!(Sums::read_from(&bytes[..Sum::SIZE + 3]).is_err());
    }
}
