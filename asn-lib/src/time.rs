use chrono::{TimeZone as _, Utc};
use std::{
    fmt::{self, Formatter},
    io::{self, Read, Write},
};

/// nanoseconds since the UNIX epoch
///
/// encoded as 8 bytes big endian so the stored objects sort by time.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const SIZE: usize = std::mem::size_of::<u64>();

    /// the current time, saturated to the range of the nanoseconds
    /// representable from the epoch (1970 to 2262)
    pub fn now() -> Self {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX).max(0);
        Self(nanos as u64)
    }

    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    pub const fn to_be_bytes(self) -> [u8; Self::SIZE] {
        self.0.to_be_bytes()
    }

    pub const fn from_be_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }

    pub fn read_from<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut bytes = [0; Self::SIZE];
        reader.read_exact(&mut bytes)?;
        Ok(Self::from_be_bytes(bytes))
    }

    pub fn write_to<W: Write>(self, mut writer: W) -> io::Result<u64> {
        writer.write_all(&self.to_be_bytes())?;
        Ok(Self::SIZE as u64)
    }

    /// RFC 2822 formatted date, e.g. `Tue, 14 Nov 2023 22:13:20 +0000`
    pub fn to_rfc2822(self) -> String {
        Utc.timestamp_nanos(self.0 as i64).to_rfc2822()
    }
}

impl From<u64> for Timestamp {
    fn from(nanos: u64) -> Self {
        Self(nanos)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc2822())
    }
}
