use std::{
    convert::TryFrom,
    fmt::{self, Formatter},
    num::ParseIntError,
    str::FromStr,
};

/// protocol version number
///
/// every frame on the wire and every stored object starts with one byte
/// of version. The identifiers that follow are translated through the
/// table of that version (see [`Id::from_wire`]) so older peers and
/// older stored objects keep their meaning as the protocol evolves.
///
/// [`Id::from_wire`]: crate::Id::from_wire
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Version(u8);

impl Version {
    /// the encoded size of the [`Version`].
    ///
    /// ```
    /// # use asn_lib::Version;
    /// assert_eq!(Version::SIZE, 1)
    /// ```
    pub const SIZE: usize = std::mem::size_of::<u8>();

    /// version 0: the initial set of requests and objects
    pub const V0: Self = Self(0);

    /// the latest version implemented, anything above is incompatible
    pub const LATEST: Self = Self::V0;

    /// number of versions with an identifier table
    pub(crate) const COUNT: usize = Self::LATEST.0 as usize + 1;

    /// returns if the version is known by this implementation
    ///
    /// ```
    /// # use asn_lib::Version;
    /// assert!(Version::LATEST.is_supported());
    /// assert!(!Version::from_u8(Version::LATEST.to_u8() + 1).is_supported());
    /// ```
    #[inline]
    pub fn is_supported(self) -> bool {
        self <= Self::LATEST
    }

    /// bring the version within the supported range
    #[inline]
    pub fn clamp(self) -> Self {
        if self.is_supported() {
            self
        } else {
            Self::LATEST
        }
    }

    #[inline]
    pub const fn from_u8(version: u8) -> Self {
        Self(version)
    }

    #[inline]
    pub const fn to_u8(self) -> u8 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::LATEST
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl FromStr for Version {
    type Err = ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u8::from_str(s).map(Self)
    }
}

impl<'a> TryFrom<&'a str> for Version {
    type Error = ParseIntError;
    fn try_from(value: &'a str) -> Result<Self, Self::Error> {
        value.parse()
    }
}
