/// fixed size byte array value with hexadecimal string codec
///
/// the hexadecimal string is the canonical human readable form, it is
/// also the form used in the configuration files (see the serde
/// attributes).
macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $size:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name([u8; $size]);

        impl $name {
            pub const SIZE: usize = $size;

            pub const fn from_bytes(bytes: [u8; $size]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $size] {
                &self.0
            }

            /// read exactly [`Self::SIZE`] bytes from the reader
            pub fn read_from<R: ::std::io::Read>(mut reader: R) -> ::std::io::Result<Self> {
                let mut bytes = [0; $size];
                reader.read_exact(&mut bytes)?;
                Ok(Self(bytes))
            }

            pub fn write_to<W: ::std::io::Write>(&self, mut writer: W) -> ::std::io::Result<u64> {
                writer.write_all(&self.0)?;
                Ok($size as u64)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self([0; $size])
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                self.0.as_ref()
            }
        }

        impl From<[u8; $size]> for $name {
            fn from(bytes: [u8; $size]) -> Self {
                Self(bytes)
            }
        }

        impl From<$name> for [u8; $size] {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl<'a> ::std::convert::TryFrom<&'a [u8]> for $name {
            type Error = ::std::array::TryFromSliceError;
            fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
                ::std::convert::TryInto::try_into(value).map(Self)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.to_string()
            }
        }

        impl<'a> ::std::convert::TryFrom<&'a str> for $name {
            type Error = ::hex::FromHexError;
            fn try_from(value: &'a str) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl ::std::convert::TryFrom<String> for $name {
            type Error = ::hex::FromHexError;
            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(&::hex::encode(&self.0))
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_tuple(stringify!($name))
                    .field(&::hex::encode(&self.0))
                    .finish()
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::hex::FromHexError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut bytes = [0; $size];
                ::hex::decode_to_slice(s, &mut bytes)?;
                Ok(Self(bytes))
            }
        }
    };
}
