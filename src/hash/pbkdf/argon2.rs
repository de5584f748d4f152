//! Parameters for the [Argon2](https://en.wikipedia.org/wiki/Argon2) password hash.
//!
//! Argon2's parameters segment has the form `m=<memory KiB>,t=<iterations>,p=<lanes>`, optionally
//! followed by `keyid=<b64>` and `data=<b64>`, in that order. The optional values are raw bytes,
//! encoded the same way as the salt. For example:
//!
//! ```text
//! $argon2id$v=19$m=65536,t=2,p=1$oH2BFYR6JuV1k2IXDvh67w$Xy0iVWdHMbfq2eLN/dRMRcjNcMnkjckbJNv+xSOZ0qc
//! ```
//!
//! The same parameters are used by all three Argon2 variants; only the algorithm identifier
//! differs.

use super::next_decimal;
use crate::encode::base64;
use crate::mem::Buffer;
use crate::phc::{ParamSet, ParamsIter, ParseError, Record, KV_DELIMITER, PAIR_DELIMITER};
use crate::PhcError;

/// The algorithm identifier for Argon2i.
pub const ARGON2I_ID: &str = "argon2i";

/// The algorithm identifier for Argon2d.
pub const ARGON2D_ID: &str = "argon2d";

/// The algorithm identifier for Argon2id.
pub const ARGON2ID_ID: &str = "argon2id";

/// The current version of the Argon2 algorithm (`0x13`).
pub const VERSION: u32 = 19;

/// The maximum number of pairs in an Argon2 parameters segment.
const PARAMS_COUNT_MAX: usize = 5;

const KEYID_KEY: &str = "keyid";
const DATA_KEY: &str = "data";

/// A PHC record for an Argon2 hash.
pub type Argon2Record<'a> = Record<'a, Argon2Params>;

/// Argon2 cost parameters, plus the optional key identifier and associated data.
#[derive(Debug, Eq, PartialEq)]
pub struct Argon2Params {
    /// Memory size, in KiB.
    pub m: u32,

    /// Number of iterations.
    pub t: u32,

    /// Degree of parallelism (number of lanes).
    pub p: u32,

    /// Identifier of the secret key used, if any. Must not be empty.
    pub keyid: Option<Buffer>,

    /// Associated data, if any. Must not be empty.
    pub data: Option<Buffer>,
}

impl Argon2Params {
    /// Create a new set of parameters without a key identifier or associated data.
    pub const fn new(m: u32, t: u32, p: u32) -> Self {
        Self {
            m,
            t,
            p,
            keyid: None,
            data: None,
        }
    }

    /// Set the key identifier.
    ///
    /// Returns [`ParseError::EmptySegment`] if `keyid` is empty.
    pub fn with_keyid(mut self, keyid: &[u8]) -> Result<Self, PhcError> {
        self.keyid = Some(non_empty(keyid)?);
        Ok(self)
    }

    /// Set the associated data.
    ///
    /// Returns [`ParseError::EmptySegment`] if `data` is empty.
    pub fn with_data(mut self, data: &[u8]) -> Result<Self, PhcError> {
        self.data = Some(non_empty(data)?);
        Ok(self)
    }
}

fn non_empty(bytes: &[u8]) -> Result<Buffer, PhcError> {
    if bytes.is_empty() {
        return Err(ParseError::EmptySegment.into());
    }

    Buffer::from_slice(bytes)
}

impl ParamSet for Argon2Params {
    fn from_segment(segment: &str) -> Result<Self, PhcError> {
        let mut iter = ParamsIter::new(segment, PARAMS_COUNT_MAX);

        let mut params = Self::new(
            next_decimal(&mut iter, "m")?,
            next_decimal(&mut iter, "t")?,
            next_decimal(&mut iter, "p")?,
        );

        for param in iter {
            let param = param?;

            match param.key {
                KEYID_KEY if params.keyid.is_none() && params.data.is_none() => {
                    params.keyid = Some(base64::decode_unpadded(param.value)?);
                }
                DATA_KEY if params.data.is_none() => {
                    params.data = Some(base64::decode_unpadded(param.value)?);
                }
                _ => return Err(ParseError::UnexpectedParam.into()),
            }
        }

        Ok(params)
    }

    fn to_segment(&self) -> Result<String, PhcError> {
        let mut segment = format!("m={},t={},p={}", self.m, self.t, self.p);

        for (key, value) in [(KEYID_KEY, &self.keyid), (DATA_KEY, &self.data)] {
            if let Some(value) = value {
                if value.is_empty() {
                    return Err(ParseError::EmptySegment.into());
                }

                segment.push(PAIR_DELIMITER);
                segment.push_str(key);
                segment.push(KV_DELIMITER);
                segment.push_str(&base64::encode_unpadded(value)?);
            }
        }

        Ok(segment)
    }
}
