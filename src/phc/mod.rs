//! PHC string parsing and serialization.
//!
//! A PHC string has the following grammar:
//!
//! ```text
//! $<algorithm_id>[$v=<version>][$<params>][$<salt>[$<derived_key>]]
//! ```
//!
//! * `algorithm_id` names the hash algorithm, and is between 1 and [`MAX_ALGORITHM_ID_LEN`] bytes.
//! * `version` is an unsigned decimal integer, without leading zeros.
//! * `params` is a comma-separated list of `key=value` pairs, interpreted by a [`ParamSet`].
//! * `salt` and `derived_key` are raw bytes, encoded using Base64 with padding removed (see
//!   [`encode::base64`](crate::encode::base64)).
//!
//! Every field except the algorithm identifier is optional, but a derived key can only be present
//! if a salt is present.
//!
//! The [`Record`] type represents a parsed PHC string. Records are generic over the type of their
//! parameters: Parameter types for scrypt and Argon2 are provided in
//! [`hash::pbkdf`](crate::hash::pbkdf), and [`RawParams`] accepts any well-formed parameters
//! segment.
//!
//! # Examples
//! Parsing a stored scrypt hash:
//!
//! ```rust
//! use phc_encoding::hash::pbkdf::scrypt::{ScryptParams, ALG_ID};
//! use phc_encoding::phc::Record;
//!
//! let stored = "$scrypt$v=1$ln=15,r=8,p=1$c2FsdHNhbHQ$dGVzdHBhc3M";
//! let record = Record::<ScryptParams>::parse(stored).unwrap();
//! record.verify_algorithm(ALG_ID).unwrap();
//!
//! let params = record.params().unwrap();
//! assert_eq!((params.ln, params.r, params.p), (15, 8, 1));
//! assert_eq!(record.salt().unwrap(), b"saltsalt");
//! assert_eq!(record.derived_key().unwrap(), b"testpass");
//!
//! assert_eq!(record.serialize().unwrap(), stored);
//! ```
//!
//! Building a record for a freshly computed hash:
//!
//! ```rust
//! use phc_encoding::phc::{generate_salt, RawParams, Record, SALT_LENGTH_RECOMMENDED};
//!
//! let salt = generate_salt(SALT_LENGTH_RECOMMENDED).unwrap();
//! let key = [0x42; 32]; // the output of the hash function would go here
//!
//! let params = RawParams::new().with("m", "65536").unwrap().with("t", "2").unwrap();
//! let record = Record::new("argon2id")
//!     .unwrap()
//!     .with_version(19)
//!     .with_params(params)
//!     .with_hash(salt, &key)
//!     .unwrap();
//!
//! let encoded = record.serialize().unwrap();
//! assert!(encoded.starts_with("$argon2id$v=19$m=65536,t=2$"));
//! assert_eq!(Record::<RawParams>::parse(&encoded).unwrap(), record);
//! ```

use crate::encode::base64;
use crate::mem::Buffer;
use crate::PhcError;
use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

mod params;

pub use params::{Param, ParamSet, ParamsIter, RawParams, KV_DELIMITER, PAIR_DELIMITER};

/// Separates the fields of a PHC string.
pub const FIELDS_DELIMITER: char = '$';

/// The maximum length of an algorithm identifier, in bytes.
pub const MAX_ALGORITHM_ID_LEN: usize = 32;

/// The maximum length of a parameter key, in bytes.
pub const MAX_PARAM_KEY_LEN: usize = 32;

/// The prefix marking the version segment.
const VERSION_PREFIX: &str = "v=";

/// A reasonable salt length for new password hashes, in bytes.
pub const SALT_LENGTH_RECOMMENDED: usize = 16;

/// Ways in which a PHC string can fail to follow the grammar.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum ParseError {
    /// The string did not start with the `$` delimiter.
    #[error("PHC string must begin with '$'")]
    MissingDelimiter,

    /// The algorithm identifier segment was absent or empty.
    #[error("missing algorithm identifier")]
    MissingAlgorithm,

    /// The algorithm identifier was longer than [`MAX_ALGORITHM_ID_LEN`] bytes.
    #[error("algorithm identifier too long")]
    AlgorithmTooLong,

    /// A salt or derived key segment was empty.
    #[error("empty byte segment")]
    EmptySegment,

    /// Unexpected content followed the derived key.
    #[error("trailing data after the derived key")]
    TrailingSegment,

    /// A version or parameter value contained something other than the digits `0-9`, or had a
    /// leading zero.
    #[error("value is not a decimal integer")]
    NotDecimal,

    /// A parameter did not contain exactly one `=`.
    #[error("parameter must be a single key=value pair")]
    InvalidParamPair,

    /// A parameter key was empty or longer than [`MAX_PARAM_KEY_LEN`] bytes.
    #[error("invalid parameter key")]
    InvalidParamKey,

    /// A parameter value was empty.
    #[error("invalid parameter value")]
    InvalidParamValue,

    /// The parameters segment contained more pairs than allowed.
    #[error("too many parameters")]
    TooManyParams,

    /// A required parameter was absent.
    #[error("missing parameter")]
    MissingParam,

    /// A parameter key was not the one expected at its position.
    #[error("unexpected parameter")]
    UnexpectedParam,
}

/// A parsed PHC string.
///
/// The algorithm identifier is borrowed from the string the record was parsed from (or the string
/// passed to [`Record::new`]), so a record cannot outlive it. Salts and derived keys are owned, and
/// stored in hardened [`Buffer`]s.
///
/// A record can only be built in a grammatically valid state: The builder methods never allow a
/// derived key without a salt, or an empty salt or key. Whenever [`serialize`](Self::serialize)
/// succeeds, [`parse`](Self::parse) reads its output back into an equal record.
#[derive(Debug, Eq, PartialEq)]
pub struct Record<'a, P> {
    algorithm_id: &'a str,
    version: Option<u32>,
    params: Option<P>,
    salt: Option<Buffer>,
    derived_key: Option<Buffer>,
}

impl<'a, P: ParamSet> Record<'a, P> {
    /// Create a record with only an algorithm identifier set.
    ///
    /// Returns [`ParseError::MissingAlgorithm`] if `algorithm_id` is empty, or
    /// [`ParseError::AlgorithmTooLong`] if it is longer than [`MAX_ALGORITHM_ID_LEN`] bytes. The
    /// identifier must not contain `$`.
    pub fn new(algorithm_id: &'a str) -> Result<Self, PhcError> {
        if algorithm_id.is_empty() || algorithm_id.contains(FIELDS_DELIMITER) {
            return Err(ParseError::MissingAlgorithm.into());
        } else if algorithm_id.len() > MAX_ALGORITHM_ID_LEN {
            return Err(ParseError::AlgorithmTooLong.into());
        }

        Ok(Self {
            algorithm_id,
            version: None,
            params: None,
            salt: None,
            derived_key: None,
        })
    }

    /// Set the version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// Set the parameters.
    pub fn with_params(mut self, params: P) -> Self {
        self.params = Some(params);
        self
    }

    /// Set the salt, clearing any derived key.
    ///
    /// Returns [`ParseError::EmptySegment`] if `salt` is empty.
    pub fn with_salt(mut self, salt: impl AsRef<[u8]>) -> Result<Self, PhcError> {
        self.salt = Some(non_empty_buffer(salt.as_ref())?);
        self.derived_key = None;
        Ok(self)
    }

    /// Set both the salt and the derived key.
    ///
    /// Returns [`ParseError::EmptySegment`] if either is empty.
    pub fn with_hash(
        mut self,
        salt: impl AsRef<[u8]>,
        derived_key: impl AsRef<[u8]>,
    ) -> Result<Self, PhcError> {
        self.salt = Some(non_empty_buffer(salt.as_ref())?);
        self.derived_key = Some(non_empty_buffer(derived_key.as_ref())?);
        Ok(self)
    }

    /// Parse a PHC string.
    ///
    /// The parameters segment, if present, is parsed using `P`'s [`ParamSet::from_segment`]. A
    /// segment is treated as the parameters segment if it contains `=`; a segment starting with
    /// `v=` and containing no `,` is the version instead.
    ///
    /// Fails with a [`ParseError`] if `s` does not follow the grammar, an
    /// [`IntegerParseError`](PhcError::IntegerParseError) if the version does not fit in a `u32`,
    /// or a [`DecodeError`](PhcError::DecodeError) if the salt or derived key is not valid Base64.
    /// Errors from `P` are passed on unchanged. Any buffers decoded before a failure are wiped and
    /// freed before returning.
    pub fn parse(s: &'a str) -> Result<Self, PhcError> {
        let mut segments = match s.strip_prefix(FIELDS_DELIMITER) {
            Some(rest) => rest.split(FIELDS_DELIMITER),
            None => return Err(ParseError::MissingDelimiter.into()),
        };

        let algorithm_id = segments.next().ok_or(ParseError::MissingAlgorithm)?;
        let mut record = Self::new(algorithm_id)?;

        let mut segment = match segments.next() {
            Some(segment) => segment,
            None => return Ok(record),
        };

        if is_version_segment(segment) {
            record.version = Some(params::parse_decimal(&segment[VERSION_PREFIX.len()..])?);
            segment = match segments.next() {
                Some(segment) => segment,
                None => return Ok(record),
            };
        }

        if segment.contains(KV_DELIMITER) {
            record.params = Some(P::from_segment(segment)?);
            segment = match segments.next() {
                Some(segment) => segment,
                None => return Ok(record),
            };
        }

        record.salt = Some(base64::decode_unpadded(segment)?);

        if let Some(segment) = segments.next() {
            record.derived_key = Some(base64::decode_unpadded(segment)?);
        }

        if segments.next().is_some() {
            return Err(ParseError::TrailingSegment.into());
        }

        Ok(record)
    }

    /// Serialize this record to a PHC string.
    ///
    /// Fields are written in grammar order, whatever order they were set in. The output parses
    /// back to a record equal to this one.
    ///
    /// Fails with [`ParseError::MissingParam`] if the parameters serialize to a segment without any
    /// `key=value` pair, or [`ParseError::UnexpectedParam`] if they serialize to a lone `v=` pair
    /// while the record has no version, as either would be misread when parsing.
    pub fn serialize(&self) -> Result<String, PhcError> {
        let mut out = String::new();

        out.push(FIELDS_DELIMITER);
        out.push_str(self.algorithm_id);

        if let Some(version) = self.version {
            out.push(FIELDS_DELIMITER);
            out.push_str(VERSION_PREFIX);
            out.push_str(&version.to_string());
        }

        if let Some(segment) = self.params_segment()? {
            out.push(FIELDS_DELIMITER);
            out.push_str(&segment);
        }

        for bytes in [&self.salt, &self.derived_key].into_iter().flatten() {
            out.push(FIELDS_DELIMITER);
            out.push_str(&base64::encode_unpadded(bytes)?);
        }

        Ok(out)
    }

    /// Returns the length of the string [`serialize`](Self::serialize) would produce, in bytes.
    ///
    /// Only the parameters segment is serialized to compute this, the Base64 segments are not.
    pub fn encoded_len(&self) -> Result<usize, PhcError> {
        let mut len = 1 + self.algorithm_id.len();

        if let Some(version) = self.version {
            len += 1 + VERSION_PREFIX.len() + decimal_len(version);
        }

        if let Some(segment) = self.params_segment()? {
            len += 1 + segment.len();
        }

        for bytes in [&self.salt, &self.derived_key].into_iter().flatten() {
            len += 1 + base64::encoded_len_unpadded(bytes.len());
        }

        Ok(len)
    }

    /// Serialize the parameters, checking the parser would read the segment back as parameters.
    ///
    /// A segment without `=` would be read as a salt, and a lone `v=` pair without a version
    /// segment before it would be read as the version.
    fn params_segment(&self) -> Result<Option<String>, PhcError> {
        let segment = match &self.params {
            Some(params) => params.to_segment()?,
            None => return Ok(None),
        };

        if !segment.contains(KV_DELIMITER) {
            return Err(ParseError::MissingParam.into());
        } else if self.version.is_none() && is_version_segment(&segment) {
            return Err(ParseError::UnexpectedParam.into());
        }

        Ok(Some(segment))
    }

    /// Check that this record's algorithm identifier is `expected`.
    ///
    /// Returns [`PhcError::InvalidAlgorithm`] if it is not. Parsing a record does not check the
    /// identifier, so this should be called before trusting the record's parameters.
    pub fn verify_algorithm(&self, expected: &str) -> Result<(), PhcError> {
        if self.algorithm_id == expected {
            Ok(())
        } else {
            Err(PhcError::InvalidAlgorithm)
        }
    }

    /// Release the parameters, salt and derived key held by this record.
    ///
    /// Buffers are wiped before their memory is freed. Calling this more than once has no further
    /// effect. Dropping a record releases the same resources.
    pub fn release(&mut self) {
        self.params = None;
        self.salt = None;
        self.derived_key = None;
    }
}

impl<'a, P> Record<'a, P> {
    /// Returns the algorithm identifier.
    pub fn algorithm_id(&self) -> &'a str {
        self.algorithm_id
    }

    /// Returns the version, if present.
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    /// Returns the parameters, if present.
    pub fn params(&self) -> Option<&P> {
        self.params.as_ref()
    }

    /// Returns the salt, if present.
    pub fn salt(&self) -> Option<&[u8]> {
        self.salt.as_deref()
    }

    /// Returns the derived key (the hash output), if present.
    pub fn derived_key(&self) -> Option<&[u8]> {
        self.derived_key.as_deref()
    }
}

impl<'a, P: ParamSet> TryFrom<&'a str> for Record<'a, P> {
    type Error = PhcError;

    fn try_from(s: &'a str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl<P: ParamSet> std::fmt::Display for Record<'_, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.serialize().map_err(|_| std::fmt::Error)?)
    }
}

#[cfg(feature = "use-serde")]
#[cfg_attr(doc_cfg, doc(cfg(feature = "use-serde")))]
impl<P: ParamSet> serde::Serialize for Record<'_, P> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error;

        let encoded = Record::serialize(self).map_err(S::Error::custom)?;
        serializer.serialize_str(&encoded)
    }
}

#[cfg(feature = "use-serde")]
#[cfg_attr(doc_cfg, doc(cfg(feature = "use-serde")))]
impl<'de: 'a, 'a, P: ParamSet> serde::Deserialize<'de> for Record<'a, P> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let s = <&'de str as serde::Deserialize<'de>>::deserialize(deserializer)?;
        Record::parse(s).map_err(D::Error::custom)
    }
}

/// Generate a random salt of `len` bytes using Sodium's CSPRNG.
///
/// Returns [`ParseError::EmptySegment`] if `len` is zero, as an empty salt cannot be encoded.
pub fn generate_salt(len: usize) -> Result<Buffer, PhcError> {
    if len == 0 {
        return Err(ParseError::EmptySegment.into());
    }

    Buffer::random(len)
}

/// Generate a random salt of `len` bytes using `rng`.
///
/// Returns [`ParseError::EmptySegment`] if `len` is zero, as an empty salt cannot be encoded.
pub fn generate_salt_with<R>(rng: &mut R, len: usize) -> Result<Buffer, PhcError>
where
    R: RngCore + CryptoRng,
{
    if len == 0 {
        return Err(ParseError::EmptySegment.into());
    }

    let mut salt = Buffer::new_empty(len)?;
    rng.fill_bytes(&mut salt);
    Ok(salt)
}

fn is_version_segment(segment: &str) -> bool {
    segment.starts_with(VERSION_PREFIX) && !segment.contains(PAIR_DELIMITER)
}

fn non_empty_buffer(bytes: &[u8]) -> Result<Buffer, PhcError> {
    if bytes.is_empty() {
        return Err(ParseError::EmptySegment.into());
    }

    Buffer::from_slice(bytes)
}

fn decimal_len(mut n: u32) -> usize {
    let mut len = 1;
    while n >= 10 {
        n /= 10;
        len += 1;
    }
    len
}
