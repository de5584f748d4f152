//! Parameters for the [scrypt](https://www.tarsnap.com/scrypt.html) password hash.
//!
//! scrypt's parameters segment has the form `ln=<log2 N>,r=<block size>,p=<parallelism>`, with all
//! three parameters required, in that order. For example:
//!
//! ```text
//! $scrypt$ln=15,r=8,p=1$c2FsdHNhbHQ$dGVzdHBhc3M
//! ```

use super::next_decimal;
use crate::phc::{ParamSet, ParamsIter, Record};
use crate::PhcError;

/// The algorithm identifier for scrypt.
pub const ALG_ID: &str = "scrypt";

/// The number of pairs in a scrypt parameters segment.
const PARAMS_COUNT: usize = 3;

/// A PHC record for an scrypt hash.
pub type ScryptRecord<'a> = Record<'a, ScryptParams>;

/// scrypt cost parameters.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ScryptParams {
    /// The base-2 logarithm of the CPU/memory cost parameter `N`.
    pub ln: u8,

    /// The block size parameter.
    pub r: u32,

    /// The parallelisation parameter.
    pub p: u32,
}

impl ScryptParams {
    /// Create a new set of parameters.
    pub const fn new(ln: u8, r: u32, p: u32) -> Self {
        Self { ln, r, p }
    }

    /// Returns the CPU/memory cost parameter `N = 2^ln`, or `None` if it does not fit in a `u64`.
    pub fn n(&self) -> Option<u64> {
        1u64.checked_shl(self.ln as u32)
    }
}

impl ParamSet for ScryptParams {
    fn from_segment(segment: &str) -> Result<Self, PhcError> {
        let mut iter = ParamsIter::new(segment, PARAMS_COUNT);

        let ln = next_decimal(&mut iter, "ln")?;
        let r = next_decimal(&mut iter, "r")?;
        let p = next_decimal(&mut iter, "p")?;

        // Surfaces `TooManyParams` if the segment carries anything else.
        iter.next().transpose()?;

        Ok(Self { ln, r, p })
    }

    fn to_segment(&self) -> Result<String, PhcError> {
        Ok(format!("ln={},r={},p={}", self.ln, self.r, self.p))
    }
}

#[cfg(test)]
mod tests {
    use super::{ScryptParams, ScryptRecord, ALG_ID};
    use crate::phc::{ParamSet, ParseError};
    use crate::PhcError;

    #[test]
    fn parse_scrypt_string() -> Result<(), PhcError> {
        let s = "$scrypt$v=1$ln=15,r=8,p=1$c2FsdHNhbHQ$dGVzdHBhc3M";
        let record = ScryptRecord::parse(s)?;

        record.verify_algorithm(ALG_ID)?;
        assert_eq!(record.params(), Some(&ScryptParams::new(15, 8, 1)));
        assert_eq!(record.params().and_then(ScryptParams::n), Some(32768));
        assert_eq!(record.serialize()?, s);

        Ok(())
    }

    #[test]
    fn segment_round_trip() -> Result<(), PhcError> {
        for segment in ["ln=15,r=8,p=1", "ln=0,r=1,p=1", "ln=255,r=4294967295,p=16"] {
            assert_eq!(ScryptParams::from_segment(segment)?.to_segment()?, segment);
        }

        Ok(())
    }

    #[test]
    fn invalid_segments() {
        let cases = [
            ("r=8,ln=15,p=1", ParseError::UnexpectedParam),
            ("ln=15,r=8", ParseError::MissingParam),
            ("ln=15,r=8,p=1,x=2", ParseError::TooManyParams),
            ("ln=15,r=eight,p=1", ParseError::NotDecimal),
            ("ln=15,r=8,p=", ParseError::InvalidParamValue),
            ("n=32768,r=8,p=1", ParseError::UnexpectedParam),
            ("ln=015,r=8,p=1", ParseError::NotDecimal),
            ("ln=15,r=08,p=1", ParseError::NotDecimal),
        ];

        for (segment, expected) in cases {
            assert_eq!(
                ScryptParams::from_segment(segment).unwrap_err(),
                PhcError::ParseError(expected),
                "segment {:?}",
                segment
            );
        }

        assert!(matches!(
            ScryptParams::from_segment("ln=256,r=8,p=1"),
            Err(PhcError::IntegerParseError(_))
        ));
    }

    #[test]
    fn leading_zeros_rejected() {
        assert_eq!(
            ScryptRecord::parse("$scrypt$ln=015,r=08,p=1$c2FsdA").unwrap_err(),
            PhcError::ParseError(ParseError::NotDecimal)
        );
    }

    #[test]
    fn n_overflow() {
        assert_eq!(ScryptParams::new(63, 8, 1).n(), Some(1 << 63));
        assert_eq!(ScryptParams::new(64, 8, 1).n(), None);
    }
}
