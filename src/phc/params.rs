//! The parameters segment of a PHC string.
//!
//! Parameters are written as `key=value` pairs separated by commas, e.g: `m=65536,t=2,p=1`. Which
//! keys are allowed, in which order, and what their values mean differs between algorithms, so
//! the segment is handed to a [`ParamSet`] implementation supplied by the record's user. Most
//! implementations will want to use [`ParamsIter`] to split the segment into its pairs.

use super::{ParseError, MAX_PARAM_KEY_LEN};
use crate::PhcError;
use std::num::ParseIntError;
use std::str::FromStr;

/// Separates `key=value` pairs within a parameters segment.
pub const PAIR_DELIMITER: char = ',';

/// Separates the key from the value within a pair.
pub const KV_DELIMITER: char = '=';

/// Algorithm-specific parameters, as stored in the parameters segment of a PHC string.
///
/// Implementations must be able to parse their own output: For any segment `s` accepted by
/// [`from_segment`](Self::from_segment), `to_segment` must reproduce `s` exactly. The serialized
/// form must contain at least one `=`, otherwise the record parser will read it back as a salt.
pub trait ParamSet: Sized {
    /// Parse a parameters segment (without the surrounding `$` delimiters).
    fn from_segment(segment: &str) -> Result<Self, PhcError>;

    /// Serialize these parameters to the textual form accepted by
    /// [`from_segment`](Self::from_segment).
    fn to_segment(&self) -> Result<String, PhcError>;
}

/// A single `key=value` pair from a parameters segment, borrowed from the segment.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Param<'a> {
    /// The key, between 1 and [`MAX_PARAM_KEY_LEN`] bytes.
    pub key: &'a str,

    /// The value, at least 1 byte.
    pub value: &'a str,
}

impl<'a> Param<'a> {
    /// Parse the value of this pair as an unsigned decimal integer.
    ///
    /// Only the digits `0-9` are accepted, with no leading zeros: An empty value, a leading `0`
    /// (other than in `0` itself), a sign, whitespace, or any other character results in a
    /// [`ParseError::NotDecimal`] error. A value which is out of range for `T` results in a
    /// [`PhcError::IntegerParseError`].
    pub fn decimal<T>(&self) -> Result<T, PhcError>
    where
        T: FromStr<Err = ParseIntError>,
    {
        parse_decimal(self.value)
    }

    /// Check that the key of this pair is `key`, returning [`ParseError::UnexpectedParam`]
    /// otherwise.
    pub fn expect_key(&self, key: &str) -> Result<&Self, PhcError> {
        if self.key == key {
            Ok(self)
        } else {
            Err(ParseError::UnexpectedParam.into())
        }
    }
}

/// Parse `value` as an unsigned decimal integer, see [`Param::decimal`].
pub(crate) fn parse_decimal<T>(value: &str) -> Result<T, PhcError>
where
    T: FromStr<Err = ParseIntError>,
{
    if value.is_empty()
        || (value.len() > 1 && value.starts_with('0'))
        || !value.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(ParseError::NotDecimal.into());
    }

    Ok(value.parse()?)
}

/// A lazy iterator over the `key=value` pairs of a parameters segment.
///
/// Pairs are yielded in the order they appear in the segment. Each item is a `Result`: A malformed
/// pair yields an error, after which the iterator is exhausted. At most `limit` pairs are
/// accepted; attempting to produce one more yields [`ParseError::TooManyParams`]. The check is
/// made when the excess pair is reached, not up front.
///
/// The iterator cannot be rewound, but it is cheap to [`Clone`], or to construct again with
/// [`ParamsIter::new`].
#[derive(Clone, Debug)]
pub struct ParamsIter<'a> {
    pairs: std::str::Split<'a, char>,
    limit: usize,
    count: usize,
    done: bool,
}

impl<'a> ParamsIter<'a> {
    /// Iterate over the pairs of `segment`, accepting at most `limit` of them.
    pub fn new(segment: &'a str, limit: usize) -> Self {
        Self {
            pairs: segment.split(PAIR_DELIMITER),
            limit,
            count: 0,
            done: false,
        }
    }

    /// Returns the number of pairs produced so far.
    pub fn count_so_far(&self) -> usize {
        self.count
    }

    /// Returns the next pair, or [`ParseError::MissingParam`] if the segment has no more pairs.
    ///
    /// Useful for parameter types which bind their parameters by position.
    pub fn next_required(&mut self) -> Result<Param<'a>, PhcError> {
        self.next()
            .unwrap_or_else(|| Err(ParseError::MissingParam.into()))
    }

    fn parse_pair(pair: &'a str) -> Result<Param<'a>, PhcError> {
        let mut kv = pair.split(KV_DELIMITER);

        let (key, value) = match (kv.next(), kv.next(), kv.next()) {
            (Some(key), Some(value), None) => (key, value),
            _ => return Err(ParseError::InvalidParamPair.into()),
        };

        if key.is_empty() || key.len() > MAX_PARAM_KEY_LEN {
            return Err(ParseError::InvalidParamKey.into());
        } else if value.is_empty() {
            return Err(ParseError::InvalidParamValue.into());
        }

        Ok(Param { key, value })
    }
}

impl<'a> Iterator for ParamsIter<'a> {
    type Item = Result<Param<'a>, PhcError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let pair = match self.pairs.next() {
            Some(pair) => pair,
            None => {
                self.done = true;
                return None;
            }
        };

        if self.count == self.limit {
            self.done = true;
            return Some(Err(ParseError::TooManyParams.into()));
        }

        let param = Self::parse_pair(pair);
        match param {
            Ok(_) => self.count += 1,
            Err(_) => self.done = true,
        }

        Some(param)
    }
}

impl std::iter::FusedIterator for ParamsIter<'_> {}

/// A generic parameter set: An ordered list of `key=value` pairs, with any keys.
///
/// This type accepts any well-formed parameters segment of at most [`RawParams::MAX_PAIRS`] pairs,
/// without interpreting it. Order is preserved, so a parsed segment always serializes back to the
/// same text.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawParams {
    pairs: Vec<(String, String)>,
}

impl RawParams {
    /// The maximum number of pairs accepted when parsing.
    pub const MAX_PAIRS: usize = 32;

    /// Create an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair, returning the updated list.
    ///
    /// The pair is validated the same way a parsed pair would be, so that the list always
    /// serializes to a segment which parses back to an equal list.
    pub fn with(mut self, key: &str, value: &str) -> Result<Self, PhcError> {
        if self.pairs.len() == Self::MAX_PAIRS {
            return Err(ParseError::TooManyParams.into());
        } else if key.is_empty()
            || key.len() > MAX_PARAM_KEY_LEN
            || key.contains([PAIR_DELIMITER, KV_DELIMITER, '$'])
        {
            return Err(ParseError::InvalidParamKey.into());
        } else if value.is_empty() || value.contains([PAIR_DELIMITER, KV_DELIMITER, '$']) {
            return Err(ParseError::InvalidParamValue.into());
        }

        self.pairs.push((key.to_owned(), value.to_owned()));
        Ok(self)
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value for `key` parsed as an unsigned decimal integer, if present.
    pub fn get_decimal<T>(&self, key: &str) -> Option<Result<T, PhcError>>
    where
        T: FromStr<Err = ParseIntError>,
    {
        self.get(key).map(parse_decimal::<T>)
    }

    /// Iterate over the pairs, in order.
    pub fn iter(&self) -> impl Iterator<Item = Param<'_>> {
        self.pairs.iter().map(|(key, value)| Param {
            key: key.as_str(),
            value: value.as_str(),
        })
    }

    /// Returns the number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl ParamSet for RawParams {
    fn from_segment(segment: &str) -> Result<Self, PhcError> {
        let pairs = ParamsIter::new(segment, Self::MAX_PAIRS)
            .map(|param| param.map(|p| (p.key.to_owned(), p.value.to_owned())))
            .collect::<Result<_, _>>()?;

        Ok(Self { pairs })
    }

    fn to_segment(&self) -> Result<String, PhcError> {
        let mut segment = String::new();

        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                segment.push(PAIR_DELIMITER);
            }
            segment.push_str(key);
            segment.push(KV_DELIMITER);
            segment.push_str(value);
        }

        Ok(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::{Param, ParamSet, ParamsIter, RawParams};
    use crate::phc::ParseError;
    use crate::PhcError;

    fn parse_error(result: Option<Result<Param<'_>, PhcError>>) -> ParseError {
        match result {
            Some(Err(PhcError::ParseError(e))) => e,
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn pairs_in_order() -> Result<(), PhcError> {
        let params: Vec<_> = ParamsIter::new("ln=15,r=8,p=1", 3).collect::<Result<_, _>>()?;

        assert_eq!(
            params,
            [
                Param { key: "ln", value: "15" },
                Param { key: "r", value: "8" },
                Param { key: "p", value: "1" },
            ]
        );
        assert_eq!(params[0].decimal::<u8>()?, 15);
        assert_eq!(params[1].decimal::<u32>()?, 8);

        Ok(())
    }

    #[test]
    fn limit_enforced_lazily() -> Result<(), PhcError> {
        let mut iter = ParamsIter::new("a=1,b=2,c=3,d=4", 3);

        assert_eq!(iter.next().transpose()?, Some(Param { key: "a", value: "1" }));
        assert_eq!(iter.next().transpose()?, Some(Param { key: "b", value: "2" }));
        assert_eq!(iter.next().transpose()?, Some(Param { key: "c", value: "3" }));
        assert_eq!(iter.count_so_far(), 3);
        assert_eq!(parse_error(iter.next()), ParseError::TooManyParams);
        assert!(iter.next().is_none());

        // Exactly `limit` pairs is fine.
        assert_eq!(ParamsIter::new("a=1,b=2,c=3", 3).count(), 3);
        assert!(ParamsIter::new("a=1,b=2,c=3", 3).all(|p| p.is_ok()));

        Ok(())
    }

    #[test]
    fn zero_limit() {
        let mut iter = ParamsIter::new("a=1", 0);
        assert_eq!(parse_error(iter.next()), ParseError::TooManyParams);
    }

    #[test]
    fn malformed_pairs() {
        let cases = [
            ("a", ParseError::InvalidParamPair),
            ("a=1=2", ParseError::InvalidParamPair),
            ("=1", ParseError::InvalidParamKey),
            ("a=", ParseError::InvalidParamValue),
            ("", ParseError::InvalidParamPair),
            ("a=1,,b=2", ParseError::InvalidParamPair),
            (
                "abcdefghijklmnopqrstuvwxyz0123456=1",
                ParseError::InvalidParamKey,
            ),
        ];

        for (segment, expected) in cases {
            let mut iter = ParamsIter::new(segment, 8);
            let first_error = iter.find(|p| p.is_err());
            assert_eq!(parse_error(first_error), expected, "segment {:?}", segment);
            assert!(iter.next().is_none());
        }
    }

    #[test]
    fn max_length_key() -> Result<(), PhcError> {
        let key = "k".repeat(32);
        let segment = format!("{}=v", key);
        let param = ParamsIter::new(&segment, 1).next_required()?;
        assert_eq!(param.key, key);

        Ok(())
    }

    #[test]
    fn error_stops_iteration() {
        let mut iter = ParamsIter::new("a=1,b,c=3", 8);
        assert!(iter.next().unwrap().is_ok());
        assert_eq!(parse_error(iter.next()), ParseError::InvalidParamPair);
        assert!(iter.next().is_none());
    }

    #[test]
    fn restart_from_scratch() -> Result<(), PhcError> {
        let iter = ParamsIter::new("m=1,t=2", 2);
        let first: Vec<_> = iter.clone().collect::<Result<_, _>>()?;
        let second: Vec<_> = iter.collect::<Result<_, _>>()?;
        assert_eq!(first, second);

        Ok(())
    }

    #[test]
    fn next_required() -> Result<(), PhcError> {
        let mut iter = ParamsIter::new("m=1", 2);
        iter.next_required()?.expect_key("m")?;
        assert_eq!(
            iter.next_required().unwrap_err(),
            PhcError::ParseError(ParseError::MissingParam)
        );

        Ok(())
    }

    #[test]
    fn decimal_values() {
        let param = |value| Param { key: "k", value };

        assert_eq!(param("0").decimal::<u32>(), Ok(0));
        assert_eq!(param("4294967295").decimal::<u32>(), Ok(u32::MAX));
        assert!(matches!(
            param("4294967296").decimal::<u32>(),
            Err(PhcError::IntegerParseError(_))
        ));
        assert!(matches!(
            param("256").decimal::<u8>(),
            Err(PhcError::IntegerParseError(_))
        ));

        for invalid in ["+1", "-1", "1 ", "0x10", "1_000", "1,000", "ten", "01", "00", "007"] {
            assert_eq!(
                param(invalid).decimal::<u64>(),
                Err(PhcError::ParseError(ParseError::NotDecimal))
            );
        }
    }

    #[test]
    fn raw_params_round_trip() -> Result<(), PhcError> {
        for segment in ["ln=15,r=8,p=1", "m=65536,t=2,p=1", "x=y", "keyid=Zm9v,data=YmFy"] {
            let params = RawParams::from_segment(segment)?;
            assert_eq!(params.to_segment()?, segment);
        }

        let params = RawParams::from_segment("ln=15,r=8,p=1")?;
        assert_eq!(params.len(), 3);
        assert_eq!(params.get("r"), Some("8"));
        assert_eq!(params.get("n"), None);
        assert_eq!(params.get_decimal::<u8>("ln"), Some(Ok(15)));
        assert_eq!(
            params.iter().map(|p| p.key).collect::<Vec<_>>(),
            ["ln", "r", "p"]
        );

        Ok(())
    }

    #[test]
    fn raw_params_limit() -> Result<(), PhcError> {
        let segment = (0..=RawParams::MAX_PAIRS)
            .map(|i| format!("k{}=1", i))
            .collect::<Vec<_>>()
            .join(",");

        assert_eq!(
            RawParams::from_segment(&segment).unwrap_err(),
            PhcError::ParseError(ParseError::TooManyParams)
        );

        let mut params = RawParams::new();
        for i in 0..RawParams::MAX_PAIRS {
            params = params.with(&format!("k{}", i), "1")?;
        }
        assert_eq!(
            params.with("one", "more").unwrap_err(),
            PhcError::ParseError(ParseError::TooManyParams)
        );

        Ok(())
    }

    #[test]
    fn raw_params_builder_validates() -> Result<(), PhcError> {
        let params = RawParams::new().with("m", "512")?.with("t", "3")?;
        assert_eq!(params.to_segment()?, "m=512,t=3");

        assert!(RawParams::new().with("", "1").is_err());
        assert!(RawParams::new().with("a=b", "1").is_err());
        assert!(RawParams::new().with("a", "").is_err());
        assert!(RawParams::new().with("a", "1,2").is_err());
        assert!(RawParams::new().with("a", "1$2").is_err());

        Ok(())
    }
}
