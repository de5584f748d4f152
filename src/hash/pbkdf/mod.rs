//! Password hashing (Password-based Key Derivation Function) parameters.
//!
//! Password hash algorithms are intentionally configurable: Their cost parameters determine how
//! much memory and computation a single hash requires, which in turn determines how expensive a
//! brute-force attack on a leaked hash is. These parameters must be stored alongside the hash, so
//! the same computation can be repeated when verifying a password. In a PHC string, they occupy the
//! parameters segment.
//!
//! This module provides [`ParamSet`] implementations for the parameters of
//! [scrypt](https://www.tarsnap.com/scrypt.html) ([`scrypt`]) and
//! [Argon2](https://en.wikipedia.org/wiki/Argon2) ([`argon2`]), following the conventions of the
//! reference implementations of these algorithms. They check the shape of the segment (which keys
//! appear, in which order, and that values are well-formed), not whether the costs are sensible.
//!
//! # Changing Parameters
//! When the parameters used for new hashes are increased, existing hashes remain valid but weaker.
//! [`requires_rehash`] compares a stored hash against the current parameters, so that a new hash
//! can be computed the next time the user logs in.
//!
//! ```rust
//! use phc_encoding::hash::pbkdf::argon2::{Argon2Params, ARGON2ID_ID, VERSION};
//! use phc_encoding::hash::pbkdf::{requires_rehash, RehashResult};
//!
//! let stored = "$argon2id$v=19$m=4096,t=3,p=1$c29tZXNhbHQ$iWh06vD8Fy27wf9npn6FXWiCX4K6pW6Ue1Bnzz07Z8A";
//! let current = Argon2Params::new(65536, 2, 1);
//!
//! assert_eq!(
//!     requires_rehash(stored, ARGON2ID_ID, Some(VERSION), &current),
//!     RehashResult::ParametersDiffer,
//! );
//! ```

use crate::phc::{ParamSet, ParamsIter, Record};
use crate::PhcError;
use std::num::ParseIntError;
use std::str::FromStr;

pub mod argon2;
pub mod scrypt;

/// Possible results of [`requires_rehash`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RehashResult {
    /// The parameters of the hash match, a rehash is not required.
    ParametersMatch,

    /// The hash appears to be in the correct format, but the version or parameters differ from
    /// those specified.
    ///
    /// You may wish to compute a new hash the next time the user logs in.
    ParametersDiffer,

    /// The hash is not in the correct format for this algorithm.
    ///
    /// You may wish to compute a new hash the next time the user logs in.
    InvalidHash,
}

/// Determine whether `hash` was computed with `algorithm_id`, `version` and `params`.
///
/// Returns [`RehashResult::InvalidHash`] if `hash` is not a valid PHC string whose parameters
/// segment can be parsed as `P`, or if its algorithm identifier is not `algorithm_id`. Returns
/// [`RehashResult::ParametersDiffer`] if the version or parameters are not the ones given, and
/// [`RehashResult::ParametersMatch`] otherwise.
pub fn requires_rehash<P>(
    hash: &str,
    algorithm_id: &str,
    version: Option<u32>,
    params: &P,
) -> RehashResult
where
    P: ParamSet + PartialEq,
{
    let record = match Record::<P>::parse(hash) {
        Ok(record) => record,
        Err(_) => return RehashResult::InvalidHash,
    };

    if record.verify_algorithm(algorithm_id).is_err() {
        RehashResult::InvalidHash
    } else if record.version() == version && record.params() == Some(params) {
        RehashResult::ParametersMatch
    } else {
        RehashResult::ParametersDiffer
    }
}

/// Take the next pair from `iter`, check its key is `key`, and parse its value as a decimal.
fn next_decimal<T>(iter: &mut ParamsIter<'_>, key: &str) -> Result<T, PhcError>
where
    T: FromStr<Err = ParseIntError>,
{
    iter.next_required()?.expect_key(key)?.decimal()
}

#[cfg(test)]
mod tests {
    use super::argon2::{Argon2Params, ARGON2ID_ID, ARGON2I_ID, VERSION};
    use super::scrypt::{self, ScryptParams};
    use super::{requires_rehash, RehashResult};

    const ARGON2_STR: &str =
        "$argon2id$v=19$m=65536,t=2,p=1$oH2BFYR6JuV1k2IXDvh67w$Xy0iVWdHMbfq2eLN/dRMRcjNcMnkjckbJNv+xSOZ0qc";

    #[test]
    fn needs_rehash() {
        let params = Argon2Params::new(65536, 2, 1);

        assert_eq!(
            requires_rehash(ARGON2_STR, ARGON2ID_ID, Some(VERSION), &params),
            RehashResult::ParametersMatch,
        );

        assert_eq!(
            requires_rehash(
                ARGON2_STR,
                ARGON2ID_ID,
                Some(VERSION),
                &Argon2Params::new(65536, 3, 1)
            ),
            RehashResult::ParametersDiffer,
        );
        assert_eq!(
            requires_rehash(
                ARGON2_STR,
                ARGON2ID_ID,
                Some(VERSION),
                &Argon2Params::new(32768, 2, 1)
            ),
            RehashResult::ParametersDiffer,
        );
        assert_eq!(
            requires_rehash(ARGON2_STR, ARGON2ID_ID, Some(16), &params),
            RehashResult::ParametersDiffer,
        );

        assert_eq!(
            requires_rehash(ARGON2_STR, ARGON2I_ID, Some(VERSION), &params),
            RehashResult::InvalidHash,
        );
        assert_eq!(
            requires_rehash("not valid", ARGON2ID_ID, Some(VERSION), &params),
            RehashResult::InvalidHash,
        );
    }

    #[test]
    fn needs_rehash_wrong_param_type() {
        // An Argon2 parameters segment is not a valid scrypt parameters segment.
        assert_eq!(
            requires_rehash(ARGON2_STR, scrypt::ALG_ID, None, &ScryptParams::new(15, 8, 1)),
            RehashResult::InvalidHash,
        );
    }
}
