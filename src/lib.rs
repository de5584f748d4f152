//! Parsing and serialization of [PHC
//! strings](https://github.com/P-H-C/phc-string-format/blob/master/phc-sf-spec.md), backed by
//! the [Sodium](https://libsodium.org) cryptographic library.
//!
//! Password hashing algorithms such as scrypt and Argon2 need to store more than just their output:
//! To verify a password later on, the algorithm used, its version, its cost parameters and the salt
//! must all be known. The PHC string format is a compact, printable encoding of all of these
//! values, for example:
//!
//! ```text
//! $argon2id$v=19$m=65536,t=2,p=1$oH2BFYR6JuV1k2IXDvh67w$Xy0iVWdHMbfq2eLN/dRMRcjNcMnkjckbJNv+xSOZ0qc
//! ```
//!
//! This crate provides a [`Record`](phc::Record) type representing such a string, which can be
//! parsed from, and serialized back to, the textual form. The parameters segment differs between
//! algorithms, so records are generic over a [`ParamSet`](phc::ParamSet) describing it. Parameter
//! types for [scrypt](hash::pbkdf::scrypt) and [Argon2](hash::pbkdf::argon2) are included, and
//! [`RawParams`](phc::RawParams) accepts any well-formed parameters segment.
//!
//! This crate does not compute password hashes itself.
//!
//! # Which API Should I Use?
//! I want to...
//! * Read the components of a stored password hash
//!     * Use [`phc::Record::parse`], then [`phc::Record::verify_algorithm`] to check the algorithm
//!       is the one you expect
//! * Store the output of a password hash computation
//!     * Build a record with [`phc::Record::new`], then call [`phc::Record::serialize`]
//! * Generate a salt for a new password hash
//!     * Use [`phc::generate_salt`]
//! * Support a new algorithm's parameters
//!     * Implement [`phc::ParamSet`], using [`phc::ParamsIter`] to split the segment
//!
//! # Hardened Buffers
//! Salts and derived keys are stored in [`mem::Buffer`]s, which are allocated using Sodium's
//! secure memory utilities. Their contents are locked in memory, compared in constant time, and
//! securely erased when they are released.

use libsodium_sys as sodium;
use thiserror::Error;

pub mod encode;
pub mod hash;
pub mod mem;
pub mod phc;
pub mod random;

/// General error type used in this crate.
///
/// This type is returned by functions which can possibly fail throughout the crate.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum PhcError {
    /// Failed to initialise Sodium.
    ///
    /// This corresponds to a call to `sodium_init` returning -1, indicating initialisation
    /// failure. In such a case, Sodium is unsafe to use.
    #[error("failed to initialise libsodium")]
    SodiumInitFailed,

    /// Memory management error.
    ///
    /// Sodium's allocator could not provide the requested memory.
    #[error("memory management error")]
    MemoryManagement,

    /// The input did not follow the PHC string grammar.
    #[error("PHC string parse error")]
    ParseError(#[from] phc::ParseError),

    /// A record's algorithm identifier was not the one expected, see
    /// [`phc::Record::verify_algorithm`].
    #[error("unexpected algorithm identifier")]
    InvalidAlgorithm,

    /// A decimal value was out of range for its integer type.
    #[error("integer parse error")]
    IntegerParseError(#[from] std::num::ParseIntError),

    /// Failed to decode a Base64 segment.
    #[error("base64 decoding failed")]
    DecodeError,
}

/// Attempt to initialise Sodium.
///
/// This function should be called in any scenario where a function from Sodium will be used
/// internally. Returns `Ok(0)` if Sodium was initialised successfully, `Ok(1)` if Sodium has
/// already been initialised, or [`PhcError::SodiumInitFailed`] if the initialisation was
/// unsuccessful.
fn require_init() -> Result<libc::c_int, PhcError> {
    let init_status = unsafe {
        // SAFETY: This function can safely be called multiple times from multiple threads. Once it
        // has been called, all other Sodium functions are also thread-safe.
        sodium::sodium_init()
    };

    // sodium_init() returns -1 on init failure, 0 on success, or 1 if Sodium is already
    // initialised
    if init_status < 0 {
        return Err(PhcError::SodiumInitFailed);
    }

    Ok(init_status)
}
