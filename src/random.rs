//! Random data suitable for cryptographic use.
//!
//! This module is a wrapper around the [`randombytes`
//! API](https://doc.libsodium.org/generating_random_data) from Sodium, used to generate salts for
//! new password hashes. Random data is sourced from the platform's secure RNG API (e.g:
//! /dev/urandom).
//!
//! # Examples
//! Using the [rand](https://rust-random.github.io/book)-compatible API:
//!
//! ```rust
//! use phc_encoding::phc::generate_salt_with;
//! use phc_encoding::random::SodiumRng;
//!
//! let salt = generate_salt_with(&mut SodiumRng, 16).unwrap();
//! assert_eq!(salt.len(), 16);
//! ```

use crate::{require_init, PhcError};
use libsodium_sys as sodium;
use rand_core::{impls, CryptoRng, Error as RandError, RngCore};

/// [rand](https://rust-random.github.io/book)-compatible CSPRNG API.
///
/// This struct implements the `RngCore` trait, so it can be passed anywhere a
/// `RngCore + CryptoRng` source of randomness is accepted, e.g:
/// [`generate_salt_with`](crate::phc::generate_salt_with).
#[derive(Clone, Copy, Debug)]
pub struct SodiumRng;

impl RngCore for SodiumRng {
    fn next_u32(&mut self) -> u32 {
        impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if self.try_fill_bytes(dest).is_err() {
            panic!("failed to initialise libsodium");
        }
    }

    #[cfg(feature = "std")]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), RandError> {
        fill_random(dest).map_err(RandError::new)
    }

    #[cfg(not(feature = "std"))]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), RandError> {
        fill_random(dest).map_err(|_| {
            core::num::NonZeroU32::new(RandError::CUSTOM_START)
                .unwrap()
                .into()
        })
    }
}

impl CryptoRng for SodiumRng {}

/// Fill `buf` with random data suitable for cryptographic use.
///
/// Returns an error if Sodium could not be correctly initialised.
pub fn fill_random(buf: &mut [u8]) -> Result<(), PhcError> {
    require_init()?;

    unsafe {
        // SAFETY: The first argument to this function should be a pointer to which random data will
        // be written, and the second argument should be the number of bytes to write, starting at
        // the pointer. We use `buf.len()` to specify the number of bytes to write, so `buf` is
        // clearly valid for writes of the required length.
        sodium::randombytes_buf(buf.as_mut_ptr() as *mut libc::c_void, buf.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    // These tests only check that, for sufficiently many samples, every byte value shows up. They
    // guard against API regressions rather than verifying the quality of the randomness.
    use super::{fill_random, SodiumRng};
    use crate::PhcError;
    use rand_core::{Error as RandError, RngCore};

    #[test]
    fn fill_random_appears_random() -> Result<(), PhcError> {
        let mut buf = [0u8; 65536];
        fill_random(&mut buf)?;

        let mut seen = [0; 256];
        for b in buf {
            seen[b as usize] += 1;
        }

        for c in seen {
            assert!(c > 0);
        }

        Ok(())
    }

    #[test]
    fn sodiumrng_is_rngcore() -> Result<(), RandError> {
        let mut seen = [false; 256];
        for _ in 0..65535 {
            seen[(SodiumRng.next_u32() & 0xff) as usize] = true;
        }
        assert!(seen.iter().all(|&b| b));

        let mut buf = [0u8; 4096];
        SodiumRng.try_fill_bytes(&mut buf)?;
        assert!(buf.iter().any(|&b| b != 0));

        Ok(())
    }
}
