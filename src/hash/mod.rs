//! Hash algorithms.
//!
//! This crate does not compute hashes itself, but describes the parameters of the password hash
//! algorithms whose results are commonly stored as PHC strings, in the [`pbkdf`] module.

pub mod pbkdf;
