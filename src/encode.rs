//! Binary-to-text encoding/decoding functions.
//!
//! The salt and derived key of a password hash are raw bytes, while a PHC string must be printable
//! so it can be stored in (e.g:) a database column. PHC strings use the standard
//! [Base64](https://en.wikipedia.org/wiki/Base64) alphabet with the trailing `=` padding removed.
//!
//! # Security Considerations
//! Encoding is *not* the same as encryption: Anyone can decode an encoded message.

/// Base64 encoding, as used by PHC strings.
pub mod base64 {
    use crate::mem::Buffer;
    use crate::phc::ParseError;
    use crate::{require_init, PhcError};
    use libsodium_sys as sodium;
    use std::ptr;

    /// The padding character appended by the standard Base64 variant.
    const PAD: u8 = b'=';

    /// Different variants of Base64 encoding supported by Sodium.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    #[repr(u32)]
    enum Variant {
        /// The standard Base64 alphabet, `[A-Za-z0-9+/=]`
        Original = sodium::sodium_base64_VARIANT_ORIGINAL,
    }

    /// Returns the length of the unpadded Base64 encoding of `len` bytes.
    pub const fn encoded_len_unpadded(len: usize) -> usize {
        (len / 3) * 4
            + match len % 3 {
                0 => 0,
                1 => 2,
                _ => 3,
            }
    }

    /// Encode the contents of `buf` (raw bytes) as a Base64 string with the padding removed.
    ///
    /// The standard alphabet is used, and all trailing `=` characters are stripped from the
    /// output. The result can later be decoded back to raw bytes using [`decode_unpadded`].
    pub fn encode_unpadded(buf: &[u8]) -> Result<String, PhcError> {
        require_init()?;

        let variant = Variant::Original;
        let out_len = unsafe {
            // SAFETY: This function just calls the `sodium_base64_ENCODED_LEN` macro, checking
            // first that `variant` is a valid Base64 variant. The `Variant` enum is defined based
            // on the `sodium_base64_VARIANT_NAME` constants, so every item is a valid variant.
            sodium::sodium_base64_encoded_len(buf.len(), variant as libc::c_int)
        };
        let mut out = vec![0u8; out_len];

        let base64_len = unsafe {
            // SAFETY: The first argument to this function is the destination pointer to which the
            // C-formatted string will be written. `out` is `sodium_base64_encoded_len(buf.len(),
            // variant)` bytes long, which is the number of bytes required to store the output,
            // including the null byte. The second argument specifies the maximum number of bytes
            // which can be written to this pointer, and we pass `out.len()`. The next two arguments
            // specify the buffer to encode and its length, and we use `buf.len()`, so `buf` is
            // valid for reads of this length. The final argument must be one of Sodium's variant
            // constants, which every `Variant` item is.
            sodium::sodium_bin2base64(
                out.as_mut_ptr() as *mut libc::c_char,
                out.len(),
                buf.as_ptr(),
                buf.len(),
                variant as libc::c_int,
            );

            // SAFETY: `sodium_bin2base64` always writes a null-terminated string into `out`, so
            // reading up to the first null byte (and at most `out.len()` bytes) stays in bounds.
            libc::strnlen(out.as_ptr() as *const libc::c_char, out.len())
        };

        out.truncate(base64_len);
        while out.last() == Some(&PAD) {
            out.pop();
        }

        // The Base64 alphabet is pure ASCII.
        String::from_utf8(out).map_err(|_| PhcError::DecodeError)
    }

    /// Decode an unpadded Base64 string into a new [`Buffer`].
    ///
    /// Returns a [`ParseError::EmptySegment`] error if `base64` is empty: A salt or derived key
    /// segment must always contain data. If the length of `base64` is not a multiple of four, it is
    /// padded with `=` to the next multiple of four before decoding, so input which still carries
    /// its padding is accepted too. Returns [`PhcError::DecodeError`] if `base64` contains
    /// characters outside the standard alphabet, or cannot be a valid encoding because of its
    /// length.
    pub fn decode_unpadded(base64: &str) -> Result<Buffer, PhcError> {
        require_init()?;

        if base64.is_empty() {
            return Err(ParseError::EmptySegment.into());
        }

        let mut padded = base64.as_bytes().to_vec();
        let remainder = padded.len() % 4;
        if remainder != 0 {
            padded.resize(padded.len() + 4 - remainder, PAD);
        }

        let mut output = Buffer::new_empty(padded.len() / 4 * 3)?;
        let mut written = 0;

        let decode_result = unsafe {
            // SAFETY: The first argument to this function is the destination to which the decoded
            // bytes will be written, and the second is the maximum number of bytes which can be
            // written to it. We pass `output.len()`, so `output` is valid for writes of this
            // length. The next two arguments specify the Base64 string to decode and its length.
            // The length is passed explicitly, so the string need not be null-terminated. The next
            // argument is a set of characters to ignore, which Sodium skips if it is NULL. The next
            // argument is where the decoded length will be written, a plain `usize`. The next
            // argument receives a pointer to the end of the parsed input, which Sodium skips if it
            // is NULL: In that case, any unparsed trailing input is treated as an error. The final
            // argument must be one of Sodium's variant constants, which every `Variant` item is.
            sodium::sodium_base642bin(
                output.as_mut_ptr(),
                output.len(),
                padded.as_ptr() as *const libc::c_char,
                padded.len(),
                ptr::null(),
                &mut written,
                ptr::null_mut::<*const libc::c_char>(),
                Variant::Original as libc::c_int,
            )
        };

        if decode_result != 0 {
            return Err(PhcError::DecodeError);
        }

        output.truncate(written);
        Ok(output)
    }

}
