//! Hardened memory management utilities.
//!
//! This module wraps Sodium's [secure memory management
//! functions](https://doc.libsodium.org/memory_management), which are used to store the byte
//! segments of a PHC string (salts and derived keys).
//!
//! A derived key is as sensitive as the password it was computed from: Anyone holding it can run an
//! offline brute-force search for the password. Simply freeing the memory it occupied does not
//! erase it, only marks it as free, so a later allocation could observe its contents. Memory
//! allocated through Sodium is placed directly before a guard page, protected by a canary, locked
//! so that it is never swapped to disk, and securely erased when freed.
//!
//! Sodium's allocator has much more overhead than the standard system allocator, which is
//! acceptable for the handful of short buffers a password hash record holds.

use crate::{require_init, PhcError};
use libsodium_sys as sodium;
use std::ptr::NonNull;

/// A variable-length byte buffer allocated using Sodium's secure memory utilities.
///
/// The contents are wiped and the memory returned to Sodium when the buffer is dropped. Equality
/// comparisons run in constant time for buffers of the same length, and the [`Debug`] output never
/// reveals the contents.
///
/// `Buffer` implements [`Deref<Target = [u8]>`](std::ops::Deref), so it can be used like a
/// `&[u8]`.
pub struct Buffer {
    ptr: NonNull<u8>,
    len: usize,
}

impl Buffer {
    /// Create a new buffer of `len` bytes, filled with all zeroes.
    ///
    /// Returns [`PhcError::MemoryManagement`] if Sodium could not allocate the memory.
    pub fn new_empty(len: usize) -> Result<Self, PhcError> {
        require_init()?;

        let ptr = unsafe {
            // SAFETY: This call to `sodium_malloc` allocates `len` bytes outside of Rust's memory
            // management. The memory is freed exactly once, in the `Drop` implementation of this
            // struct. The alignment for a u8 is 1 byte, so alignment is not a concern.
            sodium::sodium_malloc(len) as *mut u8
        };
        let ptr = NonNull::new(ptr).ok_or(PhcError::MemoryManagement)?;

        unsafe {
            // SAFETY: We allocated `len` bytes at `ptr` above, and clear exactly `len` bytes. All
            // zeroes is a valid representation of a u8 slice.
            sodium::sodium_memzero(ptr.as_ptr() as *mut libc::c_void, len);
        }

        Ok(Self { ptr, len })
    }

    /// Create a new buffer containing a copy of `buf`.
    pub fn from_slice(buf: &[u8]) -> Result<Self, PhcError> {
        let mut new = Self::new_empty(buf.len())?;
        new.copy_from_slice(buf);
        Ok(new)
    }

    /// Create a new buffer of `len` bytes, filled with random data from Sodium's CSPRNG.
    pub fn random(len: usize) -> Result<Self, PhcError> {
        let mut new = Self::new_empty(len)?;
        crate::random::fill_random(&mut new)?;
        Ok(new)
    }

    /// Create a new buffer of the same length, copying the contents of this buffer.
    ///
    /// This operation may fail, as Sodium's allocator is more likely to encounter issues than the
    /// standard system allocator.
    pub fn try_clone(&self) -> Result<Self, PhcError> {
        Self::from_slice(self)
    }

    /// Shorten the buffer to `len` bytes, wiping the bytes past the new end.
    ///
    /// Has no effect if `len` is greater than or equal to the current length. The memory itself is
    /// only returned to Sodium when the buffer is dropped.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }

        clear(&mut self[len..]).ok();
        self.len = len;
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            // SAFETY: `ptr` was returned by `sodium_malloc` in `new_empty`, and this is the only
            // place it is freed. `drop` is called exactly once, after which none of the struct's
            // methods are accessible, so neither a double-free nor a use-after-free is possible.
            // `sodium_free` wipes the whole allocated region, including any bytes dropped by
            // `truncate`, before releasing it.
            sodium::sodium_free(self.ptr.as_ptr() as *mut libc::c_void);
        }
    }
}

// SAFETY: `Buffer` uniquely owns the memory behind `ptr`, just like a `Box<[u8]>`, so moving it
// across threads or sharing immutable references between threads is sound.
unsafe impl Send for Buffer {}
unsafe impl Sync for Buffer {}

impl std::ops::Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        unsafe {
            // SAFETY: `ptr` points to at least `len` initialised bytes, which remain valid for the
            // lifetime of the struct. The returned reference cannot outlive `self`.
            std::slice::from_raw_parts(self.ptr.as_ptr(), self.len)
        }
    }
}

impl std::ops::DerefMut for Buffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe {
            // SAFETY: As for `deref`. We hold `&mut self`, so the mutable reference is unique.
            std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len)
        }
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl AsMut<[u8]> for Buffer {
    fn as_mut(&mut self) -> &mut [u8] {
        self
    }
}

impl TryFrom<&[u8]> for Buffer {
    type Error = PhcError;

    fn try_from(buf: &[u8]) -> Result<Self, Self::Error> {
        Self::from_slice(buf)
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Buffer([u8; {}])", self.len)
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        // Sodium is initialised for as long as any `Buffer` exists, so `eq` cannot fail here.
        eq(self, other).unwrap_or(false)
    }
}

impl Eq for Buffer {}

/// Constant time test for equality of two slices.
///
/// For the same input size, the time taken to compare the slices is always identical. Returns true
/// if the slices contain the same contents, false otherwise. Always returns false if the slices are
/// not of the same length.
pub fn eq(a: &[u8], b: &[u8]) -> Result<bool, PhcError> {
    require_init()?;

    if a.len() != b.len() {
        return Ok(false);
    }

    let comparison_result = unsafe {
        // SAFETY: This function expects two pointers to regions of memory of the same length,
        // specified by the third parameter. We check above to ensure that a and b are of the same
        // length. We use a.len() to specify the length, so it is correct for these slices.
        sodium::sodium_memcmp(
            a.as_ptr() as *const libc::c_void,
            b.as_ptr() as *const libc::c_void,
            a.len(),
        )
    };

    Ok(comparison_result == 0)
}

/// Zero the contents of `buf`, in such a way that the compiler will not remove the operation.
pub fn clear(buf: &mut [u8]) -> Result<(), PhcError> {
    require_init()?;

    unsafe {
        // SAFETY: `buf` points to `buf.len()` writable bytes, and we clear exactly that many. All
        // zeroes is a valid representation of a u8 slice.
        sodium::sodium_memzero(buf.as_mut_ptr() as *mut libc::c_void, buf.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{clear, eq, Buffer};
    use crate::{random, PhcError};

    #[test]
    fn new_empty_is_zeroed() -> Result<(), PhcError> {
        for len in [0, 1, 16, 64, 1 << 12] {
            let buf = Buffer::new_empty(len)?;
            assert_eq!(buf.len(), len);
            assert!(buf.iter().all(|&b| b == 0));
        }

        Ok(())
    }

    #[test]
    fn from_slice_copies() -> Result<(), PhcError> {
        let buf = Buffer::from_slice(b"saltsalt")?;
        assert_eq!(&buf[..], b"saltsalt");

        let cloned = buf.try_clone()?;
        assert_eq!(buf, cloned);

        Ok(())
    }

    #[test]
    fn truncate_shortens_and_wipes() -> Result<(), PhcError> {
        let mut buf = Buffer::from_slice(&[0xff; 32])?;

        buf.truncate(40);
        assert_eq!(buf.len(), 32);

        buf.truncate(10);
        assert_eq!(&buf[..], &[0xff; 10]);

        buf.truncate(0);
        assert!(buf.is_empty());

        Ok(())
    }

    #[test]
    fn equality() -> Result<(), PhcError> {
        let a = Buffer::from_slice(b"testpass")?;
        let b = Buffer::from_slice(b"testpass")?;
        let c = Buffer::from_slice(b"testpast")?;
        let d = Buffer::from_slice(b"testpas")?;

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);

        Ok(())
    }

    #[test]
    fn debug_hides_contents() -> Result<(), PhcError> {
        let buf = Buffer::from_slice(b"secret")?;
        assert_eq!(format!("{:?}", buf), "Buffer([u8; 6])");

        Ok(())
    }

    #[test]
    fn random_buffers_differ() -> Result<(), PhcError> {
        let a = Buffer::random(32)?;
        let b = Buffer::random(32)?;
        assert_ne!(a, b);

        Ok(())
    }

    #[test]
    fn eq_tests() -> Result<(), PhcError> {
        let mut buf_a = [0; 1000];
        let mut buf_b = [0; 1000];

        random::fill_random(&mut buf_a)?;
        buf_b.copy_from_slice(&buf_a);

        assert!(eq(&buf_a, &buf_b)?);
        assert!(!eq(&buf_a[..500], &buf_b[..501])?);

        buf_b[..500].copy_from_slice(&[0; 500]);

        assert!(!eq(&buf_a, &buf_b)?);
        assert!(eq(&buf_a[500..], &buf_b[500..])?);

        Ok(())
    }

    #[test]
    fn clear_tests() -> Result<(), PhcError> {
        let mut buf = vec![0; 777];
        random::fill_random(&mut buf)?;
        clear(&mut buf)?;
        assert_eq!(&buf, &vec![0; 777]);

        Ok(())
    }
}
