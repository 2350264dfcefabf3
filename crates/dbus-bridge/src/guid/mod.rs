//! Globally unique identifiers as used to identify bus servers.

#[cfg(test)]
mod tests;

use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

/// Number of random bytes in a guid, the remaining four carry a timestamp.
const RANDOM_BYTES: usize = 12;

/// A D-Bus GUID: 128 bits encoded as 32 lowercase hex digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guid([u8; 32]);

impl Guid {
    /// Generate a new GUID.
    ///
    /// The first 96 bits are random, the last 32 bits hold the current UNIX
    /// time in seconds.
    ///
    /// # Examples
    ///
    /// ```
    /// let guid = dbus_bridge::Guid::generate();
    /// assert!(dbus_bridge::is_guid(guid.as_str()));
    /// ```
    pub fn generate() -> Self {
        let mut raw = [0u8; 16];

        if !os_random(&mut raw[..RANDOM_BYTES]) {
            fallback_random(&mut raw[..RANDOM_BYTES]);
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or_default();

        raw[RANDOM_BYTES..].copy_from_slice(&now.to_be_bytes());
        Self::from_raw(&raw)
    }

    /// Parse a GUID, returning `None` if `candidate` is not one.
    ///
    /// Upper case hex digits are accepted and normalized.
    pub fn parse(candidate: &str) -> Option<Self> {
        if !is_guid(candidate) {
            return None;
        }

        let mut bytes = [0; 32];
        bytes.copy_from_slice(candidate.as_bytes());
        bytes.make_ascii_lowercase();
        Some(Self(bytes))
    }

    /// Access the GUID as a string.
    pub fn as_str(&self) -> &str {
        // NB: Only ever constructed from ASCII hex digits.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    fn from_raw(raw: &[u8; 16]) -> Self {
        const HEX: [u8; 16] = *b"0123456789abcdef";

        let mut bytes = [0; 32];

        for (n, b) in raw.iter().enumerate() {
            bytes[n * 2] = HEX[(b >> 4) as usize];
            bytes[n * 2 + 1] = HEX[(b & 0xf) as usize];
        }

        Self(bytes)
    }
}

impl fmt::Display for Guid {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Guid {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guid").field(&self.as_str()).finish()
    }
}

/// Generate a new GUID suitable for bootstrapping a bus connection.
#[inline]
pub fn generate_guid() -> Guid {
    Guid::generate()
}

/// Test if `candidate` is a GUID: exactly 32 ASCII hex digits.
pub fn is_guid(candidate: &str) -> bool {
    candidate.len() == 32 && candidate.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(all(target_os = "linux", feature = "libc"))]
fn os_random(buf: &mut [u8]) -> bool {
    let mut filled = 0;

    while filled < buf.len() {
        let rest = &mut buf[filled..];

        // SAFETY: The pointer and length describe a valid mutable slice.
        let n = unsafe { libc::getrandom(rest.as_mut_ptr().cast(), rest.len(), 0) };

        if n < 0 {
            if std::io::Error::last_os_error().kind() == std::io::ErrorKind::Interrupted {
                continue;
            }

            return false;
        }

        filled += n as usize;
    }

    true
}

#[cfg(not(all(target_os = "linux", feature = "libc")))]
fn os_random(_: &mut [u8]) -> bool {
    false
}

/// Fill `buf` from the randomly seeded keys of the standard library hasher.
fn fallback_random(buf: &mut [u8]) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    for chunk in buf.chunks_mut(8) {
        let mut hasher = RandomState::new().build_hasher();
        hasher.write_u128(nanos);
        hasher.write_u32(std::process::id());
        let bytes = hasher.finish().to_ne_bytes();
        chunk.copy_from_slice(&bytes[..chunk.len()]);
    }
}
