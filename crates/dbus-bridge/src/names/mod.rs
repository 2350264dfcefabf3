//! Bus name ownership.


use std::fmt;
use std::num::NonZeroU32;

/// Maximum length of any bus, interface or member name.
const MAX_NAME_LENGTH: usize = 255;

raw_set! {
    /// The flags to a name ownership request.
    #[repr(u32)]
    pub enum NameFlag {
        /// If an application A specifies this flag and succeeds in becoming the
        /// owner of the name, and another application B later requests the
        /// name with the `REPLACE_EXISTING` flag, then application A will lose
        /// ownership and application B will become the new owner.
        ALLOW_REPLACEMENT = 1,
        /// Try to replace the current owner if there is one. The application
        /// only replaces the current owner if it specified
        /// `ALLOW_REPLACEMENT`.
        REPLACE_EXISTING = 2,
        /// Without this flag, if an application requests a name that is already
        /// owned, the application will be placed in a queue to own the name
        /// when the current owner gives it up. If this flag is given, the
        /// application will not be placed in the queue and ownership is lost
        /// immediately.
        DO_NOT_QUEUE = 4,
    }
}

/// An identifier handed out by a successful name request or interface
/// registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct RegistrationId(NonZeroU32);

impl RegistrationId {
    /// Construct an identifier from a raw transport value, where zero
    /// indicates failure.
    #[inline]
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Get the raw value of the identifier.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for RegistrationId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The eventual outcome of a name request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameEvent {
    /// The connection became the primary owner of the name.
    Acquired {
        /// The identifier returned when the name was requested.
        id: RegistrationId,
        /// The requested name.
        name: Box<str>,
    },
    /// The connection lost the name, or could not acquire it.
    Lost {
        /// The identifier returned when the name was requested.
        id: RegistrationId,
        /// The requested name.
        name: Box<str>,
    },
}

impl NameEvent {
    /// The identifier of the request this event belongs to.
    pub fn id(&self) -> RegistrationId {
        match self {
            NameEvent::Acquired { id, .. } | NameEvent::Lost { id, .. } => *id,
        }
    }

    /// The name this event concerns.
    pub fn name(&self) -> &str {
        match self {
            NameEvent::Acquired { name, .. } | NameEvent::Lost { name, .. } => name,
        }
    }
}

/// Test if `name` is a valid bus name, either unique (`:1.42`) or
/// well-known (`com.example.Test`).
pub fn is_bus_name(name: &str) -> bool {
    match name.strip_prefix(':') {
        Some(rest) => is_dotted(rest, name.len(), |_, b| is_name_byte(b) || b == b'-'),
        None => is_dotted(name, name.len(), |first, b| {
            (is_name_byte(b) || b == b'-') && !(first && b.is_ascii_digit())
        }),
    }
}

/// Test if `name` is a valid unique connection name.
pub fn is_unique_name(name: &str) -> bool {
    name.starts_with(':') && is_bus_name(name)
}

/// Test if `name` is a valid interface name.
pub fn is_interface_name(name: &str) -> bool {
    is_dotted(name, name.len(), |first, b| {
        is_name_byte(b) && !(first && b.is_ascii_digit())
    })
}

/// Test if `name` is a valid member (method or signal) name.
pub fn is_member_name(name: &str) -> bool {
    let bytes = name.as_bytes();

    match bytes {
        [] => false,
        [first, ..] if first.is_ascii_digit() => false,
        _ => bytes.len() <= MAX_NAME_LENGTH && bytes.iter().all(|&b| is_name_byte(b)),
    }
}

#[inline]
fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Validate a name made of at least two non-empty elements separated by
/// `.`. The predicate receives whether the byte starts an element.
fn is_dotted(name: &str, total: usize, valid: impl Fn(bool, u8) -> bool) -> bool {
    if name.is_empty() || total > MAX_NAME_LENGTH {
        return false;
    }

    let mut elements = 0;

    for element in name.split('.') {
        let bytes = element.as_bytes();

        if bytes.is_empty() {
            return false;
        }

        for (n, &b) in bytes.iter().enumerate() {
            if !valid(n == 0, b) {
                return false;
            }
        }

        elements += 1;
    }

    elements >= 2
}
