use std::error;
use std::fmt;

use crate::{BusType, TransportError};

/// Result alias using an [`Error`] as the error type by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error raised by this crate.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Self { kind }
    }

    /// Test if the bus could not be connected to.
    pub fn is_connection(&self) -> bool {
        matches!(self.kind, ErrorKind::Connection(..))
    }

    /// Test if a name request could not be issued.
    pub fn is_ownership(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Ownership(..) | ErrorKind::OwnershipId(..)
        )
    }

    /// Test if an interface descriptor could not be parsed.
    pub fn is_introspection(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Introspection(..) | ErrorKind::MissingInterface
        )
    }

    /// Test if an object could not be registered.
    pub fn is_registration(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Registration(..) | ErrorKind::RegistrationId(..)
        )
    }
}

impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Connection(bus, error) => {
                write!(f, "Failed to connect to the {bus} bus: {error}")
            }
            ErrorKind::Ownership(name, error) => {
                write!(f, "Failed to own name `{name}` on bus: {error}")
            }
            ErrorKind::OwnershipId(name) => {
                write!(f, "Failed to own name `{name}` on bus (id = 0)")
            }
            ErrorKind::Introspection(error) => {
                write!(f, "Invalid interface descriptor: {error}")
            }
            ErrorKind::MissingInterface => {
                write!(f, "Interface descriptor does not declare an interface")
            }
            ErrorKind::Registration(path, error) => {
                write!(f, "Failed to register object at `{path}`: {error}")
            }
            ErrorKind::RegistrationId(path) => {
                write!(
                    f,
                    "Failed to register the object interface at `{path}` (id = 0)"
                )
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Connection(_, error) => Some(error),
            ErrorKind::Ownership(_, error) => Some(error),
            ErrorKind::Introspection(error) => Some(error),
            ErrorKind::Registration(_, error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum ErrorKind {
    Connection(BusType, TransportError),
    Ownership(Box<str>, TransportError),
    OwnershipId(Box<str>),
    Introspection(dbus_bridge_xml::Error),
    MissingInterface,
    Registration(Box<str>, TransportError),
    RegistrationId(Box<str>),
}
