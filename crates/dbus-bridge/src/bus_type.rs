use std::fmt;

/// The well-known message bus to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusType {
    /// The system-wide message bus.
    System,
    /// The login session message bus.
    Session,
}

impl fmt::Display for BusType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusType::System => write!(f, "system"),
            BusType::Session => write!(f, "session"),
        }
    }
}
