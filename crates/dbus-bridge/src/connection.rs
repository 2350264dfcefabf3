use std::fmt;
use std::sync::Arc;

use crate::transport::Link;
use crate::BusType;

/// An established connection to a message bus.
///
/// Constructed through [`Context::connect`]. The connection is closed when
/// [`Connection::close`] is called, when it is dropped, or when the bus goes
/// away. Closed connections are never re-established and every operation
/// performed on them fails.
///
/// [`Context::connect`]: crate::Context::connect
pub struct Connection {
    bus_type: BusType,
    link: Arc<dyn Link>,
}

impl Connection {
    pub(crate) fn new(bus_type: BusType, link: Arc<dyn Link>) -> Self {
        Self { bus_type, link }
    }

    /// The bus this connection was established to.
    #[inline]
    pub fn bus_type(&self) -> BusType {
        self.bus_type
    }

    /// The unique name assigned to this connection by the bus, such as
    /// `:1.42`.
    #[inline]
    pub fn unique_name(&self) -> &str {
        self.link.unique_name()
    }

    /// Close the connection, releasing every name and object owned by it.
    pub fn close(&self) {
        self.link.close();
    }

    /// Test if the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.link.is_closed()
    }

    #[inline]
    pub(crate) fn link(&self) -> &dyn Link {
        &*self.link
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("bus_type", &self.bus_type)
            .field("unique_name", &self.unique_name())
            .finish()
    }
}
