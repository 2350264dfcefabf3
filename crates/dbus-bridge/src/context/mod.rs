//! The context shared by setup code and the main loop.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::debug;

use crate::dispatch::{Dispatch, DispatchTable, HandlerError, ObjectBridge, Reply};
use crate::error::{Error, ErrorKind, Result};
use crate::transport::{Event, EventSender, InterfaceInfo, Transport};
use crate::{BusType, Connection, LocalBus, MainLoop, NameFlag, RegistrationId};

/// Default name of the thread servicing the main loop.
const DEFAULT_LOOP_THREAD_NAME: &str = "dbus-bridge-loop";

/// Builder of a [`Context`].
#[derive(Default)]
pub struct ContextBuilder {
    transport: Option<Arc<dyn Transport>>,
    loop_thread_name: Option<Box<str>>,
}

impl ContextBuilder {
    /// Construct a new [`ContextBuilder`] with the default configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_bridge::ContextBuilder;
    ///
    /// let cx = ContextBuilder::new().build();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given transport to connect to buses.
    ///
    /// Defaults to a private [`LocalBus`] serving both buses.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_bridge::{BusType, ContextBuilder, LocalBus};
    ///
    /// let bus = LocalBus::builder().system().build();
    /// let cx = ContextBuilder::new().transport(bus).build();
    /// assert!(cx.connect(BusType::System).is_ok());
    /// ```
    pub fn transport<T>(&mut self, transport: T) -> &mut Self
    where
        T: Transport,
    {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set the name of the thread spawned by [`MainLoop::run`].
    pub fn loop_thread_name(&mut self, name: &str) -> &mut Self {
        self.loop_thread_name = Some(name.into());
        self
    }

    /// Construct a [`Context`] with the current configuration.
    pub fn build(&self) -> Context {
        let transport = match &self.transport {
            Some(transport) => transport.clone(),
            None => Arc::new(LocalBus::new()),
        };

        let loop_thread_name = self
            .loop_thread_name
            .clone()
            .unwrap_or_else(|| DEFAULT_LOOP_THREAD_NAME.into());

        let (events, receiver) = mpsc::unbounded_channel();

        Context {
            inner: Arc::new(Inner {
                transport,
                table: Arc::new(DispatchTable::new()),
                events,
                receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
                loop_thread_name,
            }),
        }
    }
}

/// The context every bus operation is performed through.
///
/// It owns the method dispatch table and the queue through which the bus
/// delivers events to the [`MainLoop`]. Cloning the context produces another
/// handle to the same state.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    table: Arc<DispatchTable>,
    events: EventSender,
    receiver: Arc<tokio::sync::Mutex<UnboundedReceiver<Event>>>,
    loop_thread_name: Box<str>,
}

impl Context {
    /// Construct a context connecting through `transport` with the default
    /// configuration.
    pub fn new<T>(transport: T) -> Self
    where
        T: Transport,
    {
        Self::builder().transport(transport).build()
    }

    /// Construct a builder for a context.
    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    /// Connect to the given bus, returning once the connection is
    /// established.
    pub fn connect(&self, bus: BusType) -> Result<Connection> {
        let link = self
            .inner
            .transport
            .connect(bus, self.inner.events.clone())
            .map_err(|error| ErrorKind::Connection(bus, error))?;

        debug!(%bus, unique_name = link.unique_name(), "Connected");
        Ok(Connection::new(bus, link))
    }

    /// Request ownership of the well-known `name`.
    ///
    /// This only fails if the request could not be issued. Whether the name
    /// was acquired is reported later as a [`NameEvent`] serviced by the main
    /// loop, tagged with the returned identifier.
    ///
    /// [`NameEvent`]: crate::NameEvent
    pub fn own_name(
        &self,
        connection: &Connection,
        name: &str,
        flags: NameFlag,
    ) -> Result<RegistrationId> {
        let raw = connection
            .link()
            .own_name(name, flags)
            .map_err(|error| ErrorKind::Ownership(name.into(), error))?;

        let Some(id) = RegistrationId::new(raw) else {
            return Err(Error::new(ErrorKind::OwnershipId(name.into())));
        };

        debug!(name, ?flags, %id, "Requested name");
        Ok(id)
    }

    /// Export the interface described by `interface_xml` at `path`.
    ///
    /// Method calls to the interface are routed through the dispatch table of
    /// this context. Only the first interface in the descriptor is exported.
    pub fn register_interface(
        &self,
        connection: &Connection,
        path: &str,
        interface_xml: &str,
    ) -> Result<RegistrationId> {
        let node = dbus_bridge_xml::parse_node(interface_xml).map_err(ErrorKind::Introspection)?;

        let mut interfaces = node.interfaces.iter();

        let Some(interface) = interfaces.next() else {
            return Err(Error::new(ErrorKind::MissingInterface));
        };

        for ignored in interfaces {
            debug!(path, interface = ignored.name, "Ignoring additional interface");
        }

        let bridge = Arc::new(ObjectBridge::new(self.inner.table.clone()));

        let raw = connection
            .link()
            .register_object(path, InterfaceInfo::from(interface), bridge)
            .map_err(|error| ErrorKind::Registration(path.into(), error))?;

        let Some(id) = RegistrationId::new(raw) else {
            return Err(Error::new(ErrorKind::RegistrationId(path.into())));
        };

        debug!(path, interface = interface.name, %id, "Registered interface");
        Ok(id)
    }

    /// Register `handler` for calls to `method` on `interface` at `path`.
    ///
    /// Any handler previously registered for the same target is replaced.
    pub fn register_handler<F>(&self, path: &str, interface: &str, method: &str, handler: F)
    where
        F: Fn(&str, &str, &str) -> Result<Reply, HandlerError> + Send + Sync + 'static,
    {
        self.inner.table.register(path, interface, method, handler);
    }

    /// Dispatch a call to `method` on `interface` at `path` through the
    /// dispatch table, the same way inbound calls from the bus are.
    pub fn dispatch(&self, path: &str, interface: &str, method: &str) -> Dispatch {
        self.inner.table.dispatch(path, interface, method)
    }

    /// Access the dispatch table of this context.
    pub fn dispatch_table(&self) -> &Arc<DispatchTable> {
        &self.inner.table
    }

    /// Construct a main loop servicing the events of this context.
    pub fn main_loop(&self) -> MainLoop {
        MainLoop::new(
            self.inner.receiver.clone(),
            self.inner.loop_thread_name.clone(),
        )
    }
}
