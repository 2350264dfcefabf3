//! The capability set a bus implementation provides.
//!
//! A [`Transport`] opens [`Link`]s to a bus. Everything the bus wants to
//! tell a connection after the fact, such as inbound method calls or the
//! outcome of a name request, is pushed as an [`Event`] into the queue handed
//! to [`Transport::connect`] and serviced by a [`MainLoop`].
//!
//! [`MainLoop`]: crate::MainLoop

use std::error;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;

use crate::dispatch::Reply;
use crate::{BusType, NameEvent, NameFlag};

/// Well-known error name for calls to methods which are not implemented.
pub const ERROR_UNKNOWN_METHOD: &str = "org.freedesktop.DBus.Error.UnknownMethod";
/// Well-known error name for calls to names without an owner.
pub const ERROR_SERVICE_UNKNOWN: &str = "org.freedesktop.DBus.Error.ServiceUnknown";
/// Well-known error name for generic failures.
pub const ERROR_FAILED: &str = "org.freedesktop.DBus.Error.Failed";
/// Well-known error name for invalid arguments or return values.
pub const ERROR_INVALID_ARGS: &str = "org.freedesktop.DBus.Error.InvalidArgs";
/// Well-known error name for calls whose reply could not be delivered.
pub const ERROR_NO_REPLY: &str = "org.freedesktop.DBus.Error.NoReply";

/// Sender half of the event queue of a context.
pub type EventSender = UnboundedSender<Event>;

/// A bus implementation which can be connected to.
pub trait Transport: Send + Sync + 'static {
    /// Connect to the given bus, blocking until the handshake has completed.
    ///
    /// Events for the new connection are sent to `events`.
    fn connect(&self, bus: BusType, events: EventSender) -> Result<Arc<dyn Link>, TransportError>;
}

/// A single established connection to a bus.
pub trait Link: Send + Sync + 'static {
    /// The unique name assigned to the connection by the bus.
    fn unique_name(&self) -> &str;

    /// Request ownership of `name`.
    ///
    /// Returns the raw identifier of the request, where zero indicates that the
    /// request could not be issued.
    fn own_name(&self, name: &str, flags: NameFlag) -> Result<u32, TransportError>;

    /// Export `interface` at `path`, routing method calls to `handler`.
    ///
    /// Returns the raw identifier of the registration, where zero indicates
    /// that the registration failed.
    fn register_object(
        &self,
        path: &str,
        interface: InterfaceInfo,
        handler: Arc<dyn ObjectHandler>,
    ) -> Result<u32, TransportError>;

    /// Close the connection, releasing all names and objects.
    fn close(&self);

    /// Test if the connection has been closed or has failed.
    fn is_closed(&self) -> bool;
}

/// The handler installed for an exported object.
///
/// This is the single entry point through which the bus calls back into the
/// host for every method call on a registered object.
pub trait ObjectHandler: Send + Sync + 'static {
    /// Handle an inbound method call.
    fn method_call(&self, call: &MethodCall) -> MethodReply;
}

/// An inbound method call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    /// Unique name of the caller.
    pub sender: Box<str>,
    /// The object path being called.
    pub path: Box<str>,
    /// The interface being called.
    pub interface: Box<str>,
    /// The method being called.
    pub member: Box<str>,
}

/// The reply sent back on the bus for a method call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodReply {
    /// A successful method return.
    Return(Reply),
    /// An error reply.
    Error {
        /// The D-Bus error name.
        name: Box<str>,
        /// Human readable message.
        message: Box<str>,
    },
}

impl MethodReply {
    /// Construct an error reply.
    pub fn error(name: &str, message: impl Into<Box<str>>) -> Self {
        Self::Error {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<Reply> for MethodReply {
    #[inline]
    fn from(reply: Reply) -> Self {
        MethodReply::Return(reply)
    }
}

/// An event delivered to the connection and serviced by a main loop.
pub enum Event {
    /// A method call on an exported object.
    MethodCall {
        /// The call.
        call: MethodCall,
        /// The handler installed when the object was registered.
        handler: Arc<dyn ObjectHandler>,
        /// Where to send the reply.
        reply: oneshot::Sender<MethodReply>,
    },
    /// A change in name ownership.
    Name(NameEvent),
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::MethodCall { call, .. } => f.debug_tuple("MethodCall").field(call).finish(),
            Event::Name(event) => f.debug_tuple("Name").field(event).finish(),
        }
    }
}

/// The parts of an interface description the bus needs to route calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    /// The name of the interface.
    pub name: Box<str>,
    /// Methods of the interface.
    pub methods: Box<[MethodInfo]>,
}

impl InterfaceInfo {
    /// Look up a method by name.
    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| &*m.name == name)
    }
}

impl From<&dbus_bridge_xml::Interface<'_>> for InterfaceInfo {
    fn from(interface: &dbus_bridge_xml::Interface<'_>) -> Self {
        Self {
            name: interface.name.into(),
            methods: interface
                .methods
                .iter()
                .map(|m| MethodInfo {
                    name: m.name.into(),
                    in_signature: m.in_signature().into(),
                    out_signature: m.out_signature().into(),
                })
                .collect(),
        }
    }
}

/// A method of an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// The name of the method.
    pub name: Box<str>,
    /// Concatenated signature of input arguments.
    pub in_signature: Box<str>,
    /// Concatenated signature of output arguments.
    pub out_signature: Box<str>,
}

/// An error raised by a transport.
#[derive(Debug)]
pub struct TransportError {
    kind: TransportErrorKind,
}

impl TransportError {
    #[inline]
    pub(crate) fn new(kind: TransportErrorKind) -> Self {
        Self { kind }
    }

    /// Construct a transport specific error from a diagnostic message.
    pub fn other(message: impl Into<Box<str>>) -> Self {
        Self::new(TransportErrorKind::Other(message.into()))
    }

    /// Test if the error was raised because the connection is closed.
    pub fn is_closed(&self) -> bool {
        matches!(self.kind, TransportErrorKind::Closed)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TransportErrorKind::Unavailable(bus) => {
                write!(f, "Could not connect: no {bus} bus is available")
            }
            TransportErrorKind::Closed => write!(f, "The connection is closed"),
            TransportErrorKind::InvalidBusName(name) => {
                write!(f, "`{name}` is not a valid bus name")
            }
            TransportErrorKind::InvalidObjectPath(path) => {
                write!(f, "`{path}` is not a valid object path")
            }
            TransportErrorKind::InvalidInterfaceName(name) => {
                write!(f, "`{name}` is not a valid interface name")
            }
            TransportErrorKind::ObjectExists { path, interface } => {
                write!(
                    f,
                    "An object is already exported for the interface {interface} at {path}"
                )
            }
            TransportErrorKind::Other(message) => f.write_str(message),
        }
    }
}

impl error::Error for TransportError {}

#[derive(Debug)]
pub(crate) enum TransportErrorKind {
    Unavailable(BusType),
    Closed,
    InvalidBusName(Box<str>),
    InvalidObjectPath(Box<str>),
    InvalidInterfaceName(Box<str>),
    ObjectExists { path: Box<str>, interface: Box<str> },
    Other(Box<str>),
}
