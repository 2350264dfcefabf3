//! Routing of inbound method calls to registered handlers.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::error;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::transport::{MethodCall, MethodReply, ObjectHandler, ERROR_FAILED, ERROR_UNKNOWN_METHOD};

/// The error a handler fails with.
pub type HandlerError = Box<dyn error::Error + Send + Sync>;

/// A registered method call handler.
///
/// Called with the object path, interface name and method name of the
/// inbound call.
pub type MethodCallback =
    Arc<dyn Fn(&str, &str, &str) -> Result<Reply, HandlerError> + Send + Sync>;

/// The value returned by a handler and sent back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A string reply, signature `s`.
    String(String),
    /// A boolean reply, signature `b`.
    Bool(bool),
}

impl Reply {
    /// The D-Bus signature of the reply.
    pub fn signature(&self) -> &'static str {
        match self {
            Reply::String(..) => "s",
            Reply::Bool(..) => "b",
        }
    }
}

impl From<String> for Reply {
    #[inline]
    fn from(value: String) -> Self {
        Reply::String(value)
    }
}

impl From<&str> for Reply {
    #[inline]
    fn from(value: &str) -> Self {
        Reply::String(value.to_owned())
    }
}

impl From<bool> for Reply {
    #[inline]
    fn from(value: bool) -> Self {
        Reply::Bool(value)
    }
}

/// The key a handler is registered under.
///
/// Formed as `{path}/{interface}.{method}`. For valid object paths,
/// interface names and member names the key is unique, since member names
/// never contain `.` and interface names never contain `/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DispatchKey(Box<str>);

impl DispatchKey {
    /// Construct the key for the given call target.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_bridge::DispatchKey;
    ///
    /// let key = DispatchKey::new("/com/example/Test", "com.example.Test", "Ping");
    /// assert_eq!(key.as_str(), "/com/example/Test/com.example.Test.Ping");
    /// ```
    pub fn new(path: &str, interface: &str, method: &str) -> Self {
        Self(format!("{path}/{interface}.{method}").into())
    }

    /// Access the key as a string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DispatchKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The outcome of dispatching a method call.
#[derive(Debug)]
pub enum Dispatch {
    /// No handler is registered for the call.
    NotFound,
    /// The handler failed.
    Failed(HandlerError),
    /// The handler produced a reply.
    Reply(Reply),
}

impl Dispatch {
    /// Test if a handler was found for the call.
    #[inline]
    pub fn found(&self) -> bool {
        !matches!(self, Dispatch::NotFound)
    }

    /// The reply produced by the handler, if any.
    #[inline]
    pub fn reply(&self) -> Option<&Reply> {
        match self {
            Dispatch::Reply(reply) => Some(reply),
            _ => None,
        }
    }

    /// Convert into the reply to send on the bus for `call`.
    pub fn into_method_reply(self, call: &MethodCall) -> MethodReply {
        match self {
            Dispatch::Reply(reply) => MethodReply::Return(reply),
            Dispatch::Failed(error) => MethodReply::error(ERROR_FAILED, error.to_string()),
            Dispatch::NotFound => MethodReply::error(
                ERROR_UNKNOWN_METHOD,
                format!(
                    "No handler for method {} in interface {} at object path {}",
                    call.member, call.interface, call.path
                ),
            ),
        }
    }
}

/// Table mapping call targets to handlers.
///
/// The table is shared between the thread registering handlers and the
/// thread servicing the main loop.
#[derive(Default)]
pub struct DispatchTable {
    handlers: Mutex<HashMap<DispatchKey, MethodCallback>>,
}

impl DispatchTable {
    /// Construct an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for calls to `method` on `interface` at `path`,
    /// replacing any handler previously registered for the same target.
    pub fn register<F>(&self, path: &str, interface: &str, method: &str, handler: F)
    where
        F: Fn(&str, &str, &str) -> Result<Reply, HandlerError> + Send + Sync + 'static,
    {
        let key = DispatchKey::new(path, interface, method);
        debug!(%key, "Registering method call handler");

        if self.handlers.lock().insert(key, Arc::new(handler)).is_some() {
            debug!(path, interface, method, "Replaced existing handler");
        }
    }

    /// Dispatch a call to `method` on `interface` at `path`.
    ///
    /// The handler is invoked exactly once if present. The table is not
    /// locked while the handler runs.
    pub fn dispatch(&self, path: &str, interface: &str, method: &str) -> Dispatch {
        let key = DispatchKey::new(path, interface, method);

        let Some(handler) = self.handlers.lock().get(&key).cloned() else {
            return Dispatch::NotFound;
        };

        match handler(path, interface, method) {
            Ok(reply) => Dispatch::Reply(reply),
            Err(error) => Dispatch::Failed(error),
        }
    }

    /// Test if a handler is registered for the given target.
    pub fn contains(&self, path: &str, interface: &str, method: &str) -> bool {
        self.handlers
            .lock()
            .contains_key(&DispatchKey::new(path, interface, method))
    }

    /// The number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Test if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.lock().is_empty()
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.lock();
        let mut keys = handlers.keys().collect::<Vec<_>>();
        keys.sort();
        f.debug_struct("DispatchTable").field("keys", &keys).finish()
    }
}

/// The object handler installed for every registered interface, routing
/// calls through a shared dispatch table.
pub(crate) struct ObjectBridge {
    table: Arc<DispatchTable>,
}

impl ObjectBridge {
    pub(crate) fn new(table: Arc<DispatchTable>) -> Self {
        Self { table }
    }
}

impl ObjectHandler for ObjectBridge {
    fn method_call(&self, call: &MethodCall) -> MethodReply {
        let dispatch = self.table.dispatch(&call.path, &call.interface, &call.member);

        match &dispatch {
            Dispatch::NotFound => {
                warn!(
                    path = &*call.path,
                    interface = &*call.interface,
                    method = &*call.member,
                    "No handler registered for method call"
                );
            }
            Dispatch::Failed(error) => {
                warn!(
                    path = &*call.path,
                    interface = &*call.interface,
                    method = &*call.member,
                    %error,
                    "Method call handler failed"
                );
            }
            Dispatch::Reply(..) => {}
        }

        dispatch.into_method_reply(call)
    }
}
