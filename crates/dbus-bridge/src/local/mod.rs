//! An in-process message bus.
//!
//! [`LocalBus`] implements [`Transport`] by hosting the bus daemon inside the
//! current process. It keeps track of unique and well-known names, exported
//! objects and routes method calls from peers to the connection owning the
//! destination.
//!
//! ```
//! use dbus_bridge::{BusType, Context, LocalBus};
//!
//! let bus = LocalBus::builder().session().build();
//! let cx = Context::new(bus.clone());
//!
//! assert!(cx.connect(BusType::Session).is_ok());
//! assert!(cx.connect(BusType::System).is_err());
//! ```


use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::names::{is_bus_name, is_interface_name, is_unique_name};
use crate::object_path::is_object_path;
use crate::transport::{
    Event, EventSender, InterfaceInfo, Link, MethodCall, MethodReply, ObjectHandler, Transport,
    TransportError, TransportErrorKind, ERROR_INVALID_ARGS, ERROR_NO_REPLY,
    ERROR_SERVICE_UNKNOWN, ERROR_UNKNOWN_METHOD,
};
use crate::{BusType, NameEvent, NameFlag, RegistrationId};

/// Builder of a [`LocalBus`].
#[derive(Debug, Default)]
pub struct LocalBusBuilder {
    session: bool,
    system: bool,
}

impl LocalBusBuilder {
    /// Construct a builder which serves no buses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a session bus.
    pub fn session(&mut self) -> &mut Self {
        self.session = true;
        self
    }

    /// Serve a system bus.
    pub fn system(&mut self) -> &mut Self {
        self.system = true;
        self
    }

    /// Construct the bus.
    pub fn build(&self) -> LocalBus {
        let mut buses = HashMap::new();

        if self.session {
            buses.insert(BusType::Session, Daemon::default());
        }

        if self.system {
            buses.insert(BusType::System, Daemon::default());
        }

        LocalBus {
            state: Arc::new(Mutex::new(State { buses, next_id: 1 })),
        }
    }
}

/// An in-process message bus serving a session and / or a system bus.
///
/// Cloning the bus produces another handle to the same daemon.
#[derive(Clone)]
pub struct LocalBus {
    state: Arc<Mutex<State>>,
}

impl LocalBus {
    /// Construct a bus serving both the session and the system bus.
    pub fn new() -> Self {
        Self::builder().session().system().build()
    }

    /// Construct a builder for a bus.
    pub fn builder() -> LocalBusBuilder {
        LocalBusBuilder::new()
    }

    /// Get the unique name of the current primary owner of `name`.
    pub fn name_owner(&self, bus: BusType, name: &str) -> Option<String> {
        let state = self.state.lock();
        let daemon = state.buses.get(&bus)?;
        let entry = daemon.names.get(name)?;
        let peer = daemon.peers.get(&entry.owner.peer)?;
        Some(peer.unique_name.to_string())
    }

    /// Shut down the given bus.
    ///
    /// Every connection to it is closed, and further attempts to connect fail.
    pub fn shutdown(&self, bus: BusType) {
        let daemon = self.state.lock().buses.remove(&bus);

        if let Some(daemon) = daemon {
            debug!(%bus, peers = daemon.peers.len(), "Shutting down bus");
        }
    }

    /// Call `method` on `interface` at `path` of the connection owning
    /// `destination`, waiting for the reply.
    pub async fn call(
        &self,
        bus: BusType,
        destination: &str,
        path: &str,
        interface: &str,
        method: &str,
    ) -> MethodReply {
        match self.start_call(bus, destination, path, interface, method) {
            Ok(PendingCall { rx, out_signature }) => check_reply(&out_signature, rx.await.ok()),
            Err(reply) => reply,
        }
    }

    /// Blocking variant of [`LocalBus::call`].
    ///
    /// # Panics
    ///
    /// This panics if called from within an asynchronous execution context.
    pub fn call_blocking(
        &self,
        bus: BusType,
        destination: &str,
        path: &str,
        interface: &str,
        method: &str,
    ) -> MethodReply {
        match self.start_call(bus, destination, path, interface, method) {
            Ok(PendingCall { rx, out_signature }) => {
                check_reply(&out_signature, rx.blocking_recv().ok())
            }
            Err(reply) => reply,
        }
    }

    /// Route a call to its destination, returning an immediate error reply if
    /// it cannot be delivered.
    fn start_call(
        &self,
        bus: BusType,
        destination: &str,
        path: &str,
        interface: &str,
        method: &str,
    ) -> Result<PendingCall, MethodReply> {
        let mut state = self.state.lock();

        let Some(daemon) = state.buses.get_mut(&bus) else {
            return Err(MethodReply::error(
                ERROR_NO_REPLY,
                format!("The {bus} bus is not available"),
            ));
        };

        let Some(peer) = daemon.resolve(destination) else {
            return Err(MethodReply::error(
                ERROR_SERVICE_UNKNOWN,
                format!("The name {destination} was not provided by any .service files"),
            ));
        };

        let key = (Box::<str>::from(path), Box::<str>::from(interface));

        let Some(object) = peer.objects.get(&key) else {
            return Err(MethodReply::error(
                ERROR_UNKNOWN_METHOD,
                format!("No such interface '{interface}' on object at path {path}"),
            ));
        };

        let Some(info) = object.interface.method(method) else {
            return Err(MethodReply::error(
                ERROR_UNKNOWN_METHOD,
                format!("No such method '{method}'"),
            ));
        };

        if !info.in_signature.is_empty() {
            return Err(MethodReply::error(
                ERROR_INVALID_ARGS,
                format!(
                    "Type of message, '()', does not match expected type '({})'",
                    info.in_signature
                ),
            ));
        }

        let events = peer.events.clone();
        let handler = object.handler.clone();
        let out_signature = info.out_signature.clone();

        // The caller is only assigned a name once the call is deliverable.
        let sender = daemon.allocate_unique_name();

        let (tx, rx) = oneshot::channel();

        let event = Event::MethodCall {
            call: MethodCall {
                sender,
                path: path.into(),
                interface: interface.into(),
                member: method.into(),
            },
            handler,
            reply: tx,
        };

        if events.send(event).is_err() {
            return Err(no_reply());
        }

        Ok(PendingCall { rx, out_signature })
    }
}

impl Default for LocalBus {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LocalBus {
    fn connect(&self, bus: BusType, events: EventSender) -> Result<Arc<dyn Link>, TransportError> {
        let mut state = self.state.lock();

        let Some(daemon) = state.buses.get_mut(&bus) else {
            return Err(TransportError::new(TransportErrorKind::Unavailable(bus)));
        };

        let unique_name = daemon.allocate_unique_name();
        let peer = daemon.next_peer;
        daemon.next_peer += 1;

        daemon.peers.insert(
            peer,
            Peer {
                unique_name: unique_name.clone(),
                events,
                objects: HashMap::new(),
            },
        );

        debug!(%bus, unique_name = &*unique_name, "Peer connected");

        Ok(Arc::new(LocalLink {
            state: self.state.clone(),
            bus,
            peer,
            unique_name,
        }))
    }
}

/// A call waiting for its reply.
struct PendingCall {
    rx: oneshot::Receiver<MethodReply>,
    out_signature: Box<str>,
}

/// Validate a reply against the declared output arguments of the method.
fn check_reply(out_signature: &str, reply: Option<MethodReply>) -> MethodReply {
    match reply {
        Some(MethodReply::Return(reply)) => {
            if reply.signature() != out_signature {
                return MethodReply::error(
                    ERROR_INVALID_ARGS,
                    format!(
                        "Type of return value is incorrect: got '({})', expected '({out_signature})'",
                        reply.signature(),
                    ),
                );
            }

            MethodReply::Return(reply)
        }
        Some(reply) => reply,
        None => no_reply(),
    }
}

fn no_reply() -> MethodReply {
    MethodReply::error(
        ERROR_NO_REPLY,
        "Message recipient disconnected from message bus without replying",
    )
}

struct State {
    buses: HashMap<BusType, Daemon>,
    /// Identifiers are shared across buses, like the process-wide counters of
    /// established bus libraries.
    next_id: u32,
}

impl State {
    fn allocate_id(&mut self) -> RegistrationId {
        loop {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1);

            if let Some(id) = RegistrationId::new(id) {
                return id;
            }
        }
    }
}

struct Daemon {
    next_unique: u64,
    next_peer: u64,
    peers: HashMap<u64, Peer>,
    names: HashMap<Box<str>, NameEntry>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self {
            next_unique: 1,
            next_peer: 0,
            peers: HashMap::new(),
            names: HashMap::new(),
        }
    }
}

impl Daemon {
    fn allocate_unique_name(&mut self) -> Box<str> {
        let name = format!(":1.{}", self.next_unique);
        self.next_unique += 1;
        name.into()
    }

    /// Resolve a unique or well-known name to its peer.
    fn resolve(&self, destination: &str) -> Option<&Peer> {
        if is_unique_name(destination) {
            return self
                .peers
                .values()
                .find(|p| &*p.unique_name == destination);
        }

        let entry = self.names.get(destination)?;
        self.peers.get(&entry.owner.peer)
    }

    fn notify(&self, owner: Owner, name: &str, acquired: bool) {
        let Some(peer) = self.peers.get(&owner.peer) else {
            return;
        };

        let event = if acquired {
            NameEvent::Acquired {
                id: owner.id,
                name: name.into(),
            }
        } else {
            NameEvent::Lost {
                id: owner.id,
                name: name.into(),
            }
        };

        debug!(unique_name = &*peer.unique_name, ?event, "Name ownership changed");
        // A peer which is not servicing events anymore is not interested.
        _ = peer.events.send(Event::Name(event));
    }

    /// Apply a name request following the semantics of `RequestName`.
    fn request_name(&mut self, name: &str, requester: Owner) {
        if !self.names.contains_key(name) {
            self.names.insert(
                name.into(),
                NameEntry {
                    owner: requester,
                    queue: VecDeque::new(),
                },
            );

            self.notify(requester, name, true);
            return;
        }

        let Some(entry) = self.names.get_mut(name) else {
            return;
        };

        if entry.owner.peer == requester.peer {
            entry.owner = requester;
            return;
        }

        entry.queue.retain(|o| o.peer != requester.peer);

        if entry.owner.flags & NameFlag::ALLOW_REPLACEMENT
            && requester.flags & NameFlag::REPLACE_EXISTING
        {
            let previous = entry.owner;
            entry.owner = requester;

            if !(previous.flags & NameFlag::DO_NOT_QUEUE) {
                entry.queue.push_front(previous);
            }

            self.notify(previous, name, false);
            self.notify(requester, name, true);
            return;
        }

        if requester.flags & NameFlag::DO_NOT_QUEUE {
            self.notify(requester, name, false);
            return;
        }

        entry.queue.push_back(requester);
    }

    /// Remove a peer, handing its names over to the next in queue.
    fn remove_peer(&mut self, peer: u64) -> Option<Peer> {
        let mut promoted = Vec::new();

        self.names.retain(|name, entry| {
            entry.queue.retain(|o| o.peer != peer);

            if entry.owner.peer != peer {
                return true;
            }

            match entry.queue.pop_front() {
                Some(next) => {
                    entry.owner = next;
                    promoted.push((name.clone(), next));
                    true
                }
                None => false,
            }
        });

        let removed = self.peers.remove(&peer);

        for (name, owner) in promoted {
            self.notify(owner, &name, true);
        }

        removed
    }
}

struct Peer {
    unique_name: Box<str>,
    events: EventSender,
    objects: HashMap<(Box<str>, Box<str>), Object>,
}

struct Object {
    interface: InterfaceInfo,
    handler: Arc<dyn ObjectHandler>,
}

struct NameEntry {
    owner: Owner,
    queue: VecDeque<Owner>,
}

#[derive(Clone, Copy)]
struct Owner {
    peer: u64,
    flags: NameFlag,
    id: RegistrationId,
}

/// A connection to a [`LocalBus`].
struct LocalLink {
    state: Arc<Mutex<State>>,
    bus: BusType,
    peer: u64,
    unique_name: Box<str>,
}

impl LocalLink {
    fn closed() -> TransportError {
        TransportError::new(TransportErrorKind::Closed)
    }
}

impl Link for LocalLink {
    fn unique_name(&self) -> &str {
        &self.unique_name
    }

    fn own_name(&self, name: &str, flags: NameFlag) -> Result<u32, TransportError> {
        if !is_bus_name(name) || is_unique_name(name) {
            return Err(TransportError::new(TransportErrorKind::InvalidBusName(
                name.into(),
            )));
        }

        let mut state = self.state.lock();
        let id = state.allocate_id();

        let Some(daemon) = state.buses.get_mut(&self.bus) else {
            return Err(Self::closed());
        };

        if !daemon.peers.contains_key(&self.peer) {
            return Err(Self::closed());
        }

        daemon.request_name(
            name,
            Owner {
                peer: self.peer,
                flags,
                id,
            },
        );

        Ok(id.get())
    }

    fn register_object(
        &self,
        path: &str,
        interface: InterfaceInfo,
        handler: Arc<dyn ObjectHandler>,
    ) -> Result<u32, TransportError> {
        if !is_object_path(path) {
            return Err(TransportError::new(TransportErrorKind::InvalidObjectPath(
                path.into(),
            )));
        }

        if !is_interface_name(&interface.name) {
            return Err(TransportError::new(
                TransportErrorKind::InvalidInterfaceName(interface.name),
            ));
        }

        let mut state = self.state.lock();
        let id = state.allocate_id();

        let Some(peer) = state
            .buses
            .get_mut(&self.bus)
            .and_then(|daemon| daemon.peers.get_mut(&self.peer))
        else {
            return Err(Self::closed());
        };

        let key = (Box::<str>::from(path), interface.name.clone());

        if peer.objects.contains_key(&key) {
            return Err(TransportError::new(TransportErrorKind::ObjectExists {
                path: key.0,
                interface: key.1,
            }));
        }

        peer.objects.insert(key, Object { interface, handler });
        Ok(id.get())
    }

    fn close(&self) {
        // Handlers of the removed peer may own links of their own, which lock
        // the bus state when dropped. So the peer is dropped after the lock is
        // released.
        let peer = {
            let mut state = self.state.lock();

            match state.buses.get_mut(&self.bus) {
                Some(daemon) => daemon.remove_peer(self.peer),
                None => None,
            }
        };

        if peer.is_some() {
            debug!(bus = %self.bus, unique_name = &*self.unique_name, "Peer disconnected");
        }
    }

    fn is_closed(&self) -> bool {
        let state = self.state.lock();

        match state.buses.get(&self.bus) {
            Some(daemon) => !daemon.peers.contains_key(&self.peer),
            None => true,
        }
    }
}

impl Drop for LocalLink {
    fn drop(&mut self) {
        self.close();
    }
}
