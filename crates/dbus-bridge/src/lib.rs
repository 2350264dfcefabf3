//! A small binding layer over a D-Bus message bus.
//!
//! This crate lets a host application:
//! * Connect to the session or system bus.
//! * Own well-known names.
//! * Export objects implementing an interface described by introspection XML.
//! * Route inbound method calls to handlers registered by object path,
//!   interface and method name.
//!
//! Inbound calls are serviced by a [`MainLoop`] on a thread of its own.
//!
//! The bus itself is reached through the [`Transport`] capability set.
//! [`LocalBus`] implements it with a bus hosted inside the current process.
//!
//! ## Examples
//!
//! ```
//! use dbus_bridge::{BusType, Context, LocalBus, NameFlag, Reply};
//! use dbus_bridge::transport::MethodReply;
//!
//! const XML: &str = r#"
//! <node>
//!   <interface name="com.example.Test">
//!     <method name="Ping">
//!       <arg name="ok" type="b" direction="out"/>
//!     </method>
//!   </interface>
//! </node>
//! "#;
//!
//! let bus = LocalBus::new();
//! let cx = Context::new(bus.clone());
//!
//! let c = cx.connect(BusType::Session)?;
//! cx.own_name(&c, "com.example.Test", NameFlag::NONE)?;
//! cx.register_interface(&c, "/com/example/Test", XML)?;
//!
//! cx.register_handler("/com/example/Test", "com.example.Test", "Ping", |_, _, _| {
//!     Ok(Reply::Bool(true))
//! });
//!
//! let main_loop = cx.main_loop();
//! main_loop.run();
//!
//! let reply = bus.call_blocking(
//!     BusType::Session,
//!     "com.example.Test",
//!     "/com/example/Test",
//!     "com.example.Test",
//!     "Ping",
//! );
//!
//! assert_eq!(reply, MethodReply::Return(Reply::Bool(true)));
//! main_loop.quit();
//! # Ok::<_, dbus_bridge::Error>(())
//! ```
//!
//! [`Transport`]: crate::transport::Transport

#[macro_use]
mod macros;

#[doc(inline)]
pub use self::bus_type::BusType;
mod bus_type;

#[doc(inline)]
pub use self::error::{Error, Result};
mod error;

#[doc(inline)]
pub use self::guid::{generate_guid, is_guid, Guid};
mod guid;

#[doc(inline)]
pub use self::names::{
    is_bus_name, is_interface_name, is_member_name, is_unique_name, NameEvent, NameFlag,
    RegistrationId,
};
mod names;

#[doc(inline)]
pub use self::object_path::is_object_path;
mod object_path;

#[doc(inline)]
pub use self::transport::TransportError;
pub mod transport;

#[doc(inline)]
pub use self::dispatch::{Dispatch, DispatchKey, DispatchTable, HandlerError, MethodCallback, Reply};
mod dispatch;

#[doc(inline)]
pub use self::connection::Connection;
mod connection;

#[doc(inline)]
pub use self::context::{Context, ContextBuilder};
mod context;

#[doc(inline)]
pub use self::main_loop::{LoopState, MainLoop, QuitGuard};
mod main_loop;

#[doc(inline)]
pub use self::local::{LocalBus, LocalBusBuilder};
mod local;
