//! Parser for D-Bus introspection descriptors.
//!
//! ```
//! let node = dbus_bridge_xml::parse_node(r#"
//! <node>
//!   <interface name="com.example.Test">
//!     <method name="Ping">
//!       <arg name="ok" type="b" direction="out"/>
//!     </method>
//!   </interface>
//! </node>
//! "#)?;
//!
//! assert_eq!(node.interfaces[0].name, "com.example.Test");
//! assert_eq!(node.interfaces[0].methods[0].out_signature(), "b");
//! # Ok::<_, dbus_bridge_xml::Error>(())
//! ```

#[cfg(test)]
mod tests;

pub use self::error::{Error, Result};
mod error;

pub use self::elements::{
    Access, Annotation, Argument, Description, Direction, Doc, Interface, Method, Node, Property,
    Signal,
};
mod elements;

pub use self::parser::parse_node;
mod parser;

mod signature;
