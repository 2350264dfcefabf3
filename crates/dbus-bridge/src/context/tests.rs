use std::sync::Arc;

use crate::transport::{EventSender, InterfaceInfo, Link, ObjectHandler, Transport, TransportError};
use crate::{BusType, Context, LocalBus, NameFlag, Reply};

const PATH: &str = "/com/example/Test";
const INTERFACE: &str = "com.example.Test";

const XML: &str = r#"
<node>
  <interface name="com.example.Test">
    <method name="Ping">
      <arg name="ok" type="b" direction="out"/>
    </method>
  </interface>
</node>
"#;

/// A transport whose requests are issued but never assigned an identifier.
struct ZeroTransport;

struct ZeroLink;

impl Transport for ZeroTransport {
    fn connect(&self, _: BusType, _: EventSender) -> Result<Arc<dyn Link>, TransportError> {
        Ok(Arc::new(ZeroLink))
    }
}

impl Link for ZeroLink {
    fn unique_name(&self) -> &str {
        ":1.1"
    }

    fn own_name(&self, _: &str, _: NameFlag) -> Result<u32, TransportError> {
        Ok(0)
    }

    fn register_object(
        &self,
        _: &str,
        _: InterfaceInfo,
        _: Arc<dyn ObjectHandler>,
    ) -> Result<u32, TransportError> {
        Ok(0)
    }

    fn close(&self) {}

    fn is_closed(&self) -> bool {
        false
    }
}

struct Unreachable;

impl Transport for Unreachable {
    fn connect(&self, bus: BusType, _: EventSender) -> Result<Arc<dyn Link>, TransportError> {
        Err(TransportError::other(format!("no {bus} bus socket")))
    }
}

#[test]
fn connect() -> anyhow::Result<()> {
    let cx = Context::new(LocalBus::new());

    let c = cx.connect(BusType::Session)?;
    assert_eq!(c.bus_type(), BusType::Session);
    assert!(c.unique_name().starts_with(":1."));
    assert!(!c.is_closed());

    c.close();
    assert!(c.is_closed());
    Ok(())
}

#[test]
fn connect_failure() {
    let cx = Context::new(Unreachable);

    let Err(error) = cx.connect(BusType::System) else {
        panic!("expected connection to fail");
    };

    assert!(error.is_connection());
    assert!(error.to_string().contains("no system bus socket"));
}

#[test]
fn connect_unserved_bus() {
    let cx = Context::new(LocalBus::builder().session().build());
    assert!(cx.connect(BusType::Session).is_ok());

    let Err(error) = cx.connect(BusType::System) else {
        panic!("expected connection to fail");
    };

    assert!(error.is_connection());
}

#[test]
fn default_builder() -> anyhow::Result<()> {
    let cx = Context::builder().build();
    let c = cx.connect(BusType::System)?;
    assert_eq!(c.bus_type(), BusType::System);
    Ok(())
}

#[test]
fn own_name() -> anyhow::Result<()> {
    let cx = Context::new(LocalBus::new());
    let c = cx.connect(BusType::Session)?;

    let a = cx.own_name(&c, "com.example.Test", NameFlag::NONE)?;
    let b = cx.own_name(&c, "com.example.Other", NameFlag::DO_NOT_QUEUE)?;
    assert_ne!(a, b);
    Ok(())
}

#[test]
fn own_name_do_not_queue() -> anyhow::Result<()> {
    let bus = LocalBus::new();
    let cx = Context::new(bus.clone());
    let a = cx.connect(BusType::Session)?;
    let b = cx.connect(BusType::Session)?;

    cx.own_name(&a, "com.example.Test", NameFlag::NONE)?;

    // The request itself succeeds even though the name will not be granted.
    let id = cx.own_name(&b, "com.example.Test", NameFlag::DO_NOT_QUEUE)?;
    assert!(id.get() > 0);

    assert_eq!(
        bus.name_owner(BusType::Session, "com.example.Test").as_deref(),
        Some(a.unique_name())
    );
    Ok(())
}

#[test]
fn own_name_failures() -> anyhow::Result<()> {
    let cx = Context::new(LocalBus::new());
    let c = cx.connect(BusType::Session)?;

    let Err(error) = cx.own_name(&c, "not a name", NameFlag::NONE) else {
        panic!("expected invalid name to fail");
    };

    assert!(error.is_ownership());

    c.close();

    let Err(error) = cx.own_name(&c, "com.example.Test", NameFlag::NONE) else {
        panic!("expected closed connection to fail");
    };

    assert!(error.is_ownership());

    let cx = Context::new(ZeroTransport);
    let c = cx.connect(BusType::Session)?;

    let Err(error) = cx.own_name(&c, "com.example.Test", NameFlag::NONE) else {
        panic!("expected zero id to fail");
    };

    assert!(error.is_ownership());
    Ok(())
}

#[test]
fn register_interface() -> anyhow::Result<()> {
    let cx = Context::new(LocalBus::new());
    let c = cx.connect(BusType::Session)?;

    let id = cx.register_interface(&c, PATH, XML)?;
    assert!(id.get() > 0);

    let Err(error) = cx.register_interface(&c, PATH, XML) else {
        panic!("expected duplicate registration to fail");
    };

    assert!(error.is_registration());

    let Err(error) = cx.register_interface(&c, "not/a/path", XML) else {
        panic!("expected invalid path to fail");
    };

    assert!(error.is_registration());
    Ok(())
}

#[test]
fn register_interface_zero_id() -> anyhow::Result<()> {
    let cx = Context::new(ZeroTransport);
    let c = cx.connect(BusType::Session)?;

    let Err(error) = cx.register_interface(&c, PATH, XML) else {
        panic!("expected zero id to fail");
    };

    assert!(error.is_registration());
    Ok(())
}

#[test]
fn register_malformed_interface() -> anyhow::Result<()> {
    let bus = LocalBus::new();
    let cx = Context::new(bus.clone());
    let c = cx.connect(BusType::Session)?;

    cx.register_handler(PATH, INTERFACE, "Ping", |_, _, _| Ok(Reply::Bool(true)));

    for xml in [
        "<node><interface name=\"com.example.Test\">",
        "<node><interface name=\"com.example.Test\"></node>",
        "<node><interface><method name=\"Ping\"/></interface></node>",
        "<node><interface name=\"com.example.Test\"><method name=\"Ping\"><arg type=\"zz\"/></method></interface></node>",
        "<bogus/>",
        "<node><interface name=\"com.example.Test\"><tp:docstring></interface></node>",
        "",
    ] {
        let Err(error) = cx.register_interface(&c, PATH, xml) else {
            panic!("expected {xml:?} to fail");
        };

        assert!(error.is_introspection(), "{xml:?}: {error}");
    }

    assert_eq!(cx.dispatch_table().len(), 1);

    // Nothing was bound, so the path is still free.
    cx.register_interface(&c, PATH, XML)?;
    Ok(())
}

#[test]
fn register_extended_interface() -> anyhow::Result<()> {
    const EXTENDED: &str = r#"
    <node xmlns:tp="http://telepathy.freedesktop.org/wiki/DbusSpec#extensions-v0">
      <interface name="com.example.Test">
        <tp:docstring>A test interface.</tp:docstring>
        <method name="Ping" tp:name-for-bindings="Ping">
          <arg name="ok" type="b" direction="out" tp:type="Bool"/>
        </method>
      </interface>
    </node>
    "#;

    let cx = Context::new(LocalBus::new());
    let c = cx.connect(BusType::Session)?;

    let id = cx.register_interface(&c, PATH, EXTENDED)?;
    assert!(id.get() > 0);

    // The interface is exported under its declared name.
    assert!(cx.register_interface(&c, PATH, XML).is_err());
    Ok(())
}

#[test]
fn register_missing_interface() -> anyhow::Result<()> {
    let cx = Context::new(LocalBus::new());
    let c = cx.connect(BusType::Session)?;

    let Err(error) = cx.register_interface(&c, PATH, "<node/>") else {
        panic!("expected descriptor without interface to fail");
    };

    assert!(error.is_introspection());
    Ok(())
}

#[test]
fn register_first_interface_only() -> anyhow::Result<()> {
    const MULTIPLE: &str = r#"
    <node>
      <interface name="com.example.First">
        <method name="Ping"><arg type="b" direction="out"/></method>
      </interface>
      <interface name="com.example.Second">
        <method name="Ping"><arg type="b" direction="out"/></method>
      </interface>
    </node>
    "#;

    let cx = Context::new(LocalBus::new());
    let c = cx.connect(BusType::Session)?;

    cx.register_interface(&c, PATH, MULTIPLE)?;

    // The second interface was never exported, so a descriptor declaring only
    // it can still be registered at the same path.
    const SECOND: &str = r#"
    <node>
      <interface name="com.example.Second">
        <method name="Ping"><arg type="b" direction="out"/></method>
      </interface>
    </node>
    "#;

    cx.register_interface(&c, PATH, SECOND)?;
    assert!(cx.register_interface(&c, PATH, MULTIPLE).is_err());
    Ok(())
}

#[test]
fn dispatch_through_context() {
    let cx = Context::new(LocalBus::new());

    assert!(!cx.dispatch(PATH, INTERFACE, "Ping").found());

    cx.register_handler(PATH, INTERFACE, "Ping", |_, _, _| Ok(Reply::from("pong")));

    let outcome = cx.dispatch(PATH, INTERFACE, "Ping");
    assert!(outcome.found());
    assert_eq!(outcome.reply(), Some(&Reply::from("pong")));

    // Clones share the same table.
    let other = cx.clone();
    assert!(other.dispatch(PATH, INTERFACE, "Ping").found());
}
