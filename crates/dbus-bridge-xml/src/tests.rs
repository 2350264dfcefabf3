use crate::error::ErrorKind;
use crate::{parse_node, Access, Direction, Result};

const SIMPLE: &str = r#"
<!DOCTYPE node PUBLIC
    "-//freedesktop//DTD D-BUS Object Introspection 1.0//EN"
    "http://www.freedesktop.org/standards/dbus/1.0/introspect.dtd" >
<node xmlns:doc="http://www.freedesktop.org/dbus/1.0/doc.dtd">
  <interface name="com.example.MyService1.InterestingInterface">
    <method name="AddContact">
      <arg name="name" direction="in" type="s">
        <doc:doc><doc:summary>Name of new contact</doc:summary></doc:doc>
      </arg>
      <arg name="email" direction="in" type="s">
        <doc:doc><doc:summary>E-mail address of new contact</doc:summary></doc:doc>
      </arg>
      <arg name="id" direction="out" type="u">
        <doc:doc><doc:summary>ID of newly added contact</doc:summary></doc:doc>
      </arg>
      <doc:doc>
        <doc:description>
          <doc:para>
            Adds a new contact to the address book with their name and
            e-mail address.
          </doc:para>
        </doc:description>
      </doc:doc>
    </method>
  </interface>
</node>
"#;

const MENDER: &str = r#"
<node name="/io/mender/AuthenticationManager">
  <!-- Authentication manager -->
  <interface name="io.mender.Authentication1">
    <annotation name="org.freedesktop.DBus.Deprecated" value="false"/>
    <method name="GetJwtToken">
      <arg type="s" name="token" direction="out"/>
      <arg type="s" name="server_url" direction="out"/>
    </method>
    <method name="FetchJwtToken">
      <arg type="b" name="success" direction="out"/>
    </method>
    <signal name="JwtTokenStateChange">
      <arg type="s" name="token"/>
      <arg type="s" name="server_url"/>
    </signal>
    <property name="Ready" type="b" access="read"/>
  </interface>
  <interface name="io.mender.Update1">
    <method name="SetUpdateControlMap">
      <arg type="s" name="update_control_map"/>
      <arg type="i" name="refresh_timeout" direction="out"/>
    </method>
  </interface>
  <node name="child"/>
</node>
"#;

const TELEPATHY: &str = r#"
<node name="/Connection" xmlns:tp="http://telepathy.freedesktop.org/wiki/DbusSpec#extensions-v0">
  <tp:copyright>Copyright (C) 2005-2009 Collabora Limited</tp:copyright>
  <interface name="org.freedesktop.Telepathy.Connection">
    <tp:docstring xmlns="http://www.w3.org/1999/xhtml">
      <p>A connection to a <em>single</em> account.</p>
    </tp:docstring>
    <method name="Connect" tp:name-for-bindings="Connect">
      <tp:docstring>Request that the connection be established.</tp:docstring>
    </method>
    <method name="GetStatus" tp:name-for-bindings="Get_Status">
      <arg name="Status" type="u" direction="out" tp:type="Connection_Status"/>
      <annotation name="org.freedesktop.DBus.Deprecated" value="true"/>
    </method>
    <signal name="StatusChanged" tp:name-for-bindings="Status_Changed">
      <arg name="Status" type="u" tp:type="Connection_Status"/>
    </signal>
    <tp:enum name="Connection_Status" type="u">
      <tp:enumvalue suffix="Connected" value="0"/>
    </tp:enum>
  </interface>
</node>
"#;

#[test]
fn test_simple() -> Result<()> {
    let node = parse_node(SIMPLE)?;
    assert_eq!(
        node.interfaces[0].name,
        "com.example.MyService1.InterestingInterface"
    );

    let method = &node.interfaces[0].methods[0];
    assert_eq!(method.name, "AddContact");
    assert_eq!(method.in_signature(), "ss");
    assert_eq!(method.out_signature(), "u");
    assert_eq!(method.arguments[0].doc.summary, Some("Name of new contact"));
    assert!(method.doc.description.paragraph.is_some());
    Ok(())
}

#[test]
fn test_members() -> Result<()> {
    let node = parse_node(MENDER)?;
    assert_eq!(node.name, Some("/io/mender/AuthenticationManager"));
    assert_eq!(node.interfaces.len(), 2);
    assert_eq!(&node.nodes[..], &["child"]);

    let auth = &node.interfaces[0];
    assert_eq!(auth.name, "io.mender.Authentication1");
    assert_eq!(auth.annotations.len(), 1);
    assert_eq!(auth.methods.len(), 2);
    assert_eq!(auth.signals[0].arguments.len(), 2);
    assert_eq!(auth.signals[0].arguments[0].direction, Direction::Out);
    assert_eq!(auth.properties[0].access, Access::Read);

    let fetch = auth.method("FetchJwtToken").expect("missing method");
    assert_eq!(fetch.out_signature(), "b");
    assert!(auth.method("Missing").is_none());

    // Direction of method arguments defaults to `in`.
    let update = &node.interfaces[1].methods[0];
    assert_eq!(update.in_signature(), "s");
    assert_eq!(update.out_signature(), "i");
    Ok(())
}

#[test]
fn test_empty_node() -> Result<()> {
    let node = parse_node(r#"<node xmlns="http://example.com"/>"#)?;
    assert!(node.interfaces.is_empty());
    Ok(())
}

#[test]
fn test_unterminated() {
    let error = parse_node(r#"<node><interface name="com.example.Test">"#).unwrap_err();
    assert!(!error.to_string().is_empty());

    assert!(parse_node(r#"<node><interface name="com.example.Test"#).is_err());
}

#[test]
fn test_missing_root() {
    let error = parse_node("").unwrap_err();
    assert_eq!(error.kind(), &ErrorKind::MissingRoot);
}

#[test]
fn test_unsupported_root() {
    let error = parse_node(r#"<object name="x"/>"#).unwrap_err();
    assert_eq!(
        error.kind(),
        &ErrorKind::UnsupportedElementStart("object".into())
    );
    assert_eq!(error.path(), "");
}

#[test]
fn test_foreign_elements() -> Result<()> {
    let node = parse_node(TELEPATHY)?;
    assert_eq!(node.interfaces.len(), 1);

    let interface = &node.interfaces[0];
    assert_eq!(interface.name, "org.freedesktop.Telepathy.Connection");
    assert_eq!(interface.methods.len(), 2);
    assert_eq!(interface.signals.len(), 1);

    let connect = interface.method("Connect").expect("missing method");
    assert_eq!(connect.in_signature(), "");
    assert_eq!(connect.out_signature(), "");

    let status = interface.method("GetStatus").expect("missing method");
    assert_eq!(status.out_signature(), "u");
    assert_eq!(status.annotations.len(), 1);
    Ok(())
}

#[test]
fn test_foreign_element_mismatch() {
    let error = parse_node(
        r#"<node><interface name="a.b"><tp:docstring>text</tp:flags></interface></node>"#,
    )
    .unwrap_err();

    assert_eq!(
        error.kind(),
        &ErrorKind::MismatchingEnd {
            expected: "docstring".into(),
            actual: "flags".into(),
        }
    );
}

#[test]
fn test_missing_interface_name() {
    let error = parse_node(r#"<node><interface></interface></node>"#).unwrap_err();
    assert_eq!(error.kind(), &ErrorKind::MissingInterfaceName);
    assert_eq!(error.path(), "node/interface");
}

#[test]
fn test_bad_direction() {
    let error = parse_node(
        r#"<node><interface name="a.b"><method name="M"><arg type="s" direction="up"/></method></interface></node>"#,
    )
    .unwrap_err();

    assert_eq!(
        error.kind(),
        &ErrorKind::UnsupportedArgumentDirection("up".into())
    );
}

#[test]
fn test_signal_in_argument() {
    let error = parse_node(
        r#"<node><interface name="a.b"><signal name="S"><arg type="s" direction="in"/></signal></interface></node>"#,
    )
    .unwrap_err();

    assert_eq!(error.kind(), &ErrorKind::SignalArgumentDirection);
}

#[test]
fn test_argument_signatures() {
    fn arg(ty: &str) -> String {
        format!(
            r#"<node><interface name="a.b"><method name="M"><arg type="{ty}"/></method></interface></node>"#
        )
    }

    for ty in ["s", "a{sv}", "(ib)", "aas", "a(sa{ss})", "v", "h"] {
        assert!(parse_node(&arg(ty)).is_ok(), "{ty} should be valid");
    }

    for ty in ["", "ss", "a", "()", "(i", "{sv}", "a{vs}", "a{s}", "z"] {
        let error = parse_node(&arg(ty)).unwrap_err();
        assert!(
            matches!(error.kind(), ErrorKind::Signature(..)),
            "{ty} should be invalid: {error}"
        );
    }
}
