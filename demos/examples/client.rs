use anyhow::{Context as _, Result};
use dbus_bridge::transport::MethodReply;
use dbus_bridge::{BusType, Connection, Context, LocalBus, NameFlag, Reply};
use dbus_bridge_demos::{init_tracing, NAME, PATH};

const INTERFACE: &str = "se.tedro.DBusExample.Named";

const XML: &str = r#"
<node>
  <interface name="se.tedro.DBusExample.Named">
    <method name="WhoAmI">
      <arg name="name" type="s" direction="out"/>
    </method>
  </interface>
</node>
"#;

/// Start a service answering `WhoAmI` with `label`.
fn service(bus: &LocalBus, label: &'static str, flags: NameFlag) -> Result<(Context, Connection)> {
    let cx = Context::builder()
        .transport(bus.clone())
        .loop_thread_name(label)
        .build();

    let c = cx.connect(BusType::Session)?;
    cx.own_name(&c, NAME, flags)?;
    cx.register_interface(&c, PATH, XML)?;
    cx.register_handler(PATH, INTERFACE, "WhoAmI", move |_, _, _| Ok(Reply::from(label)));
    Ok((cx, c))
}

fn who_am_i(bus: &LocalBus) -> Result<String> {
    match bus.call_blocking(BusType::Session, NAME, PATH, INTERFACE, "WhoAmI") {
        MethodReply::Return(Reply::String(name)) => Ok(name),
        reply => anyhow::bail!("Unexpected reply: {reply:?}"),
    }
}

fn main() -> Result<()> {
    init_tracing();

    let bus = LocalBus::new();

    let (first, _first_conn) = service(&bus, "first", NameFlag::ALLOW_REPLACEMENT)?;
    let first_loop = first.main_loop();
    first_loop.run();

    println!("owner: {}", who_am_i(&bus)?);

    let (second, _second_conn) = service(&bus, "second", NameFlag::REPLACE_EXISTING)?;
    let second_loop = second.main_loop();
    second_loop.run();

    println!("owner: {}", who_am_i(&bus)?);

    let owner = bus
        .name_owner(BusType::Session, NAME)
        .context("name has no owner")?;
    println!("unique name of owner: {owner}");

    second_loop.quit();
    first_loop.quit();
    Ok(())
}
