use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use dbus_bridge::transport::MethodReply;
use dbus_bridge::{BusType, Context, LocalBus, NameFlag, Reply};
use dbus_bridge_demos::{init_tracing, NAME, PATH};

const INTERFACE: &str = "se.tedro.DBusExample.Pingable";

const XML: &str = r#"
<node>
  <interface name="se.tedro.DBusExample.Pingable">
    <method name="Ping">
      <arg name="reply" type="s" direction="out"/>
    </method>
    <method name="IsBusy">
      <arg name="busy" type="b" direction="out"/>
    </method>
    <method name="Explode">
      <arg name="never" type="b" direction="out"/>
    </method>
  </interface>
</node>
"#;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let bus = LocalBus::new();
    let cx = Context::new(bus.clone());

    let c = cx.connect(BusType::Session)?;
    cx.own_name(&c, NAME, NameFlag::DO_NOT_QUEUE)?;
    cx.register_interface(&c, PATH, XML)?;

    let pings = Arc::new(AtomicU32::new(0));
    let counter = pings.clone();

    cx.register_handler(PATH, INTERFACE, "Ping", move |_, _, _| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Reply::from(format!("pong #{n}")))
    });

    cx.register_handler(PATH, INTERFACE, "IsBusy", |_, _, _| Ok(Reply::Bool(false)));

    cx.register_handler(PATH, INTERFACE, "Explode", |_, _, _| {
        Err("the server refuses to explode".into())
    });

    let main_loop = cx.main_loop();
    main_loop.run();
    let _guard = main_loop.quit_on_drop();

    for method in ["Ping", "Ping", "IsBusy", "Explode", "Unknown"] {
        match bus.call(BusType::Session, NAME, PATH, INTERFACE, method).await {
            MethodReply::Return(reply) => println!("{method}: {reply:?}"),
            MethodReply::Error { name, message } => println!("{method}: {name}: {message}"),
        }
    }

    if pings.load(Ordering::SeqCst) != 2 {
        bail!("Expected two pings to be served");
    }

    Ok(())
}
