use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::transport::{MethodCall, MethodReply, ObjectHandler, ERROR_FAILED, ERROR_UNKNOWN_METHOD};

use super::{Dispatch, DispatchKey, DispatchTable, ObjectBridge, Reply};

const PATH: &str = "/com/example/Test";
const INTERFACE: &str = "com.example.Test";

fn call(member: &str) -> MethodCall {
    MethodCall {
        sender: ":1.1".into(),
        path: PATH.into(),
        interface: INTERFACE.into(),
        member: member.into(),
    }
}

#[test]
fn key_format() {
    let key = DispatchKey::new(PATH, INTERFACE, "Ping");
    assert_eq!(key.as_str(), "/com/example/Test/com.example.Test.Ping");
    assert_eq!(key, DispatchKey::new(PATH, INTERFACE, "Ping"));
    assert_eq!(key.to_string(), key.as_str());
}

#[test]
fn key_injective() {
    let paths = ["/", "/a", "/a/b", "/a_b", "/com/example"];
    let interfaces = ["a.b", "a.b.c", "com.example.Test", "b.c"];
    let methods = ["Ping", "c", "b_c", "Ping2"];

    let mut seen = HashSet::new();

    for path in paths {
        for interface in interfaces {
            for method in methods {
                let key = DispatchKey::new(path, interface, method);
                assert!(
                    seen.insert(key.clone()),
                    "{key} produced by more than one triple"
                );
            }
        }
    }
}

#[test]
fn dispatch_invokes_once() {
    let table = DispatchTable::new();
    let count = Arc::new(AtomicUsize::new(0));

    let c = count.clone();

    table.register(PATH, INTERFACE, "Ping", move |path, interface, method| {
        assert_eq!(path, PATH);
        assert_eq!(interface, INTERFACE);
        assert_eq!(method, "Ping");
        c.fetch_add(1, Ordering::SeqCst);
        Ok(Reply::Bool(true))
    });

    let outcome = table.dispatch(PATH, INTERFACE, "Ping");
    assert!(outcome.found());
    assert_eq!(outcome.reply(), Some(&Reply::Bool(true)));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn dispatch_not_found() {
    let table = DispatchTable::new();
    let count = Arc::new(AtomicUsize::new(0));

    let c = count.clone();

    table.register(PATH, INTERFACE, "Ping", move |_, _, _| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(Reply::Bool(true))
    });

    let outcome = table.dispatch(PATH, INTERFACE, "Pong");
    assert!(!outcome.found());
    assert!(outcome.reply().is_none());

    let outcome = table.dispatch("/com/example/Other", INTERFACE, "Ping");
    assert!(!outcome.found());

    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn register_replaces() {
    let table = DispatchTable::new();

    table.register(PATH, INTERFACE, "Ping", |_, _, _| Ok(Reply::from("first")));
    table.register(PATH, INTERFACE, "Ping", |_, _, _| Ok(Reply::from("second")));

    assert_eq!(table.len(), 1);

    let outcome = table.dispatch(PATH, INTERFACE, "Ping");
    assert_eq!(outcome.reply(), Some(&Reply::from("second")));
}

#[test]
fn handler_failure() {
    let table = DispatchTable::new();

    table.register(PATH, INTERFACE, "Ping", |_, _, _| Err("device unplugged".into()));

    let outcome = table.dispatch(PATH, INTERFACE, "Ping");
    assert!(outcome.found());
    assert!(outcome.reply().is_none());
    assert!(matches!(&outcome, Dispatch::Failed(error) if error.to_string() == "device unplugged"));
}

#[test]
fn handler_registers_handler() {
    let table = Arc::new(DispatchTable::new());
    let inner = table.clone();

    table.register(PATH, INTERFACE, "Install", move |_, _, _| {
        inner.register(PATH, INTERFACE, "Ping", |_, _, _| Ok(Reply::Bool(true)));
        Ok(Reply::Bool(true))
    });

    assert!(!table.contains(PATH, INTERFACE, "Ping"));
    assert!(table.dispatch(PATH, INTERFACE, "Install").found());
    assert!(table.contains(PATH, INTERFACE, "Ping"));
    assert_eq!(table.len(), 2);
}

#[test]
fn bridge_replies() {
    let table = Arc::new(DispatchTable::new());

    table.register(PATH, INTERFACE, "Ping", |_, _, _| Ok(Reply::Bool(true)));
    table.register(PATH, INTERFACE, "Fail", |_, _, _| Err("broken".into()));

    let bridge = ObjectBridge::new(table);

    assert_eq!(
        bridge.method_call(&call("Ping")),
        MethodReply::Return(Reply::Bool(true))
    );

    assert_eq!(
        bridge.method_call(&call("Fail")),
        MethodReply::error(ERROR_FAILED, "broken")
    );

    assert!(matches!(
        bridge.method_call(&call("Missing")),
        MethodReply::Error { name, .. } if &*name == ERROR_UNKNOWN_METHOD
    ));
}

#[test]
fn reply_signature() {
    assert_eq!(Reply::from("x").signature(), "s");
    assert_eq!(Reply::from(String::from("x")).signature(), "s");
    assert_eq!(Reply::from(false).signature(), "b");
}
