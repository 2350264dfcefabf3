//! The event loop servicing inbound bus events.


use std::fmt;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::transport::Event;
use crate::NameEvent;

/// The state of a [`MainLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// The loop has been constructed but never run.
    Created,
    /// The loop is servicing events.
    Running,
    /// The loop has been stopped. It can be run again.
    Stopped,
}

impl fmt::Display for LoopState {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopState::Created => write!(f, "created"),
            LoopState::Running => write!(f, "running"),
            LoopState::Stopped => write!(f, "stopped"),
        }
    }
}

/// An event loop delivering method calls to their handlers and reporting
/// name ownership changes.
///
/// Events are serviced on a dedicated thread while the loop is running.
/// Events which arrive while it is not running are kept and serviced once it
/// is run again.
///
/// The loop stops by itself once every sender of the event queue is gone.
///
/// Cloning the loop produces another handle to the same loop. Dropping the
/// last handle to a running loop stops it.
#[derive(Clone)]
pub struct MainLoop {
    inner: Arc<Inner>,
}

struct Inner {
    receiver: Arc<tokio::sync::Mutex<UnboundedReceiver<Event>>>,
    thread_name: Box<str>,
    shared: Mutex<Shared>,
}

struct Shared {
    state: LoopState,
    /// Incremented every time a loop thread is spawned.
    generation: u64,
    quit: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MainLoop {
    pub(crate) fn new(
        receiver: Arc<tokio::sync::Mutex<UnboundedReceiver<Event>>>,
        thread_name: Box<str>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                receiver,
                thread_name,
                shared: Mutex::new(Shared {
                    state: LoopState::Created,
                    generation: 0,
                    quit: None,
                    thread: None,
                }),
            }),
        }
    }

    /// Start servicing events on a separate thread and return immediately.
    ///
    /// This has no effect if the loop is already running. Failing to start
    /// the loop is logged and leaves its state unchanged.
    pub fn run(&self) {
        let mut shared = self.inner.shared.lock();

        if shared.state == LoopState::Running {
            return;
        }

        let (quit_tx, quit_rx) = oneshot::channel();
        let receiver = self.inner.receiver.clone();
        let inner = Arc::downgrade(&self.inner);
        let generation = shared.generation.wrapping_add(1);

        let result = thread::Builder::new()
            .name(self.inner.thread_name.to_string())
            .spawn(move || {
                service(receiver, quit_rx);
                finished(&inner, generation);
            });

        let thread = match result {
            Ok(thread) => thread,
            Err(error) => {
                error!(%error, "Failed to spawn main loop thread");
                return;
            }
        };

        shared.state = LoopState::Running;
        shared.generation = generation;
        shared.quit = Some(quit_tx);
        shared.thread = Some(thread);
        info!(thread = &*self.inner.thread_name, "Main loop running");
    }

    /// Stop servicing events.
    ///
    /// A handler which is currently running is allowed to complete, and once
    /// this returns no further events are delivered. When called from a
    /// handler the loop stops as soon as that handler returns. This has no
    /// effect if the loop is not running.
    pub fn quit(&self) {
        let thread = {
            let mut shared = self.inner.shared.lock();

            if shared.state != LoopState::Running {
                return;
            }

            if let Some(quit) = shared.quit.take() {
                // The loop thread may already have exited.
                _ = quit.send(());
            }

            shared.state = LoopState::Stopped;
            shared.thread.take()
        };

        if let Some(thread) = thread {
            if thread.thread().id() != thread::current().id() && thread.join().is_err() {
                error!("Main loop thread panicked");
            }
        }

        info!("Main loop stopped");
    }

    /// Construct a guard which quits the loop when dropped, also when
    /// unwinding.
    pub fn quit_on_drop(&self) -> QuitGuard {
        QuitGuard {
            main_loop: self.clone(),
        }
    }

    /// The current state of the loop.
    pub fn state(&self) -> LoopState {
        self.inner.shared.lock().state
    }

    /// Test if the loop is running.
    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }
}

impl fmt::Debug for MainLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainLoop")
            .field("thread_name", &self.inner.thread_name)
            .field("state", &self.state())
            .finish()
    }
}

/// Quits the [`MainLoop`] it was constructed from when dropped.
///
/// See [`MainLoop::quit_on_drop`].
#[must_use = "the loop is stopped as soon as the guard is dropped"]
pub struct QuitGuard {
    main_loop: MainLoop,
}

impl Drop for QuitGuard {
    fn drop(&mut self) {
        self.main_loop.quit();
    }
}

/// Body of the loop thread.
fn service(
    receiver: Arc<tokio::sync::Mutex<UnboundedReceiver<Event>>>,
    mut quit: oneshot::Receiver<()>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            error!(%error, "Failed to build main loop runtime");
            return;
        }
    };

    runtime.block_on(async move {
        // A restarted loop waits here until the previous thread has exited.
        let mut receiver = receiver.lock().await;

        loop {
            tokio::select! {
                biased;
                _ = &mut quit => break,
                event = receiver.recv() => match event {
                    Some(event) => handle(event),
                    None => {
                        debug!("Event queue closed");
                        break;
                    }
                },
            }
        }
    });
}

/// Mark the loop as stopped if the thread of `generation` exited without
/// being asked to.
fn finished(inner: &Weak<Inner>, generation: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };

    let mut shared = inner.shared.lock();

    if shared.generation != generation || shared.state != LoopState::Running {
        return;
    }

    shared.state = LoopState::Stopped;
    shared.quit = None;
    // Detaches the current thread.
    shared.thread = None;
    drop(shared);

    info!("Main loop stopped");
}

fn handle(event: Event) {
    match event {
        Event::MethodCall {
            call,
            handler,
            reply,
        } => {
            let response = handler.method_call(&call);

            if reply.send(response).is_err() {
                debug!(
                    sender = &*call.sender,
                    method = &*call.member,
                    "Caller went away before the reply was sent"
                );
            }
        }
        Event::Name(NameEvent::Acquired { id, name }) => {
            info!(name = &*name, %id, "Acquired name");
        }
        Event::Name(NameEvent::Lost { id, name }) => {
            info!(name = &*name, %id, "Lost name");
        }
    }
}
