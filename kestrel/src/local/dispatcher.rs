use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};

/// Execution resource shared by every cell of one actor system.
///
/// A dispatch pass is an ordinary task: the producer that wins a mailbox's
/// idle-to-busy transition hands the pass to the dispatcher instead of
/// running it inline. When constructed inside a Tokio runtime the dispatcher
/// adopts that runtime; otherwise it builds a dedicated worker pool.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

enum DispatcherInner {
    Adopted(Handle),
    Owned(Runtime),
}

impl Dispatcher {
    pub fn new(worker_threads: Option<usize>) -> Self {
        let inner = match Handle::try_current() {
            Ok(handle) => DispatcherInner::Adopted(handle),
            Err(_) => {
                let runtime = Builder::new_multi_thread()
                    .worker_threads(worker_threads.unwrap_or_else(num_cpus::get))
                    .thread_name("kestrel-worker")
                    .enable_all()
                    .build()
                    .expect("failed to build dispatcher runtime");
                DispatcherInner::Owned(runtime)
            }
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn handle(&self) -> &Handle {
        match &*self.inner {
            DispatcherInner::Adopted(handle) => handle,
            DispatcherInner::Owned(runtime) => runtime.handle(),
        }
    }

    /// Schedules a unit of work on the shared pool.
    pub fn execute<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle().spawn(fut);
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.inner {
            DispatcherInner::Adopted(_) => write!(f, "Dispatcher(adopted)"),
            DispatcherInner::Owned(_) => write!(f, "Dispatcher(owned)"),
        }
    }
}
