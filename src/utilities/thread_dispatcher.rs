/// Provides multithreading dispatch primitives and a thread count for the solver to use.
///
/// The solver does not need a load balancing parallel for. It only needs a way to start a
/// known number of workers and wait for all of them to return; the work distribution
/// happens inside the worker body through an atomic job counter.
pub trait IThreadDispatcher: Send + Sync {
    /// Gets the number of workers available in the thread dispatcher.
    fn thread_count(&self) -> usize;

    /// Runs `worker_body` once on each of at most `maximum_worker_count` workers, passing the
    /// worker index. Returns only after every dispatched worker has returned.
    fn dispatch_workers(&self, worker_body: &(dyn Fn(usize) + Sync), maximum_worker_count: usize);
}

/// Fixed pool of worker threads backed by a dedicated rayon pool.
#[cfg(feature = "parallel")]
pub struct ThreadDispatcher {
    pool: rayon::ThreadPool,
    thread_count: usize,
}

#[cfg(feature = "parallel")]
impl ThreadDispatcher {
    /// Creates a dispatcher owning `thread_count` worker threads.
    pub fn new(thread_count: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let thread_count = thread_count.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .thread_name(|index| format!("solver-worker-{index}"))
            .build()?;
        log::debug!("created thread dispatcher with {thread_count} workers");
        Ok(Self { pool, thread_count })
    }
}

#[cfg(feature = "parallel")]
impl IThreadDispatcher for ThreadDispatcher {
    #[inline(always)]
    fn thread_count(&self) -> usize {
        self.thread_count
    }

    fn dispatch_workers(&self, worker_body: &(dyn Fn(usize) + Sync), maximum_worker_count: usize) {
        let worker_count = maximum_worker_count.min(self.thread_count);
        if worker_count <= 1 {
            worker_body(0);
            return;
        }
        self.pool.broadcast(|context| {
            if context.index() < worker_count {
                worker_body(context.index());
            }
        });
    }
}
