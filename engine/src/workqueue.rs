use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Queue {
    jobs: VecDeque<Job>,
    shutdown: bool,
}

/// A fixed-size worker pool with an unbounded FIFO task queue and a
/// quiescence barrier.
///
/// `submit` enqueues work and returns immediately. `await_all` blocks the
/// caller until every submitted task has completed (or been abandoned by a
/// `shutdown`). Task panics are caught at the worker boundary, logged, and
/// never stop `pending` from being decremented — a stuck `await_all` would
/// otherwise hang the whole pipeline on one bad file or query.
///
/// Cheaply `Clone`-able: every clone shares the same queue, pending count,
/// and worker threads, so a task running on the pool can submit further
/// tasks onto the very same pool (the crawler needs this to fan a page's
/// discovered links back out as more crawl tasks).
#[derive(Clone)]
pub struct WorkQueue {
    queue: Arc<(Mutex<Queue>, Condvar)>,
    pending: Arc<(Mutex<usize>, Condvar)>,
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl WorkQueue {
    /// Spawns `threads` worker threads, each looping on the shared queue.
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let queue = Arc::new((
            Mutex::new(Queue {
                jobs: VecDeque::new(),
                shutdown: false,
            }),
            Condvar::new(),
        ));
        let pending = Arc::new((Mutex::new(0usize), Condvar::new()));

        let mut workers = Vec::with_capacity(threads);
        for idx in 0..threads {
            let queue = queue.clone();
            let pending = pending.clone();
            let handle = std::thread::Builder::new()
                .name(format!("work-queue-worker-{}", idx))
                .spawn(move || worker_loop(queue, pending))
                .expect("spawn work queue worker thread");
            workers.push(handle);
        }

        Self {
            queue,
            pending,
            workers: Arc::new(Mutex::new(workers)),
        }
    }

    /// Enqueues `task`. Wait-free aside from the brief critical sections on
    /// the queue and pending-count locks.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let (lock, _) = &*self.pending;
            let mut pending = lock.lock().expect("pending lock poisoned");
            *pending += 1;
        }

        let (lock, cond) = &*self.queue;
        let mut queue = lock.lock().expect("queue lock poisoned");
        queue.jobs.push_back(Box::new(task));
        cond.notify_one();
    }

    /// Blocks the caller until `pending == 0`.
    pub fn await_all(&self) {
        let (lock, cond) = &*self.pending;
        let mut pending = lock.lock().expect("pending lock poisoned");
        while *pending != 0 {
            pending = cond.wait(pending).expect("pending lock poisoned");
        }
    }

    /// Requests workers stop after draining their current task. Any task
    /// still sitting in the queue is abandoned, not run. Safe to call from
    /// any clone; joins happen once (later calls find an empty handle
    /// list).
    pub fn shutdown(&self) {
        {
            let (lock, cond) = &*self.queue;
            let mut queue = lock.lock().expect("queue lock poisoned");
            queue.shutdown = true;
            cond.notify_all();
        }

        let mut workers = self.workers.lock().expect("workers lock poisoned");
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    queue: Arc<(Mutex<Queue>, Condvar)>,
    pending: Arc<(Mutex<usize>, Condvar)>,
) {
    loop {
        let job = {
            let (lock, cond) = &*queue;
            let mut guard = lock.lock().expect("queue lock poisoned");
            loop {
                if guard.shutdown {
                    break None;
                }
                if let Some(job) = guard.jobs.pop_front() {
                    break Some(job);
                }
                guard = cond.wait(guard).expect("queue lock poisoned");
            }
        };

        let job = match job {
            Some(job) => job,
            None => return,
        };

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "worker task panicked".to_string());
            eprintln!("work queue task failed: {}", message);
            log::error!("work queue task failed: {}", message);
        }

        let (lock, cond) = &*pending;
        let mut pending = lock.lock().expect("pending lock poisoned");
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            cond.notify_all();
        }
    }
}
