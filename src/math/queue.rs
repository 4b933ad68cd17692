//! Serial async job queue
//!
//! Runs at most one job at a time, in submission order. Jobs are local
//! futures; the queue must be used from inside a `tokio::task::LocalSet`.
//! A job that fails or panics is logged and the next one starts.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use tokio::sync::Notify;

/// A unit of work run for its side effects
pub type Job = Pin<Box<dyn Future<Output = anyhow::Result<()>>>>;

#[derive(Default)]
struct QueueInner {
    jobs: RefCell<VecDeque<Job>>,
    draining: Cell<bool>,
    idle: Notify,
}

/// Cloneable handle to a queue with a concurrency limit of one
#[derive(Clone, Default)]
pub struct RenderQueue {
    inner: Rc<QueueInner>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job; starts draining if the queue was idle.
    ///
    /// Never blocks and may be called from inside a running job.
    pub fn enqueue<F>(&self, job: F)
    where
        F: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.inner.jobs.borrow_mut().push_back(Box::pin(job));

        if !self.inner.draining.get() {
            self.inner.draining.set(true);
            tokio::task::spawn_local(drain(Rc::clone(&self.inner)));
        }
    }

    /// Jobs waiting to start (the running job is not counted)
    pub fn len(&self) -> usize {
        self.inner.jobs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when nothing is running or waiting
    pub fn is_idle(&self) -> bool {
        !self.inner.draining.get()
    }

    /// Resolves once every submitted job, including ones submitted while
    /// waiting, has finished
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

async fn drain(inner: Rc<QueueInner>) {
    loop {
        let next = inner.jobs.borrow_mut().pop_front();
        let Some(job) = next else {
            break;
        };

        // Each job gets its own task so a panic stays inside it
        match tokio::task::spawn_local(job).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::error!("Render job failed: {:#}", err),
            Err(err) if err.is_panic() => log::error!("Render job panicked"),
            Err(err) => log::error!("Render job did not finish: {}", err),
        }
    }

    inner.draining.set(false);
    inner.idle.notify_waiters();
}
