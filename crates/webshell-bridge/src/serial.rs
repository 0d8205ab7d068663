// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The serial execution context.
//
// Every touch of the host runtime or of shell UI state happens here, one job
// at a time. Callable operations may arrive on any thread, so they hand work
// over with `post` (which never blocks) instead of writing directly.

use tokio::sync::mpsc;
use tracing::{trace, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable handle for posting jobs onto the serial context.
#[derive(Clone)]
pub struct SerialContext {
    tx: mpsc::UnboundedSender<Job>,
}

/// The single consumer that runs posted jobs in order.
pub struct SerialQueue {
    rx: mpsc::UnboundedReceiver<Job>,
}

/// Create a connected context/queue pair.
pub fn serial_context() -> (SerialContext, SerialQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SerialContext { tx }, SerialQueue { rx })
}

impl SerialContext {
    /// Queue `job` and return immediately. Returns `false` if the queue has
    /// been dropped (the shell is shutting down) and the job was discarded.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) -> bool {
        match self.tx.send(Box::new(job)) {
            Ok(()) => true,
            Err(_) => {
                warn!("serial context closed; job discarded");
                false
            }
        }
    }
}

impl SerialQueue {
    /// Run every queued job, including ones posted by jobs run in this call.
    /// Returns the number of jobs run.
    pub fn run_until_idle(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        if ran > 0 {
            trace!(ran, "serial queue drained");
        }
        ran
    }

    /// Run jobs as they arrive until every `SerialContext` is dropped.
    pub async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            job();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn jobs_run_in_post_order() {
        let (ctx, mut queue) = serial_context();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let seen = Arc::clone(&seen);
            assert!(ctx.post(move || seen.lock().expect("lock").push(i)));
        }
        assert!(seen.lock().expect("lock").is_empty(), "post must not run the job");
        assert_eq!(queue.run_until_idle(), 5);
        assert_eq!(*seen.lock().expect("lock"), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn nested_posts_run_in_same_drain() {
        let (ctx, mut queue) = serial_context();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let inner_ctx = ctx.clone();
        let inner_seen = Arc::clone(&seen);
        ctx.post(move || {
            inner_seen.lock().expect("lock").push("outer");
            let seen = Arc::clone(&inner_seen);
            inner_ctx.post(move || seen.lock().expect("lock").push("inner"));
        });
        assert_eq!(queue.run_until_idle(), 2);
        assert_eq!(*seen.lock().expect("lock"), vec!["outer", "inner"]);
    }

    #[test]
    fn post_after_queue_dropped_is_discarded() {
        let (ctx, queue) = serial_context();
        drop(queue);
        assert!(!ctx.post(|| unreachable!("must not run")));
    }

    #[tokio::test]
    async fn async_loop_runs_posts_from_other_threads() {
        let (ctx, queue) = serial_context();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let worker = std::thread::spawn(move || {
            ctx.post(move || {
                let _ = done_tx.send("ran");
            });
        });
        worker.join().expect("worker thread");
        let runner = tokio::spawn(queue.run());
        assert_eq!(done_rx.await.expect("job ran"), "ran");
        runner.await.expect("loop exits once contexts are dropped");
    }
}
