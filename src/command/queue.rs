//! Per-channel command execution queues.
//!
//! Each queue executes submitted command groups strictly in FIFO order
//! on a dedicated worker task. Queue 0 serves global commands; each
//! channel gets its own queue, so a slow command on one channel never
//! stalls another. Depth is bounded: past the limit new submissions are
//! rejected with `504 QUEUE OVERFLOW` instead of piling up.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::{Environment, GroupCommand, GroupOrigin};

/// Submissions past this depth are rejected.
const MAX_QUEUE_DEPTH: usize = 128;

/// A FIFO execution queue with one worker task.
pub struct CommandQueue {
    name: String,
    tx: mpsc::UnboundedSender<Arc<GroupCommand>>,
    depth: Arc<AtomicUsize>,
}

impl CommandQueue {
    /// Create the queue and spawn its worker task.
    pub fn spawn(name: String, env: Arc<Environment>) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let depth = Arc::new(AtomicUsize::new(0));
        tokio::spawn(Self::run(rx, env, Arc::clone(&depth), name.clone()));
        Arc::new(Self { name, tx, depth })
    }

    /// Number of groups queued or executing.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    /// Submit a group for execution.
    ///
    /// A full queue rejects the group immediately: every member gets
    /// `504 QUEUE OVERFLOW` on its own reply path, and so does a batch
    /// submitter waiting for consolidated reporting.
    pub fn add(&self, group: Arc<GroupCommand>) {
        if self.depth.load(Ordering::Acquire) > MAX_QUEUE_DEPTH {
            warn!(queue = %self.name, command = %group.name(), "Queue overflow, rejecting");
            for command in group.commands() {
                command.send_reply("504 QUEUE OVERFLOW\r\n");
            }
            group.send_reply("504 QUEUE OVERFLOW\r\n");
            return;
        }

        self.depth.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(group).is_err() {
            // Worker gone; only happens during shutdown.
            self.depth.fetch_sub(1, Ordering::AcqRel);
        }
    }

    async fn run(
        mut rx: mpsc::UnboundedReceiver<Arc<GroupCommand>>,
        env: Arc<Environment>,
        depth: Arc<AtomicUsize>,
        name: String,
    ) {
        while let Some(group) = rx.recv().await {
            Self::execute_group(&env, &name, &group).await;
            depth.fetch_sub(1, Ordering::AcqRel);
        }
    }

    async fn execute_group(env: &Arc<Environment>, queue_name: &str, group: &GroupCommand) {
        let mut failed = 0usize;

        for command in group.commands() {
            let started = Instant::now();
            let outcome = std::panic::AssertUnwindSafe(command.execute(env))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(body)) => {
                    debug!(
                        queue = %queue_name,
                        command = %command.name(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Executed"
                    );
                    command.send_reply(&body);
                }
                Ok(Err(err)) => {
                    failed += 1;
                    if err.is_expected() {
                        debug!(queue = %queue_name, command = %command.name(), %err, "Failed");
                    } else {
                        warn!(queue = %queue_name, command = %command.name(), %err, "Failed");
                    }
                    command.send_reply(&err.reply_body(command.name()));
                }
                Err(_) => {
                    failed += 1;
                    error!(queue = %queue_name, command = %command.name(), "Handler panicked");
                    command.send_reply("500 INTERNAL ERROR\r\n");
                }
            }
        }

        // An empty batch completes without a report.
        if group.origin() == GroupOrigin::ClientBatch && !group.commands().is_empty() {
            let report = if failed == 0 {
                "202 COMMIT OK\r\n"
            } else {
                "202 COMMIT PARTIAL\r\n"
            };
            group.send_reply(report);
        }
    }
}
