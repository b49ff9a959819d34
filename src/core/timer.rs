//! Single-shot flush timer
//!
//! One worker thread per timer holds at most one deadline. Arming replaces
//! the previous deadline, so there is never more than one pending fire.
//! Every arm carries an epoch supplied by the owner; the owner compares it
//! against its own current epoch when the timer fires, which makes a fire
//! that raced with a cancel harmless.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Commands sent to the timer worker
#[derive(Debug)]
enum TimerCommand {
    Arm { epoch: u64, delay: Duration },
    Cancel,
    Shutdown,
}

/// Cancellable delayed callback running on its own thread
#[derive(Debug)]
pub struct FlushTimer {
    tx: Sender<TimerCommand>,
    worker: Option<JoinHandle<()>>,
}

impl FlushTimer {
    /// Start the worker thread. `on_fire` receives the epoch of the deadline
    /// that expired.
    pub fn spawn<F>(on_fire: F) -> std::io::Result<Self>
    where
        F: FnMut(u64) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<TimerCommand>();

        let worker = thread::Builder::new()
            .name("linegrid-flush".to_string())
            .spawn(move || run_worker(rx, on_fire))?;

        Ok(Self {
            tx,
            worker: Some(worker),
        })
    }

    /// Schedule a fire after `delay`, replacing any pending one
    pub fn arm(&self, epoch: u64, delay: Duration) {
        let _ = self.tx.send(TimerCommand::Arm { epoch, delay });
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(TimerCommand::Cancel);
    }

    /// Stop the worker and wait for it. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.tx.send(TimerCommand::Shutdown);

        // A callback that drops its own timer must not join itself
        if worker.thread().id() != thread::current().id() {
            let _ = worker.join();
        }
    }
}

impl Drop for FlushTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker<F>(rx: mpsc::Receiver<TimerCommand>, mut on_fire: F)
where
    F: FnMut(u64),
{
    let mut pending: Option<(Instant, u64)> = None;

    loop {
        let command = match pending {
            Some((deadline, epoch)) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(timeout) {
                    Ok(command) => command,
                    Err(RecvTimeoutError::Timeout) => {
                        pending = None;
                        tracing::debug!("Flush timer fired (epoch {})", epoch);
                        on_fire(epoch);
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(command) => command,
                Err(_) => break,
            },
        };

        match command {
            TimerCommand::Arm { epoch, delay } => {
                pending = Some((Instant::now() + delay, epoch));
            }
            TimerCommand::Cancel => pending = None,
            TimerCommand::Shutdown => break,
        }
    }
}
