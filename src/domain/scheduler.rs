//! Fixed-interval background runner for execution cycles.
//!
//! The scheduler owns one worker thread while running. The first cycle fires
//! immediately on [`Scheduler::start`]; each later cycle starts one full
//! interval after the previous one finished, so cycles never overlap even
//! when a cycle overruns the interval. [`Scheduler::stop`] is cooperative: it
//! wakes the worker out of its interval sleep, lets an in-flight cycle finish,
//! and joins the thread before returning.
//!
//! The task sits behind a mutex that is the single arbitration point for
//! everything it owns (notably the tracked position), which is what makes
//! [`Scheduler::run_now`] safe to call while the worker is running.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info};

use crate::domain::error::AutotraderError;

/// Unit of work run by the scheduler.
pub trait CycleTask: Send + 'static {
    fn run_cycle(&mut self) -> Result<(), AutotraderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct Scheduler<T: CycleTask> {
    task: Arc<Mutex<T>>,
    cycles_run: Arc<AtomicU64>,
    worker: Option<Worker>,
}

impl<T: CycleTask> Scheduler<T> {
    pub fn new(task: T) -> Self {
        Scheduler {
            task: Arc::new(Mutex::new(task)),
            cycles_run: Arc::new(AtomicU64::new(0)),
            worker: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.worker.is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// Cycles attempted so far, scheduled and manual, including failed ones.
    pub fn cycles_run(&self) -> u64 {
        self.cycles_run.load(Ordering::SeqCst)
    }

    /// Spawn the worker. A no-op while already running.
    pub fn start(&mut self, interval: Duration) -> Result<(), AutotraderError> {
        if self.worker.is_some() {
            return Ok(());
        }

        let (stop_tx, stop_rx) = mpsc::channel();
        let task = Arc::clone(&self.task);
        let cycles_run = Arc::clone(&self.cycles_run);

        let handle = thread::Builder::new()
            .name("autotrader-scheduler".to_string())
            .spawn(move || run_loop(task, cycles_run, interval, stop_rx))?;

        info!(interval_secs = interval.as_secs_f64(), "scheduler started");
        self.worker = Some(Worker { stop_tx, handle });
        Ok(())
    }

    /// Signal the worker and wait for it to exit. A no-op while stopped.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        // a closed channel also stops the loop
        let _ = worker.stop_tx.send(());
        if worker.handle.join().is_err() {
            error!("scheduler worker terminated abnormally");
        }
        info!(cycles = self.cycles_run(), "scheduler stopped");
    }

    /// Run one cycle on the caller's thread, serialized with scheduled cycles.
    pub fn run_now(&self) -> Result<(), AutotraderError> {
        let run = self.cycles_run.fetch_add(1, Ordering::SeqCst) + 1;
        info!(run, "running manual cycle");
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        task.run_cycle()
    }

    /// Borrow the task between cycles.
    pub fn with_task<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut task)
    }
}

impl<T: CycleTask> Drop for Scheduler<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop<T: CycleTask>(
    task: Arc<Mutex<T>>,
    cycles_run: Arc<AtomicU64>,
    interval: Duration,
    stop_rx: Receiver<()>,
) {
    loop {
        match stop_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        let run = cycles_run.fetch_add(1, Ordering::SeqCst) + 1;
        info!(run, "running scheduled cycle");
        run_guarded(&task, run);

        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn run_guarded<T: CycleTask>(task: &Mutex<T>, run: u64) {
    let mut guard = task.lock().unwrap_or_else(PoisonError::into_inner);
    match panic::catch_unwind(AssertUnwindSafe(|| guard.run_cycle())) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(run, error = %e, "scheduled cycle failed"),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(run, panic = %message, "scheduled cycle panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    struct Counter {
        runs: Arc<AtomicU64>,
        fail: bool,
    }

    impl CycleTask for Counter {
        fn run_cycle(&mut self) -> Result<(), AutotraderError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AutotraderError::data_unavailable("BTC/USDT", "offline"))
            } else {
                Ok(())
            }
        }
    }

    fn counter(fail: bool) -> (Counter, Arc<AtomicU64>) {
        let runs = Arc::new(AtomicU64::new(0));
        (
            Counter {
                runs: Arc::clone(&runs),
                fail,
            },
            runs,
        )
    }

    fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        cond()
    }

    #[test]
    fn starts_stopped() {
        let (task, _) = counter(false);
        let scheduler = Scheduler::new(task);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(scheduler.cycles_run(), 0);
    }

    #[test]
    fn start_stop_transitions() {
        let (task, _) = counter(false);
        let mut scheduler = Scheduler::new(task);

        scheduler.start(Duration::from_secs(60)).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Running);

        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[test]
    fn stop_while_stopped_is_noop() {
        let (task, runs) = counter(false);
        let mut scheduler = Scheduler::new(task);
        scheduler.stop();
        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn first_cycle_fires_immediately() {
        let (task, runs) = counter(false);
        let mut scheduler = Scheduler::new(task);

        scheduler.start(Duration::from_secs(3600)).unwrap();
        assert!(wait_until(Duration::from_secs(5), || runs
            .load(Ordering::SeqCst)
            == 1));

        // the hour-long sleep is interrupted by stop
        let started = Instant::now();
        scheduler.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn second_start_is_noop() {
        let (task, runs) = counter(false);
        let mut scheduler = Scheduler::new(task);

        scheduler.start(Duration::from_secs(3600)).unwrap();
        assert!(wait_until(Duration::from_secs(5), || runs
            .load(Ordering::SeqCst)
            == 1));
        scheduler.start(Duration::from_millis(1)).unwrap();
        thread::sleep(Duration::from_millis(30));
        scheduler.stop();

        // no second worker with the short interval was spawned
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_cycles_do_not_stop_loop() {
        let (task, runs) = counter(true);
        let mut scheduler = Scheduler::new(task);

        scheduler.start(Duration::from_millis(1)).unwrap();
        assert!(wait_until(Duration::from_secs(5), || runs
            .load(Ordering::SeqCst)
            >= 3));
        assert!(scheduler.is_running());
        scheduler.stop();
    }

    #[test]
    fn run_now_returns_task_result() {
        let (task, runs) = counter(true);
        let scheduler = Scheduler::new(task);
        assert!(scheduler.run_now().is_err());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.cycles_run(), 1);
    }

    #[test]
    fn restart_after_stop() {
        let (task, runs) = counter(false);
        let mut scheduler = Scheduler::new(task);

        scheduler.start(Duration::from_secs(3600)).unwrap();
        assert!(wait_until(Duration::from_secs(5), || runs
            .load(Ordering::SeqCst)
            == 1));
        scheduler.stop();

        scheduler.start(Duration::from_secs(3600)).unwrap();
        assert!(wait_until(Duration::from_secs(5), || runs
            .load(Ordering::SeqCst)
            == 2));
        scheduler.stop();
        assert_eq!(scheduler.cycles_run(), 2);
    }

    #[test]
    fn with_task_reads_state() {
        let (task, _) = counter(false);
        let scheduler = Scheduler::new(task);
        scheduler.run_now().unwrap();
        let seen = scheduler.with_task(|t| t.runs.load(Ordering::SeqCst));
        assert_eq!(seen, 1);
    }
}
