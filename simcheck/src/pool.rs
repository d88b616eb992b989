//! Bounded worker pool running per-document tasks with failure isolation.
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use hashbrown::HashMap;

use crate::errors::{DocumentFailure, FailureKind, Result, SimcheckError, Stage};

/// How often a waiting batch wakes up to look for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Shared flag for cooperative cancellation of a running check.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an untriggered token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Tasks not yet started are skipped and
    /// running ones observe it through [`TaskContext::should_stop`].
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Checks if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What a running task may know about itself.
pub struct TaskContext {
    index: usize,
    started: Instant,
    timeout: Option<Duration>,
    cancel: CancelToken,
}

impl TaskContext {
    /// Gets the position of the document being processed.
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Checks if the task has exceeded its time budget.
    pub fn is_timed_out(&self) -> bool {
        self.timeout
            .map_or(false, |timeout| self.started.elapsed() > timeout)
    }

    /// Checks if the task should give up, either because the batch was
    /// cancelled or because the time budget is exhausted.
    pub fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.is_timed_out()
    }
}

/// A fixed-size thread pool shared by the concurrent stages of a check.
///
/// Data-parallel stages run on an inner rayon pool through [`WorkerPool::install`].
/// Per-document stages that may fail or hang run through [`WorkerPool::map_isolated`]
/// on supervised threads, so that a stuck document is given up on after its time
/// budget instead of stalling the batch.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
    task_timeout: Option<Duration>,
    cancel: CancelToken,
}

impl WorkerPool {
    /// Creates a pool of `workers` threads.
    pub fn new(workers: usize, task_timeout: Option<Duration>) -> Result<Self> {
        if workers == 0 {
            return Err(SimcheckError::config("workers must not be 0."));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("simcheck-worker-{i}"))
            .build()?;
        Ok(Self {
            pool,
            workers,
            task_timeout,
            cancel: CancelToken::new(),
        })
    }

    /// Replaces the cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Gets the cancellation token.
    pub const fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Gets the number of threads.
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `op` inside the pool, so that rayon's parallel iterators in it
    /// use the pool's threads.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Applies `f` to every item concurrently, returning the outcomes in input order.
    ///
    /// At most `workers` tasks run at once. An error, panic or timeout of one item
    /// becomes a [`DocumentFailure`] for that item only. The time budget of a task
    /// starts when the task starts. A task exceeding it is abandoned: its thread is
    /// left to finish on its own, its result is discarded and a fresh thread takes
    /// its place. If the batch is cancelled, [`SimcheckError::Cancelled`] is returned
    /// without waiting for the running tasks.
    pub fn map_isolated<T, R, F>(
        &self,
        stage: Stage,
        items: Vec<T>,
        f: F,
    ) -> Result<Vec<Result<R, DocumentFailure>>>
    where
        T: Send + Sync + 'static,
        R: Send + 'static,
        F: Fn(&T, &TaskContext) -> Result<R, String> + Send + Sync + 'static,
    {
        let n = items.len();
        let batch = Arc::new(Batch {
            stage,
            abandoned: (0..n).map(|_| AtomicBool::new(false)).collect(),
            items,
            f,
            next: AtomicUsize::new(0),
            timeout: self.task_timeout,
            cancel: self.cancel.clone(),
        });
        let (tx, rx) = mpsc::channel();
        for _ in 0..self.workers.min(n) {
            spawn_worker(&batch, &tx)?;
        }

        let mut outcomes: Vec<Option<Result<R, DocumentFailure>>> = (0..n).map(|_| None).collect();
        let mut running: HashMap<usize, Instant> = HashMap::new();
        let mut remaining = n;
        while remaining > 0 {
            if self.cancel.is_cancelled() {
                return Err(SimcheckError::Cancelled);
            }
            let wait = self
                .task_timeout
                .and_then(|timeout| {
                    running
                        .values()
                        .map(|&at| (at + timeout).saturating_duration_since(Instant::now()))
                        .min()
                })
                .map_or(POLL_INTERVAL, |d| d.min(POLL_INTERVAL));
            match rx.recv_timeout(wait) {
                Ok(Event::Started(i, at)) => {
                    running.insert(i, at);
                }
                Ok(Event::Finished(i, outcome)) => {
                    running.remove(&i);
                    if outcomes[i].is_none() {
                        outcomes[i] = Some(outcome);
                        remaining -= 1;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if let Some(timeout) = self.task_timeout {
                let expired: Vec<usize> = running
                    .iter()
                    .filter(|(_, at)| at.elapsed() > timeout)
                    .map(|(&i, _)| i)
                    .collect();
                for i in expired {
                    running.remove(&i);
                    batch.abandoned[i].store(true, Ordering::Release);
                    tracing::debug!(document = i, stage = %stage, "task abandoned after {timeout:?}");
                    outcomes[i] = Some(Err(DocumentFailure {
                        index: i,
                        stage,
                        kind: FailureKind::TimedOut,
                        message: format!("exceeded {timeout:?}"),
                    }));
                    remaining -= 1;
                    spawn_worker(&batch, &tx)?;
                }
            }
        }
        if self.cancel.is_cancelled() {
            return Err(SimcheckError::Cancelled);
        }
        Ok(outcomes
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| {
                outcome.unwrap_or_else(|| {
                    Err(DocumentFailure {
                        index,
                        stage,
                        kind: FailureKind::Panicked,
                        message: "worker exited without a result".to_string(),
                    })
                })
            })
            .collect())
    }
}

enum Event<R> {
    Started(usize, Instant),
    Finished(usize, Result<R, DocumentFailure>),
}

/// Items of one `map_isolated` call, shared by its threads.
struct Batch<T, F> {
    stage: Stage,
    items: Vec<T>,
    f: F,
    next: AtomicUsize,
    abandoned: Vec<AtomicBool>,
    timeout: Option<Duration>,
    cancel: CancelToken,
}

impl<T, F> Batch<T, F> {
    /// Takes items until none is left. A thread whose task was abandoned exits,
    /// since a replacement was already spawned.
    fn work<R>(&self, events: &Sender<Event<R>>)
    where
        F: Fn(&T, &TaskContext) -> Result<R, String>,
    {
        loop {
            let index = self.next.fetch_add(1, Ordering::Relaxed);
            let Some(item) = self.items.get(index) else {
                return;
            };
            let ctx = TaskContext {
                index,
                started: Instant::now(),
                timeout: self.timeout,
                cancel: self.cancel.clone(),
            };
            if events.send(Event::Started(index, ctx.started)).is_err() {
                return;
            }
            let outcome = self.run_task(item, &ctx);
            if self.abandoned[index].load(Ordering::Acquire)
                || events.send(Event::Finished(index, outcome)).is_err()
            {
                return;
            }
        }
    }

    fn run_task<R>(&self, item: &T, ctx: &TaskContext) -> Result<R, DocumentFailure>
    where
        F: Fn(&T, &TaskContext) -> Result<R, String>,
    {
        let failure = |kind, message| DocumentFailure {
            index: ctx.index,
            stage: self.stage,
            kind,
            message,
        };
        if self.cancel.is_cancelled() {
            return Err(failure(FailureKind::Cancelled, "batch cancelled".to_string()));
        }
        match panic::catch_unwind(AssertUnwindSafe(|| (self.f)(item, ctx))) {
            Ok(_) if ctx.is_timed_out() => Err(failure(
                FailureKind::TimedOut,
                format!("exceeded {:?}", ctx.timeout.unwrap_or_default()),
            )),
            Ok(Ok(r)) => Ok(r),
            Ok(Err(msg)) => Err(failure(FailureKind::Rejected, msg)),
            Err(payload) => Err(failure(FailureKind::Panicked, panic_message(&*payload))),
        }
    }
}

fn spawn_worker<T, R, F>(batch: &Arc<Batch<T, F>>, events: &Sender<Event<R>>) -> Result<()>
where
    T: Send + Sync + 'static,
    R: Send + 'static,
    F: Fn(&T, &TaskContext) -> Result<R, String> + Send + Sync + 'static,
{
    let batch = Arc::clone(batch);
    let events = events.clone();
    thread::Builder::new()
        .name(format!("simcheck-{}", batch.stage))
        .spawn(move || batch.work(&events))?;
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_preserved() {
        let pool = WorkerPool::new(4, None).unwrap();
        let items: Vec<usize> = (0..100).collect();
        let outcomes = pool
            .map_isolated(Stage::Segmentation, items, |&x, _| Ok(x * 2))
            .unwrap();
        let values: Vec<usize> = outcomes.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, (0..100).map(|x| x * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_failures_are_isolated() {
        let pool = WorkerPool::new(2, None).unwrap();
        let outcomes = pool
            .map_isolated(Stage::Segmentation, vec![1, 2, 3, 4], |&x, _| match x {
                2 => Err("bad input".to_string()),
                3 => panic!("boom"),
                _ => Ok(x),
            })
            .unwrap();
        assert_eq!(outcomes[0], Ok(1));
        let e = outcomes[1].clone().unwrap_err();
        assert_eq!(e.index, 1);
        assert_eq!(e.kind, FailureKind::Rejected);
        assert_eq!(e.message, "bad input");
        let e = outcomes[2].clone().unwrap_err();
        assert_eq!(e.kind, FailureKind::Panicked);
        assert_eq!(e.message, "boom");
        assert_eq!(outcomes[3], Ok(4));
    }

    #[test]
    fn test_timeout() {
        let pool = WorkerPool::new(2, Some(Duration::from_millis(20))).unwrap();
        let outcomes = pool
            .map_isolated(Stage::Segmentation, vec![0u64, 500], |&ms, _| {
                thread::sleep(Duration::from_millis(ms));
                Ok(ms)
            })
            .unwrap();
        assert_eq!(outcomes[0], Ok(0));
        assert_eq!(
            outcomes[1].clone().unwrap_err().kind,
            FailureKind::TimedOut
        );
    }

    #[test]
    fn test_hung_task_does_not_stall_batch() {
        let pool = WorkerPool::new(2, Some(Duration::from_millis(50))).unwrap();
        let start = Instant::now();
        let outcomes = pool
            .map_isolated(Stage::Segmentation, vec![0u64, 5000, 0], |&ms, _| {
                thread::sleep(Duration::from_millis(ms));
                Ok(ms)
            })
            .unwrap();
        assert!(start.elapsed() < Duration::from_secs(2), "{:?}", start.elapsed());
        assert_eq!(outcomes[0], Ok(0));
        let e = outcomes[1].clone().unwrap_err();
        assert_eq!(e.index, 1);
        assert_eq!(e.kind, FailureKind::TimedOut);
        assert_eq!(outcomes[2], Ok(0));
    }

    #[test]
    fn test_abandoned_worker_is_replaced() {
        // The only worker hangs on the first item, so the rest needs a new thread.
        let pool = WorkerPool::new(1, Some(Duration::from_millis(50))).unwrap();
        let start = Instant::now();
        let outcomes = pool
            .map_isolated(Stage::CodeTokenization, vec![5000u64, 0, 0], |&ms, _| {
                thread::sleep(Duration::from_millis(ms));
                Ok(ms)
            })
            .unwrap();
        assert!(start.elapsed() < Duration::from_secs(2), "{:?}", start.elapsed());
        assert_eq!(outcomes[0].clone().unwrap_err().kind, FailureKind::TimedOut);
        assert_eq!(outcomes[1], Ok(0));
        assert_eq!(outcomes[2], Ok(0));
    }

    #[test]
    fn test_budget_starts_with_task() {
        // Queued tasks wait for the single worker without being charged for it.
        let pool = WorkerPool::new(1, Some(Duration::from_millis(300))).unwrap();
        let outcomes = pool
            .map_isolated(Stage::Segmentation, vec![100u64, 100, 100], |&ms, _| {
                thread::sleep(Duration::from_millis(ms));
                Ok(ms)
            })
            .unwrap();
        assert_eq!(outcomes, vec![Ok(100), Ok(100), Ok(100)]);
    }

    #[test]
    fn test_cooperative_timeout() {
        let pool = WorkerPool::new(1, Some(Duration::from_millis(5))).unwrap();
        let outcomes: Vec<Result<(), DocumentFailure>> = pool
            .map_isolated(Stage::Segmentation, vec![()], |_, ctx| {
                while !ctx.should_stop() {
                    thread::sleep(Duration::from_millis(1));
                }
                Err("interrupted".to_string())
            })
            .unwrap();
        assert_eq!(
            outcomes[0].clone().unwrap_err().kind,
            FailureKind::TimedOut
        );
    }

    #[test]
    fn test_cancelled() {
        let token = CancelToken::new();
        let pool = WorkerPool::new(2, None)
            .unwrap()
            .with_cancel_token(token.clone());
        token.cancel();
        let result = pool.map_isolated(Stage::Segmentation, vec![1, 2, 3], |&x, _| Ok(x));
        assert!(matches!(result, Err(SimcheckError::Cancelled)));
    }

    #[test]
    fn test_cancel_while_running() {
        let token = CancelToken::new();
        let pool = WorkerPool::new(1, None)
            .unwrap()
            .with_cancel_token(token.clone());
        let start = Instant::now();
        let result = pool.map_isolated(Stage::Segmentation, vec![token], |token, _| {
            token.cancel();
            thread::sleep(Duration::from_secs(5));
            Ok(())
        });
        assert!(matches!(result, Err(SimcheckError::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_empty_batch() {
        let pool = WorkerPool::new(2, None).unwrap();
        let outcomes: Vec<Result<u8, DocumentFailure>> = pool
            .map_isolated(Stage::Segmentation, vec![], |&x: &u8, _| Ok(x))
            .unwrap();
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_zero_workers() {
        assert!(WorkerPool::new(0, None).is_err());
    }
}
