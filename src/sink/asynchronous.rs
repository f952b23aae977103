// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::cell::Cell;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use crossbeam_channel::TrySendError;

use crate::Error;
use crate::Trap;
use crate::record::LogRecord;
use crate::registry::panic_message;
use crate::sink::Sink;
use crate::trap::DefaultTrap;

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // id of the async sink whose worker runs on this thread, 0 elsewhere
    static CURRENT_WORKER: Cell<u64> = const { Cell::new(0) };
}

/// A composable sink, consuming and flushing records on a dedicated worker thread.
///
/// Records are cloned and handed to the worker, so the logging call returns as soon as the record
/// is queued. Failures of the wrapped sinks are reported to the configured [`Trap`] since no caller
/// is waiting for them.
///
/// Dropping the sink drains the queue and joins the worker.
///
/// A wrapped sink that panics is reported to the [`Trap`] and the worker keeps running. Records
/// dispatched from the worker thread itself, such as the report of that panic, are queued without
/// blocking, and flushing from the worker thread fails instead of waiting on itself.
///
/// # Examples
///
/// ```
/// use logsink::sink::AsyncBuilder;
/// use logsink::sink::FallbackSink;
///
/// let sink = AsyncBuilder::new("logsink-async")
///     .sink(FallbackSink::default())
///     .build()
///     .unwrap();
/// ```
#[derive(Debug)]
pub struct AsyncSink {
    sinks: Arc<[Box<dyn Sink>]>,
    state: AsyncState,
}

impl Sink for AsyncSink {
    fn consume(&self, record: &LogRecord) -> Result<(), Error> {
        let task = Task::Consume {
            sinks: self.sinks.clone(),
            record: Box::new(record.clone()),
        };
        self.state.send_task(task)
    }

    /// Wait until every record queued before this call has been consumed and the wrapped sinks
    /// have been flushed.
    fn flush(&self) -> Result<(), Error> {
        if self.state.on_worker() {
            return Err(Error::new(
                "cannot flush an async sink from its own worker thread",
            ));
        }

        let (done, finished) = crossbeam_channel::bounded(1);
        let task = Task::Flush {
            sinks: self.sinks.clone(),
            done,
        };
        self.state.send_task(task)?;
        finished
            .recv()
            .map_err(|err| Error::new("async sink worker exited before flushing").with_source(err))
    }
}

/// Overflow policy for [`AsyncSink`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
enum Overflow {
    /// Blocks until the channel is not full.
    Block,
    /// Drops the incoming operation.
    DropIncoming,
}

/// A builder for [`AsyncSink`].
#[must_use = "call `build` to construct the async sink"]
#[derive(Debug)]
pub struct AsyncBuilder {
    thread_name: String,
    sinks: Vec<Box<dyn Sink>>,
    buffered_lines_limit: Option<usize>,
    trap: Box<dyn Trap>,
    overflow: Overflow,
}

impl AsyncBuilder {
    /// Create a new async sink builder.
    pub fn new(thread_name: impl Into<String>) -> AsyncBuilder {
        AsyncBuilder {
            thread_name: thread_name.into(),
            sinks: vec![],
            buffered_lines_limit: None,
            trap: Box::new(DefaultTrap::default()),
            overflow: Overflow::Block,
        }
    }

    /// Set the buffer size of pending records. Unbounded if `None`.
    pub fn buffered_lines_limit(mut self, buffered_lines_limit: Option<usize>) -> Self {
        self.buffered_lines_limit = buffered_lines_limit;
        self
    }

    /// Set the overflow policy to block when the buffer is full.
    pub fn overflow_block(mut self) -> Self {
        self.overflow = Overflow::Block;
        self
    }

    /// Set the overflow policy to drop incoming records when the buffer is full.
    pub fn overflow_drop_incoming(mut self) -> Self {
        self.overflow = Overflow::DropIncoming;
        self
    }

    /// Set the trap for failures of the wrapped sinks.
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Add a sink to be driven by the worker.
    pub fn sink(mut self, sink: impl Into<Box<dyn Sink>>) -> Self {
        self.sinks.push(sink.into());
        self
    }

    /// Build the async sink and spawn its worker thread.
    ///
    /// # Errors
    ///
    /// Return an error if the worker thread cannot be spawned.
    pub fn build(self) -> Result<AsyncSink, Error> {
        let Self {
            thread_name,
            sinks,
            buffered_lines_limit,
            trap,
            overflow,
        } = self;

        let (sender, receiver) = match buffered_lines_limit {
            Some(limit) => crossbeam_channel::bounded(limit),
            None => crossbeam_channel::unbounded(),
        };

        let id = NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed);
        let worker = Worker { id, receiver, trap };
        let handle = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || worker.run())
            .map_err(|err| {
                Error::new("failed to spawn async sink thread")
                    .with_context("thread", thread_name)
                    .with_source(err)
            })?;

        Ok(AsyncSink {
            sinks: sinks.into_boxed_slice().into(),
            state: AsyncState(Some(State {
                id,
                overflow,
                sender,
                handle,
            })),
        })
    }
}

enum Task {
    Consume {
        sinks: Arc<[Box<dyn Sink>]>,
        record: Box<LogRecord>,
    },
    Flush {
        sinks: Arc<[Box<dyn Sink>]>,
        done: Sender<()>,
    },
}

impl Task {
    fn send_failure(&self) -> Error {
        Error::new(match self {
            Task::Consume { .. } => "failed to send record to async sink",
            Task::Flush { .. } => "failed to send flush to async sink",
        })
    }
}

#[derive(Debug)]
struct AsyncState(Option<State>);

#[derive(Debug)]
struct State {
    id: u64,
    overflow: Overflow,
    sender: Sender<Task>,
    handle: JoinHandle<()>,
}

impl AsyncState {
    fn on_worker(&self) -> bool {
        self.0
            .as_ref()
            .is_some_and(|state| state.id == CURRENT_WORKER.get())
    }

    fn send_task(&self, task: Task) -> Result<(), Error> {
        let Some(State {
            overflow, sender, ..
        }) = self.0.as_ref()
        else {
            return Err(task.send_failure());
        };

        // the worker must never wait for room in its own queue
        if self.on_worker() {
            return match sender.try_send(task) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(task)) => {
                    Err(task.send_failure().with_context("reason", "queue is full"))
                }
                Err(TrySendError::Disconnected(task)) => Err(task.send_failure()),
            };
        }

        match overflow {
            Overflow::Block => sender.send(task).map_err(|err| err.0.send_failure()),
            Overflow::DropIncoming => match sender.try_send(task) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => Ok(()),
                Err(TrySendError::Disconnected(task)) => Err(task.send_failure()),
            },
        }
    }
}

impl Drop for AsyncState {
    fn drop(&mut self) {
        if let Some(State { id, sender, handle, .. }) = self.0.take() {
            // the worker leaves its loop once the queue is drained and the sender is gone
            drop(sender);
            if id != CURRENT_WORKER.get() {
                let _ = handle.join();
            }
        }
    }
}

struct Worker {
    id: u64,
    receiver: Receiver<Task>,
    trap: Box<dyn Trap>,
}

impl Worker {
    fn run(self) {
        let Self {
            id,
            receiver,
            trap,
        } = self;
        CURRENT_WORKER.set(id);

        while let Ok(task) = receiver.recv() {
            match task {
                Task::Consume { sinks, record } => {
                    for sink in sinks.iter() {
                        let result = guard(|| sink.consume(&record));
                        if let Err(err) = result {
                            let err = Error::new("failed to consume record").with_source(err);
                            trap.trap(&err);
                        }
                    }
                }
                Task::Flush { sinks, done } => {
                    for sink in sinks.iter() {
                        if let Err(err) = guard(|| sink.flush()) {
                            let err = Error::new("failed to flush").with_source(err);
                            trap.trap(&err);
                        }
                    }
                    let _ = done.send(());
                }
            }
        }
    }
}

// turn a panicking sink into an error so the worker survives it
fn guard(f: impl FnOnce() -> Result<(), Error>) -> Result<(), Error> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Error::new("sink panicked")
            .with_context("panic", panic_message(payload.as_ref()))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::OnceLock;
    use std::sync::Weak;

    use super::*;

    #[derive(Debug, Default)]
    struct Collect(Mutex<Vec<String>>);

    impl Sink for Collect {
        fn consume(&self, record: &LogRecord) -> Result<(), Error> {
            self.0.lock().unwrap().push(record.message().to_string());
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Failing;

    impl Sink for Failing {
        fn consume(&self, _: &LogRecord) -> Result<(), Error> {
            Err(Error::new("sink is broken"))
        }
    }

    #[derive(Debug, Default)]
    struct CountTrap(Arc<Mutex<Vec<String>>>);

    impl Trap for CountTrap {
        fn trap(&self, err: &Error) {
            self.0.lock().unwrap().push(err.to_string());
        }
    }

    #[test]
    fn test_flush_waits_for_queued_records() {
        let collect = Arc::new(Collect::default());
        let sink = AsyncBuilder::new("async-flush")
            .sink(collect.clone())
            .build()
            .unwrap();

        for i in 0..100 {
            let record = LogRecord::builder().message(format!("record {i}")).build();
            sink.consume(&record).unwrap();
        }
        sink.flush().unwrap();

        let messages = collect.0.lock().unwrap();
        assert_eq!(messages.len(), 100);
        assert_eq!(messages[0], "record 0");
        assert_eq!(messages[99], "record 99");
    }

    #[test]
    fn test_worker_failures_go_to_trap() {
        let trapped = Arc::new(Mutex::new(vec![]));
        let sink = AsyncBuilder::new("async-trap")
            .trap(CountTrap(trapped.clone()))
            .sink(Failing)
            .build()
            .unwrap();

        sink.consume(&LogRecord::builder().message("lost").build())
            .unwrap();
        sink.flush().unwrap();

        let trapped = trapped.lock().unwrap();
        assert_eq!(trapped.len(), 1);
        assert!(trapped[0].contains("failed to consume record"));
        assert!(trapped[0].contains("sink is broken"));
    }

    #[test]
    fn test_drop_drains_the_queue() {
        let collect = Arc::new(Collect::default());
        let sink = AsyncBuilder::new("async-drop")
            .buffered_lines_limit(Some(8))
            .sink(collect.clone())
            .build()
            .unwrap();

        for i in 0..32 {
            let record = LogRecord::builder().message(format!("record {i}")).build();
            sink.consume(&record).unwrap();
        }
        drop(sink);

        assert_eq!(collect.0.lock().unwrap().len(), 32);
    }

    #[derive(Debug)]
    struct Reentrant {
        owner: OnceLock<Weak<AsyncSink>>,
        report: Sender<Vec<String>>,
    }

    impl Sink for Reentrant {
        fn consume(&self, record: &LogRecord) -> Result<(), Error> {
            if record.message() != "reenter" {
                return Ok(());
            }
            let Some(owner) = self.owner.get().and_then(Weak::upgrade) else {
                return Ok(());
            };

            let outcome = |result: Result<(), Error>| match result {
                Ok(()) => "ok".to_string(),
                Err(err) => err.to_string(),
            };
            let requeued = LogRecord::builder().message("requeued").build();
            let report = vec![
                outcome(owner.flush()),
                outcome(owner.consume(&requeued)),
                outcome(owner.consume(&requeued)),
            ];
            // the test thread owns the last handle
            drop(owner);
            self.report.send(report).unwrap();
            Ok(())
        }
    }

    #[test]
    fn test_worker_never_waits_on_itself() {
        let (report, reports) = crossbeam_channel::unbounded();
        let reentrant = Arc::new(Reentrant {
            owner: OnceLock::new(),
            report,
        });
        let sink = Arc::new(
            AsyncBuilder::new("async-reentrant")
                .buffered_lines_limit(Some(1))
                .sink(reentrant.clone())
                .build()
                .unwrap(),
        );
        reentrant.owner.set(Arc::downgrade(&sink)).unwrap();

        sink.consume(&LogRecord::builder().message("reenter").build())
            .unwrap();
        let report = reports
            .recv_timeout(std::time::Duration::from_secs(10))
            .unwrap();

        assert_eq!(
            report[0],
            "cannot flush an async sink from its own worker thread"
        );
        assert_eq!(report[1], "ok");
        assert_eq!(
            report[2],
            "failed to send record to async sink, context: { reason: queue is full }"
        );

        // other threads still flush normally
        sink.flush().unwrap();
    }

    #[derive(Debug)]
    struct Explosive;

    impl Sink for Explosive {
        fn consume(&self, record: &LogRecord) -> Result<(), Error> {
            if record.message() == "boom" {
                panic!("sink exploded");
            }
            Ok(())
        }
    }

    #[test]
    fn test_sink_panic_goes_to_trap() {
        let trapped = Arc::new(Mutex::new(vec![]));
        let collect = Arc::new(Collect::default());
        let sink = AsyncBuilder::new("async-panic")
            .trap(CountTrap(trapped.clone()))
            .sink(Explosive)
            .sink(collect.clone())
            .build()
            .unwrap();

        sink.consume(&LogRecord::builder().message("boom").build())
            .unwrap();
        sink.consume(&LogRecord::builder().message("after").build())
            .unwrap();
        sink.flush().unwrap();

        assert_eq!(*collect.0.lock().unwrap(), vec!["boom", "after"]);
        let trapped = trapped.lock().unwrap();
        assert_eq!(trapped.len(), 1);
        assert_eq!(
            trapped[0],
            "failed to consume record, sources: [sink panicked, context: { panic: sink exploded }]"
        );
    }
}
