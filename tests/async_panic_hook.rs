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


//! The panic hook of a global registry whose sinks run on an async worker.
//!
//! Global state is shared by every test in a binary, so this file holds a single test.

use std::sync::Arc;
use std::sync::Mutex;

use logsink::Error;
use logsink::LogRecord;
use logsink::Logger;
use logsink::Severity;
use logsink::Sink;
use logsink::SinkRegistry;
use logsink::sink::AsyncBuilder;

#[derive(Debug, Default)]
struct Capture(Mutex<Vec<LogRecord>>);

impl Sink for Capture {
    fn consume(&self, record: &LogRecord) -> Result<(), Error> {
        self.0.lock().unwrap().push(record.clone());
        Ok(())
    }
}

impl Capture {
    fn take(&self) -> Vec<LogRecord> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
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

fn assert_panic_record(record: &LogRecord, panic_message: &str) {
    assert_eq!(record.module_name(), Some("Logger"));
    assert_eq!(record.severity(), Severity::Error);
    assert_eq!(record.message(), "An unhandled panic occurred.");
    assert!(
        record.exception().contains(panic_message),
        "{}",
        record.exception()
    );
}

#[test]
fn test_panicking_async_sink_is_reported_without_stalling() {
    let capture = Arc::new(Capture::default());
    let sink = AsyncBuilder::new("async-panic-hook")
        .sink(Explosive)
        .sink(capture.clone())
        .build()
        .unwrap();
    SinkRegistry::builder()
        .force_console(false)
        .capture_panics(true)
        .sink(sink)
        .try_apply()
        .unwrap();

    // the hook runs on the worker thread and must not wait for that same worker
    let logger = Logger::new("Payments", "App.Billing");
    logger.info("boom", &[]).unwrap();
    // the report is queued behind the first flush
    logsink::registry::global().flush().unwrap();
    logsink::registry::global().flush().unwrap();

    let records = capture.take();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].message(), "boom");
    assert_panic_record(&records[1], "sink exploded");

    // the worker survived and still serves the hook on other threads
    let result = std::thread::spawn(|| panic!("worker exploded")).join();
    assert!(result.is_err());

    let records = capture.take();
    assert_eq!(records.len(), 1);
    assert_panic_record(&records[0], "worker exploded");

    logger.info("still running", &[]).unwrap();
    logsink::registry::global().flush().unwrap();
    let records = capture.take();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message(), "still running");
}
