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

//! The lazily built global registry, including the panic hook it installs.
//!
//! Global state is shared by every test in a binary, so this file holds a single test.

use std::any::TypeId;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use logsink::Error;
use logsink::LogRecord;
use logsink::Logger;
use logsink::Severity;
use logsink::Sink;
use logsink::registry;
use logsink::sink::ConsoleSink;

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

#[test]
fn test_global_registry_lifecycle() {
    let capture = Arc::new(Capture::default());
    let discoveries = Arc::new(AtomicUsize::new(0));

    registry::set_force_console(false);
    registry::set_sink_provider({
        let discoveries = discoveries.clone();
        move || {
            discoveries.fetch_add(1, Ordering::SeqCst);
            // a discovered console sink never duplicates the forced one
            Ok(Some(Box::new(ConsoleSink::default()) as Box<dyn Sink>))
        }
    });
    registry::register_sink(capture.clone());

    // racing first uses build the registry exactly once
    let logger = Logger::new("Startup", "App.Boot");
    std::thread::scope(|s| {
        for i in 0..8 {
            let logger = &logger;
            s.spawn(move || logger.info("worker {0} ready", &[&i]).unwrap());
        }
    });
    assert_eq!(discoveries.load(Ordering::SeqCst), 1);

    let global = registry::global();
    assert_eq!(global.len(), 1);
    assert_eq!(
        global.sinks().next().map(|sink| sink.concrete_type()),
        Some(TypeId::of::<Capture>())
    );
    assert_eq!(capture.take().len(), 8);

    // configuration after first use has no effect
    registry::register_sink(ConsoleSink::default());
    registry::set_force_console(true);
    assert_eq!(registry::global().len(), 1);
    assert!(
        logsink::SinkRegistry::builder()
            .force_console(false)
            .try_apply()
            .is_err()
    );

    // the static entry point has no namespace
    logsink::log("Scheduler", "tick", Severity::Verbose, None).unwrap();
    let records = capture.take();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].module_name(), Some("Scheduler"));
    assert_eq!(records[0].namespace(), None);
    assert_eq!(records[0].severity(), Severity::Verbose);

    // unhandled panics are logged before the previous hook runs
    let result = std::thread::spawn(|| panic!("worker exploded")).join();
    assert!(result.is_err());

    let records = capture.take();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.module_name(), Some("Logger"));
    assert_eq!(record.severity(), Severity::Error);
    assert_eq!(record.message(), "An unhandled panic occurred.");
    assert!(record.exception().contains("worker exploded"), "{}", record.exception());
    assert!(record.exception().contains("location"), "{}", record.exception());
}
