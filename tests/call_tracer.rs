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

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Barrier;
use std::sync::Mutex;

use logsink::CallTracer;
use logsink::Error;
use logsink::LogRecord;
use logsink::Logger;
use logsink::Severity;
use logsink::Sink;
use logsink::SinkRegistry;
use logsink::trace_call;

#[derive(Debug, Default)]
struct PerThread(Mutex<BTreeMap<u64, Vec<String>>>);

impl Sink for PerThread {
    fn consume(&self, record: &LogRecord) -> Result<(), Error> {
        assert_eq!(record.severity(), Severity::Verbose);
        let mut lines = self.0.lock().unwrap();
        lines
            .entry(record.thread_id())
            .or_default()
            .push(record.message().to_string());
        Ok(())
    }
}

fn nested(logger: &Logger, barrier: &Barrier, worker: usize) {
    let _outer = trace_call!(logger, "outer", worker);
    barrier.wait();
    let _middle = trace_call!(logger, "middle");
    barrier.wait();
    {
        let _inner = CallTracer::enter_with_args(logger, "inner", &[&"x", &worker]);
        assert_eq!(CallTracer::depth(), 6);
        barrier.wait();
    }
    barrier.wait();
}

#[test]
fn test_interleaved_threads_keep_their_own_depth() {
    const WORKERS: usize = 4;

    let sink = Arc::new(PerThread::default());
    let registry = SinkRegistry::builder()
        .force_console(false)
        .sink(sink.clone())
        .build();
    let logger = Logger::new("Tracer", "App.Tracing").with_registry(Arc::new(registry));
    let barrier = Barrier::new(WORKERS);

    std::thread::scope(|s| {
        for worker in 0..WORKERS {
            let logger = &logger;
            let barrier = &barrier;
            s.spawn(move || nested(logger, barrier, worker));
        }
    });

    let lines = sink.0.lock().unwrap();
    assert_eq!(lines.len(), WORKERS);
    for lines in lines.values() {
        let worker = lines[0]
            .trim_start_matches("> outer(")
            .trim_end_matches(')')
            .to_string();
        assert_eq!(
            *lines,
            vec![
                format!("> outer({worker})"),
                "  > middle()".to_string(),
                format!("    > inner(x, {worker})"),
                "    < inner()".to_string(),
                "  < middle()".to_string(),
                "< outer()".to_string(),
            ]
        );
    }
}
