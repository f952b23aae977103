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

use std::any::Any;
use std::cell::Cell;
use std::panic;
use std::panic::PanicHookInfo;
use std::sync::Arc;
use std::sync::Once;
use std::thread;
use std::time::Duration;

use crate::Error;
use crate::SinkRegistry;
use crate::Trap;
use crate::logger;
use crate::record::Severity;
use crate::trap::DefaultTrap;

pub(crate) const UNHANDLED_PANIC_MESSAGE: &str = "An unhandled panic occurred.";

// Gives sinks that write asynchronously a chance to finish before the process goes down.
const GRACE_PERIOD: Duration = Duration::from_millis(100);

static INSTALLED: Once = Once::new();

thread_local! {
    static REPORTING: Cell<bool> = const { Cell::new(false) };
}

/// Chain a panic hook in front of the current one that logs every panic through `registry`.
///
/// Only the first call installs a hook.
pub(crate) fn install(registry: Arc<SinkRegistry>) {
    INSTALLED.call_once(move || {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            report(&registry, info);
            previous(info);
        }));
    });
}

fn report(registry: &SinkRegistry, info: &PanicHookInfo<'_>) {
    // a sink that panics while reporting must not recurse into the hook
    if REPORTING.replace(true) {
        return;
    }

    let mut cause = Error::new(panic_message(info.payload()));
    if let Some(location) = info.location() {
        cause = cause.with_context("location", location);
    }

    let record = logger::internal_record(UNHANDLED_PANIC_MESSAGE, Severity::Error, &cause);
    let result = registry
        .dispatch(&record)
        .and_then(|()| registry.flush());
    if let Err(err) = result {
        DefaultTrap::default().trap(&err);
    }

    thread::sleep(GRACE_PERIOD);
    REPORTING.set(false);
}

/// The message a panic was raised with, or a placeholder for non-string payloads.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "Box<dyn Any>"
    }
}
