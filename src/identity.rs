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

//! Identity of the running process and of the calling thread.
//!
//! The process identity is resolved once, the first time it is requested, and every record
//! refers to that same snapshot for the rest of the process's life.

use std::path::Path;
use std::sync::OnceLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// Environment variable that overrides the OS-reported process name.
pub const PROCESS_ALIAS_ENV: &str = "PROCESS_ALIAS";

/// Process-wide identity fields stamped on every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    process_name: String,
    process_id: u32,
    machine_name: String,
    user_name: String,
}

impl ProcessIdentity {
    /// Create an identity from explicit values.
    pub fn new(
        process_name: impl Into<String>,
        process_id: u32,
        machine_name: impl Into<String>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            process_name: process_name.into(),
            process_id,
            machine_name: machine_name.into(),
            user_name: user_name.into(),
        }
    }

    fn detect() -> Self {
        let exe = std::env::current_exe().ok();
        Self {
            process_name: resolve_process_name(
                std::env::var(PROCESS_ALIAS_ENV).ok(),
                exe.as_deref(),
            ),
            process_id: std::process::id(),
            machine_name: machine_name(),
            user_name: resolve_user_name(
                std::env::var("USERDOMAIN").ok(),
                std::env::var("USER")
                    .or_else(|_| std::env::var("USERNAME"))
                    .ok(),
            ),
        }
    }

    /// The process name, or the value of [`PROCESS_ALIAS_ENV`] if it was set.
    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    /// The OS process id.
    pub fn process_id(&self) -> u32 {
        self.process_id
    }

    /// The host name of the machine.
    pub fn machine_name(&self) -> &str {
        &self.machine_name
    }

    /// The user running the process, as `DOMAIN\user` when a domain is known.
    pub fn user_name(&self) -> &str {
        &self.user_name
    }
}

/// Return the identity of the current process.
///
/// Resolved on first call; later changes to the environment are not observed.
pub fn process_identity() -> &'static ProcessIdentity {
    static IDENTITY: OnceLock<ProcessIdentity> = OnceLock::new();
    IDENTITY.get_or_init(ProcessIdentity::detect)
}

/// Return a small, stable number identifying the calling thread.
///
/// Numbers are handed out sequentially, starting at 1, the first time a thread asks.
pub fn current_thread_id() -> u64 {
    static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

    thread_local! {
        static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
    }

    THREAD_ID.with(|id| *id)
}

/// Return the name of the calling thread, if it has one.
pub fn current_thread_name() -> Option<String> {
    std::thread::current().name().map(str::to_string)
}

fn resolve_process_name(alias: Option<String>, exe: Option<&Path>) -> String {
    if let Some(alias) = alias.filter(|alias| !alias.trim().is_empty()) {
        return alias;
    }

    exe.and_then(Path::file_stem)
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

fn resolve_user_name(domain: Option<String>, user: Option<String>) -> String {
    let user = user.unwrap_or_default();
    match domain.filter(|domain| !domain.is_empty()) {
        Some(domain) => format!("{domain}\\{user}"),
        None => user,
    }
}

#[cfg(unix)]
fn machine_name() -> String {
    let mut buf = [0u8; 256];
    // SAFETY: the buffer is valid for writes of its full length.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast::<libc::c_char>(), buf.len()) };
    if rc == 0 {
        let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        let name = String::from_utf8_lossy(&buf[..len]).into_owned();
        if !name.is_empty() {
            return name;
        }
    }

    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(not(unix))]
fn machine_name() -> String {
    std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
