//! Named thread spawning for the polling and record-writer tasks.
//!
//! On ESP-IDF, `std::thread` is backed by pthreads over FreeRTOS tasks.
//! `esp_pthread_set_cfg()` sets thread-local configuration applied to the
//! *next* `pthread_create()` from the calling thread, so the config→spawn
//! pair must not be interleaved with other thread creation on that thread.
//! On other targets core and priority are ignored.

use std::io;
use std::thread::JoinHandle;

/// CPU core identifiers for the ESP32-S3 dual-core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): protocol stacks.
    Pro = 0,
    /// Core 1 (APP_CPU): detection loop.
    App = 1,
}

/// Spawn parameters for one task.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
    /// Must be NUL-terminated on ESP-IDF (e.g. `"smoke-poll\0"`).
    pub name: &'static str,
}

impl TaskSpec {
    pub fn display_name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }
}

/// Polling loop task.
pub const POLL_TASK: TaskSpec = TaskSpec {
    core: Core::App,
    priority: 10,
    stack_kb: 16,
    name: "smoke-poll\0",
};

/// Reading-log writer task.
pub const RECORD_TASK: TaskSpec = TaskSpec {
    core: Core::Pro,
    priority: 3,
    stack_kb: 8,
    name: "smoke-log\0",
};

#[cfg(target_os = "espidf")]
pub fn spawn_task<T, F>(spec: TaskSpec, f: F) -> io::Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    // SAFETY: the config struct is fully initialised by the IDF helper and
    // `name` outlives the task because it is 'static.
    let ret = unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = spec.priority as i32;
        cfg.stack_size = (spec.stack_kb * 1024) as i32;
        cfg.thread_name = spec.name.as_ptr() as *const _;
        esp_idf_sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_sys::ESP_OK as i32 {
        return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
    }

    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        spec.display_name(),
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .spawn(f)
}

#[cfg(not(target_os = "espidf"))]
pub fn spawn_task<T, F>(spec: TaskSpec, f: F) -> io::Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    log::info!(
        "Spawning '{}' (host, stack={}KB)",
        spec.display_name(),
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .stack_size(spec.stack_kb * 1024)
        .spawn(f)
}
