//! # Task-health watchdog supervisor
//!
//! ## Overview
//!
//! A cooperative dead-man's switch layered on a hardware watchdog timer.
//! Every task that should make continuous progress registers with the
//! supervisor and periodically heartbeats; the supervisor re-arms the
//! hardware countdown only while the whole fleet keeps checking in. A
//! required task that goes silent for a full supervision period forces a
//! system reset, the last-resort recovery mechanism when part of the
//! firmware has hung.
//!
//! Tasks can suspend themselves around legitimately long blocking waits, or
//! request a number of grace periods ("latency") during which silence is
//! tolerated. A designated idle task is satisfied implicitly by any other
//! task's heartbeat, since forward progress anywhere proves the scheduler
//! itself is alive.
//!
//! The hardware watchdog is injected through the [`hal::WdtDevice`] trait;
//! bind its expiry interrupt to [`TaskWdt::on_timeout`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use esp_task_wdt::{Config, TaskWdt};
//!
//! let wdt = TaskWdt::new(timer, Config::default());
//!
//! // In each supervised task:
//! let id = wdt.register()?;
//! loop {
//!     do_work();
//!     wdt.notify(id)?;
//! }
//! ```
//!
//! ## Additional configuration
//!
//! We've exposed some configuration options that don't fit into cargo
//! features. These can be set via environment variables, or via cargo's `[env]`
//! section inside `.cargo/config.toml`. Below is a table of tunable parameters
//! for this crate:
#![doc = ""]
#![doc = include_str!(concat!(env!("OUT_DIR"), "/esp_task_wdt_config_table.md"))]
#![doc = ""]
//! ## Feature Flags
#![doc = document_features::document_features!()]
#![doc(html_logo_url = "https://avatars.githubusercontent.com/u/46717278")]
#![deny(missing_docs, rust_2018_idioms)]
#![no_std]

// MUST be the first module
mod fmt;

pub mod hal;
mod mask;
mod supervisor;

pub use self::supervisor::{Status, TaskWdt};

/// Maximum number of concurrently registered tasks.
///
/// Set via `ESP_TASK_WDT_CONFIG_MAX_TASKS`; the pool never grows at runtime.
pub const MAX_TASKS: usize = esp_config::esp_config_int!(usize, "ESP_TASK_WDT_CONFIG_MAX_TASKS");

/// Number of 32-bit words in each task mask.
pub const MASK_WORDS: usize = MAX_TASKS / 32;

/// Supervision period multiplier used when none is configured (unit: 10 ms).
pub const DEFAULT_RESCALE_TIME: u32 =
    esp_config::esp_config_int!(u32, "ESP_TASK_WDT_CONFIG_DEFAULT_RESCALE_TIME");

/// Smallest accepted supervision period multiplier.
pub const MIN_RESCALE_TIME: u32 =
    esp_config::esp_config_int!(u32, "ESP_TASK_WDT_CONFIG_MIN_RESCALE_TIME");

/// Largest accepted supervision period multiplier.
pub const MAX_RESCALE_TIME: u32 =
    esp_config::esp_config_int!(u32, "ESP_TASK_WDT_CONFIG_MAX_RESCALE_TIME");

const _: () = assert!(
    MAX_TASKS > 0 && MAX_TASKS % 32 == 0,
    "ESP_TASK_WDT_CONFIG_MAX_TASKS must be a positive multiple of 32"
);

const _: () = assert!(
    MIN_RESCALE_TIME <= DEFAULT_RESCALE_TIME && DEFAULT_RESCALE_TIME <= MAX_RESCALE_TIME,
    "rescale time configuration must satisfy min <= default <= max"
);

/// Task watchdog errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Every task slot is taken.
    NoCapacity,
    /// The id is out of range or does not name a registered task.
    InvalidId,
    /// The supervisor is disabled; no task-context operation is accepted
    /// until [`TaskWdt::enable`] is called.
    Disabled,
    /// A debug probe was attached at startup; the supervisor refuses to arm.
    DebuggerAttached,
    /// The requested rescale time is out of bounds; the previous value was
    /// kept.
    InvalidRescaleTime,
}

/// Opaque handle for a registered task slot.
///
/// Unique while the registration lasts; the underlying slot may be handed to
/// another task after [`TaskWdt::unregister`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    /// Numeric slot index, in `0..`[`MAX_TASKS`].
    pub fn index(self) -> usize {
        self.0
    }
}

fn unknown_task() -> usize {
    0
}

/// Supervisor configuration, consumed once at construction.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Supervision period as a multiple of the 10 ms base tick.
    ///
    /// Out-of-range values fall back to [`DEFAULT_RESCALE_TIME`].
    pub rescale_time: u32,

    /// Whether a debug probe was attached at startup.
    ///
    /// Sample the probe state once and pass it here (on esp-hal:
    /// `esp_hal::debugger::debugger_connected()`); the supervisor then
    /// starts disabled so breakpoint-halted execution cannot trigger
    /// spurious resets.
    pub debugger_attached: bool,

    /// Returns an opaque identity token for the calling task.
    ///
    /// Recorded at registration for diagnostics only; the supervisor never
    /// dereferences or otherwise interprets it.
    pub current_task: fn() -> usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rescale_time: DEFAULT_RESCALE_TIME,
            debugger_attached: false,
            current_task: unknown_task,
        }
    }
}
