//! Hardware watchdog timer capability.
//!
//! The supervisor drives whichever watchdog peripheral the platform provides
//! through the [`WdtDevice`] trait, so the escalation logic can be exercised
//! against a fake device with no hardware attached.

use fugit::MicrosDurationU64;

/// Interface to the hardware watchdog timer backing the supervisor.
///
/// All methods take `&self`: the expiry path runs in interrupt context and
/// must not depend on a lock. Implementations for memory-mapped peripherals
/// can write their registers directly; calls from task context are serialized
/// by the supervisor's internal critical section, and the expiry callback
/// cannot interleave with them on these (single-interrupt-source) devices.
///
/// Binding the timer's expiry interrupt to [`TaskWdt::on_timeout`] is the
/// caller's responsibility, in the platform's usual interrupt-handler idiom.
///
/// [`TaskWdt::on_timeout`]: crate::TaskWdt::on_timeout
pub trait WdtDevice {
    /// Loads the countdown with `period` and starts (or restarts) it.
    fn arm(&self, period: MicrosDurationU64);

    /// Stops the countdown.
    fn disarm(&self);

    /// Controls whether expiry resets the system directly instead of only
    /// invoking the expiry interrupt.
    fn set_abort(&self, enable: bool);

    /// Resets the system immediately.
    ///
    /// Real implementations do not return from this call. The signature
    /// still returns so test doubles can record the escalation instead of
    /// aborting the test process.
    fn force_reset(&self);

    /// Whether the countdown is currently running.
    fn is_armed(&self) -> bool;
}
