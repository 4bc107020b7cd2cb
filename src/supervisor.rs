//! The task-health supervisor.
//!
//! Tracks liveness of a set of registered tasks against a hardware watchdog
//! period. Tasks heartbeat with [`TaskWdt::notify`]; the hardware timer's
//! expiry interrupt drives the mandatory evaluation through
//! [`TaskWdt::on_timeout`]. A required task that stays silent for a full
//! period costs a system reset.

use core::cell::RefCell;

use critical_section::Mutex;
use fugit::MicrosDurationU64;
use portable_atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicUsize, Ordering};

use crate::{
    Config,
    DEFAULT_RESCALE_TIME,
    Error,
    MASK_WORDS,
    MAX_RESCALE_TIME,
    MAX_TASKS,
    MIN_RESCALE_TIME,
    TaskId,
    hal::WdtDevice,
    mask::{TaskMask, WORD_BITS},
};

/// Duration of one rescale unit.
const RESCALE_UNIT_US: u64 = 10_000;

/// Sentinel for "no task id" in the atomic id slots.
const NO_TASK: usize = usize::MAX;

/// Task-health watchdog supervisor.
///
/// A cooperative dead-man's switch: tasks [`register`](Self::register) once,
/// then periodically [`notify`](Self::notify). If every monitored task has
/// checked in, the hardware countdown is re-armed; if the countdown expires
/// with a required task still silent, the supervisor forces a system reset.
///
/// # Concurrency
///
/// All task-context operations serialize on a single critical section. The
/// expiry path ([`on_timeout`](Self::on_timeout)) runs in interrupt context
/// and deliberately does **not** enter that critical section: it snapshots
/// the masks with relaxed word-granular atomic loads. The race is benign and
/// bounded: a stale word can delay detection of a hang by at most one
/// period, but can neither suppress a genuine escalation nor fabricate one,
/// because only evaluation paths clear the notified mask and a heartbeat is
/// never lost, only observed a period late.
///
/// No allocation happens after construction; all state is fixed-size arrays
/// sized by [`MAX_TASKS`].
pub struct TaskWdt<D: WdtDevice> {
    timer: D,
    enabled: AtomicBool,
    debugger_attached: bool,
    rescale_time: AtomicU32,
    registered: TaskMask<MASK_WORDS>,
    monitored: TaskMask<MASK_WORDS>,
    notified: TaskMask<MASK_WORDS>,
    latency: [AtomicU8; MAX_TASKS],
    max_task_id: AtomicUsize,
    idle_task_id: AtomicUsize,
    current_task: fn() -> usize,
    owners: Mutex<RefCell<[usize; MAX_TASKS]>>,
}

impl<D: WdtDevice> TaskWdt<D> {
    /// Constructs the supervisor and arms the hardware countdown.
    ///
    /// With `debugger_attached` set the supervisor starts disabled and the
    /// hardware timer is left disarmed: breakpoint-halted execution would
    /// starve every heartbeat and reset an otherwise healthy system.
    pub fn new(timer: D, config: Config) -> Self {
        let rescale_time = if (MIN_RESCALE_TIME..=MAX_RESCALE_TIME).contains(&config.rescale_time)
        {
            config.rescale_time
        } else {
            warn!(
                "rescale time {} outside {}..={}, using default",
                config.rescale_time, MIN_RESCALE_TIME, MAX_RESCALE_TIME
            );
            DEFAULT_RESCALE_TIME
        };

        let wdt = Self {
            timer,
            enabled: AtomicBool::new(!config.debugger_attached),
            debugger_attached: config.debugger_attached,
            rescale_time: AtomicU32::new(rescale_time),
            registered: TaskMask::new(),
            monitored: TaskMask::new(),
            notified: TaskMask::new(),
            latency: [const { AtomicU8::new(0) }; MAX_TASKS],
            max_task_id: AtomicUsize::new(NO_TASK),
            idle_task_id: AtomicUsize::new(NO_TASK),
            current_task: config.current_task,
            owners: Mutex::new(RefCell::new([0; MAX_TASKS])),
        };

        if wdt.debugger_attached {
            info!("debug probe attached, supervisor starts disabled");
            wdt.timer.disarm();
        } else {
            wdt.timer.set_abort(true);
            wdt.timer.arm(wdt.period());
        }

        wdt
    }

    /// Allocates a slot and starts monitoring the calling task.
    ///
    /// The returned id is unique while registered and may be reused after
    /// [`unregister`](Self::unregister).
    pub fn register(&self) -> Result<TaskId, Error> {
        self.ensure_enabled()?;

        critical_section::with(|cs| {
            let Some(id) = self.registered.first_clear() else {
                warn!("no free task slot");
                return Err(Error::NoCapacity);
            };

            self.registered.set(id);
            self.monitored.set(id);
            self.latency[id].store(0, Ordering::Relaxed);
            self.owners.borrow_ref_mut(cs)[id] = (self.current_task)();

            let max = self.max_task_id.load(Ordering::Relaxed);
            if max == NO_TASK || id > max {
                self.max_task_id.store(id, Ordering::Relaxed);
            }

            debug!("registered task slot {}", id);

            Ok(TaskId(id))
        })
    }

    /// Releases a slot, dropping the task from all masks.
    ///
    /// Idempotent: unregistering an id that is already free succeeds, so
    /// racing shutdown paths can both call it.
    pub fn unregister(&self, id: TaskId) -> Result<(), Error> {
        self.ensure_enabled()?;
        let id = index_in_range(id)?;

        critical_section::with(|cs| {
            if !self.registered.contains(id) {
                return Ok(());
            }

            self.registered.clear(id);
            self.monitored.clear(id);
            self.notified.clear(id);
            self.latency[id].store(0, Ordering::Relaxed);
            self.owners.borrow_ref_mut(cs)[id] = 0;

            self.max_task_id.store(
                self.registered.highest_set().unwrap_or(NO_TASK),
                Ordering::Relaxed,
            );

            debug!("unregistered task slot {}", id);

            Ok(())
        })
    }

    /// Exempts the task from monitoring until [`resume`](Self::resume).
    ///
    /// For legitimately long bounded waits (blocking network I/O and the
    /// like) during which the task cannot heartbeat. The registration and
    /// its id are kept.
    pub fn suspend(&self, id: TaskId) -> Result<(), Error> {
        self.ensure_enabled()?;

        critical_section::with(|_| {
            let id = self.registered_index(id)?;
            self.monitored.clear(id);
            Ok(())
        })
    }

    /// Puts the task back under monitoring.
    ///
    /// Resuming is not a heartbeat: the task must [`notify`](Self::notify)
    /// within the current period or it counts as hung.
    pub fn resume(&self, id: TaskId) -> Result<(), Error> {
        self.ensure_enabled()?;

        critical_section::with(|_| {
            let id = self.registered_index(id)?;
            self.resume_monitoring(id);
            Ok(())
        })
    }

    /// Heartbeat: marks the task as alive for the current period.
    ///
    /// Clears any remaining latency grace for the id, then evaluates the
    /// fleet; if every monitored task has now checked in the period is
    /// re-armed immediately instead of waiting for the hardware timer.
    pub fn notify(&self, id: TaskId) -> Result<(), Error> {
        self.ensure_enabled()?;

        critical_section::with(|_| {
            let id = self.registered_index(id)?;
            self.heartbeat(id);
            Ok(())
        })
    }

    /// Resume and heartbeat in one lock acquisition.
    ///
    /// The usual pattern for "I was blocked, now I'm back and alive".
    pub fn notify_and_resume(&self, id: TaskId) -> Result<(), Error> {
        self.ensure_enabled()?;

        critical_section::with(|_| {
            let id = self.registered_index(id)?;
            self.resume_monitoring(id);
            self.heartbeat(id);
            Ok(())
        })
    }

    /// Grants the task `cycles` consecutive silent periods before it is
    /// required to heartbeat again.
    ///
    /// An explicit [`notify`](Self::notify) cancels the remaining grace.
    pub fn set_latency(&self, id: TaskId, cycles: u8) -> Result<(), Error> {
        self.ensure_enabled()?;

        critical_section::with(|_| {
            let id = self.registered_index(id)?;
            self.latency[id].store(cycles, Ordering::Relaxed);
            Ok(())
        })
    }

    /// Designates the idle task for the heartbeat relay.
    ///
    /// Forward progress by any other task is sufficient evidence that the
    /// scheduler is alive, so every non-idle heartbeat is forwarded as an
    /// implicit heartbeat for this id. Requiring the idle task to check in
    /// on its own schedule would escalate spuriously under heavy load, when
    /// the idle task legitimately never runs.
    pub fn set_idle_task_id(&self, id: Option<TaskId>) -> Result<(), Error> {
        let idle = match id {
            Some(id) => index_in_range(id)?,
            None => NO_TASK,
        };
        self.idle_task_id.store(idle, Ordering::Relaxed);
        Ok(())
    }

    /// Changes the supervision period to `rescale_time` × 10 ms.
    ///
    /// Takes effect at the next re-arm, not immediately. Out-of-range values
    /// are rejected and the previous period is kept.
    pub fn set_rescale_time(&self, rescale_time: u32) -> Result<(), Error> {
        self.ensure_enabled()?;

        if !(MIN_RESCALE_TIME..=MAX_RESCALE_TIME).contains(&rescale_time) {
            warn!(
                "rescale time {} outside {}..={}",
                rescale_time, MIN_RESCALE_TIME, MAX_RESCALE_TIME
            );
            return Err(Error::InvalidRescaleTime);
        }

        critical_section::with(|_| {
            self.rescale_time.store(rescale_time, Ordering::Relaxed);
        });

        Ok(())
    }

    /// Current supervision period multiplier (unit: 10 ms).
    pub fn rescale_time(&self) -> u32 {
        self.rescale_time.load(Ordering::Relaxed)
    }

    /// Re-enables supervision and restarts the hardware countdown.
    ///
    /// Refused while a debug probe is attached.
    pub fn enable(&self) -> Result<(), Error> {
        if self.debugger_attached {
            return Err(Error::DebuggerAttached);
        }

        self.enabled.store(true, Ordering::Relaxed);
        self.timer.set_abort(true);
        self.timer.arm(self.period());
        info!("task watchdog enabled");

        Ok(())
    }

    /// Kill switch: stops the hardware countdown and short-circuits every
    /// task-context operation with [`Error::Disabled`].
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
        self.timer.disarm();
        info!("task watchdog disabled");
    }

    /// Whether supervision is currently active.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Mandatory evaluation, to be called from the timer's expiry interrupt.
    ///
    /// Consumes one unit of latency grace from every id still holding some,
    /// then checks the fleet. Fully checked in: the period is re-armed.
    /// Otherwise escalates: the hardware abort flag is raised and the system
    /// is reset on the spot. Escalation is the recovery mechanism, not an
    /// error to recover from; there is no further grace once the hardware
    /// timer itself has fired.
    ///
    /// Runs lock-free; see the type-level notes on the bounded-staleness
    /// race.
    pub fn on_timeout(&self) {
        if !self.is_enabled() {
            return;
        }

        if self.mandatory_check() {
            self.rearm();
        } else {
            error!("required task(s) missed the supervision period, resetting");
            self.timer.set_abort(true);
            self.timer.force_reset();
        }
    }

    /// Diagnostics snapshot.
    pub fn status(&self) -> Status {
        Status {
            enabled: self.is_enabled(),
            armed: self.timer.is_armed(),
            registered: self.registered.snapshot(),
            monitored: self.monitored.snapshot(),
            notified: self.notified.snapshot(),
            idle_task_id: task_id_opt(self.idle_task_id.load(Ordering::Relaxed)),
            max_task_id: task_id_opt(self.max_task_id.load(Ordering::Relaxed)),
            rescale_time: self.rescale_time(),
        }
    }

    /// The identity token recorded when `id` was registered, while it stays
    /// registered.
    pub fn task_token(&self, id: TaskId) -> Option<usize> {
        let id = index_in_range(id).ok()?;

        critical_section::with(|cs| {
            if self.registered.contains(id) {
                Some(self.owners.borrow_ref(cs)[id])
            } else {
                None
            }
        })
    }

    /// Borrows the underlying watchdog device.
    pub fn device(&self) -> &D {
        &self.timer
    }

    fn ensure_enabled(&self) -> Result<(), Error> {
        if self.is_enabled() {
            Ok(())
        } else {
            Err(Error::Disabled)
        }
    }

    /// Validates that `id` names a currently registered slot.
    fn registered_index(&self, id: TaskId) -> Result<usize, Error> {
        let id = index_in_range(id)?;
        if self.registered.contains(id) {
            Ok(id)
        } else {
            Err(Error::InvalidId)
        }
    }

    fn resume_monitoring(&self, id: usize) {
        self.monitored.set(id);
        // A concurrently-unregistered id must not become monitored again.
        self.monitored.retain(&self.registered);
    }

    /// Records the heartbeat, forwards it to the idle task, then runs the
    /// opportunistic evaluation. Caller holds the lock.
    fn heartbeat(&self, id: usize) {
        trace!("heartbeat from task slot {}", id);

        self.notified.set(id);
        self.latency[id].store(0, Ordering::Relaxed);

        let idle = self.idle_task_id.load(Ordering::Relaxed);
        if idle != NO_TASK && idle != id && self.registered.contains(idle) {
            self.notified.set(idle);
            self.latency[idle].store(0, Ordering::Relaxed);
        }

        if self.fleet_checked_in() {
            // Early reset: a healthy system never depends on exact timer
            // alignment.
            self.rearm();
        }
    }

    /// Opportunistic evaluation: has every monitored task checked in?
    ///
    /// Latency grace is accounted only by the mandatory cycle; here a graced
    /// but silent task simply keeps the period running until the timer
    /// fires.
    fn fleet_checked_in(&self) -> bool {
        for word in 0..self.word_bound() {
            let required = self.monitored.load_word(word);
            if self.notified.load_word(word) & required != required {
                return false;
            }
        }
        true
    }

    /// Mandatory evaluation: decrements every nonzero latency counter by
    /// exactly one and exempts those ids from the required set for this
    /// cycle only.
    fn mandatory_check(&self) -> bool {
        let mut complete = true;

        for word in 0..self.word_bound() {
            let mut exempt = 0u32;
            for bit in 0..WORD_BITS {
                let id = word * WORD_BITS + bit;
                let graced = self.latency[id]
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |remaining| {
                        remaining.checked_sub(1)
                    })
                    .is_ok();
                if graced {
                    exempt |= 1 << bit;
                }
            }

            let required = self.monitored.load_word(word) & !exempt;
            if self.notified.load_word(word) & required != required {
                complete = false;
            }
        }

        complete
    }

    /// Closes the period: clears the notified mask and restarts the hardware
    /// countdown with the current rescale time.
    fn rearm(&self) {
        self.notified.clear_all();

        if !self.debugger_attached {
            self.timer.arm(self.period());
        }
    }

    fn period(&self) -> MicrosDurationU64 {
        MicrosDurationU64::micros(RESCALE_UNIT_US * u64::from(self.rescale_time()))
    }

    /// Words worth scanning, bounded by the highest registered id.
    fn word_bound(&self) -> usize {
        match self.max_task_id.load(Ordering::Relaxed) {
            NO_TASK => 0,
            max => max / WORD_BITS + 1,
        }
    }
}

fn index_in_range(id: TaskId) -> Result<usize, Error> {
    if id.0 < MAX_TASKS {
        Ok(id.0)
    } else {
        Err(Error::InvalidId)
    }
}

fn task_id_opt(id: usize) -> Option<TaskId> {
    if id == NO_TASK { None } else { Some(TaskId(id)) }
}

/// Point-in-time view of the supervisor, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    /// Whether supervision is active.
    pub enabled: bool,
    /// Whether the hardware countdown is running.
    pub armed: bool,
    /// Words of the registered mask.
    pub registered: [u32; MASK_WORDS],
    /// Words of the monitored mask.
    pub monitored: [u32; MASK_WORDS],
    /// Words of the notified mask.
    pub notified: [u32; MASK_WORDS],
    /// Idle task designated for the heartbeat relay, if configured.
    pub idle_task_id: Option<TaskId>,
    /// Highest currently registered id, if any task is registered.
    pub max_task_id: Option<TaskId>,
    /// Supervision period multiplier (unit: 10 ms).
    pub rescale_time: u32,
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    /// Records what the supervisor asked of the hardware instead of touching
    /// any. `force_reset` returns so escalations can be counted.
    struct FakeWdt {
        armed: Cell<bool>,
        arm_count: Cell<u32>,
        last_period: Cell<MicrosDurationU64>,
        abort: Cell<bool>,
        resets: Cell<u32>,
    }

    impl FakeWdt {
        fn new() -> Self {
            Self {
                armed: Cell::new(false),
                arm_count: Cell::new(0),
                last_period: Cell::new(MicrosDurationU64::micros(0)),
                abort: Cell::new(false),
                resets: Cell::new(0),
            }
        }
    }

    impl WdtDevice for FakeWdt {
        fn arm(&self, period: MicrosDurationU64) {
            self.armed.set(true);
            self.arm_count.set(self.arm_count.get() + 1);
            self.last_period.set(period);
        }

        fn disarm(&self) {
            self.armed.set(false);
        }

        fn set_abort(&self, enable: bool) {
            self.abort.set(enable);
        }

        fn force_reset(&self) {
            self.resets.set(self.resets.get() + 1);
        }

        fn is_armed(&self) -> bool {
            self.armed.get()
        }
    }

    fn supervisor() -> TaskWdt<FakeWdt> {
        TaskWdt::new(FakeWdt::new(), Config::default())
    }

    // In these tests a completed fleet re-arms the fake immediately (the
    // early reset path); calling `on_timeout` afterwards therefore models a
    // full period in which nobody sent a further heartbeat.

    #[test]
    fn construction_arms_with_abort() {
        let wdt = supervisor();
        assert!(wdt.is_enabled());
        assert!(wdt.device().armed.get());
        assert!(wdt.device().abort.get());
        assert_eq!(
            wdt.device().last_period.get(),
            MicrosDurationU64::micros(RESCALE_UNIT_US * u64::from(DEFAULT_RESCALE_TIME))
        );
    }

    #[test]
    fn ids_unique_while_registered_and_reused_after() {
        let wdt = supervisor();
        let a = wdt.register().unwrap();
        let b = wdt.register().unwrap();
        assert_ne!(a, b);

        wdt.unregister(a).unwrap();
        let c = wdt.register().unwrap();
        assert_eq!(c.index(), a.index());
    }

    #[test]
    fn pool_never_grows() {
        let wdt = supervisor();
        for _ in 0..MAX_TASKS {
            wdt.register().unwrap();
        }
        assert_eq!(wdt.register(), Err(Error::NoCapacity));
    }

    #[test]
    fn unregister_is_idempotent() {
        let wdt = supervisor();
        let a = wdt.register().unwrap();
        wdt.unregister(a).unwrap();
        wdt.unregister(a).unwrap();
    }

    #[test]
    fn mutating_calls_on_unregistered_id_fail() {
        let wdt = supervisor();
        let a = wdt.register().unwrap();
        wdt.unregister(a).unwrap();

        assert_eq!(wdt.notify(a), Err(Error::InvalidId));
        assert_eq!(wdt.suspend(a), Err(Error::InvalidId));
        assert_eq!(wdt.resume(a), Err(Error::InvalidId));
        assert_eq!(wdt.notify_and_resume(a), Err(Error::InvalidId));
        assert_eq!(wdt.set_latency(a, 1), Err(Error::InvalidId));
    }

    #[test]
    fn healthy_fleet_never_escalates() {
        let wdt = supervisor();
        let a = wdt.register().unwrap();
        let b = wdt.register().unwrap();

        for _ in 0..5 {
            wdt.notify(a).unwrap();
            wdt.notify(b).unwrap();
        }

        // One arm at construction, one early re-arm per completed period.
        assert_eq!(wdt.device().arm_count.get(), 1 + 5);
        assert_eq!(wdt.device().resets.get(), 0);
    }

    #[test]
    fn empty_required_set_rearms_on_timeout() {
        let wdt = supervisor();
        wdt.on_timeout();
        assert_eq!(wdt.device().resets.get(), 0);
        assert_eq!(wdt.device().arm_count.get(), 2);
    }

    #[test]
    fn silent_task_escalates_within_one_period() {
        let wdt = supervisor();
        let _a = wdt.register().unwrap();
        let b = wdt.register().unwrap();

        wdt.notify(b).unwrap();
        wdt.on_timeout();

        assert_eq!(wdt.device().resets.get(), 1);
        assert!(wdt.device().abort.get());
    }

    #[test]
    fn early_rearm_clears_notified() {
        let wdt = supervisor();
        let a = wdt.register().unwrap();

        wdt.notify(a).unwrap();

        let status = wdt.status();
        assert_eq!(status.notified, [0; MASK_WORDS]);
        assert_eq!(wdt.device().arm_count.get(), 2);
    }

    #[test]
    fn latency_exempts_exactly_k_periods() {
        let wdt = supervisor();
        let a = wdt.register().unwrap();
        let b = wdt.register().unwrap();
        wdt.set_latency(b, 2).unwrap();

        // Periods 1 and 2: B is graced, A heartbeats, no escalation.
        for _ in 0..2 {
            wdt.notify(a).unwrap();
            wdt.on_timeout();
            assert_eq!(wdt.device().resets.get(), 0);
        }

        // Period 3: grace exhausted.
        wdt.notify(a).unwrap();
        wdt.on_timeout();
        assert_eq!(wdt.device().resets.get(), 1);
    }

    #[test]
    fn explicit_notify_cancels_grace() {
        let wdt = supervisor();
        let a = wdt.register().unwrap();
        let b = wdt.register().unwrap();
        wdt.set_latency(b, 2).unwrap();

        // B heartbeats once, wiping its grace; the fleet completes and
        // re-arms early.
        wdt.notify(b).unwrap();
        wdt.notify(a).unwrap();

        // Next period B is silent and no longer graced.
        wdt.notify(a).unwrap();
        wdt.on_timeout();
        assert_eq!(wdt.device().resets.get(), 1);
    }

    #[test]
    fn suspended_task_is_not_required() {
        let wdt = supervisor();
        let a = wdt.register().unwrap();
        let b = wdt.register().unwrap();
        wdt.suspend(b).unwrap();

        // A alone completes the fleet, period after period.
        for _ in 0..4 {
            wdt.notify(a).unwrap();
        }

        assert_eq!(wdt.device().arm_count.get(), 1 + 4);
        assert_eq!(wdt.device().resets.get(), 0);
    }

    #[test]
    fn resume_is_not_a_heartbeat() {
        let wdt = supervisor();
        let a = wdt.register().unwrap();
        let b = wdt.register().unwrap();
        wdt.suspend(b).unwrap();

        wdt.notify(a).unwrap();
        wdt.resume(b).unwrap();

        // B is required again but has not notified.
        wdt.notify(a).unwrap();
        assert_eq!(wdt.device().arm_count.get(), 2);

        wdt.on_timeout();
        assert_eq!(wdt.device().resets.get(), 1);
    }

    #[test]
    fn notify_and_resume_satisfies_the_period() {
        let wdt = supervisor();
        let a = wdt.register().unwrap();
        let b = wdt.register().unwrap();
        wdt.suspend(b).unwrap();
        wdt.notify(a).unwrap();

        wdt.notify_and_resume(b).unwrap();
        wdt.notify(a).unwrap();

        assert_eq!(wdt.device().arm_count.get(), 1 + 2);
        assert_eq!(wdt.device().resets.get(), 0);
    }

    #[test]
    fn monitored_stays_subset_of_registered() {
        let wdt = supervisor();
        let a = wdt.register().unwrap();
        let b = wdt.register().unwrap();
        wdt.unregister(b).unwrap();
        wdt.resume(a).unwrap();

        let status = wdt.status();
        for (monitored, registered) in status.monitored.iter().zip(status.registered.iter()) {
            assert_eq!(monitored & !registered, 0);
        }
    }

    #[test]
    fn idle_relay_forwards_other_heartbeats() {
        let wdt = supervisor();
        let idle = wdt.register().unwrap();
        let a = wdt.register().unwrap();
        wdt.set_idle_task_id(Some(idle)).unwrap();

        // A's heartbeat satisfies both A and the idle task.
        wdt.notify(a).unwrap();
        assert_eq!(wdt.device().arm_count.get(), 2);
        assert_eq!(wdt.device().resets.get(), 0);
    }

    #[test]
    fn idle_heartbeat_satisfies_only_idle() {
        let wdt = supervisor();
        let idle = wdt.register().unwrap();
        let _a = wdt.register().unwrap();
        wdt.set_idle_task_id(Some(idle)).unwrap();

        wdt.notify(idle).unwrap();
        // A is still required.
        assert_eq!(wdt.device().arm_count.get(), 1);

        wdt.on_timeout();
        assert_eq!(wdt.device().resets.get(), 1);
    }

    #[test]
    fn rescale_time_bounds() {
        let wdt = supervisor();

        assert_eq!(
            wdt.set_rescale_time(MIN_RESCALE_TIME - 1),
            Err(Error::InvalidRescaleTime)
        );
        assert_eq!(wdt.rescale_time(), DEFAULT_RESCALE_TIME);

        wdt.set_rescale_time(MIN_RESCALE_TIME).unwrap();
        assert_eq!(wdt.rescale_time(), MIN_RESCALE_TIME);

        assert_eq!(
            wdt.set_rescale_time(MAX_RESCALE_TIME + 1),
            Err(Error::InvalidRescaleTime)
        );
        assert_eq!(wdt.rescale_time(), MIN_RESCALE_TIME);
    }

    #[test]
    fn rescale_time_applies_at_next_rearm() {
        let wdt = supervisor();
        let a = wdt.register().unwrap();

        wdt.set_rescale_time(MIN_RESCALE_TIME).unwrap();
        assert_eq!(
            wdt.device().last_period.get(),
            MicrosDurationU64::micros(RESCALE_UNIT_US * u64::from(DEFAULT_RESCALE_TIME))
        );

        wdt.notify(a).unwrap();
        assert_eq!(
            wdt.device().last_period.get(),
            MicrosDurationU64::micros(RESCALE_UNIT_US * u64::from(MIN_RESCALE_TIME))
        );
    }

    #[test]
    fn disable_short_circuits_everything() {
        let wdt = supervisor();
        let a = wdt.register().unwrap();

        wdt.disable();
        assert!(!wdt.device().is_armed());

        assert_eq!(wdt.register(), Err(Error::Disabled));
        assert_eq!(wdt.notify(a), Err(Error::Disabled));
        assert_eq!(wdt.unregister(a), Err(Error::Disabled));
        assert_eq!(wdt.set_rescale_time(MIN_RESCALE_TIME), Err(Error::Disabled));

        // The mandatory path is inert as well.
        wdt.on_timeout();
        assert_eq!(wdt.device().resets.get(), 0);

        wdt.enable().unwrap();
        assert!(wdt.device().is_armed());
        wdt.notify(a).unwrap();
    }

    #[test]
    fn debugger_attached_never_arms() {
        let wdt = TaskWdt::new(
            FakeWdt::new(),
            Config {
                debugger_attached: true,
                ..Config::default()
            },
        );

        assert!(!wdt.is_enabled());
        assert_eq!(wdt.device().arm_count.get(), 0);
        assert_eq!(wdt.enable(), Err(Error::DebuggerAttached));
        assert_eq!(wdt.register(), Err(Error::Disabled));
    }

    #[test]
    fn status_reports_registry_state() {
        let wdt = supervisor();
        let a = wdt.register().unwrap();
        let b = wdt.register().unwrap();
        wdt.suspend(b).unwrap();
        wdt.set_idle_task_id(Some(a)).unwrap();

        let status = wdt.status();
        assert!(status.enabled);
        assert!(status.armed);
        assert_eq!(status.registered[0], 0b11);
        assert_eq!(status.monitored[0], 0b01);
        assert_eq!(status.idle_task_id, Some(a));
        assert_eq!(status.max_task_id, Some(b));
        assert_eq!(status.rescale_time, DEFAULT_RESCALE_TIME);
    }

    #[test]
    fn max_task_id_recomputed_downward() {
        let wdt = supervisor();
        let a = wdt.register().unwrap();
        let b = wdt.register().unwrap();
        let c = wdt.register().unwrap();

        wdt.unregister(c).unwrap();
        assert_eq!(wdt.status().max_task_id, Some(b));

        wdt.unregister(b).unwrap();
        wdt.unregister(a).unwrap();
        assert_eq!(wdt.status().max_task_id, None);
    }

    #[test]
    fn task_token_recorded_for_diagnostics() {
        fn fake_task() -> usize {
            0x4242
        }

        let wdt = TaskWdt::new(
            FakeWdt::new(),
            Config {
                current_task: fake_task,
                ..Config::default()
            },
        );

        let a = wdt.register().unwrap();
        assert_eq!(wdt.task_token(a), Some(0x4242));

        wdt.unregister(a).unwrap();
        assert_eq!(wdt.task_token(a), None);
    }
}
