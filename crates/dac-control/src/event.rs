//! Controller events, device masks and handler registration
//!
//! Each event kind has at most one handler, a plain function pointer called
//! inline from [`Controller::poll`](crate::Controller::poll) or the power
//! methods. Registering a handler replaces the previous one.

use core::fmt;

/// Largest device collection a controller can track. The lock aggregate
/// needs two bits per device.
pub const MAX_DEVICES: usize = 16;

fn bit(index: usize) -> u32 {
    u32::try_from(index)
        .ok()
        .and_then(|shift| 1u32.checked_shl(shift))
        .unwrap_or(0)
}

// ── Device mask ──────────────────────────────────────────────────────────────

/// Set of device indices, bit `i` for device `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceMask(u32);

impl DeviceMask {
    /// No devices.
    pub const EMPTY: Self = Self(0);

    /// Add device `index`.
    pub fn insert(&mut self, index: usize) {
        self.0 |= bit(index);
    }

    /// Whether device `index` is in the set.
    pub fn contains(self, index: usize) -> bool {
        let bit = bit(index);
        bit != 0 && self.0 & bit != 0
    }

    /// True when no device is in the set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of devices in the set.
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DeviceMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#b}", self.0)
    }
}

// ── Lock aggregate ───────────────────────────────────────────────────────────

/// Lock state of every device from one sample.
///
/// For `n` devices, bit `i` is set when device `i` is locked and bit `i + n`
/// when its lock status could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LockMask(u32);

/// Classification of a [`LockMask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LockStatus {
    /// Every device locked
    Locked,
    /// Every device read, at least one unlocked
    Unlocked,
    /// At least one lock read failed
    ReadError,
}

impl LockMask {
    /// Nothing locked, nothing failed.
    pub const EMPTY: Self = Self(0);

    /// Reference value with all `devices` locked.
    pub fn all_locked(devices: usize) -> Self {
        Self(bit(devices).wrapping_sub(1))
    }

    /// Mark device `index` locked.
    pub fn set_locked(&mut self, index: usize) {
        self.0 |= bit(index);
    }

    /// Mark the lock read of device `index` (out of `devices`) failed.
    pub fn set_read_error(&mut self, index: usize, devices: usize) {
        self.0 |= bit(index.saturating_add(devices));
    }

    /// Whether device `index` reported lock.
    pub fn is_locked(self, index: usize) -> bool {
        self.0 & bit(index) != 0
    }

    /// Whether the lock read of device `index` failed.
    pub fn read_failed(self, index: usize, devices: usize) -> bool {
        self.0 & bit(index.saturating_add(devices)) != 0
    }

    /// Classify against the reference for `devices` devices.
    pub fn status(self, devices: usize) -> LockStatus {
        if self == Self::all_locked(devices) {
            LockStatus::Locked
        } else if self.0 < bit(devices) {
            LockStatus::Unlocked
        } else {
            LockStatus::ReadError
        }
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }
}

// ── Events ───────────────────────────────────────────────────────────────────

/// Kind of controller event, used to register handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    /// About to assert the power relay
    BeforePowerOn,
    /// Power relay asserted
    AfterPowerOn,
    /// Devices muted and held in reset, relay still on
    BeforePowerOff,
    /// Relay off and devices reset
    AfterPowerOff,
    /// Initialisation sequence finished with every device healthy
    Initialised,
    /// Initialisation sequence finished with failed devices
    NotInitialised,
    /// Every device locked
    Lock,
    /// At least one device lost lock
    NoLock,
    /// At least one lock status could not be read
    LockReadError,
    /// The automute aggregate flipped
    AutomuteChanged,
}

impl EventKind {
    /// Number of event kinds.
    pub const COUNT: usize = 10;

    /// Every kind, in declaration order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::BeforePowerOn,
        Self::AfterPowerOn,
        Self::BeforePowerOff,
        Self::AfterPowerOff,
        Self::Initialised,
        Self::NotInitialised,
        Self::Lock,
        Self::NoLock,
        Self::LockReadError,
        Self::AutomuteChanged,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    /// Name for logs.
    pub const fn label(self) -> &'static str {
        match self {
            Self::BeforePowerOn => "before power on",
            Self::AfterPowerOn => "after power on",
            Self::BeforePowerOff => "before power off",
            Self::AfterPowerOff => "after power off",
            Self::Initialised => "initialised",
            Self::NotInitialised => "not initialised",
            Self::Lock => "lock",
            Self::NoLock => "no lock",
            Self::LockReadError => "lock read error",
            Self::AutomuteChanged => "automute changed",
        }
    }
}

/// Event delivered to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// See [`EventKind::BeforePowerOn`]
    BeforePowerOn,
    /// See [`EventKind::AfterPowerOn`]
    AfterPowerOn,
    /// See [`EventKind::BeforePowerOff`]
    BeforePowerOff,
    /// See [`EventKind::AfterPowerOff`]
    AfterPowerOff,
    /// See [`EventKind::Initialised`]
    Initialised,
    /// See [`EventKind::NotInitialised`]
    NotInitialised {
        /// Devices that failed every attempt
        failed: DeviceMask,
    },
    /// See [`EventKind::Lock`]
    Lock {
        /// Sample that triggered the event
        mask: LockMask,
    },
    /// See [`EventKind::NoLock`]
    NoLock {
        /// Sample that triggered the event
        mask: LockMask,
    },
    /// See [`EventKind::LockReadError`]
    LockReadError {
        /// Sample that triggered the event
        mask: LockMask,
    },
    /// See [`EventKind::AutomuteChanged`]
    AutomuteChanged {
        /// New aggregate value
        automuted: bool,
    },
}

impl Event {
    /// Kind used to look up the handler.
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::BeforePowerOn => EventKind::BeforePowerOn,
            Self::AfterPowerOn => EventKind::AfterPowerOn,
            Self::BeforePowerOff => EventKind::BeforePowerOff,
            Self::AfterPowerOff => EventKind::AfterPowerOff,
            Self::Initialised => EventKind::Initialised,
            Self::NotInitialised { .. } => EventKind::NotInitialised,
            Self::Lock { .. } => EventKind::Lock,
            Self::NoLock { .. } => EventKind::NoLock,
            Self::LockReadError { .. } => EventKind::LockReadError,
            Self::AutomuteChanged { .. } => EventKind::AutomuteChanged,
        }
    }

    /// Lock event matching a classified sample.
    pub const fn from_lock(status: LockStatus, mask: LockMask) -> Self {
        match status {
            LockStatus::Locked => Self::Lock { mask },
            LockStatus::Unlocked => Self::NoLock { mask },
            LockStatus::ReadError => Self::LockReadError { mask },
        }
    }
}

/// Event handler.
pub type Handler = fn(&Event);

/// One optional handler per [`EventKind`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Handlers {
    slots: [Option<Handler>; EventKind::COUNT],
}

impl Handlers {
    /// No handlers registered.
    pub const fn new() -> Self {
        Self {
            slots: [None; EventKind::COUNT],
        }
    }

    /// Register `handler` for `kind`, replacing any previous one.
    pub fn set(&mut self, kind: EventKind, handler: Handler) {
        if let Some(slot) = self.slots.get_mut(kind.index()) {
            *slot = Some(handler);
        }
    }

    /// Remove the handler for `kind`.
    pub fn clear(&mut self, kind: EventKind) {
        if let Some(slot) = self.slots.get_mut(kind.index()) {
            *slot = None;
        }
    }

    /// Whether a handler is registered for `kind`.
    pub fn is_set(&self, kind: EventKind) -> bool {
        self.slots
            .get(kind.index())
            .is_some_and(Option::is_some)
    }

    /// Call the handler for `event`, if any.
    pub fn dispatch(&self, event: &Event) {
        if let Some(Some(handler)) = self.slots.get(event.kind().index()) {
            handler(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    thread_local! {
        static CALLS: Cell<u32> = const { Cell::new(0) };
    }

    fn count(_: &Event) {
        CALLS.with(|c| c.set(c.get().saturating_add(1)));
    }

    #[test]
    fn test_lock_mask_classification() {
        let mut mask = LockMask::EMPTY;
        mask.set_locked(0);
        mask.set_locked(1);
        assert_eq!(mask, LockMask::all_locked(2));
        assert_eq!(mask.status(2), LockStatus::Locked);

        let mut partial = LockMask::EMPTY;
        partial.set_locked(1);
        assert_eq!(partial.status(2), LockStatus::Unlocked);
        assert_eq!(LockMask::EMPTY.status(2), LockStatus::Unlocked);

        let mut failed = LockMask::EMPTY;
        failed.set_locked(0);
        failed.set_read_error(1, 2);
        assert_eq!(failed.bits(), 0b1001);
        assert!(failed.read_failed(1, 2));
        assert!(!failed.is_locked(1));
        assert_eq!(failed.status(2), LockStatus::ReadError);
    }

    #[test]
    fn test_all_locked_reference() {
        assert_eq!(LockMask::all_locked(0).bits(), 0);
        assert_eq!(LockMask::all_locked(3).bits(), 0b111);
        assert_eq!(LockMask::all_locked(MAX_DEVICES).bits(), 0xFFFF);
    }

    #[test]
    fn test_device_mask() {
        let mut mask = DeviceMask::EMPTY;
        assert!(mask.is_empty());
        mask.insert(0);
        mask.insert(3);
        assert!(mask.contains(3));
        assert!(!mask.contains(1));
        assert!(!mask.contains(40));
        assert_eq!(mask.len(), 2);
        assert_eq!(mask.to_string(), "0b1001");
    }

    #[test]
    fn test_event_kinds_match_table() {
        for (index, kind) in EventKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), index);
        }
        assert_eq!(
            Event::from_lock(LockStatus::Unlocked, LockMask::EMPTY).kind(),
            EventKind::NoLock
        );
    }

    #[test]
    fn test_handler_replaced_and_cleared() {
        CALLS.with(|c| c.set(0));
        let mut handlers = Handlers::new();
        handlers.dispatch(&Event::Initialised);
        handlers.set(EventKind::Initialised, count);
        assert!(handlers.is_set(EventKind::Initialised));
        handlers.dispatch(&Event::Initialised);
        handlers.dispatch(&Event::AfterPowerOn);
        assert_eq!(CALLS.with(Cell::get), 1);

        handlers.clear(EventKind::Initialised);
        handlers.dispatch(&Event::Initialised);
        assert_eq!(CALLS.with(Cell::get), 1);
    }
}
