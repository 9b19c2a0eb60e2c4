//! Outside-click handling.
//!
//! A [`PointerBus`] is the session-wide source of pointer-down events (the
//! terminal host feeds every left click into it). Listeners run in
//! [`Priority`] order and never stop propagation. The outside-click
//! coordinator runs ahead of every host listener, [`Priority::First`]
//! included, so open dropdowns are closed before anything else reacts to the
//! same click.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::multiselect::OpenControlRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    First,
    Normal,
    Last,
}

/// A pointer-down at a terminal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerDown {
    pub column: u16,
    pub row: u16,
}

impl PointerDown {
    pub fn new(column: u16, row: u16) -> Self {
        Self { column, row }
    }
}

type Listener = Arc<dyn Fn(&PointerDown) + Send + Sync>;

/// Dispatch order. The coordinator tier sorts before all host priorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Coordinator,
    Host(Priority),
}

struct Subscription {
    id: u64,
    tier: Tier,
    listener: Listener,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

#[derive(Clone, Default)]
pub struct PointerBus {
    inner: Arc<Mutex<BusInner>>,
}

impl fmt::Debug for PointerBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

fn lock(inner: &Mutex<BusInner>) -> MutexGuard<'_, BusInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PointerBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays registered until the guard is dropped.
    pub fn subscribe<F>(&self, priority: Priority, listener: F) -> ListenerGuard
    where
        F: Fn(&PointerDown) + Send + Sync + 'static,
    {
        self.subscribe_tier(Tier::Host(priority), Arc::new(listener))
    }

    fn subscribe_tier(&self, tier: Tier, listener: Listener) -> ListenerGuard {
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscriptions.push(Subscription { id, tier, listener });
        ListenerGuard {
            bus: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Deliver an event to every listener, highest priority first.
    /// Returns the number of listeners that saw it.
    pub fn dispatch(&self, event: &PointerDown) -> usize {
        let listeners: Vec<Listener> = {
            let inner = lock(&self.inner);
            let mut subs: Vec<&Subscription> = inner.subscriptions.iter().collect();
            subs.sort_by_key(|s| (s.tier, s.id));
            subs.into_iter().map(|s| Arc::clone(&s.listener)).collect()
        };
        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).subscriptions.len()
    }
}

/// Deregisters its listener on drop.
#[must_use = "the listener is removed when the guard is dropped"]
pub struct ListenerGuard {
    bus: Weak<Mutex<BusInner>>,
    id: u64,
}

impl fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerGuard").field("id", &self.id).finish()
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            lock(&bus).subscriptions.retain(|s| s.id != self.id);
        }
    }
}

/// Screen rectangle occupied by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Area {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Area {
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, column: u16, row: u16) -> bool {
        column >= self.x
            && row >= self.y
            && u32::from(column) < u32::from(self.x) + u32::from(self.width)
            && u32::from(row) < u32::from(self.y) + u32::from(self.height)
    }
}

/// The form's current bounds, updated by the host on every draw.
///
/// Until the first update nothing is inside, so every click counts as outside.
#[derive(Debug, Clone, Default)]
pub struct FormBoundary {
    area: Arc<Mutex<Option<Area>>>,
}

impl FormBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, area: Area) {
        *self.area.lock().unwrap_or_else(PoisonError::into_inner) = Some(area);
    }

    pub fn get(&self) -> Option<Area> {
        *self.area.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains(&self, event: &PointerDown) -> bool {
        self.get()
            .is_some_and(|area| area.contains(event.column, event.row))
    }
}

pub struct OutsideClickCoordinator;

impl OutsideClickCoordinator {
    /// Close every open control whenever a pointer-down lands outside `boundary`.
    pub fn mount(
        bus: &PointerBus,
        registry: OpenControlRegistry,
        boundary: FormBoundary,
    ) -> OutsideClickGuard {
        let listener = bus.subscribe_tier(Tier::Coordinator, Arc::new(move |event: &PointerDown| {
            if boundary.contains(event) {
                return;
            }
            let closed = registry.close_all();
            if !closed.is_empty() {
                tracing::debug!(
                    column = event.column,
                    row = event.row,
                    closed = closed.len(),
                    "outside click closed open controls"
                );
            }
        }));
        OutsideClickGuard {
            _listener: listener,
        }
    }
}

/// Keeps the coordinator subscribed; dropping it unsubscribes.
#[derive(Debug)]
#[must_use = "the coordinator stops listening when the guard is dropped"]
pub struct OutsideClickGuard {
    _listener: ListenerGuard,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::FieldPath;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn open_count(reg: &OpenControlRegistry) -> usize {
        ["a", "b"]
            .iter()
            .filter(|id| reg.is_open(&FieldPath::root(id)))
            .count()
    }

    fn open_registry() -> OpenControlRegistry {
        let reg = OpenControlRegistry::new();
        for id in ["a", "b"] {
            reg.register(FieldPath::root(id));
            reg.toggle_open(&FieldPath::root(id));
        }
        reg
    }

    #[test]
    fn outside_click_closes_everything() {
        let bus = PointerBus::new();
        let reg = open_registry();
        let boundary = FormBoundary::new();
        boundary.set(Area::new(0, 0, 10, 10));
        let _guard = OutsideClickCoordinator::mount(&bus, reg.clone(), boundary);
        bus.dispatch(&PointerDown::new(20, 3));
        assert!(open_count(&reg) == 0);
    }

    #[test]
    fn inside_click_closes_nothing() {
        let bus = PointerBus::new();
        let reg = open_registry();
        let boundary = FormBoundary::new();
        boundary.set(Area::new(0, 0, 10, 10));
        let _guard = OutsideClickCoordinator::mount(&bus, reg.clone(), boundary);
        bus.dispatch(&PointerDown::new(9, 9));
        assert_eq!(open_count(&reg), 2);
    }

    #[test]
    fn unknown_boundary_counts_as_outside() {
        let bus = PointerBus::new();
        let reg = open_registry();
        let _guard = OutsideClickCoordinator::mount(&bus, reg.clone(), FormBoundary::new());
        bus.dispatch(&PointerDown::new(0, 0));
        assert!(open_count(&reg) == 0);
    }

    #[test]
    fn coordinator_runs_before_normal_listeners() {
        let bus = PointerBus::new();
        let reg = open_registry();
        let seen_open = Arc::new(AtomicUsize::new(usize::MAX));
        let observer = {
            let reg = reg.clone();
            let seen_open = Arc::clone(&seen_open);
            bus.subscribe(Priority::Normal, move |_| {
                seen_open.store(open_count(&reg), Ordering::SeqCst);
            })
        };
        let _guard = OutsideClickCoordinator::mount(&bus, reg, FormBoundary::new());
        assert_eq!(bus.dispatch(&PointerDown::new(1, 1)), 2);
        assert_eq!(seen_open.load(Ordering::SeqCst), 0);
        drop(observer);
    }

    #[test]
    fn coordinator_runs_before_earlier_first_priority_listeners() {
        let bus = PointerBus::new();
        let reg = open_registry();
        let seen_open = Arc::new(AtomicUsize::new(usize::MAX));
        let host = {
            let reg = reg.clone();
            let seen_open = Arc::clone(&seen_open);
            bus.subscribe(Priority::First, move |_| {
                seen_open.store(open_count(&reg), Ordering::SeqCst);
            })
        };
        let _guard = OutsideClickCoordinator::mount(&bus, reg, FormBoundary::new());
        bus.dispatch(&PointerDown::new(1, 1));
        assert_eq!(seen_open.load(Ordering::SeqCst), 0);
        drop(host);
    }

    #[test]
    fn dropping_the_guard_unsubscribes() {
        let bus = PointerBus::new();
        let guard = OutsideClickCoordinator::mount(&bus, OpenControlRegistry::new(), FormBoundary::new());
        assert_eq!(bus.listener_count(), 1);
        drop(guard);
        assert_eq!(bus.listener_count(), 0);
    }
}
