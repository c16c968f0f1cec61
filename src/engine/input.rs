use std::cell::RefCell;
use std::rc::{Rc, Weak};

use glam::Vec2;

/// Edge-triggered input notifications. Continuous holds live on [`InputState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEvent {
    Jump,
    Dive,
    Dash,
    Interact,
}

/// One step's input snapshot, produced by the device layer.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// x = strafe, y = forward. Magnitude at most 1.
    pub move_vector: Vec2,
    pub look_vector: Vec2,
    pub aim: bool,
    pub hover: bool,
    /// Grapple / whip ability hold.
    pub green: bool,
    /// Vacuum ability hold.
    pub vacuum: bool,
    pub fire: bool,
    /// Edges that fired this step, in arrival order.
    pub events: Vec<InputEvent>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_move_input(&self) -> bool {
        self.move_vector.length() > 0.1
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

struct BusInner {
    next_id: u64,
    subscribers: Vec<(u64, Vec<InputEvent>)>,
}

/// Routes edge-triggered events to whoever currently holds a [`Subscription`].
///
/// Cloning the bus shares the same subscriber table.
#[derive(Clone)]
pub struct InputBus {
    inner: Rc<RefCell<BusInner>>,
}

impl InputBus {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Register interest in `events`. Interest lasts as long as the returned guard.
    pub fn subscribe(&self, events: &[InputEvent]) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, events.to_vec()));
        Subscription {
            bus: Rc::downgrade(&self.inner),
            id,
        }
    }

    pub fn is_subscribed(&self, event: InputEvent) -> bool {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .any(|(_, events)| events.contains(&event))
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

impl Default for InputBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped registration on an [`InputBus`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    bus: Weak<RefCell<BusInner>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.borrow_mut().subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}
