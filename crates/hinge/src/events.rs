//! # World Events
//!
//! Two delivery paths:
//!
//! ```text
//!                      ┌──────────────┐   WorldEvent   ┌──────────────┐
//!  kernel events ────> │ContactRouter │ ─────────────> │  EventBus    │ ──> host
//!  (after step)        └──────┬───────┘                └──────────────┘
//!                             │ per-body callbacks
//!                             v
//!                      ┌──────────────┐
//!                      │ BodyRegistry │ ──> &mut PendingRemovals
//!                      └──────────────┘
//! ```
//!
//! Aggregate notifications go to every subscriber over its own bounded
//! crossbeam channel; per-body listeners are closures stored on the wrapper.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use hinge_core::{
    ConstraintId, ContactEquation, ContactMaterialId, Kernel, KernelEvent, KernelEventKind,
    ShapeRef, SpringId,
};

use crate::body::{BodyContact, BodyHandle, ImpactContact};
use crate::registry::BodyRegistry;

/// Aggregate notifications raised by a World.
#[derive(Clone, Debug, PartialEq)]
pub enum WorldEvent {
    /// A body entered the simulation.
    BodyAdded(BodyHandle),
    /// A body left the simulation.
    BodyRemoved(BodyHandle),
    /// A spring was added.
    SpringAdded(SpringId),
    /// A spring was removed.
    SpringRemoved(SpringId),
    /// A constraint was added.
    ConstraintAdded(ConstraintId),
    /// A constraint was removed.
    ConstraintRemoved(ConstraintId),
    /// A contact material was added.
    ContactMaterialAdded(ContactMaterialId),
    /// A contact material was removed.
    ContactMaterialRemoved(ContactMaterialId),
    /// Two wrapped bodies started touching.
    BeginContact {
        /// First body.
        body_a: BodyHandle,
        /// Second body.
        body_b: BodyHandle,
        /// Shape on the first body.
        shape_a: ShapeRef,
        /// Shape on the second body.
        shape_b: ShapeRef,
        /// Contact equations.
        equations: Vec<ContactEquation>,
    },
    /// Two wrapped bodies stopped touching.
    EndContact {
        /// First body.
        body_a: BodyHandle,
        /// Second body.
        body_b: BodyHandle,
        /// Shape on the first body.
        shape_a: ShapeRef,
        /// Shape on the second body.
        shape_b: ShapeRef,
    },
}

/// Fans [`WorldEvent`]s out to every subscriber.
///
/// Each subscriber owns a bounded channel of its own, so one slow consumer
/// never steals or blocks another's notifications. Channels whose receiver
/// was dropped are pruned on the next publish.
#[derive(Debug)]
pub struct EventBus {
    /// Per-subscriber channel capacity.
    capacity: usize,
    /// One sender per live subscriber.
    subscribers: Vec<Sender<WorldEvent>>,
}

impl EventBus {
    /// Creates an event bus with no subscribers.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Events buffered per subscriber before new ones are dropped.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            subscribers: Vec::new(),
        }
    }

    /// Opens a new subscription. It sees every event published from now on.
    pub fn subscribe(&mut self) -> EventReceiver {
        let (sender, receiver) = bounded(self.capacity);
        self.subscribers.push(sender);
        EventReceiver { receiver }
    }

    /// Number of live subscriptions, as of the last publish.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Delivers an event to every subscriber (non-blocking).
    ///
    /// A full subscriber misses this event; the others still get it.
    /// Returns the number of subscribers that received it.
    pub fn publish(&mut self, event: &WorldEvent) -> usize {
        let mut delivered = 0;
        self.subscribers.retain(|sender| match sender.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(event)) => {
                tracing::warn!("World event subscriber full, dropping {:?}", event);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        delivered
    }
}

/// One subscription to World notifications.
#[derive(Debug)]
pub struct EventReceiver {
    receiver: Receiver<WorldEvent>,
}

impl EventReceiver {
    /// Receives all pending events (non-blocking).
    #[inline]
    pub fn drain(&self) -> Vec<WorldEvent> {
        let mut events = Vec::with_capacity(self.receiver.len());
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Receives one event (non-blocking).
    #[inline]
    pub fn try_recv(&self) -> Option<WorldEvent> {
        self.receiver.try_recv().ok()
    }

    /// Returns the number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Checks if there are pending events.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}

/// Fans kernel contact and impact events out to the World and to bodies.
///
/// Tracks which kernel listeners it holds so attach/detach stay idempotent.
#[derive(Debug, Default)]
pub struct ContactRouter {
    contacts_attached: bool,
    impact_attached: bool,
}

impl ContactRouter {
    /// Creates a router holding no kernel listeners.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            contacts_attached: false,
            impact_attached: false,
        }
    }

    /// Subscribes to begin- and end-contact, once.
    pub fn attach_contacts<K: Kernel>(&mut self, kernel: &mut K) {
        if self.contacts_attached {
            return;
        }
        kernel.subscribe(KernelEventKind::BeginContact);
        kernel.subscribe(KernelEventKind::EndContact);
        self.contacts_attached = true;
    }

    /// Drops the begin- and end-contact subscriptions, once.
    pub fn detach_contacts<K: Kernel>(&mut self, kernel: &mut K) {
        if !self.contacts_attached {
            return;
        }
        kernel.unsubscribe(KernelEventKind::BeginContact);
        kernel.unsubscribe(KernelEventKind::EndContact);
        self.contacts_attached = false;
    }

    /// Checks if contact events are being routed.
    #[must_use]
    pub const fn contacts_attached(&self) -> bool {
        self.contacts_attached
    }

    /// Attaches or detaches the impact listener.
    ///
    /// Returns `true` if the subscription changed.
    pub fn set_impact_events<K: Kernel>(&mut self, kernel: &mut K, enable: bool) -> bool {
        if self.impact_attached == enable {
            return false;
        }
        if enable {
            kernel.subscribe(KernelEventKind::Impact);
        } else {
            kernel.unsubscribe(KernelEventKind::Impact);
        }
        self.impact_attached = enable;
        tracing::debug!("Impact events {}", if enable { "attached" } else { "detached" });
        true
    }

    /// Checks if impact events are being routed.
    #[must_use]
    pub const fn impact_attached(&self) -> bool {
        self.impact_attached
    }

    /// Routes one batch of kernel events.
    pub fn route<K: Kernel>(&self, kernel: &K, events: Vec<KernelEvent>, registry: &mut BodyRegistry, bus: &mut EventBus) {
        for event in events {
            match event {
                KernelEvent::BeginContact {
                    shape_a,
                    shape_b,
                    equations,
                } => {
                    if self.contacts_attached {
                        Self::route_contact(registry, bus, shape_a, shape_b, Some(equations));
                    }
                }
                KernelEvent::EndContact { shape_a, shape_b } => {
                    if self.contacts_attached {
                        Self::route_contact(registry, bus, shape_a, shape_b, None);
                    }
                }
                KernelEvent::Impact { shape_a, shape_b } => {
                    if self.impact_attached {
                        Self::route_impact(kernel, registry, shape_a, shape_b);
                    }
                }
            }
        }
    }

    /// `equations` is `Some` for begin-contact.
    fn route_contact(
        registry: &mut BodyRegistry,
        bus: &mut EventBus,
        shape_a: ShapeRef,
        shape_b: ShapeRef,
        equations: Option<Vec<ContactEquation>>,
    ) {
        let begin = equations.is_some();
        let equations = equations.unwrap_or_default();
        let a = registry.wrapper_of(shape_a.body);
        let b = registry.wrapper_of(shape_b.body);

        if let (Some(body_a), Some(body_b)) = (a, b) {
            let event = if begin {
                WorldEvent::BeginContact {
                    body_a,
                    body_b,
                    shape_a,
                    shape_b,
                    equations: equations.clone(),
                }
            } else {
                WorldEvent::EndContact {
                    body_a,
                    body_b,
                    shape_a,
                    shape_b,
                }
            };
            bus.publish(&event);
        }

        if let Some(this) = a {
            let contact = BodyContact {
                other: b,
                other_shape: shape_b,
                this,
                this_shape: shape_a,
                equations: equations.clone(),
            };
            registry.dispatch_contact(begin, &contact);
        }

        if let Some(this) = b {
            let contact = BodyContact {
                other: a,
                other_shape: shape_a,
                this,
                this_shape: shape_b,
                equations,
            };
            registry.dispatch_contact(begin, &contact);
        }
    }

    fn route_impact<K: Kernel>(kernel: &K, registry: &mut BodyRegistry, shape_a: ShapeRef, shape_b: ShapeRef) {
        let (Some(a), Some(b)) = (registry.wrapper_of(shape_a.body), registry.wrapper_of(shape_b.body)) else {
            return;
        };
        let group_of = |shape: ShapeRef| {
            kernel
                .body(shape.body)
                .and_then(|body| body.shapes.get(shape.index as usize))
                .map_or(0, |s| s.collision_group)
        };

        let for_a = ImpactContact {
            this: a,
            other: b,
            this_shape: shape_a,
            other_shape: shape_b,
        };
        registry.dispatch_impact(&for_a, group_of(shape_b));

        let for_b = ImpactContact {
            this: b,
            other: a,
            this_shape: shape_b,
            other_shape: shape_a,
        };
        registry.dispatch_impact(&for_b, group_of(shape_a));
    }
}
