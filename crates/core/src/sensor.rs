//! `SensorChannel` and the contracts wiring sensors, rules, and alert sinks.
//!
//! Delivery is single-threaded and run-to-completion: `publish` stores the
//! value, bumps the update counter, then calls every live listener before it
//! returns. Listeners are held as weak handles so a channel never keeps a
//! rule alive.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::frame::{FrameError, ObdResponse};
use crate::pid::SensorSpec;

/// Receives value updates from subscribed sensors.
pub trait SensorListener {
    fn on_sensor_update(&mut self, command: &str, value: f64);
}

/// Weak handle under which a listener is registered with a channel.
pub type ListenerHandle = Weak<RefCell<dyn SensorListener>>;

/// The contract a sensor must satisfy for rules to bind against it: a stable
/// command-code identity, a monotonically increasing update count, and a
/// subscribe/notify mechanism.
pub trait SensorInput {
    fn command(&self) -> &str;

    /// The most recently delivered value (0.0 before the first update).
    fn last_value(&self) -> f64;

    /// How many updates this sensor has delivered so far.
    fn update_count(&self) -> u64;

    fn subscribe(&self, listener: ListenerHandle);

    fn unsubscribe(&self, listener: &ListenerHandle);
}

/// Receives one notification per rule satisfaction edge. Fire-and-forget:
/// implementations must not fail the caller, and must not publish sensor
/// values from inside `notify` (delivery happens during an update callback).
pub trait AlertSink {
    fn notify(&self, rule_name: &str);

    /// Diagnostic name for this sink (e.g. `"log"`, `"journal"`).
    fn name(&self) -> &str;
}

/// A named value stream: the shipped [`SensorInput`] implementation.
pub struct SensorChannel {
    spec: SensorSpec,
    value: Cell<f64>,
    updates: Cell<u64>,
    listeners: RefCell<Vec<ListenerHandle>>,
}

impl SensorChannel {
    pub fn new(spec: SensorSpec) -> Rc<Self> {
        Rc::new(Self {
            spec,
            value: Cell::new(0.0),
            updates: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        })
    }

    pub fn spec(&self) -> &SensorSpec {
        &self.spec
    }

    /// The most recently published value (0.0 before the first update).
    pub fn value(&self) -> f64 {
        self.value.get()
    }

    /// This channel as the weak handle rules bind against.
    pub fn input_handle(self: &Rc<Self>) -> Weak<dyn SensorInput> {
        let weak: Weak<SensorChannel> = Rc::downgrade(self);
        weak
    }

    /// Number of currently registered listeners, dead handles included.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Publish a new engineering value: store it, bump the update count,
    /// notify every live listener. Dead handles are pruned in the same pass.
    pub fn publish(&self, value: f64) {
        self.value.set(value);
        self.updates.set(self.updates.get() + 1);
        trace!(
            command = %self.spec.command(),
            value,
            updates = self.updates.get(),
            "sensor update"
        );

        // Snapshot live listeners before the callbacks run so a listener may
        // inspect any sensor (including this one) without a held borrow.
        let live: Vec<Rc<RefCell<dyn SensorListener>>> = {
            let mut listeners = self.listeners.borrow_mut();
            listeners.retain(|handle| handle.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };

        for listener in live {
            listener.borrow_mut().on_sensor_update(self.spec.command(), value);
        }
    }

    /// Decode a raw response frame through this channel's PID formula, then
    /// publish the value. The frame must answer this channel's command.
    pub fn publish_response(&self, frame: &ObdResponse) -> Result<f64, FrameError> {
        let got = frame.command();
        if got != self.spec.command() {
            return Err(FrameError::CommandMismatch {
                expected: self.spec.command().to_string(),
                got,
            });
        }

        let value = match self.spec.pid() {
            Some(pid) => pid
                .decode(&frame.payload)
                .ok_or(FrameError::ShortPayload(got))?,
            None => return Err(FrameError::NoFormula(got)),
        };

        self.publish(value);
        Ok(value)
    }
}

impl SensorInput for SensorChannel {
    fn command(&self) -> &str {
        self.spec.command()
    }

    fn last_value(&self) -> f64 {
        self.value.get()
    }

    fn update_count(&self) -> u64 {
        self.updates.get()
    }

    /// Registration is idempotent per handle so re-running a rule's
    /// activation cannot double-deliver updates.
    fn subscribe(&self, listener: ListenerHandle) {
        let mut listeners = self.listeners.borrow_mut();
        if listeners.iter().any(|existing| existing.ptr_eq(&listener)) {
            return;
        }
        listeners.push(listener);
    }

    fn unsubscribe(&self, listener: &ListenerHandle) {
        self.listeners
            .borrow_mut()
            .retain(|existing| !existing.ptr_eq(listener));
    }
}
