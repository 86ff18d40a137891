use std::cell::RefCell;
use std::rc::Rc;

use obdwatch_core::AlertSink;

use crate::event::AlertEvent;

/// In-memory sink, mainly for tests and the replay summary.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: RefCell<Vec<AlertEvent>>,
}

impl MemorySink {
    pub fn new() -> Rc<Self> {
        Rc::new(MemorySink::default())
    }

    pub fn events(&self) -> Vec<AlertEvent> {
        self.events.borrow().clone()
    }

    pub fn rule_names(&self) -> Vec<String> {
        self.events.borrow().iter().map(|e| e.rule.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl AlertSink for MemorySink {
    fn notify(&self, rule_name: &str) {
        self.events.borrow_mut().push(AlertEvent::now(rule_name));
    }

    fn name(&self) -> &str {
        "memory"
    }
}
