use std::rc::Rc;

use tracing::trace;

use obdwatch_core::AlertSink;

/// Delivers each alert to every attached sink, in attachment order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Rc<dyn AlertSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        FanoutSink { sinks: Vec::new() }
    }

    pub fn attach(&mut self, sink: Rc<dyn AlertSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl AlertSink for FanoutSink {
    fn notify(&self, rule_name: &str) {
        for sink in &self.sinks {
            sink.notify(rule_name);
            trace!(sink = %sink.name(), rule = %rule_name, "alert dispatched");
        }
    }

    fn name(&self) -> &str {
        "fanout"
    }
}
