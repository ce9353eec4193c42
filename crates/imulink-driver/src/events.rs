use crate::types::ImuSample;

/// Handle returned by the subscribe methods; pass to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type SampleCallback = Box<dyn FnMut(&ImuSample)>;
type SignalCallback = Box<dyn FnMut()>;
type ErrorCallback = Box<dyn FnMut(&str)>;

/// Per-event subscriber lists.
///
/// Publishing iterates the relevant list synchronously within the tick or
/// call that raised the event. Subscribing and unsubscribing are explicit;
/// ids are unique across all four streams.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    sample: Vec<(SubscriptionId, SampleCallback)>,
    connected: Vec<(SubscriptionId, SignalCallback)>,
    disconnected: Vec<(SubscriptionId, SignalCallback)>,
    error: Vec<(SubscriptionId, ErrorCallback)>,
}

impl EventBus {
    fn next(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }

    pub fn on_sample(&mut self, callback: impl FnMut(&ImuSample) + 'static) -> SubscriptionId {
        let id = self.next();
        self.sample.push((id, Box::new(callback)));
        id
    }

    pub fn on_connected(&mut self, callback: impl FnMut() + 'static) -> SubscriptionId {
        let id = self.next();
        self.connected.push((id, Box::new(callback)));
        id
    }

    pub fn on_disconnected(&mut self, callback: impl FnMut() + 'static) -> SubscriptionId {
        let id = self.next();
        self.disconnected.push((id, Box::new(callback)));
        id
    }

    pub fn on_error(&mut self, callback: impl FnMut(&str) + 'static) -> SubscriptionId {
        let id = self.next();
        self.error.push((id, Box::new(callback)));
        id
    }

    /// Remove a subscriber from whichever stream it belongs to.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.sample.retain(|(i, _)| *i != id);
        self.connected.retain(|(i, _)| *i != id);
        self.disconnected.retain(|(i, _)| *i != id);
        self.error.retain(|(i, _)| *i != id);
    }

    pub(crate) fn emit_sample(&mut self, sample: &ImuSample) {
        for (_, callback) in &mut self.sample {
            callback(sample);
        }
    }

    pub(crate) fn emit_connected(&mut self) {
        for (_, callback) in &mut self.connected {
            callback();
        }
    }

    pub(crate) fn emit_disconnected(&mut self) {
        for (_, callback) in &mut self.disconnected {
            callback();
        }
    }

    pub(crate) fn emit_error(&mut self, message: &str) {
        for (_, callback) in &mut self.error {
            callback(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn sample() -> ImuSample {
        ImuSample {
            orientation: Quat::IDENTITY,
            acceleration: None,
            gyroscope: None,
            magnetometer: None,
            timestamp: 0.0,
        }
    }

    #[test]
    fn all_subscribers_of_a_stream_are_invoked() {
        let mut bus = EventBus::default();
        let count = Rc::new(RefCell::new(0));

        for _ in 0..3 {
            let count = count.clone();
            bus.on_sample(move |_| *count.borrow_mut() += 1);
        }

        bus.emit_sample(&sample());
        assert_eq!(*count.borrow(), 3);
    }

    #[test]
    fn unsubscribed_callback_is_not_invoked() {
        let mut bus = EventBus::default();
        let count = Rc::new(RefCell::new(0));

        let keep = count.clone();
        bus.on_connected(move || *keep.borrow_mut() += 1);
        let drop_count = count.clone();
        let id = bus.on_connected(move || *drop_count.borrow_mut() += 10);

        bus.unsubscribe(id);
        bus.emit_connected();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn error_event_carries_the_message() {
        let mut bus = EventBus::default();
        let seen = Rc::new(RefCell::new(String::new()));

        let sink = seen.clone();
        bus.on_error(move |message| sink.borrow_mut().push_str(message));

        bus.emit_error("connection failed");
        assert_eq!(*seen.borrow(), "connection failed");
    }
}
