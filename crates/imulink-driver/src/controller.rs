use crate::decoder;
use crate::events::EventBus;
use crate::transport::Transport;
use crate::types::{ConnectionParams, ConnectionState, ImuSample};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fixed-interval reconnect timer, advanced by `tick` while disconnected.
#[derive(Debug)]
struct ReconnectTimer {
    accumulated: f32,
    threshold: f32,
}

/// Owns the connection state and drives connect/disconnect/reconnect policy.
///
/// Single-threaded and tick-driven: all transitions happen synchronously
/// inside `tick` or a direct call from the consumer, so no locking is
/// needed. The transport is treated as synchronous; `read_frame` must
/// never block the tick.
pub struct ConnectionController<T: Transport> {
    transport: T,
    params: ConnectionParams,
    state: ConnectionState,
    auto_reconnect: bool,
    reconnect: ReconnectTimer,
    last_sample: Option<ImuSample>,
    events: EventBus,
    /// Session clock; sample timestamps are seconds since this instant.
    started: Instant,
}

impl<T: Transport> ConnectionController<T> {
    pub fn new(
        transport: T,
        params: ConnectionParams,
        auto_reconnect: bool,
        reconnect_interval_secs: f32,
    ) -> Self {
        Self {
            transport,
            params,
            state: ConnectionState::Disconnected,
            auto_reconnect,
            reconnect: ReconnectTimer {
                accumulated: 0.0,
                threshold: reconnect_interval_secs,
            },
            last_sample: None,
            events: EventBus::default(),
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Most recent decoded sample, if any arrived this session.
    pub fn last_sample(&self) -> Option<ImuSample> {
        self.last_sample
    }

    pub fn events(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Attempt to open the connection.
    ///
    /// A no-op while already connected; re-issuing `connect` never silently
    /// drops the live session. Resets the reconnect accumulator on every
    /// attempt regardless of outcome.
    pub fn connect(&mut self) {
        if self.state == ConnectionState::Connected {
            debug!("connect() ignored, already connected");
            return;
        }

        self.reconnect.accumulated = 0.0;
        match self.transport.connect(&self.params) {
            Ok(true) => {
                self.state = ConnectionState::Connected;
                info!(baud = self.params.baud_rate, "IMU connected");
                self.events.emit_connected();
            }
            Ok(false) => {
                warn!("Failed to connect to IMU");
                self.events.emit_error("connection failed");
            }
            Err(e) => {
                warn!(%e, "IMU connection error");
                self.events.emit_error(&e.to_string());
            }
        }
    }

    /// Close the connection. Only takes effect while connected.
    ///
    /// The local transition is authoritative: a transport-level error is
    /// logged and swallowed, and `disconnected` is emitted either way.
    pub fn disconnect(&mut self) {
        if self.state != ConnectionState::Connected {
            return;
        }

        if let Err(e) = self.transport.disconnect() {
            warn!(%e, "Transport disconnect error");
        }
        self.state = ConnectionState::Disconnected;
        info!("IMU disconnected");
        self.events.emit_disconnected();
    }

    /// Advance the driver by one host frame.
    ///
    /// While disconnected with auto-reconnect enabled, accumulates elapsed
    /// time and retries `connect` when the interval elapses. While connected
    /// (including a connection made this same tick), polls one frame.
    pub fn tick(&mut self, delta_secs: f32) {
        if self.state == ConnectionState::Disconnected && self.auto_reconnect {
            self.reconnect.accumulated += delta_secs;
            if self.reconnect.accumulated >= self.reconnect.threshold {
                self.reconnect.accumulated = 0.0;
                self.connect();
            }
        }

        if self.state == ConnectionState::Connected {
            self.poll_frame();
        }
    }

    fn poll_frame(&mut self) {
        match self.transport.read_frame() {
            Ok(Some(frame)) => self.handle_frame(&frame),
            Ok(None) => {}
            Err(e) => {
                // A failed read means the device went away. Treated the same
                // as a clean disconnect: one disconnected event, no error.
                warn!(%e, "IMU read failed, dropping connection");
                self.state = ConnectionState::Disconnected;
                self.events.emit_disconnected();
            }
        }
    }

    fn handle_frame(&mut self, frame: &str) {
        let timestamp = self.started.elapsed().as_secs_f32();
        match decoder::decode_frame(frame, timestamp) {
            Ok(sample) => {
                self.last_sample = Some(sample);
                self.events.emit_sample(&sample);
            }
            Err(e) => debug!(%e, raw = frame, "Dropped undecodable frame"),
        }
    }

    /// Forward a command to the device, fire-and-forget.
    pub fn send_command(&mut self, command: &str) {
        if self.state != ConnectionState::Connected {
            debug!(command, "send_command ignored while disconnected");
            return;
        }

        match self.transport.write(command) {
            Ok(()) => debug!(command, "Command sent"),
            Err(e) => warn!(%e, command, "Command send failed"),
        }
    }

    /// Enumerate candidate devices. Never raises; enumeration failures
    /// yield an empty list.
    pub fn list_devices(&mut self) -> Vec<String> {
        match self.transport.list_devices() {
            Ok(devices) => devices,
            Err(e) => {
                warn!(%e, "Device enumeration failed");
                Vec::new()
            }
        }
    }

    /// Host lost visibility (app paused, lid closed): drop the connection
    /// immediately, regardless of timer state.
    pub fn on_suspend(&mut self) {
        info!("Host suspended, releasing IMU connection");
        self.disconnect();
    }

    /// Host visibility restored: reconnect immediately, bypassing the
    /// timer, if auto-reconnect is enabled.
    pub fn on_resume(&mut self) {
        if self.auto_reconnect {
            info!("Host resumed, reconnecting IMU");
            self.connect();
        }
    }

    #[cfg(test)]
    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use crate::transport::TransportError;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Seen {
        Sample([f32; 4]),
        Connected,
        Disconnected,
        Error(String),
    }

    fn controller(transport: MockTransport) -> ConnectionController<MockTransport> {
        ConnectionController::new(transport, ConnectionParams::default(), true, 3.0)
    }

    fn record(ctrl: &mut ConnectionController<MockTransport>) -> Rc<RefCell<Vec<Seen>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        ctrl.events().on_sample(move |s| {
            let q = s.orientation;
            sink.borrow_mut().push(Seen::Sample([q.x, q.y, q.z, q.w]));
        });
        let sink = seen.clone();
        ctrl.events().on_connected(move || sink.borrow_mut().push(Seen::Connected));
        let sink = seen.clone();
        ctrl.events()
            .on_disconnected(move || sink.borrow_mut().push(Seen::Disconnected));
        let sink = seen.clone();
        ctrl.events()
            .on_error(move |m| sink.borrow_mut().push(Seen::Error(m.to_string())));

        seen
    }

    #[test]
    fn successful_connect_emits_connected_once() {
        let mut ctrl = controller(MockTransport::default());
        let seen = record(&mut ctrl);

        ctrl.connect();
        assert!(ctrl.is_connected());
        assert_eq!(*seen.borrow(), vec![Seen::Connected]);
    }

    #[test]
    fn declined_connect_emits_error_and_stays_disconnected() {
        let mut transport = MockTransport::default();
        transport.connect_results.push_back(Ok(false));
        let mut ctrl = controller(transport);
        let seen = record(&mut ctrl);

        ctrl.connect();
        assert!(!ctrl.is_connected());
        assert_eq!(
            *seen.borrow(),
            vec![Seen::Error("connection failed".into())]
        );
    }

    #[test]
    fn transport_error_message_reaches_the_error_event() {
        let mut transport = MockTransport::default();
        transport
            .connect_results
            .push_back(Err(TransportError::Unavailable("no serial stack")));
        let mut ctrl = controller(transport);
        let seen = record(&mut ctrl);

        ctrl.connect();
        assert!(!ctrl.is_connected());
        match &seen.borrow()[0] {
            Seen::Error(message) => assert!(message.contains("no serial stack")),
            other => panic!("unexpected event {other:?}"),
        };
    }

    #[test]
    fn connect_while_connected_is_a_noop() {
        let mut ctrl = controller(MockTransport::default());
        let seen = record(&mut ctrl);

        ctrl.connect();
        ctrl.connect();

        assert_eq!(ctrl.transport_mut().connect_calls, 1);
        assert_eq!(*seen.borrow(), vec![Seen::Connected]);
    }

    #[test]
    fn reconnect_fires_exactly_on_crossing_the_interval() {
        let mut transport = MockTransport::default();
        // Stay disconnected so the timer keeps running.
        transport.connect_results.push_back(Ok(false));
        transport.connect_results.push_back(Ok(false));
        let mut ctrl = controller(transport);

        // Below the 3 s threshold: no attempt.
        ctrl.tick(1.0);
        ctrl.tick(1.0);
        ctrl.tick(0.9);
        assert_eq!(ctrl.transport_mut().connect_calls, 0);

        // Crossing it: exactly one attempt, accumulator resets.
        ctrl.tick(0.2);
        assert_eq!(ctrl.transport_mut().connect_calls, 1);

        ctrl.tick(2.9);
        assert_eq!(ctrl.transport_mut().connect_calls, 1);
        ctrl.tick(0.2);
        assert_eq!(ctrl.transport_mut().connect_calls, 2);
    }

    #[test]
    fn read_failure_disconnects_without_an_error_event() {
        let mut transport = MockTransport::default();
        transport
            .frames
            .push_back(Err(TransportError::Io("device unplugged".into())));
        let mut ctrl = controller(transport);
        let seen = record(&mut ctrl);

        ctrl.connect();
        ctrl.tick(0.01);

        assert!(!ctrl.is_connected());
        assert_eq!(*seen.borrow(), vec![Seen::Connected, Seen::Disconnected]);
    }

    #[test]
    fn frame_is_decoded_and_published() {
        let mut transport = MockTransport::default();
        transport
            .frames
            .push_back(Ok(Some("W: 0.12 X: 0.23 Y: -0.96 Z: 0.06".into())));
        let mut ctrl = controller(transport);
        let seen = record(&mut ctrl);

        ctrl.connect();
        ctrl.tick(0.01);

        let events = seen.borrow();
        assert_eq!(events.len(), 2);
        match &events[1] {
            Seen::Sample([x, y, z, w]) => {
                assert!((x - 0.23).abs() < 1e-6);
                assert!((y - -0.96).abs() < 1e-6);
                assert!((z - 0.06).abs() < 1e-6);
                assert!((w - 0.12).abs() < 1e-6);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(ctrl.last_sample().is_some());
    }

    #[test]
    fn empty_frame_is_dropped_silently() {
        let mut transport = MockTransport::default();
        transport.frames.push_back(Ok(Some("   ".into())));
        let mut ctrl = controller(transport);
        let seen = record(&mut ctrl);

        ctrl.connect();
        ctrl.tick(0.01);

        assert_eq!(*seen.borrow(), vec![Seen::Connected]);
        assert!(ctrl.last_sample().is_none());
    }

    #[test]
    fn send_command_while_disconnected_does_not_write() {
        let mut ctrl = controller(MockTransport::default());
        let seen = record(&mut ctrl);

        ctrl.send_command("CALIBRATE");
        assert!(ctrl.transport_mut().written.is_empty());
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn send_command_while_connected_forwards_verbatim() {
        let mut ctrl = controller(MockTransport::default());
        ctrl.connect();

        ctrl.send_command("CALIBRATE\n");
        assert_eq!(ctrl.transport_mut().written, vec!["CALIBRATE\n"]);
    }

    #[test]
    fn list_devices_failure_yields_empty() {
        let mut transport = MockTransport::default();
        transport.fail_list = true;
        let mut ctrl = controller(transport);

        assert!(ctrl.list_devices().is_empty());
    }

    #[test]
    fn disconnect_swallows_transport_errors() {
        let mut transport = MockTransport::default();
        transport.disconnect_error = Some(TransportError::Io("port vanished".into()));
        let mut ctrl = controller(transport);
        let seen = record(&mut ctrl);

        ctrl.connect();
        ctrl.disconnect();

        assert!(!ctrl.is_connected());
        assert_eq!(*seen.borrow(), vec![Seen::Connected, Seen::Disconnected]);
    }

    #[test]
    fn disconnect_while_disconnected_is_a_noop() {
        let mut ctrl = controller(MockTransport::default());
        let seen = record(&mut ctrl);

        ctrl.disconnect();
        assert_eq!(ctrl.transport_mut().disconnect_calls, 0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn suspend_drops_and_resume_reconnects_immediately() {
        let mut ctrl = controller(MockTransport::default());
        let seen = record(&mut ctrl);

        ctrl.connect();
        ctrl.on_suspend();
        assert!(!ctrl.is_connected());

        // Resume bypasses the reconnect timer entirely.
        ctrl.on_resume();
        assert!(ctrl.is_connected());
        assert_eq!(
            *seen.borrow(),
            vec![Seen::Connected, Seen::Disconnected, Seen::Connected]
        );
    }

    #[test]
    fn resume_without_auto_reconnect_stays_disconnected() {
        let transport = MockTransport::default();
        let mut ctrl =
            ConnectionController::new(transport, ConnectionParams::default(), false, 3.0);

        ctrl.on_resume();
        assert!(!ctrl.is_connected());
        assert_eq!(ctrl.transport_mut().connect_calls, 0);
    }

    #[test]
    fn full_session_scenario() {
        let mut transport = MockTransport::default();
        transport
            .frames
            .push_back(Ok(Some("W: 0.12 X: 0.23 Y: -0.96 Z: 0.06".into())));
        transport
            .frames
            .push_back(Err(TransportError::Io("device unplugged".into())));
        // The timed retry succeeds.
        let mut ctrl = controller(transport);
        let seen = record(&mut ctrl);

        ctrl.connect();
        ctrl.tick(0.01); // sample arrives
        ctrl.tick(0.01); // read fails -> disconnected

        assert!(!ctrl.is_connected());

        // No reconnect before the interval elapses, then one retry.
        ctrl.tick(1.0);
        assert_eq!(ctrl.transport_mut().connect_calls, 1);
        ctrl.tick(2.5);
        assert_eq!(ctrl.transport_mut().connect_calls, 2);
        assert!(ctrl.is_connected());

        let events = seen.borrow();
        assert_eq!(events[0], Seen::Connected);
        assert!(matches!(events[1], Seen::Sample(_)));
        assert_eq!(events[2], Seen::Disconnected);
        assert_eq!(events[3], Seen::Connected);
        assert_eq!(events.len(), 4);
    }
}
