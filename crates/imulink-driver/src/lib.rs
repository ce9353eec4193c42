pub mod controller;
pub mod decoder;
pub mod events;
pub mod transport;
pub mod types;

pub use controller::ConnectionController;
pub use decoder::{decode_frame, parse_quaternion, parse_vector3, DecodeError};
pub use events::{EventBus, SubscriptionId};
pub use transport::{NullTransport, Transport, TransportError};
pub use types::{ConnectionParams, ConnectionState, ImuSample, Parity, StopBits};

use tracing::info;

/// Driver for a serial-attached IMU.
///
/// Owns the connection controller, the frame decoder sits behind it, and
/// samples are published through the event bus. Construct it with a
/// transport, subscribe to the streams you care about, then drive `tick`
/// from the host's update loop:
///
/// ```no_run
/// use imulink_driver::{ConnectionParams, ImuManager, NullTransport};
///
/// let mut imu = ImuManager::new(NullTransport, ConnectionParams::default(), true, 3.0);
/// imu.on_sample(|sample| println!("orientation: {:?}", sample.orientation));
/// imu.connect();
/// loop {
///     imu.tick(1.0 / 120.0);
///     # break;
/// }
/// ```
pub struct ImuManager<T: Transport> {
    controller: ConnectionController<T>,
}

impl<T: Transport> ImuManager<T> {
    pub fn new(
        transport: T,
        params: ConnectionParams,
        auto_reconnect: bool,
        reconnect_interval_secs: f32,
    ) -> Self {
        Self {
            controller: ConnectionController::new(
                transport,
                params,
                auto_reconnect,
                reconnect_interval_secs,
            ),
        }
    }

    pub fn connect(&mut self) {
        self.controller.connect();
    }

    pub fn disconnect(&mut self) {
        self.controller.disconnect();
    }

    /// Advance the driver by one host frame of `delta_secs` seconds.
    pub fn tick(&mut self, delta_secs: f32) {
        self.controller.tick(delta_secs);
    }

    pub fn send_command(&mut self, command: &str) {
        self.controller.send_command(command);
    }

    pub fn list_devices(&mut self) -> Vec<String> {
        self.controller.list_devices()
    }

    pub fn on_suspend(&mut self) {
        self.controller.on_suspend();
    }

    pub fn on_resume(&mut self) {
        self.controller.on_resume();
    }

    pub fn state(&self) -> ConnectionState {
        self.controller.state()
    }

    pub fn is_connected(&self) -> bool {
        self.controller.is_connected()
    }

    pub fn last_sample(&self) -> Option<ImuSample> {
        self.controller.last_sample()
    }

    pub fn on_sample(&mut self, callback: impl FnMut(&ImuSample) + 'static) -> SubscriptionId {
        self.controller.events().on_sample(callback)
    }

    pub fn on_connected(&mut self, callback: impl FnMut() + 'static) -> SubscriptionId {
        self.controller.events().on_connected(callback)
    }

    pub fn on_disconnected(&mut self, callback: impl FnMut() + 'static) -> SubscriptionId {
        self.controller.events().on_disconnected(callback)
    }

    pub fn on_error(&mut self, callback: impl FnMut(&str) + 'static) -> SubscriptionId {
        self.controller.events().on_error(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.controller.events().unsubscribe(id);
    }

    /// Tear the driver down at host shutdown, forcing a disconnect.
    pub fn shutdown(&mut self) {
        info!("IMU manager shutting down");
        self.controller.disconnect();
    }
}
