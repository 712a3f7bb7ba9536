pub mod error;
pub mod transport;
pub mod notifier;
pub mod resolver;
pub mod store;
pub mod heartbeat;

pub use error::TransportError;
pub use transport::{HealthProbe, HttpPatchSink, HttpProbe, PatchSink};
pub use notifier::{Change, Delivery, PatchNotifier};
pub use resolver::DependencyResolver;
pub use store::RegistrationStore;
pub use heartbeat::{HeartbeatMonitor, HeartbeatSettings, TickReport};
