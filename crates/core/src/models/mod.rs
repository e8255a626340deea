pub mod invocation;
pub mod message;
pub mod worker;

pub use invocation::InvocationVerdict;
pub use message::{EnvelopeFormat, NotificationEnvelope, QueueMessage};
pub use worker::{HealthState, WorkerDescriptor};
