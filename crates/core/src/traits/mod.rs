pub mod invoker;
pub mod messaging;
pub mod registry;
pub mod strategy;

pub use invoker::FunctionInvoker;
pub use messaging::QueueGateway;
pub use registry::WorkerRegistry;
pub use strategy::DispatchStrategy;
