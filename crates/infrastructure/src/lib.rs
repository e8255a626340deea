pub mod http_invoker;
pub mod in_memory_queue;
pub mod postgres_registry;
pub mod queue_factory;
pub mod redis_stream;

pub use http_invoker::HttpFunctionInvoker;
pub use in_memory_queue::InMemoryQueue;
pub use postgres_registry::PostgresWorkerRegistry;
pub use queue_factory::QueueFactory;
pub use redis_stream::{RedisStreamConfig, RedisStreamQueue};
