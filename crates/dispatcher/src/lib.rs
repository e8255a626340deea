pub mod consumer;
pub mod pipeline;
pub mod strategies;
pub mod test_utils;

pub use consumer::QueueConsumer;
pub use pipeline::{MessageDisposition, MessagePipeline};
pub use strategies::RandomStrategy;
