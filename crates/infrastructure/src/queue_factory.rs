use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info};
use url::Url;

use orchestrator_core::config::{MessageQueueConfig, MessageQueueType};
use orchestrator_core::traits::QueueGateway;
use orchestrator_core::{OrchestratorError, OrchestratorResult};

use crate::{InMemoryQueue, RedisStreamConfig, RedisStreamQueue};

pub struct QueueFactory;

impl QueueFactory {
    pub async fn create(
        config: &MessageQueueConfig,
    ) -> OrchestratorResult<Arc<dyn QueueGateway>> {
        debug!("创建消息队列网关，类型: {:?}", config.r#type);

        match config.r#type {
            MessageQueueType::RedisStream => {
                info!("初始化Redis Stream队列网关");
                let redis_config = Self::build_redis_config(config)?;
                let queue = RedisStreamQueue::new(redis_config).await?;
                Ok(Arc::new(queue))
            }
            MessageQueueType::InMemory => {
                info!("初始化内存队列网关");
                Ok(Arc::new(InMemoryQueue::new(
                    config.max_messages as usize,
                    Duration::from_secs(config.wait_time_seconds),
                    Duration::from_secs(config.visibility_timeout_seconds),
                )))
            }
        }
    }

    fn build_redis_config(config: &MessageQueueConfig) -> OrchestratorResult<RedisStreamConfig> {
        let url = Url::parse(&config.url)
            .map_err(|e| OrchestratorError::config_error(format!("无效的队列URL: {e}")))?;
        if url.scheme() != "redis" && url.scheme() != "rediss" {
            return Err(OrchestratorError::config_error(format!(
                "Redis Stream队列要求 redis:// 或 rediss:// 地址，得到: {}",
                config.url
            )));
        }

        Ok(RedisStreamConfig {
            url: config.url.clone(),
            queue_name: config.queue_name.clone(),
            consumer_group: "orchestrator".to_string(),
            consumer_name: Self::consumer_name(),
            max_messages: config.max_messages as usize,
            wait_time: Duration::from_secs(config.wait_time_seconds),
            visibility_timeout: Duration::from_secs(config.visibility_timeout_seconds),
        })
    }

    /// 消费者名：主机名加随机后缀，同机多实例也不会互相顶替
    fn consumer_name() -> String {
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown-host".to_string());
        let suffix: u16 = rand::rng().random();
        format!("{host}-{suffix:04x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> MessageQueueConfig {
        MessageQueueConfig {
            r#type: MessageQueueType::InMemory,
            url: "memory://dispatch".to_string(),
            queue_name: "dispatch".to_string(),
            envelope_format: orchestrator_core::models::EnvelopeFormat::Direct,
            max_messages: 10,
            wait_time_seconds: 0,
            visibility_timeout_seconds: 30,
            poll_error_backoff_seconds: 5,
        }
    }

    #[tokio::test]
    async fn test_create_in_memory_queue() {
        let gateway = QueueFactory::create(&base_config()).await.unwrap();
        let messages = gateway.receive_messages().await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_redis_config_rejects_non_redis_url() {
        let config = MessageQueueConfig {
            r#type: MessageQueueType::RedisStream,
            url: "amqp://localhost:5672".to_string(),
            ..base_config()
        };
        let result = QueueFactory::create(&config).await;
        assert!(matches!(
            result,
            Err(OrchestratorError::Configuration(_))
        ));
    }

    #[test]
    fn test_consumer_name_has_suffix() {
        let name = QueueFactory::consumer_name();
        assert!(name.contains('-'));
    }
}
