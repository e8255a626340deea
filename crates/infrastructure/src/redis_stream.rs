use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use redis::aio::MultiplexedConnection;
use redis::streams::{
    StreamAutoClaimOptions, StreamAutoClaimReply, StreamId, StreamReadOptions, StreamReadReply,
};
use redis::{AsyncCommands, Client};
use tracing::{debug, info, warn};

use orchestrator_core::models::QueueMessage;
use orchestrator_core::traits::QueueGateway;
use orchestrator_core::{OrchestratorError, OrchestratorResult};

/// Redis Stream队列网关配置
#[derive(Debug, Clone)]
pub struct RedisStreamConfig {
    pub url: String,
    /// Stream键名，同时作为队列名
    pub queue_name: String,
    pub consumer_group: String,
    pub consumer_name: String,
    pub max_messages: usize,
    pub wait_time: Duration,
    pub visibility_timeout: Duration,
}

/// 基于Redis Stream消费者组的队列网关
///
/// 语义映射：
/// - 接收 = 先 `XAUTOCLAIM` 认领空闲超过可见性超时的未确认条目（重投），
///   再用阻塞 `XREADGROUP` 长轮询新条目，单批合计不超过 `max_messages`；
/// - 确认 = `XACK` + `XDEL`；
/// - 投递句柄 = Stream条目ID。
///
/// 生产者按约定 `XADD <queue> * body <json文本> [id <业务ID>]` 投递。
pub struct RedisStreamQueue {
    connection: MultiplexedConnection,
    config: RedisStreamConfig,
}

impl RedisStreamQueue {
    pub async fn new(config: RedisStreamConfig) -> OrchestratorResult<Self> {
        let client = Client::open(config.url.as_str()).map_err(|e| {
            OrchestratorError::message_queue_error(format!("打开Redis客户端失败: {e}"))
        })?;
        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                OrchestratorError::message_queue_error(format!("连接Redis失败: {e}"))
            })?;

        Self::ensure_consumer_group(&mut connection, &config).await?;

        info!(
            queue = %config.queue_name,
            group = %config.consumer_group,
            consumer = %config.consumer_name,
            "Redis Stream队列网关就绪"
        );
        Ok(Self { connection, config })
    }

    async fn ensure_consumer_group(
        connection: &mut MultiplexedConnection,
        config: &RedisStreamConfig,
    ) -> OrchestratorResult<()> {
        let result: redis::RedisResult<String> = connection
            .xgroup_create_mkstream(&config.queue_name, &config.consumer_group, "0")
            .await;
        match result {
            Ok(_) => {
                debug!("创建消费者组 {}", config.consumer_group);
                Ok(())
            }
            // 组已存在不算错误
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(OrchestratorError::message_queue_error(format!(
                "创建消费者组失败: {e}"
            ))),
        }
    }

    fn entry_to_message(entry: &StreamId) -> QueueMessage {
        QueueMessage {
            id: entry.get::<String>("id"),
            body: entry.get::<String>("body"),
            delivery_handle: Some(entry.id.clone()),
        }
    }

    /// 认领空闲超过可见性超时的未确认条目，对应队列的自动重投
    async fn claim_expired(
        &self,
        connection: &mut MultiplexedConnection,
    ) -> OrchestratorResult<Vec<QueueMessage>> {
        let options = StreamAutoClaimOptions::default().count(self.config.max_messages);
        let reply: StreamAutoClaimReply = connection
            .xautoclaim_options(
                &self.config.queue_name,
                &self.config.consumer_group,
                &self.config.consumer_name,
                self.config.visibility_timeout.as_millis() as usize,
                "0-0",
                options,
            )
            .await
            .map_err(|e| {
                OrchestratorError::message_queue_error(format!("认领超时消息失败: {e}"))
            })?;

        let redelivered: Vec<QueueMessage> =
            reply.claimed.iter().map(Self::entry_to_message).collect();
        if !redelivered.is_empty() {
            debug!("重投 {} 条可见性超时的消息", redelivered.len());
            counter!("queue_messages_redelivered_total").increment(redelivered.len() as u64);
        }
        Ok(redelivered)
    }

    /// 已有认领到的消息时不再阻塞等新消息，立即返回整批。
    /// 注意Redis的 `BLOCK 0` 语义是无限阻塞，所以不阻塞用 `None` 表达
    /// 而不是零时长。
    fn effective_block(wait_time: Duration, already_claimed: usize) -> Option<Duration> {
        if already_claimed == 0 && !wait_time.is_zero() {
            Some(wait_time)
        } else {
            None
        }
    }

    async fn read_new(
        &self,
        connection: &mut MultiplexedConnection,
        count: usize,
        block_for: Option<Duration>,
    ) -> OrchestratorResult<Vec<QueueMessage>> {
        let mut options = StreamReadOptions::default()
            .group(&self.config.consumer_group, &self.config.consumer_name)
            .count(count);
        if let Some(block_for) = block_for {
            options = options.block(block_for.as_millis() as usize);
        }

        let reply: StreamReadReply = connection
            .xread_options(&[&self.config.queue_name], &[">"], &options)
            .await
            .map_err(|e| {
                OrchestratorError::message_queue_error(format!("读取消息失败: {e}"))
            })?;

        let mut messages = Vec::new();
        for key in reply.keys {
            for entry in &key.ids {
                messages.push(Self::entry_to_message(entry));
            }
        }
        Ok(messages)
    }
}

#[async_trait]
impl QueueGateway for RedisStreamQueue {
    async fn receive_messages(&self) -> OrchestratorResult<Vec<QueueMessage>> {
        let mut connection = self.connection.clone();

        let mut messages = self.claim_expired(&mut connection).await?;
        if messages.len() < self.config.max_messages {
            let remaining = self.config.max_messages - messages.len();
            let block_for = Self::effective_block(self.config.wait_time, messages.len());
            messages.extend(self.read_new(&mut connection, remaining, block_for).await?);
        }

        if !messages.is_empty() {
            counter!("queue_messages_received_total").increment(messages.len() as u64);
        }
        Ok(messages)
    }

    async fn acknowledge(&self, delivery_handle: &str) -> OrchestratorResult<()> {
        let mut connection = self.connection.clone();

        let acked: i64 = connection
            .xack(
                &self.config.queue_name,
                &self.config.consumer_group,
                &[delivery_handle],
            )
            .await
            .map_err(|e| {
                OrchestratorError::message_queue_error(format!("确认消息失败: {e}"))
            })?;
        if acked == 0 {
            warn!("条目 {delivery_handle} 不在未确认列表中，可能已被重投后确认");
        }

        let _: i64 = connection
            .xdel(&self.config.queue_name, &[delivery_handle])
            .await
            .map_err(|e| {
                OrchestratorError::message_queue_error(format!("删除消息失败: {e}"))
            })?;

        counter!("queue_messages_acknowledged_total").increment(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_blocking_read_when_messages_already_claimed() {
        let wait = Duration::from_secs(20);
        assert_eq!(RedisStreamQueue::effective_block(wait, 0), Some(wait));
        assert_eq!(RedisStreamQueue::effective_block(wait, 1), None);
        assert_eq!(RedisStreamQueue::effective_block(wait, 10), None);
    }

    #[test]
    fn test_zero_wait_time_never_blocks() {
        // BLOCK 0 对Redis意味着无限阻塞，等待时间为零时必须完全不带BLOCK
        assert_eq!(
            RedisStreamQueue::effective_block(Duration::ZERO, 0),
            None
        );
    }
}
