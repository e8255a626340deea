use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use orchestrator_core::models::QueueMessage;
use orchestrator_core::traits::QueueGateway;

use crate::pipeline::{MessageDisposition, MessagePipeline};

/// 消费循环：驱动 接收 → 流水线 → 确认 的生命周期直到收到关闭信号
///
/// 关闭信号只在两次轮询之间检查，进行中的消息处理不会被打断——
/// 要么正常跑完，要么留给已经生效的可见性超时。
pub struct QueueConsumer {
    queue: Arc<dyn QueueGateway>,
    pipeline: Arc<MessagePipeline>,
    /// 接收调用失败后的固定退避，这是循环里唯一的内置退避
    poll_error_backoff: Duration,
}

impl QueueConsumer {
    pub fn new(
        queue: Arc<dyn QueueGateway>,
        pipeline: Arc<MessagePipeline>,
        poll_error_backoff: Duration,
    ) -> Self {
        Self {
            queue,
            pipeline,
            poll_error_backoff,
        }
    }

    /// 阻塞运行消费循环，直到 `shutdown_rx` 收到信号
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("消费循环启动");
        loop {
            match shutdown_rx.try_recv() {
                Err(broadcast::error::TryRecvError::Empty) => {}
                // 收到信号或通道已关闭都按关闭处理
                _ => break,
            }
            self.poll_once().await;
        }
        info!("消费循环退出");
    }

    async fn poll_once(&self) {
        let messages = match self.queue.receive_messages().await {
            Ok(messages) => messages,
            Err(e) => {
                error!("接收消息失败: {e}");
                counter!("consumer_receive_errors_total").increment(1);
                sleep(self.poll_error_backoff).await;
                return;
            }
        };

        // 批内按接收顺序逐条处理，无并发
        for message in &messages {
            self.handle_message(message).await;
        }
    }

    async fn handle_message(&self, message: &QueueMessage) {
        debug!("处理消息 {}", message.log_id());
        match self.pipeline.process(message).await {
            MessageDisposition::Acknowledge | MessageDisposition::Drop => {
                self.acknowledge(message).await;
            }
            // 什么都不做，队列的可见性超时会重投
            MessageDisposition::Defer => {}
        }
    }

    async fn acknowledge(&self, message: &QueueMessage) {
        let Some(handle) = message.delivery_handle.as_deref() else {
            warn!(
                "消息 {} 缺少投递句柄，跳过确认，等重投后再处理",
                message.log_id()
            );
            return;
        };
        // 确认失败只记日志：消息可能被重复处理，下游按幂等假设容忍
        if let Err(e) = self.queue.acknowledge(handle).await {
            error!("确认消息 {} 失败: {e}", message.log_id());
            counter!("consumer_acknowledge_failures_total").increment(1);
        } else {
            debug!("消息 {} 已确认", message.log_id());
            counter!("consumer_messages_acknowledged_total").increment(1);
        }
    }
}
