use async_trait::async_trait;

use crate::errors::OrchestratorResult;
use crate::models::QueueMessage;

/// 持久化工作队列的端口
///
/// 队列自身提供at-least-once语义：未确认的消息在可见性超时后自动重投，
/// 本服务只负责接收与按句柄确认。
#[async_trait]
pub trait QueueGateway: Send + Sync {
    /// 长轮询接收一批消息，上限由实现的配置决定
    async fn receive_messages(&self) -> OrchestratorResult<Vec<QueueMessage>>;
    /// 按投递句柄确认（删除）一次投递
    async fn acknowledge(&self, delivery_handle: &str) -> OrchestratorResult<()>;
}
