use tokio::sync::broadcast;
use tracing::{debug, info};

/// 优雅关闭管理器
///
/// 广播一次性的关闭信号；消费循环只在轮询间隙检查，
/// 处理中的消息不会被打断。
#[derive(Clone)]
pub struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        Self { shutdown_tx }
    }

    /// 订阅关闭信号
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// 触发关闭
    pub fn shutdown(&self) {
        let subscriber_count = self.shutdown_tx.receiver_count();
        debug!("发送关闭信号给 {subscriber_count} 个订阅者");
        // 忽略发送错误，可能已经没有接收者
        let _ = self.shutdown_tx.send(());
        info!("关闭信号已发送");
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}
