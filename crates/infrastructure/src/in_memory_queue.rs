use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

use orchestrator_core::models::QueueMessage;
use orchestrator_core::traits::QueueGateway;
use orchestrator_core::{OrchestratorError, OrchestratorResult};

/// 内存队列实现
///
/// 用于嵌入式部署和测试。语义对齐外部持久化队列：
/// 接收后的消息进入在途表并带可见性截止时间，到期未确认即重投；
/// 每次投递签发新的投递句柄，确认只对当前在途句柄有效。
#[derive(Debug)]
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
    max_messages: usize,
    wait_time: Duration,
    visibility_timeout: Duration,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<QueueMessage>,
    in_flight: HashMap<String, InFlightMessage>,
    delivery_seq: u64,
    message_seq: u64,
}

#[derive(Debug)]
struct InFlightMessage {
    message: QueueMessage,
    redeliver_at: Instant,
}

/// 空轮询的内部等待步长
const POLL_STEP: Duration = Duration::from_millis(10);

impl InMemoryQueue {
    pub fn new(max_messages: usize, wait_time: Duration, visibility_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            max_messages,
            wait_time,
            visibility_timeout,
        }
    }

    /// 向队列投入一条消息（生产者侧，仅嵌入式/测试使用）
    pub async fn push_message(&self, body: impl Into<String>) -> String {
        let mut state = self.state.lock().await;
        state.message_seq += 1;
        let id = format!("m-{}", state.message_seq);
        state.pending.push_back(QueueMessage::new(
            Some(id.clone()),
            Some(body.into()),
            None,
        ));
        id
    }

    /// 投入一条消息体缺失的消息，模拟上游异常投递
    pub async fn push_empty_message(&self) -> String {
        let mut state = self.state.lock().await;
        state.message_seq += 1;
        let id = format!("m-{}", state.message_seq);
        state
            .pending
            .push_back(QueueMessage::new(Some(id.clone()), None, None));
        id
    }

    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn in_flight_len(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    /// 把可见性已过期的在途消息移回待投队列
    fn requeue_expired(state: &mut QueueState, now: Instant) {
        let expired: Vec<String> = state
            .in_flight
            .iter()
            .filter(|(_, entry)| entry.redeliver_at <= now)
            .map(|(handle, _)| handle.clone())
            .collect();

        for handle in expired {
            if let Some(entry) = state.in_flight.remove(&handle) {
                debug!("消息 {} 可见性超时，重新入队", entry.message.log_id());
                state.pending.push_front(entry.message);
            }
        }
    }

    fn take_batch(&self, state: &mut QueueState, now: Instant) -> Vec<QueueMessage> {
        let mut batch = Vec::new();
        while batch.len() < self.max_messages {
            let Some(stored) = state.pending.pop_front() else {
                break;
            };
            state.delivery_seq += 1;
            let handle = format!("h-{}", state.delivery_seq);
            let delivered = QueueMessage {
                delivery_handle: Some(handle.clone()),
                ..stored
            };
            state.in_flight.insert(
                handle,
                InFlightMessage {
                    message: delivered.clone(),
                    redeliver_at: now + self.visibility_timeout,
                },
            );
            batch.push(delivered);
        }
        batch
    }
}

#[async_trait]
impl QueueGateway for InMemoryQueue {
    async fn receive_messages(&self) -> OrchestratorResult<Vec<QueueMessage>> {
        let deadline = Instant::now() + self.wait_time;
        loop {
            {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                Self::requeue_expired(&mut state, now);
                let batch = self.take_batch(&mut state, now);
                if !batch.is_empty() {
                    return Ok(batch);
                }
            }
            // 模拟长轮询：没有消息时等到截止时间为止
            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }
            sleep(POLL_STEP).await;
        }
    }

    async fn acknowledge(&self, delivery_handle: &str) -> OrchestratorResult<()> {
        let mut state = self.state.lock().await;
        match state.in_flight.remove(delivery_handle) {
            Some(entry) => {
                debug!("已确认消息 {}", entry.message.log_id());
                Ok(())
            }
            None => Err(OrchestratorError::message_queue_error(format!(
                "投递句柄 {delivery_handle} 未知或已过期"
            ))),
        }
    }
}
