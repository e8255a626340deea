//! 测试辅助：各外部协作方的脚本化假实现

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use orchestrator_core::models::{HealthState, QueueMessage, WorkerDescriptor};
use orchestrator_core::traits::{FunctionInvoker, QueueGateway, WorkerRegistry};
use orchestrator_core::{OrchestratorError, OrchestratorResult};

pub fn make_worker(id: &str, health: HealthState) -> WorkerDescriptor {
    WorkerDescriptor {
        id: id.to_string(),
        endpoint: format!("http://{id}:9000/invoke"),
        name: format!("worker-{id}"),
        health,
        last_heartbeat: Some(chrono::Utc::now()),
    }
}

pub fn make_message(id: &str, body: &str) -> QueueMessage {
    QueueMessage::new(
        Some(id.to_string()),
        Some(body.to_string()),
        Some(format!("h-{id}")),
    )
}

/// 逐批脚本化的队列假实现：`receive_messages` 依次弹出预置批次，
/// 用完后返回空批；确认只做记录，可切换为总是失败。
#[derive(Default)]
pub struct MockQueue {
    batches: Mutex<VecDeque<OrchestratorResult<Vec<QueueMessage>>>>,
    acknowledged: Mutex<Vec<String>>,
    ack_attempts: Mutex<Vec<String>>,
    fail_acknowledge: Mutex<bool>,
}

impl MockQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enqueue_batch(&self, batch: Vec<QueueMessage>) {
        self.batches.lock().await.push_back(Ok(batch));
    }

    pub async fn enqueue_receive_error(&self, message: &str) {
        self.batches
            .lock()
            .await
            .push_back(Err(OrchestratorError::message_queue_error(message)));
    }

    /// 让后续所有确认调用失败，模拟删除操作对队列不可达
    pub async fn fail_acknowledges(&self) {
        *self.fail_acknowledge.lock().await = true;
    }

    /// 成功确认的句柄
    pub async fn acknowledged_handles(&self) -> Vec<String> {
        self.acknowledged.lock().await.clone()
    }

    /// 所有确认尝试的句柄，含失败的
    pub async fn acknowledge_attempts(&self) -> Vec<String> {
        self.ack_attempts.lock().await.clone()
    }
}

#[async_trait]
impl QueueGateway for MockQueue {
    async fn receive_messages(&self) -> OrchestratorResult<Vec<QueueMessage>> {
        let next = self.batches.lock().await.pop_front();
        match next {
            Some(next) => next,
            None => {
                // 模拟长轮询的空等待，避免消费循环空转
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn acknowledge(&self, delivery_handle: &str) -> OrchestratorResult<()> {
        self.ack_attempts
            .lock()
            .await
            .push(delivery_handle.to_string());
        if *self.fail_acknowledge.lock().await {
            return Err(OrchestratorError::message_queue_error(format!(
                "确认句柄 {delivery_handle} 失败"
            )));
        }
        self.acknowledged
            .lock()
            .await
            .push(delivery_handle.to_string());
        Ok(())
    }
}

/// 固定返回一组Worker的注册表假实现
pub struct MockRegistry {
    workers: Vec<WorkerDescriptor>,
    fail: bool,
    scan_count: Mutex<usize>,
}

impl MockRegistry {
    pub fn new(workers: Vec<WorkerDescriptor>) -> Self {
        Self {
            workers,
            fail: false,
            scan_count: Mutex::new(0),
        }
    }

    /// 扫描总是失败的注册表
    pub fn failing() -> Self {
        Self {
            workers: Vec::new(),
            fail: true,
            scan_count: Mutex::new(0),
        }
    }

    pub async fn scan_count(&self) -> usize {
        *self.scan_count.lock().await
    }
}

#[async_trait]
impl WorkerRegistry for MockRegistry {
    async fn scan_workers(&self) -> OrchestratorResult<Vec<WorkerDescriptor>> {
        *self.scan_count.lock().await += 1;
        if self.fail {
            return Err(OrchestratorError::registry_error("注册表不可用"));
        }
        Ok(self.workers.clone())
    }
}

/// 按目标脚本化响应的调用器假实现，并记录每次调用
#[derive(Default)]
pub struct MockInvoker {
    responses: HashMap<String, Result<Value, String>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置某个目标的成功响应
    pub fn respond(mut self, target: &str, response: Value) -> Self {
        self.responses.insert(target.to_string(), Ok(response));
        self
    }

    /// 预置某个目标的调用失败
    pub fn fail(mut self, target: &str, message: &str) -> Self {
        self.responses
            .insert(target.to_string(), Err(message.to_string()));
        self
    }

    pub async fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_to(&self, target: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|(t, _)| t == target)
            .count()
    }

    pub async fn total_calls(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl FunctionInvoker for MockInvoker {
    async fn invoke_sync(&self, target: &str, payload: &Value) -> OrchestratorResult<Value> {
        self.calls
            .lock()
            .await
            .push((target.to_string(), payload.clone()));
        match self.responses.get(target) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(message)) => Err(OrchestratorError::invocation_error(message.clone())),
            None => Err(OrchestratorError::invocation_error(format!(
                "未脚本化的调用目标: {target}"
            ))),
        }
    }
}
