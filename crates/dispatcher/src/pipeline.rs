use std::sync::Arc;

use metrics::counter;
use serde_json::Value;
use tracing::{debug, info, warn};

use orchestrator_core::models::{
    EnvelopeFormat, InvocationVerdict, QueueMessage, WorkerDescriptor,
};
use orchestrator_core::traits::{DispatchStrategy, FunctionInvoker, WorkerRegistry};
use orchestrator_core::{OrchestratorError, OrchestratorResult};

/// 单条消息处理完的处置结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDisposition {
    /// 全流程成功，确认删除
    Acknowledge,
    /// 毒消息：重投多少次都不会变好，确认删除以免占着可见性窗口
    Drop,
    /// 保持未确认，等队列的可见性超时自然重投
    Defer,
}

/// 单条消息的处理流水线：解码 → 完整性门 → 注册表过滤 → 选择 → 分发
///
/// 每一步的失败处置见 `MessageDisposition`。流水线自身不碰队列，
/// 确认与否由消费循环根据处置结果执行。
pub struct MessagePipeline {
    registry: Arc<dyn WorkerRegistry>,
    invoker: Arc<dyn FunctionInvoker>,
    strategy: Arc<dyn DispatchStrategy>,
    validator_endpoint: String,
    envelope_format: EnvelopeFormat,
}

impl MessagePipeline {
    pub fn new(
        registry: Arc<dyn WorkerRegistry>,
        invoker: Arc<dyn FunctionInvoker>,
        strategy: Arc<dyn DispatchStrategy>,
        validator_endpoint: String,
        envelope_format: EnvelopeFormat,
    ) -> Self {
        Self {
            registry,
            invoker,
            strategy,
            validator_endpoint,
            envelope_format,
        }
    }

    pub async fn process(&self, message: &QueueMessage) -> MessageDisposition {
        counter!("pipeline_messages_total").increment(1);

        // 1. 解码。消息体缺失或解析失败是不可重试的终态：重投不会让它变合法
        let Some(raw_body) = message.body.as_deref().filter(|body| !body.is_empty()) else {
            warn!("消息 {} 消息体为空，按毒消息丢弃", message.log_id());
            counter!("pipeline_messages_dropped_total").increment(1);
            return MessageDisposition::Drop;
        };
        let payload = match self.envelope_format.decode(raw_body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("消息 {} 解码失败: {e}，按毒消息丢弃", message.log_id());
                counter!("pipeline_messages_dropped_total").increment(1);
                return MessageDisposition::Drop;
            }
        };

        // 2. 完整性门。校验服务故障和载荷被篡改都不能静默丢弃，
        //    留在队列里等重投，保住瞬时故障重试和被拒载荷的可审计性
        if let Err(e) = self.verify_integrity(&payload).await {
            warn!(
                "消息 {} 未通过完整性门: {e}，保留等待重投",
                message.log_id()
            );
            counter!("pipeline_integrity_rejected_total").increment(1);
            return MessageDisposition::Defer;
        }

        // 3. 注册表扫描 + 健康过滤
        let healthy = match self.healthy_workers().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!("扫描Worker注册表失败: {e}，消息 {} 保留等待重投", message.log_id());
                counter!("pipeline_registry_errors_total").increment(1);
                return MessageDisposition::Defer;
            }
        };
        if healthy.is_empty() {
            // 重投前可能有Worker恢复健康
            warn!("当前没有健康的Worker，消息 {} 保留等待重投", message.log_id());
            counter!("pipeline_no_healthy_worker_total").increment(1);
            return MessageDisposition::Defer;
        }

        // 4. 选择
        let selected = match self.strategy.select_worker(&healthy).await {
            Ok(Some(worker)) => worker,
            Ok(None) => {
                warn!("策略 {} 未选出Worker，消息 {} 保留等待重投", self.strategy.name(), message.log_id());
                return MessageDisposition::Defer;
            }
            Err(e) => {
                warn!("Worker选择失败: {e}，消息 {} 保留等待重投", message.log_id());
                return MessageDisposition::Defer;
            }
        };

        // 5. 分发。注意发给Worker的是解码后的原始载荷，不是校验裁决
        match self.dispatch(&selected, &payload).await {
            Ok(response) => {
                info!(
                    "消息 {} 已分发给Worker {} ({})",
                    message.log_id(),
                    selected.name,
                    selected.id
                );
                debug!("Worker响应: {response}");
                counter!("pipeline_messages_dispatched_total").increment(1);
                MessageDisposition::Acknowledge
            }
            Err(e) => {
                warn!(
                    "分发消息 {} 给Worker {} 失败: {e}，保留等待重投",
                    message.log_id(),
                    selected.id
                );
                counter!("pipeline_dispatch_failures_total").increment(1);
                MessageDisposition::Defer
            }
        }
    }

    /// 调用完整性校验服务，只有 `statusCode == 200` 视为通过
    async fn verify_integrity(&self, payload: &Value) -> OrchestratorResult<()> {
        let response = self
            .invoker
            .invoke_sync(&self.validator_endpoint, payload)
            .await?;
        let verdict: InvocationVerdict = serde_json::from_value(response).map_err(|e| {
            OrchestratorError::serialization_error(format!("解析完整性裁决失败: {e}"))
        })?;
        if !verdict.is_accepted() {
            return Err(OrchestratorError::IntegrityRejected {
                status_code: verdict.status_code,
            });
        }
        Ok(())
    }

    async fn healthy_workers(&self) -> OrchestratorResult<Vec<WorkerDescriptor>> {
        let workers = self.registry.scan_workers().await?;
        let total = workers.len();
        let healthy: Vec<WorkerDescriptor> = workers
            .into_iter()
            .filter(WorkerDescriptor::is_healthy)
            .collect();
        debug!("注册表共 {total} 条记录，健康 {} 条", healthy.len());
        Ok(healthy)
    }

    async fn dispatch(
        &self,
        worker: &WorkerDescriptor,
        payload: &Value,
    ) -> OrchestratorResult<Value> {
        self.invoker.invoke_sync(&worker.endpoint, payload).await
    }
}
