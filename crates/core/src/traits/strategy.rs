use async_trait::async_trait;

use crate::errors::OrchestratorResult;
use crate::models::WorkerDescriptor;

/// 分发目标选择策略
#[async_trait]
pub trait DispatchStrategy: Send + Sync {
    /// 从候选集中选出一个Worker；候选集为空时返回 `None`
    async fn select_worker(
        &self,
        candidates: &[WorkerDescriptor],
    ) -> OrchestratorResult<Option<WorkerDescriptor>>;

    fn name(&self) -> &str;
}
