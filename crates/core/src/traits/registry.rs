use async_trait::async_trait;

use crate::errors::OrchestratorResult;
use crate::models::WorkerDescriptor;

/// Worker注册表抽象
///
/// 本服务对注册表只有读路径；健康标志由独立的心跳上报器维护。
/// 注册表可能返回零条、一条或多条任意健康状态的记录，调用方必须都能容忍。
#[async_trait]
pub trait WorkerRegistry: Send + Sync {
    /// 全量扫描注册表
    async fn scan_workers(&self) -> OrchestratorResult<Vec<WorkerDescriptor>>;
}
