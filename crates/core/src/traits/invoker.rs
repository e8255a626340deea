use async_trait::async_trait;
use serde_json::Value;

use crate::errors::OrchestratorResult;

/// 同步函数调用抽象
///
/// 完整性校验和Worker分发走同一份合同：输入任意JSON载荷，
/// 输出任意JSON响应；传输层错误或响应里内嵌的函数级错误信号
/// 都作为 `Err` 返回。
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke_sync(&self, target: &str, payload: &Value) -> OrchestratorResult<Value>;
}
