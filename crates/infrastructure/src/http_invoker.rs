use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use orchestrator_core::traits::FunctionInvoker;
use orchestrator_core::{OrchestratorError, OrchestratorResult};

/// HTTP同步函数调用器
///
/// 把载荷POST到目标URL并把响应体当JSON解析。完整性校验服务和
/// Worker端点走同一份合同，所以共用一个调用器。
/// 带固定请求超时，单个外部调用卡死不会无限拖住消费循环。
pub struct HttpFunctionInvoker {
    client: reqwest::Client,
}

impl HttpFunctionInvoker {
    pub fn new(request_timeout: Duration) -> OrchestratorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                OrchestratorError::Network(format!("构建HTTP客户端失败: {e}"))
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FunctionInvoker for HttpFunctionInvoker {
    async fn invoke_sync(&self, target: &str, payload: &Value) -> OrchestratorResult<Value> {
        debug!("同步调用目标: {target}");

        let response = self
            .client
            .post(target)
            .json(payload)
            .send()
            .await
            .map_err(|e| OrchestratorError::Network(format!("调用 {target} 失败: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OrchestratorError::invocation_error(format!(
                "目标 {target} 返回HTTP {status}"
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            OrchestratorError::serialization_error(format!("解析 {target} 的响应失败: {e}"))
        })?;

        // 传输层成功但响应内嵌函数级错误信号，同样算调用失败
        if let Some(message) = body.get("errorMessage").and_then(Value::as_str) {
            return Err(OrchestratorError::invocation_error(format!(
                "目标 {target} 报告函数级错误: {message}"
            )));
        }

        Ok(body)
    }
}
