pub mod handlers;
pub mod routes;

use tokio::sync::broadcast;
use tracing::{error, info};

use orchestrator_core::{OrchestratorError, OrchestratorResult};

/// 启动存活探针HTTP服务，直到收到关闭信号
///
/// 探针与消费循环相互独立：进程存活与否不依赖消费进度。
pub async fn serve(
    bind_address: &str,
    service_name: String,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> OrchestratorResult<()> {
    let app = routes::create_router(service_name);

    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .map_err(|e| {
            OrchestratorError::Network(format!("绑定探针地址 {bind_address} 失败: {e}"))
        })?;
    info!("存活探针服务监听 {bind_address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("存活探针服务开始优雅关闭");
        })
        .await
        .map_err(|e| {
            error!("存活探针服务异常退出: {e}");
            OrchestratorError::Network(format!("探针服务错误: {e}"))
        })
}
