use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use orchestrator_core::config::AppConfig;
use orchestrator_core::traits::{DispatchStrategy, FunctionInvoker, QueueGateway, WorkerRegistry};
use orchestrator_dispatcher::{MessagePipeline, QueueConsumer, RandomStrategy};
use orchestrator_infrastructure::{HttpFunctionInvoker, PostgresWorkerRegistry, QueueFactory};

use crate::shutdown::ShutdownManager;

/// 应用实例：把各外部协作方的客户端装配进消费流水线
pub struct Application {
    config: AppConfig,
    queue: Arc<dyn QueueGateway>,
    pipeline: Arc<MessagePipeline>,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let queue = QueueFactory::create(&config.message_queue)
            .await
            .context("创建队列网关失败")?;

        let registry: Arc<dyn WorkerRegistry> = Arc::new(
            PostgresWorkerRegistry::new(&config.registry)
                .await
                .context("连接Worker注册表失败")?,
        );

        let invoker: Arc<dyn FunctionInvoker> = Arc::new(
            HttpFunctionInvoker::new(Duration::from_secs(
                config.integrity.request_timeout_seconds,
            ))
            .context("创建函数调用器失败")?,
        );

        let strategy: Arc<dyn DispatchStrategy> = Arc::new(RandomStrategy::new());

        let pipeline = Arc::new(MessagePipeline::new(
            registry,
            invoker,
            strategy,
            config.integrity.validator_endpoint.clone(),
            config.message_queue.envelope_format,
        ));

        Ok(Self {
            config,
            queue,
            pipeline,
        })
    }

    /// 运行消费循环和存活探针，直到关闭信号
    pub async fn run(&self, shutdown: &ShutdownManager) -> Result<()> {
        // 探针独立于消费循环，常驻并发任务，不共享可变状态
        let api_handle = if self.config.api.enabled {
            let shutdown_rx = shutdown.subscribe();
            let bind_address = self.config.api.bind_address.clone();
            let service_name = self.config.api.service_name.clone();
            Some(tokio::spawn(async move {
                orchestrator_api::serve(&bind_address, service_name, shutdown_rx).await
            }))
        } else {
            info!("存活探针已禁用");
            None
        };

        let consumer = QueueConsumer::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.pipeline),
            Duration::from_secs(self.config.message_queue.poll_error_backoff_seconds),
        );
        consumer.run(shutdown.subscribe()).await;

        if let Some(handle) = api_handle {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("存活探针退出时报错: {e}"),
                Err(e) => warn!("等待存活探针任务失败: {e}"),
            }
        }

        Ok(())
    }
}
