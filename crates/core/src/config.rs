use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{OrchestratorError, OrchestratorResult};
use crate::models::EnvelopeFormat;

/// 应用配置
///
/// 来源优先级：内置默认值 < TOML配置文件 < `ORCHESTRATOR_` 前缀的环境变量
/// （嵌套键用 `__` 分隔，如 `ORCHESTRATOR_MESSAGE_QUEUE__URL`）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub message_queue: MessageQueueConfig,
    pub registry: RegistryConfig,
    pub integrity: IntegrityConfig,
    pub api: ApiConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageQueueConfig {
    pub r#type: MessageQueueType,
    /// 队列端点，必填，缺失时进程拒绝启动
    pub url: String,
    pub queue_name: String,
    pub envelope_format: EnvelopeFormat,
    /// 单次接收的消息上限
    pub max_messages: u32,
    /// 长轮询等待时间
    pub wait_time_seconds: u64,
    /// 可见性超时，未确认的消息在此之后重投
    pub visibility_timeout_seconds: u64,
    /// 接收调用失败后的固定退避
    pub poll_error_backoff_seconds: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageQueueType {
    RedisStream,
    InMemory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub database_url: String,
    pub table_name: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityConfig {
    /// 完整性校验服务的调用目标
    pub validator_endpoint: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub service_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub metrics_enabled: bool,
    pub metrics_bind_address: String,
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> OrchestratorResult<Self> {
        let mut builder = Config::builder();

        builder = Self::set_defaults(builder)?;

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("ORCHESTRATOR")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .map_err(|e| OrchestratorError::config_error(format!("构建配置失败: {e}")))?
            .try_deserialize()
            .map_err(|e| OrchestratorError::config_error(format!("解析配置失败: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    fn set_defaults(
        builder: ConfigBuilder<DefaultState>,
    ) -> OrchestratorResult<ConfigBuilder<DefaultState>> {
        builder
            .set_default("message_queue.type", "redis_stream")
            .and_then(|b| b.set_default("message_queue.url", ""))
            .and_then(|b| b.set_default("message_queue.queue_name", "dispatch"))
            .and_then(|b| b.set_default("message_queue.envelope_format", "direct"))
            .and_then(|b| b.set_default("message_queue.max_messages", 10))
            .and_then(|b| b.set_default("message_queue.wait_time_seconds", 20))
            .and_then(|b| b.set_default("message_queue.visibility_timeout_seconds", 30))
            .and_then(|b| b.set_default("message_queue.poll_error_backoff_seconds", 5))
            .and_then(|b| b.set_default("registry.database_url", "postgresql://localhost/orchestrator"))
            .and_then(|b| b.set_default("registry.table_name", "workers"))
            .and_then(|b| b.set_default("registry.max_connections", 5))
            .and_then(|b| b.set_default("integrity.validator_endpoint", ""))
            .and_then(|b| b.set_default("integrity.request_timeout_seconds", 30))
            .and_then(|b| b.set_default("api.enabled", true))
            .and_then(|b| b.set_default("api.bind_address", "0.0.0.0:8080"))
            .and_then(|b| b.set_default("api.service_name", "message-orchestrator"))
            .and_then(|b| b.set_default("observability.log_level", "info"))
            .and_then(|b| b.set_default("observability.metrics_enabled", true))
            .and_then(|b| b.set_default("observability.metrics_bind_address", "0.0.0.0:9090"))
            .map_err(|e| OrchestratorError::config_error(format!("设置默认配置失败: {e}")))
    }

    pub fn validate(&self) -> OrchestratorResult<()> {
        if self.message_queue.url.trim().is_empty() {
            return Err(OrchestratorError::config_error(
                "message_queue.url 为必填项（ORCHESTRATOR_MESSAGE_QUEUE__URL）",
            ));
        }
        if self.integrity.validator_endpoint.trim().is_empty() {
            return Err(OrchestratorError::config_error(
                "integrity.validator_endpoint 为必填项（ORCHESTRATOR_INTEGRITY__VALIDATOR_ENDPOINT）",
            ));
        }
        if self.message_queue.max_messages == 0 || self.message_queue.max_messages > 10 {
            return Err(OrchestratorError::config_error(
                "message_queue.max_messages 取值范围为 1..=10",
            ));
        }
        if self.message_queue.visibility_timeout_seconds == 0 {
            return Err(OrchestratorError::config_error(
                "message_queue.visibility_timeout_seconds 必须大于0",
            ));
        }
        // 表名会拼进SQL语句，只接受裸标识符
        if !Self::is_bare_identifier(&self.registry.table_name) {
            return Err(OrchestratorError::config_error(format!(
                "registry.table_name 必须是裸标识符（字母或下划线开头，只含字母、数字、下划线），得到: {:?}",
                self.registry.table_name
            )));
        }
        Ok(())
    }

    fn is_bare_identifier(name: &str) -> bool {
        let mut chars = name.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        (first.is_ascii_alphabetic() || first == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[message_queue]
type = "in_memory"
url = "memory://dispatch"
queue_name = "dispatch"
envelope_format = "enveloped"
max_messages = 10
wait_time_seconds = 20
visibility_timeout_seconds = 30
poll_error_backoff_seconds = 5

[registry]
database_url = "postgresql://localhost/orchestrator"
table_name = "workers"
max_connections = 5

[integrity]
validator_endpoint = "http://validator:9000/integrity"
request_timeout_seconds = 30

[api]
enabled = true
bind_address = "0.0.0.0:8080"
service_name = "message-orchestrator"

[observability]
log_level = "info"
metrics_enabled = false
metrics_bind_address = "0.0.0.0:9090"
"#;

    #[test]
    fn test_sample_config_parses() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.message_queue.r#type, MessageQueueType::InMemory);
        assert_eq!(
            config.message_queue.envelope_format,
            crate::models::EnvelopeFormat::Enveloped
        );
        assert_eq!(config.message_queue.max_messages, 10);
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_queue_url_is_fatal() {
        let mut config: AppConfig = toml::from_str(SAMPLE).unwrap();
        config.message_queue.url = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_table_name_must_be_bare_identifier() {
        let mut config: AppConfig = toml::from_str(SAMPLE).unwrap();
        for bad in ["", "workers; DROP TABLE workers", "my-table", "1workers", "w.x"] {
            config.registry.table_name = bad.to_string();
            assert!(config.validate().is_err(), "{bad:?} 不应通过校验");
        }
        for good in ["workers", "_workers", "Workers_2"] {
            config.registry.table_name = good.to_string();
            assert!(config.validate().is_ok(), "{good:?} 应通过校验");
        }
    }

    #[test]
    fn test_max_messages_range() {
        let mut config: AppConfig = toml::from_str(SAMPLE).unwrap();
        config.message_queue.max_messages = 11;
        assert!(config.validate().is_err());
        config.message_queue.max_messages = 0;
        assert!(config.validate().is_err());
        config.message_queue.max_messages = 1;
        assert!(config.validate().is_ok());
    }
}
