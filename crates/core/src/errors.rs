use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("消息队列错误: {0}")]
    MessageQueue(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("注册表错误: {0}")]
    Registry(String),
    #[error("函数调用错误: {0}")]
    Invocation(String),
    #[error("完整性校验未通过: 状态码 {status_code}")]
    IntegrityRejected { status_code: i64 },
    #[error("没有健康的Worker可用")]
    NoHealthyWorker,
    #[error("消息缺少投递句柄，无法确认")]
    MissingDeliveryHandle,
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("网络错误: {0}")]
    Network(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

impl OrchestratorError {
    pub fn message_queue_error<S: Into<String>>(msg: S) -> Self {
        Self::MessageQueue(msg.into())
    }
    pub fn serialization_error<S: Into<String>>(msg: S) -> Self {
        Self::Serialization(msg.into())
    }
    pub fn registry_error<S: Into<String>>(msg: S) -> Self {
        Self::Registry(msg.into())
    }
    pub fn invocation_error<S: Into<String>>(msg: S) -> Self {
        Self::Invocation(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// 是否属于启动即应终止进程的致命错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::IntegrityRejected { status_code: 500 };
        assert!(err.to_string().contains("500"));

        let err = OrchestratorError::message_queue_error("连接被拒绝");
        assert!(err.to_string().contains("连接被拒绝"));
    }

    #[test]
    fn test_is_fatal() {
        assert!(OrchestratorError::config_error("缺少队列地址").is_fatal());
        assert!(!OrchestratorError::NoHealthyWorker.is_fatal());
        assert!(!OrchestratorError::MissingDeliveryHandle.is_fatal());
    }
}
