use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 注册表里的一条Worker记录
///
/// 健康状态由外部心跳上报器独占维护，本服务只读不写；
/// `last_heartbeat` 仅作诊断参考，不做陈旧度判断。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerDescriptor {
    pub id: String,
    /// 调用端可用的端点引用（如调用目标名或URL）
    pub endpoint: String,
    /// 诊断用的人类可读名称
    pub name: String,
    pub health: HealthState,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

impl WorkerDescriptor {
    pub fn is_healthy(&self) -> bool {
        self.health == HealthState::Healthy
    }
}

impl std::str::FromStr for HealthState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(HealthState::Healthy),
            "unhealthy" => Ok(HealthState::Unhealthy),
            other => Err(format!("未知的健康状态: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_healthy() {
        let worker = WorkerDescriptor {
            id: "w1".to_string(),
            endpoint: "http://worker-a:9000/invoke".to_string(),
            name: "worker-a".to_string(),
            health: HealthState::Healthy,
            last_heartbeat: Some(Utc::now()),
        };
        assert!(worker.is_healthy());

        let worker = WorkerDescriptor {
            health: HealthState::Unhealthy,
            ..worker
        };
        assert!(!worker.is_healthy());
    }

    #[test]
    fn test_health_state_from_str() {
        assert_eq!("healthy".parse::<HealthState>(), Ok(HealthState::Healthy));
        assert_eq!(
            "unhealthy".parse::<HealthState>(),
            Ok(HealthState::Unhealthy)
        );
        assert!("降级".parse::<HealthState>().is_err());
    }
}
