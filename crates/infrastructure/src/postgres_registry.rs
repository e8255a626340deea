use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, warn};

use orchestrator_core::config::RegistryConfig;
use orchestrator_core::models::{HealthState, WorkerDescriptor};
use orchestrator_core::traits::WorkerRegistry;
use orchestrator_core::OrchestratorResult;

/// Postgres承载的Worker注册表，只读
///
/// 表由外部心跳上报器维护，本服务只做全量扫描。
pub struct PostgresWorkerRegistry {
    pool: PgPool,
    table_name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct WorkerRow {
    id: String,
    endpoint: String,
    name: String,
    health_status: String,
    last_heartbeat: Option<DateTime<Utc>>,
}

impl From<WorkerRow> for WorkerDescriptor {
    fn from(row: WorkerRow) -> Self {
        let health = match row.health_status.parse::<HealthState>() {
            Ok(state) => state,
            Err(reason) => {
                // 未知状态按不健康处理，绝不把状态不明的Worker选进候选集
                warn!("Worker {} 健康状态无法识别（{reason}），按不健康处理", row.id);
                HealthState::Unhealthy
            }
        };
        WorkerDescriptor {
            id: row.id,
            endpoint: row.endpoint,
            name: row.name,
            health,
            last_heartbeat: row.last_heartbeat,
        }
    }
}

impl PostgresWorkerRegistry {
    pub async fn new(config: &RegistryConfig) -> OrchestratorResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        Ok(Self::with_pool(pool, config.table_name.clone()))
    }

    pub fn with_pool(pool: PgPool, table_name: String) -> Self {
        Self { pool, table_name }
    }
}

#[async_trait]
impl WorkerRegistry for PostgresWorkerRegistry {
    async fn scan_workers(&self) -> OrchestratorResult<Vec<WorkerDescriptor>> {
        // 表名来自配置，不是绑定参数能表达的位置
        let query = format!(
            "SELECT id, endpoint, name, health_status, last_heartbeat FROM {}",
            self.table_name
        );
        let rows: Vec<WorkerRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;

        debug!("注册表扫描返回 {} 条Worker记录", rows.len());
        Ok(rows.into_iter().map(WorkerDescriptor::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(health_status: &str) -> WorkerRow {
        WorkerRow {
            id: "w1".to_string(),
            endpoint: "http://worker-a:9000/invoke".to_string(),
            name: "worker-a".to_string(),
            health_status: health_status.to_string(),
            last_heartbeat: Some(Utc::now()),
        }
    }

    #[test]
    fn test_row_maps_healthy() {
        let descriptor = WorkerDescriptor::from(row("healthy"));
        assert_eq!(descriptor.health, HealthState::Healthy);
        assert_eq!(descriptor.endpoint, "http://worker-a:9000/invoke");
    }

    #[test]
    fn test_row_maps_unhealthy() {
        let descriptor = WorkerDescriptor::from(row("unhealthy"));
        assert_eq!(descriptor.health, HealthState::Unhealthy);
    }

    #[test]
    fn test_unknown_health_treated_as_unhealthy() {
        let descriptor = WorkerDescriptor::from(row("degraded"));
        assert_eq!(descriptor.health, HealthState::Unhealthy);
    }
}
