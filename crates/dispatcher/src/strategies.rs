use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use orchestrator_core::models::WorkerDescriptor;
use orchestrator_core::traits::DispatchStrategy;
use orchestrator_core::{OrchestratorError, OrchestratorResult};

/// 均匀随机选择策略
///
/// 负载均摊完全靠均匀随机：没有会话亲和、没有最小负载启发、没有权重。
/// 唯一候选时确定性选中。随机源显式注入，测试可以用固定种子得到
/// 确定性序列。
pub struct RandomStrategy {
    rng: Mutex<StdRng>,
}

impl RandomStrategy {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// 固定种子构造，测试用
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DispatchStrategy for RandomStrategy {
    async fn select_worker(
        &self,
        candidates: &[WorkerDescriptor],
    ) -> OrchestratorResult<Option<WorkerDescriptor>> {
        match candidates {
            [] => {
                debug!("候选集为空，无Worker可选");
                Ok(None)
            }
            [only] => Ok(Some(only.clone())),
            _ => {
                let index = {
                    let mut rng = self
                        .rng
                        .lock()
                        .map_err(|_| OrchestratorError::Internal("随机源锁中毒".to_string()))?;
                    rng.random_range(0..candidates.len())
                };
                let selected = &candidates[index];
                debug!(
                    "随机策略选中Worker {} (索引 {}/{})",
                    selected.name,
                    index,
                    candidates.len()
                );
                Ok(Some(selected.clone()))
            }
        }
    }

    fn name(&self) -> &str {
        "Random"
    }
}
