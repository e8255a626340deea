use std::collections::HashMap;

use orchestrator_core::models::HealthState;
use orchestrator_core::traits::DispatchStrategy;
use orchestrator_dispatcher::test_utils::make_worker;
use orchestrator_dispatcher::RandomStrategy;

#[tokio::test]
async fn test_empty_candidates_selects_none() {
    let strategy = RandomStrategy::with_seed(1);
    let selected = strategy.select_worker(&[]).await.unwrap();
    assert!(selected.is_none());
}

#[tokio::test]
async fn test_single_candidate_selected_every_time() {
    let strategy = RandomStrategy::with_seed(1);
    let workers = vec![make_worker("a", HealthState::Healthy)];

    // 唯一候选必须以概率1被选中
    for _ in 0..100 {
        let selected = strategy.select_worker(&workers).await.unwrap().unwrap();
        assert_eq!(selected.id, "a");
    }
}

#[tokio::test]
async fn test_uniform_distribution_over_candidates() {
    let strategy = RandomStrategy::with_seed(42);
    let workers = vec![
        make_worker("a", HealthState::Healthy),
        make_worker("b", HealthState::Healthy),
        make_worker("c", HealthState::Healthy),
    ];

    let trials = 3000;
    let mut counts: HashMap<String, usize> = HashMap::new();
    for _ in 0..trials {
        let selected = strategy.select_worker(&workers).await.unwrap().unwrap();
        *counts.entry(selected.id).or_default() += 1;
    }

    // 三个候选各自期望1000次，容忍±20%的统计波动
    for id in ["a", "b", "c"] {
        let count = counts.get(id).copied().unwrap_or(0);
        assert!(
            (800..=1200).contains(&count),
            "Worker {id} 被选中 {count} 次，偏离均匀分布"
        );
    }
}

#[tokio::test]
async fn test_seeded_strategy_is_deterministic() {
    let workers = vec![
        make_worker("a", HealthState::Healthy),
        make_worker("b", HealthState::Healthy),
        make_worker("c", HealthState::Healthy),
        make_worker("d", HealthState::Healthy),
    ];

    let first = RandomStrategy::with_seed(7);
    let second = RandomStrategy::with_seed(7);
    for _ in 0..50 {
        let lhs = first.select_worker(&workers).await.unwrap().unwrap();
        let rhs = second.select_worker(&workers).await.unwrap().unwrap();
        assert_eq!(lhs.id, rhs.id);
    }
}

#[tokio::test]
async fn test_strategy_name() {
    assert_eq!(RandomStrategy::with_seed(1).name(), "Random");
}
