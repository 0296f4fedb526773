use crate::{
    app::risk::MarketClassification,
    records::{
        DerivedTokenRecord,
        MarketRisk,
        OwnedDashboard,
    },
};
use alloy::primitives::U256;

/// Highest level first. Equal levels keep their input order.
pub fn rank_by_level(records: &mut [DerivedTokenRecord]) {
    records.sort_by(|a, b| b.level.cmp(&a.level));
}

/// Soonest to starve first.
pub fn rank_by_time_remaining(records: &mut [DerivedTokenRecord]) {
    records.sort_by_key(|record| record.seconds_remaining);
}

pub fn total_expected_reward(records: &[DerivedTokenRecord]) -> U256 {
    records.iter().fold(U256::ZERO, |total, record| {
        total.saturating_add(record.expected_reward)
    })
}

pub fn owned_dashboard(mut records: Vec<DerivedTokenRecord>) -> OwnedDashboard {
    rank_by_level(&mut records);
    OwnedDashboard {
        total_expected_reward: total_expected_reward(&records),
        total_owned: records.len(),
        records,
    }
}

pub fn market_report(
    total_minted: usize,
    total_consumed: usize,
    classification: MarketClassification,
) -> MarketRisk {
    let MarketClassification {
        mut dying_soon,
        dead,
        alive,
        live_reads,
    } = classification;
    rank_by_time_remaining(&mut dying_soon);
    MarketRisk {
        total_minted,
        total_consumed,
        dying_soon,
        dead_count: dead.len(),
        alive_count: alive.len(),
        live_reads,
    }
}
