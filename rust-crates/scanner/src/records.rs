use crate::events::TokenId;
use alloy::primitives::{
    Address,
    U256,
};
use chrono::DateTime;
use serde::{
    Deserialize,
    Serialize,
};

pub const DEAD_LABEL: &str = "DEAD!!";
pub const MINE_READY_LABEL: &str = "NOW!!";

/// A vNFT can mine once per day.
pub const MINING_COOLDOWN_SECS: i64 = 24 * 60 * 60;
/// Records with less time than this left are flagged for attention.
pub const URGENT_THRESHOLD_SECS: i64 = 60 * 60;

const REWARD_DECIMALS: u8 = 18;

/// Live state of a token as reported by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VnftInfo {
    pub owner: Address,
    pub level: u64,
    /// Unix instant after which the token is dead unless fed.
    pub time_until_starving: i64,
    pub score: u64,
    /// Unix instant of the last mining.
    pub last_time_mined: i64,
    /// 18-decimal fixed-point token amount.
    pub expected_reward: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedTokenRecord {
    pub token_id: TokenId,
    pub level: u64,
    pub score: u64,
    pub expected_reward: U256,
    pub starving_at_display: String,
    pub mine_at_display: String,
    /// Exact as of the live read. Negative once the token is dead.
    pub seconds_remaining: i64,
    pub urgent: bool,
}

impl DerivedTokenRecord {
    pub fn from_live(token_id: TokenId, info: &VnftInfo, now: i64) -> Self {
        let seconds_remaining = info.time_until_starving.saturating_sub(now);
        let starving_at_display = if info.time_until_starving < now {
            DEAD_LABEL.to_string()
        } else {
            display_instant(info.time_until_starving)
        };
        let next_mine = info.last_time_mined.saturating_add(MINING_COOLDOWN_SECS);
        let mine_at_display = if next_mine < now {
            MINE_READY_LABEL.to_string()
        } else {
            display_instant(next_mine)
        };
        Self {
            token_id,
            level: info.level,
            score: info.score,
            expected_reward: info.expected_reward,
            starving_at_display,
            mine_at_display,
            seconds_remaining,
            urgent: seconds_remaining < URGENT_THRESHOLD_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OwnedDashboard {
    /// Level descending.
    pub records: Vec<DerivedTokenRecord>,
    pub total_expected_reward: U256,
    pub total_owned: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MarketRisk {
    /// Mint events seen across the whole history.
    pub total_minted: usize,
    /// Distinct tokens with at least one consumption.
    pub total_consumed: usize,
    /// Soonest to starve first.
    pub dying_soon: Vec<DerivedTokenRecord>,
    pub dead_count: usize,
    pub alive_count: usize,
    pub live_reads: usize,
}

impl MarketRisk {
    pub fn total_dying_soon(&self) -> usize {
        self.dying_soon.len()
    }
}

/// en-US style UTC rendering, e.g. `10/14/2026, 03:04:05 PM`.
pub fn display_instant(unix_secs: i64) -> String {
    match DateTime::from_timestamp(unix_secs, 0) {
        Some(instant) => instant.format("%m/%d/%Y, %I:%M:%S %p").to_string(),
        None => unix_secs.to_string(),
    }
}

/// Token amount with two decimals, rounded half up.
pub fn display_reward(amount: U256) -> String {
    let cents_unit = U256::from(10u64).pow(U256::from(REWARD_DECIMALS - 2));
    let half = cents_unit / U256::from(2u64);
    let cents = amount.saturating_add(half) / cents_unit;
    let whole = cents / U256::from(100u64);
    let fraction = (cents % U256::from(100u64)).to_string();
    format!("{whole}.{fraction:0>2}")
}
