use crate::{
    app::{
        chain_query::ChainQuery,
        staleness::StalenessEstimator,
    },
    config::{
        ONE_DAY_SECS,
        ScanConfig,
    },
    events::{
        ConsumeEvent,
        TokenId,
        TransferEvent,
    },
    records::{
        DerivedTokenRecord,
        VnftInfo,
    },
};
use alloy::primitives::U256;
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::HashMap;

/// Survival time granted by each consumable item.
pub const ITEM_DURATIONS: [(u64, u64); 5] = [
    (1, 3 * ONE_DAY_SECS),
    (2, 2 * ONE_DAY_SECS),
    (3, 4 * ONE_DAY_SECS),
    (4, ONE_DAY_SECS),
    (5, 7 * ONE_DAY_SECS),
];

/// Unknown items grant nothing.
pub fn item_duration_secs(item_id: U256) -> u64 {
    ITEM_DURATIONS
        .iter()
        .find(|(id, _)| U256::from(*id) == item_id)
        .map(|(_, secs)| *secs)
        .unwrap_or(0)
}

#[derive(PartialEq, Eq, Debug, Copy, Clone, Serialize, Deserialize)]
pub enum TokenState {
    Alive,
    DyingSoon,
    Dead,
}

/// Outcome of the block-arithmetic screen.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum Screening {
    Alive,
    Dead,
    /// Too close to the approximate expiry to decide without a live read.
    NeedsLiveRead,
}

pub fn screen(
    mint: &TransferEvent,
    consumption: Option<&ConsumeEvent>,
    estimator: &StalenessEstimator,
    config: &ScanConfig,
) -> Screening {
    match consumption {
        None => {
            let since_mint = estimator.elapsed_since(mint.block_number);
            if since_mint > config.unfed_grace_secs {
                Screening::Dead
            } else {
                Screening::Alive
            }
        }
        Some(consumed) => {
            let granted = item_duration_secs(consumed.item_id);
            let since_fed = estimator.elapsed_since(consumed.block_number);
            if since_fed >= granted {
                Screening::Dead
            } else if since_fed >= granted.saturating_sub(config.safety_margin_secs) {
                Screening::NeedsLiveRead
            } else {
                Screening::Alive
            }
        }
    }
}

/// Exact state from a live read. Only called for tokens that passed the screen as
/// suspicious, so a future starving instant means dying soon.
pub fn classify_live(info: &VnftInfo, now: i64) -> TokenState {
    if info.time_until_starving > now {
        TokenState::DyingSoon
    } else {
        TokenState::Dead
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketClassification {
    pub dying_soon: Vec<DerivedTokenRecord>,
    pub dead: Vec<TokenId>,
    pub alive: Vec<TokenId>,
    pub live_reads: usize,
}

/// Classify every minted token. `mints` must be in emission order; unless
/// `include_newest` is set the last one is skipped.
pub async fn classify_market<C: ChainQuery>(
    chain: &C,
    config: &ScanConfig,
    mints: &[TransferEvent],
    consumptions: &HashMap<TokenId, ConsumeEvent>,
    estimator: &StalenessEstimator,
    now: i64,
) -> MarketClassification {
    let candidates = if config.include_newest {
        mints
    } else {
        &mints[..mints.len().saturating_sub(1)]
    };

    let mut classification = MarketClassification::default();
    for mint in candidates {
        let token_id = mint.token_id;
        let screening = screen(mint, consumptions.get(&token_id), estimator, config);
        tracing::debug!("token {token_id} screened as {screening:?}");
        match screening {
            Screening::Alive => classification.alive.push(token_id),
            Screening::Dead => classification.dead.push(token_id),
            Screening::NeedsLiveRead => {
                classification.live_reads += 1;
                match chain.live_info(token_id).await {
                    Ok(info) => match classify_live(&info, now) {
                        TokenState::DyingSoon => {
                            tracing::info!(
                                "token {token_id} dying soon ({} sec left)",
                                info.time_until_starving - now
                            );
                            classification
                                .dying_soon
                                .push(DerivedTokenRecord::from_live(token_id, &info, now));
                        }
                        TokenState::Alive | TokenState::Dead => {
                            classification.dead.push(token_id)
                        }
                    },
                    Err(e) => {
                        tracing::warn!("counting token {token_id} as dead: {e}");
                        classification.dead.push(token_id);
                    }
                }
            }
        }
    }
    classification
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::app::in_memory_chain_query::InMemoryChain;
    use alloy::primitives::{
        Address,
        B256,
    };

    const NOW: i64 = 1_700_000_000;
    const AVG_BLOCK_SECS: u64 = 13;

    fn mint(token: u64, block_number: u64) -> TransferEvent {
        TransferEvent {
            token_id: TokenId::from(token),
            from: Address::ZERO,
            to: Address::repeat_byte(0x01),
            block_number,
            log_index: 0,
        }
    }

    fn consumption(token: u64, item: u64, block_number: u64) -> ConsumeEvent {
        ConsumeEvent {
            token_id: TokenId::from(token),
            item_id: U256::from(item),
            giver: Address::repeat_byte(0x01),
            block_number,
            log_index: 0,
            transaction_hash: B256::ZERO,
        }
    }

    fn live(time_until_starving: i64) -> VnftInfo {
        VnftInfo {
            owner: Address::repeat_byte(0x01),
            level: 1,
            time_until_starving,
            score: 10,
            last_time_mined: NOW,
            expected_reward: U256::ZERO,
        }
    }

    /// An estimator whose head sits exactly `elapsed` seconds after block 0.
    fn estimator_after(elapsed: u64) -> StalenessEstimator {
        StalenessEstimator::new(elapsed, 1)
    }

    #[test]
    fn item_duration_secs__known_and_unknown_items() {
        assert_eq!(item_duration_secs(U256::from(1)), 259_200);
        assert_eq!(item_duration_secs(U256::from(2)), 172_800);
        assert_eq!(item_duration_secs(U256::from(3)), 345_600);
        assert_eq!(item_duration_secs(U256::from(4)), 86_400);
        assert_eq!(item_duration_secs(U256::from(5)), 604_800);
        assert_eq!(item_duration_secs(U256::from(0)), 0);
        assert_eq!(item_duration_secs(U256::from(6)), 0);
        assert_eq!(item_duration_secs(U256::MAX), 0);
    }

    #[test]
    fn screen__unfed_mint_twenty_thousand_blocks_old__is_dead() {
        // given
        let mint = mint(1, 1_000);
        let estimator = StalenessEstimator::new(21_000, AVG_BLOCK_SECS);

        // when
        let screening = screen(&mint, None, &estimator, &ScanConfig::default());

        // then
        assert_eq!(screening, Screening::Dead);
    }

    #[test]
    fn screen__unfed_mint__crosses_grace_once_and_stays_dead() {
        let config = ScanConfig::default();
        let mint = mint(1, 0);
        let grace = config.unfed_grace_secs;
        let states = [grace - 1, grace, grace + 1, grace * 2, grace * 10]
            .map(|elapsed| screen(&mint, None, &estimator_after(elapsed), &config));
        assert_eq!(
            states,
            [
                Screening::Alive,
                Screening::Alive,
                Screening::Dead,
                Screening::Dead,
                Screening::Dead,
            ]
        );
    }

    #[test]
    fn screen__just_outside_margin__is_alive_without_live_read() {
        // given
        let config = ScanConfig::default();
        let consumed = consumption(1, 4, 0);
        let elapsed = 86_400 - config.safety_margin_secs - 1;

        // when
        let screening = screen(
            &mint(1, 0),
            Some(&consumed),
            &estimator_after(elapsed),
            &config,
        );

        // then
        assert_eq!(screening, Screening::Alive);
    }

    #[test]
    fn screen__just_inside_margin__needs_live_read() {
        // given
        let config = ScanConfig::default();
        let consumed = consumption(1, 4, 0);
        let elapsed = 86_400 - config.safety_margin_secs + 1;

        // when
        let screening = screen(
            &mint(1, 0),
            Some(&consumed),
            &estimator_after(elapsed),
            &config,
        );

        // then
        assert_eq!(screening, Screening::NeedsLiveRead);
    }

    #[test]
    fn screen__past_granted_duration__is_dead() {
        let config = ScanConfig::default();
        let consumed = consumption(1, 4, 0);
        let screening = screen(
            &mint(1, 0),
            Some(&consumed),
            &estimator_after(86_400),
            &config,
        );
        assert_eq!(screening, Screening::Dead);
    }

    #[test]
    fn screen__unknown_item__is_dead_immediately() {
        let config = ScanConfig::default();
        let consumed = consumption(1, 42, 0);
        let screening = screen(
            &mint(1, 0),
            Some(&consumed),
            &estimator_after(0),
            &config,
        );
        assert_eq!(screening, Screening::Dead);
    }

    #[test]
    fn classify_live__future_and_past_starving() {
        assert_eq!(classify_live(&live(NOW + 1), NOW), TokenState::DyingSoon);
        assert_eq!(classify_live(&live(NOW), NOW), TokenState::Dead);
        assert_eq!(classify_live(&live(NOW - 1), NOW), TokenState::Dead);
    }

    #[tokio::test]
    async fn classify_market__item_four_6600_blocks_ago__reads_live_state() {
        // given
        let chain = InMemoryChain::new(10_000);
        chain.set_info(TokenId::from(1), live(NOW + 600));
        chain.set_info(TokenId::from(2), live(NOW - 600));
        let mints = vec![mint(1, 100), mint(2, 101), mint(3, 102)];
        let consumptions = HashMap::from([
            (TokenId::from(1), consumption(1, 4, 10_000 - 6_600)),
            (TokenId::from(2), consumption(2, 4, 10_000 - 6_600)),
        ]);
        let estimator = StalenessEstimator::new(10_000, AVG_BLOCK_SECS);

        // when
        let classification = classify_market(
            &chain,
            &ScanConfig::default(),
            &mints,
            &consumptions,
            &estimator,
            NOW,
        )
        .await;

        // then
        assert_eq!(classification.live_reads, 2);
        assert_eq!(chain.live_reads(), vec![TokenId::from(1), TokenId::from(2)]);
        assert_eq!(classification.dying_soon.len(), 1);
        assert_eq!(classification.dying_soon[0].token_id, TokenId::from(1));
        assert_eq!(classification.dying_soon[0].seconds_remaining, 600);
        assert_eq!(classification.dead, vec![TokenId::from(2)]);
        assert!(classification.alive.is_empty());
    }

    #[tokio::test]
    async fn classify_market__failed_live_read__counts_as_dead_and_continues() {
        // given
        let chain = InMemoryChain::new(10_000);
        chain.set_info(TokenId::from(2), live(NOW + 60));
        let mints = vec![mint(1, 100), mint(2, 101), mint(3, 102)];
        let consumptions = HashMap::from([
            (TokenId::from(1), consumption(1, 4, 10_000 - 6_600)),
            (TokenId::from(2), consumption(2, 4, 10_000 - 6_600)),
        ]);
        let estimator = StalenessEstimator::new(10_000, AVG_BLOCK_SECS);

        // when
        let classification = classify_market(
            &chain,
            &ScanConfig::default(),
            &mints,
            &consumptions,
            &estimator,
            NOW,
        )
        .await;

        // then
        assert_eq!(classification.dead, vec![TokenId::from(1)]);
        assert_eq!(classification.dying_soon.len(), 1);
        assert_eq!(classification.dying_soon[0].token_id, TokenId::from(2));
    }

    #[tokio::test]
    async fn classify_market__default_config__skips_newest_mint() {
        // given
        let chain = InMemoryChain::new(100);
        let mints = vec![mint(1, 10), mint(2, 20)];
        let estimator = StalenessEstimator::new(100, AVG_BLOCK_SECS);

        // when
        let classification = classify_market(
            &chain,
            &ScanConfig::default(),
            &mints,
            &HashMap::new(),
            &estimator,
            NOW,
        )
        .await;

        // then
        assert_eq!(classification.alive, vec![TokenId::from(1)]);
    }

    #[tokio::test]
    async fn classify_market__include_newest__classifies_every_mint() {
        // given
        let chain = InMemoryChain::new(100);
        let mints = vec![mint(1, 10), mint(2, 20)];
        let estimator = StalenessEstimator::new(100, AVG_BLOCK_SECS);
        let config = ScanConfig {
            include_newest: true,
            ..ScanConfig::default()
        };

        // when
        let classification =
            classify_market(&chain, &config, &mints, &HashMap::new(), &estimator, NOW)
                .await;

        // then
        assert_eq!(classification.alive, vec![TokenId::from(1), TokenId::from(2)]);
        assert_eq!(classification.live_reads, 0);
    }
}
