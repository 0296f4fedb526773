use crate::{
    app::chain_query::ChainQuery,
    events::{
        KeyedEvent,
        TokenId,
        TransferEvent,
    },
    records::VnftInfo,
};
use alloy::primitives::Address;
use std::collections::HashSet;

/// Distinct tokens ever transferred to `account`, in the order they first arrived.
pub fn incoming_tokens(account: Address, transfers: &[TransferEvent]) -> Vec<TokenId> {
    let mut incoming = transfers
        .iter()
        .filter(|transfer| transfer.to == account)
        .collect::<Vec<_>>();
    incoming.sort_by_key(|transfer| transfer.order());
    let mut seen = HashSet::new();
    incoming
        .into_iter()
        .map(|transfer| transfer.token_id)
        .filter(|token_id| seen.insert(*token_id))
        .collect()
}

/// Tokens `account` holds right now.
///
/// A transfer to the account only proves it held the token at some point, so every
/// candidate is confirmed against a live read. Failed reads drop the token.
pub async fn resolve_owned<C: ChainQuery>(
    chain: &C,
    account: Address,
    transfers: &[TransferEvent],
) -> Vec<(TokenId, VnftInfo)> {
    let candidates = incoming_tokens(account, transfers);
    tracing::info!(
        "{} candidate tokens transferred to {account}",
        candidates.len()
    );
    let mut owned = Vec::with_capacity(candidates.len());
    for token_id in candidates {
        match chain.live_info(token_id).await {
            Ok(info) if info.owner == account => owned.push((token_id, info)),
            Ok(info) => {
                tracing::debug!("token {token_id} has moved on to {}", info.owner);
            }
            Err(e) => {
                tracing::warn!("dropping token {token_id}: {e}");
            }
        }
    }
    owned
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::app::in_memory_chain_query::InMemoryChain;
    use alloy::primitives::U256;

    fn transfer(token: u64, from: Address, to: Address, block_number: u64) -> TransferEvent {
        TransferEvent {
            token_id: TokenId::from(token),
            from,
            to,
            block_number,
            log_index: 0,
        }
    }

    fn owned_by(owner: Address, level: u64) -> VnftInfo {
        VnftInfo {
            owner,
            level,
            time_until_starving: 0,
            score: 0,
            last_time_mined: 0,
            expected_reward: U256::ZERO,
        }
    }

    #[test]
    fn incoming_tokens__repeat_destinations__are_listed_once() {
        // given
        let alice = Address::repeat_byte(0xa1);
        let bob = Address::repeat_byte(0xb0);
        let transfers = vec![
            transfer(2, Address::ZERO, alice, 20),
            transfer(1, Address::ZERO, alice, 10),
            transfer(1, alice, bob, 11),
            transfer(1, bob, alice, 12),
            transfer(3, Address::ZERO, bob, 13),
        ];

        // when
        let tokens = incoming_tokens(alice, &transfers);

        // then
        assert_eq!(tokens, vec![TokenId::from(1), TokenId::from(2)]);
    }

    #[tokio::test]
    async fn resolve_owned__token_transferred_away__is_excluded() {
        // given
        let alice = Address::repeat_byte(0xa1);
        let bob = Address::repeat_byte(0xb0);
        let chain = InMemoryChain::new(100);
        chain.set_info(TokenId::from(1), owned_by(bob, 1));
        chain.set_info(TokenId::from(2), owned_by(alice, 2));
        let transfers = vec![
            transfer(1, Address::ZERO, alice, 10),
            transfer(2, Address::ZERO, alice, 11),
        ];

        // when
        let owned = resolve_owned(&chain, alice, &transfers).await;

        // then
        assert_eq!(owned, vec![(TokenId::from(2), owned_by(alice, 2))]);
    }

    #[tokio::test]
    async fn resolve_owned__failed_live_read__drops_token_only() {
        // given
        let alice = Address::repeat_byte(0xa1);
        let chain = InMemoryChain::new(100);
        chain.set_reverting(TokenId::from(1), "burned");
        chain.set_info(TokenId::from(3), owned_by(alice, 4));
        let transfers = vec![
            transfer(1, Address::ZERO, alice, 10),
            transfer(2, Address::ZERO, alice, 11),
            transfer(3, Address::ZERO, alice, 12),
        ];

        // when
        let owned = resolve_owned(&chain, alice, &transfers).await;

        // then
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].0, TokenId::from(3));
        assert_eq!(
            chain.live_reads(),
            vec![TokenId::from(1), TokenId::from(2), TokenId::from(3)]
        );
    }
}
