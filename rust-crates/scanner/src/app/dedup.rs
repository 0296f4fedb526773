use crate::events::KeyedEvent;
use std::collections::{
    HashMap,
    hash_map::Entry,
};

/// Last event per key by emission order. The input may arrive in any order.
pub fn latest_by_key<E, I>(events: I) -> HashMap<E::Key, E>
where
    E: KeyedEvent,
    I: IntoIterator<Item = E>,
{
    let mut latest: HashMap<E::Key, E> = HashMap::new();
    for event in events {
        match latest.entry(event.key()) {
            Entry::Occupied(mut slot) => {
                if event.order() >= slot.get().order() {
                    slot.insert(event);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(event);
            }
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::events::{
        ConsumeEvent,
        TokenId,
    };
    use alloy::primitives::{
        Address,
        B256,
        U256,
    };
    use proptest::prelude::*;

    fn consumption(token: u64, item: u64, block_number: u64, log_index: u64) -> ConsumeEvent {
        ConsumeEvent {
            token_id: TokenId::from(token),
            item_id: U256::from(item),
            giver: Address::ZERO,
            block_number,
            log_index,
            transaction_hash: B256::ZERO,
        }
    }

    #[test]
    fn latest_by_key__empty_input__returns_empty_map() {
        let latest = latest_by_key(Vec::<ConsumeEvent>::new());
        assert!(latest.is_empty());
    }

    #[test]
    fn latest_by_key__same_block__keeps_highest_log_index() {
        // given
        let events = vec![
            consumption(1, 5, 100, 7),
            consumption(1, 4, 100, 2),
            consumption(2, 3, 90, 0),
        ];

        // when
        let latest = latest_by_key(events);

        // then
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[&TokenId::from(1)].item_id, U256::from(5));
        assert_eq!(latest[&TokenId::from(2)].item_id, U256::from(3));
    }

    #[test]
    fn latest_by_key__later_block_arrives_first__still_wins() {
        // given
        let events = vec![consumption(1, 2, 200, 0), consumption(1, 1, 150, 9)];

        // when
        let latest = latest_by_key(events);

        // then
        assert_eq!(latest[&TokenId::from(1)].block_number, 200);
    }

    fn arb_consumptions() -> impl Strategy<Value = Vec<ConsumeEvent>> {
        proptest::collection::vec((0u64..5, 0u64..50), 0..40).prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, (token, block))| consumption(token, i as u64, block, i as u64))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn latest_by_key__any_permutation__keeps_greatest_order(
            (events, shuffled) in arb_consumptions().prop_flat_map(|events| {
                (Just(events.clone()), Just(events).prop_shuffle())
            })
        ) {
            let mut expected: HashMap<TokenId, ConsumeEvent> = HashMap::new();
            for event in &events {
                let keep = expected
                    .get(&event.token_id)
                    .is_none_or(|current| event.order() > current.order());
                if keep {
                    expected.insert(event.token_id, event.clone());
                }
            }

            let actual = latest_by_key(shuffled);

            prop_assert_eq!(actual, expected);
        }
    }
}
