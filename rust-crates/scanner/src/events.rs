use crate::{
    Error,
    Result,
    abi::IVnft,
};
use alloy::{
    primitives::{
        Address,
        B256,
        U256,
    },
    rpc::types::Log,
    sol_types::SolEvent,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

#[derive(
    PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Copy, Clone, Serialize, Deserialize,
)]
pub struct TokenId(pub U256);

impl From<u64> for TokenId {
    fn from(value: u64) -> Self {
        TokenId(U256::from(value))
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a log in the chain: block first, then the index inside the block.
#[derive(
    PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Copy, Clone, Default, Serialize, Deserialize,
)]
pub struct EventOrder {
    pub block_number: u64,
    pub log_index: u64,
}

impl EventOrder {
    pub fn new(block_number: u64, log_index: u64) -> Self {
        Self {
            block_number,
            log_index,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Copy, Clone, Serialize, Deserialize)]
pub enum ContractEventKind {
    Transfer,
    VnftConsumed,
}

impl ContractEventKind {
    pub fn name(self) -> &'static str {
        match self {
            ContractEventKind::Transfer => "Transfer",
            ContractEventKind::VnftConsumed => "VnftConsumed",
        }
    }

    pub fn signature_hash(self) -> B256 {
        match self {
            ContractEventKind::Transfer => IVnft::Transfer::SIGNATURE_HASH,
            ContractEventKind::VnftConsumed => IVnft::VnftConsumed::SIGNATURE_HASH,
        }
    }
}

/// Topic filter for historical log queries. Only `Transfer` has indexed addresses;
/// the filter is ignored for other events.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Default)]
pub struct LogFilter {
    pub from: Option<Address>,
    pub to: Option<Address>,
}

impl LogFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn sent_from(from: Address) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    pub fn sent_to(to: Address) -> Self {
        Self {
            from: None,
            to: Some(to),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct TransferEvent {
    pub token_id: TokenId,
    pub from: Address,
    pub to: Address,
    pub block_number: u64,
    pub log_index: u64,
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct ConsumeEvent {
    pub token_id: TokenId,
    pub item_id: U256,
    pub giver: Address,
    pub block_number: u64,
    pub log_index: u64,
    pub transaction_hash: B256,
}

/// An event that belongs to one entity and has a place in emission order.
pub trait KeyedEvent {
    type Key: Eq + std::hash::Hash + Copy;

    fn key(&self) -> Self::Key;

    fn order(&self) -> EventOrder;
}

impl KeyedEvent for TransferEvent {
    type Key = TokenId;

    fn key(&self) -> TokenId {
        self.token_id
    }

    fn order(&self) -> EventOrder {
        EventOrder::new(self.block_number, self.log_index)
    }
}

impl KeyedEvent for ConsumeEvent {
    type Key = TokenId;

    fn key(&self) -> TokenId {
        self.token_id
    }

    fn order(&self) -> EventOrder {
        EventOrder::new(self.block_number, self.log_index)
    }
}

impl TransferEvent {
    pub fn is_mint(&self) -> bool {
        self.from == Address::ZERO
    }

    pub fn from_log(log: &Log) -> Result<Self> {
        const EVENT: &str = "Transfer";
        let (block_number, log_index) = required_position(EVENT, log)?;
        let decoded = log
            .log_decode::<IVnft::Transfer>()
            .map_err(|e| Error::malformed(EVENT, e.to_string()))?;
        let event = decoded.inner.data;
        Ok(Self {
            token_id: TokenId(event.tokenId),
            from: event.from,
            to: event.to,
            block_number,
            log_index,
        })
    }
}

impl ConsumeEvent {
    pub fn from_log(log: &Log) -> Result<Self> {
        const EVENT: &str = "VnftConsumed";
        let (block_number, log_index) = required_position(EVENT, log)?;
        let transaction_hash = log
            .transaction_hash
            .ok_or_else(|| Error::malformed(EVENT, "missing transaction hash"))?;
        let decoded = log
            .log_decode::<IVnft::VnftConsumed>()
            .map_err(|e| Error::malformed(EVENT, e.to_string()))?;
        let event = decoded.inner.data;
        Ok(Self {
            token_id: TokenId(event.nftId),
            item_id: event.itemId,
            giver: event.giver,
            block_number,
            log_index,
            transaction_hash,
        })
    }
}

fn required_position(event: &'static str, log: &Log) -> Result<(u64, u64)> {
    let block_number = log
        .block_number
        .ok_or_else(|| Error::malformed(event, "missing block number"))?;
    let log_index = log
        .log_index
        .ok_or_else(|| Error::malformed(event, "missing log index"))?;
    Ok((block_number, log_index))
}

/// Decode every log, failing the whole batch on the first malformed one.
pub fn decode_transfers(logs: &[Log]) -> Result<Vec<TransferEvent>> {
    logs.iter().map(TransferEvent::from_log).collect()
}

pub fn decode_consumptions(logs: &[Log]) -> Result<Vec<ConsumeEvent>> {
    logs.iter().map(ConsumeEvent::from_log).collect()
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::app::in_memory_chain_query::{
        consume_log,
        transfer_log,
    };

    #[test]
    fn from_log__transfer_log__decodes_indexed_fields() {
        // given
        let to = Address::repeat_byte(0x11);
        let log = transfer_log(TokenId::from(7), Address::ZERO, to, 120, 3);

        // when
        let event = TransferEvent::from_log(&log).unwrap();

        // then
        let expected = TransferEvent {
            token_id: TokenId::from(7),
            from: Address::ZERO,
            to,
            block_number: 120,
            log_index: 3,
        };
        assert_eq!(event, expected);
        assert!(event.is_mint());
    }

    #[test]
    fn from_log__consume_log__decodes_item_and_position() {
        // given
        let log = consume_log(TokenId::from(9), 4, 300, 1);

        // when
        let event = ConsumeEvent::from_log(&log).unwrap();

        // then
        assert_eq!(event.token_id, TokenId::from(9));
        assert_eq!(event.item_id, U256::from(4));
        assert_eq!(event.order(), EventOrder::new(300, 1));
        assert_eq!(Some(event.transaction_hash), log.transaction_hash);
    }

    #[test]
    fn from_log__missing_block_number__is_malformed() {
        // given
        let mut log = transfer_log(TokenId::from(1), Address::ZERO, Address::ZERO, 5, 0);
        log.block_number = None;

        // when
        let err = TransferEvent::from_log(&log).unwrap_err();

        // then
        assert!(err.is_upstream());
        assert!(matches!(err, Error::MalformedEvent { event: "Transfer", .. }));
    }

    #[test]
    fn from_log__consume_without_transaction_hash__is_malformed() {
        // given
        let mut log = consume_log(TokenId::from(1), 1, 5, 0);
        log.transaction_hash = None;

        // when
        let err = ConsumeEvent::from_log(&log).unwrap_err();

        // then
        assert!(matches!(
            err,
            Error::MalformedEvent {
                event: "VnftConsumed",
                ..
            }
        ));
    }

    #[test]
    fn from_log__transfer_log_read_as_consumption__is_malformed() {
        // given
        let log = transfer_log(TokenId::from(1), Address::ZERO, Address::ZERO, 5, 0);

        // when
        let result = ConsumeEvent::from_log(&log);

        // then
        assert!(result.is_err());
    }

    #[test]
    fn ordering__same_block__compares_log_index() {
        assert!(EventOrder::new(10, 2) > EventOrder::new(10, 1));
        assert!(EventOrder::new(11, 0) > EventOrder::new(10, 99));
    }
}
