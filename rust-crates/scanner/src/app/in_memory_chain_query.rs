use crate::{
    abi::IVnft,
    app::chain_query::{
        ChainQuery,
        LiveReadError,
    },
    events::{
        ContractEventKind,
        LogFilter,
        TokenId,
    },
    records::VnftInfo,
};
use alloy::{
    primitives::{
        Address,
        B256,
        U256,
        address,
        keccak256,
    },
    rpc::types::Log,
    sol_types::SolEvent,
};
use anyhow::anyhow;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
};

/// Address the in-memory contract emits from.
pub const IN_MEMORY_CONTRACT: Address = address!("c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0");

#[derive(Default)]
struct ChainState {
    head: u64,
    logs: Vec<Log>,
    infos: HashMap<TokenId, VnftInfo>,
    reverting: HashMap<TokenId, String>,
    live_reads: Vec<TokenId>,
    failing_queries: usize,
}

/// A chain held in memory, with a record of every live read it served.
#[derive(Clone, Default)]
pub struct InMemoryChain {
    state: Arc<Mutex<ChainState>>,
}

impl InMemoryChain {
    pub fn new(head: u64) -> Self {
        let chain = Self::default();
        chain.set_head(head);
        chain
    }

    pub fn set_head(&self, head: u64) {
        self.state.lock().unwrap().head = head;
    }

    pub fn push_log(&self, log: Log) {
        self.state.lock().unwrap().logs.push(log);
    }

    pub fn push_transfer(
        &self,
        token_id: TokenId,
        from: Address,
        to: Address,
        block_number: u64,
        log_index: u64,
    ) {
        self.push_log(transfer_log(token_id, from, to, block_number, log_index));
    }

    pub fn push_mint(&self, token_id: TokenId, to: Address, block_number: u64) {
        self.push_transfer(token_id, Address::ZERO, to, block_number, 0);
    }

    pub fn push_consumption(&self, token_id: TokenId, item_id: u64, block_number: u64) {
        self.push_log(consume_log(token_id, item_id, block_number, 1));
    }

    pub fn set_info(&self, token_id: TokenId, info: VnftInfo) {
        self.state.lock().unwrap().infos.insert(token_id, info);
    }

    /// Live reads of `token_id` revert from now on.
    pub fn set_reverting(&self, token_id: TokenId, reason: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .reverting
            .insert(token_id, reason.into());
    }

    /// The next `count` block-number or log queries fail.
    pub fn fail_next_queries(&self, count: usize) {
        self.state.lock().unwrap().failing_queries = count;
    }

    pub fn live_reads(&self) -> Vec<TokenId> {
        self.state.lock().unwrap().live_reads.clone()
    }

    fn take_query_failure(&self) -> anyhow::Result<()> {
        let mut guard = self.state.lock().unwrap();
        if guard.failing_queries > 0 {
            guard.failing_queries -= 1;
            return Err(anyhow!("in-memory chain unavailable"));
        }
        Ok(())
    }
}

impl ChainQuery for InMemoryChain {
    async fn current_block_number(&self) -> anyhow::Result<u64> {
        self.take_query_failure()?;
        Ok(self.state.lock().unwrap().head)
    }

    async fn past_logs(
        &self,
        event: ContractEventKind,
        filter: LogFilter,
        from_block: u64,
        to_block: u64,
    ) -> anyhow::Result<Vec<Log>> {
        self.take_query_failure()?;
        let signature = event.signature_hash();
        let guard = self.state.lock().unwrap();
        let logs = guard
            .logs
            .iter()
            .filter(|log| log.inner.data.topics().first() == Some(&signature))
            .filter(|log| {
                // logs without a block number are kept so callers see them
                log.block_number
                    .is_none_or(|block| (from_block..=to_block).contains(&block))
            })
            .filter(|log| matches_filter(event, filter, log))
            .cloned()
            .collect();
        Ok(logs)
    }

    async fn live_info(&self, token_id: TokenId) -> Result<VnftInfo, LiveReadError> {
        let mut guard = self.state.lock().unwrap();
        guard.live_reads.push(token_id);
        if let Some(reason) = guard.reverting.get(&token_id) {
            return Err(LiveReadError::Reverted {
                token_id,
                reason: reason.clone(),
            });
        }
        guard
            .infos
            .get(&token_id)
            .cloned()
            .ok_or(LiveReadError::NotFound(token_id))
    }
}

fn matches_filter(event: ContractEventKind, filter: LogFilter, log: &Log) -> bool {
    if event != ContractEventKind::Transfer {
        return true;
    }
    let topics = log.inner.data.topics();
    let topic_matches = |position: usize, expected: Option<Address>| match expected {
        Some(address) => topics.get(position) == Some(&address.into_word()),
        None => true,
    };
    topic_matches(1, filter.from) && topic_matches(2, filter.to)
}

fn synthetic_tx_hash(block_number: u64, log_index: u64) -> B256 {
    let mut seed = [0u8; 16];
    seed[..8].copy_from_slice(&block_number.to_be_bytes());
    seed[8..].copy_from_slice(&log_index.to_be_bytes());
    keccak256(seed)
}

fn contract_log<E: SolEvent>(event: &E, block_number: u64, log_index: u64) -> Log {
    Log {
        inner: alloy::primitives::Log {
            address: IN_MEMORY_CONTRACT,
            data: event.encode_log_data(),
        },
        block_number: Some(block_number),
        log_index: Some(log_index),
        transaction_hash: Some(synthetic_tx_hash(block_number, log_index)),
        ..Default::default()
    }
}

pub fn transfer_log(
    token_id: TokenId,
    from: Address,
    to: Address,
    block_number: u64,
    log_index: u64,
) -> Log {
    let event = IVnft::Transfer {
        from,
        to,
        tokenId: token_id.0,
    };
    contract_log(&event, block_number, log_index)
}

pub fn consume_log(
    token_id: TokenId,
    item_id: u64,
    block_number: u64,
    log_index: u64,
) -> Log {
    let event = IVnft::VnftConsumed {
        nftId: token_id.0,
        giver: Address::ZERO,
        itemId: U256::from(item_id),
    };
    contract_log(&event, block_number, log_index)
}
