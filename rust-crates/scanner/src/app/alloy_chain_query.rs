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
        U256,
    },
    providers::{
        DynProvider,
        Provider,
        ProviderBuilder,
    },
    rpc::types::{
        BlockNumberOrTag,
        Filter,
        Log,
    },
};
use anyhow::Context;
use url::Url;

/// Blocks per `eth_getLogs` request. Public RPC nodes reject wider ranges.
pub const LOG_QUERY_CHUNK_SIZE: u64 = 5000;

/// Ethereum JSON-RPC client for the vNFT contract.
pub struct AlloyChainQuery {
    provider: DynProvider,
    contract: IVnft::IVnftInstance<DynProvider>,
    contract_address: Address,
    chunk_size: u64,
}

impl AlloyChainQuery {
    pub fn connect(rpc_url: Url, contract_address: Address) -> Self {
        tracing::info!("connecting to {rpc_url} for contract {contract_address}");
        let provider = ProviderBuilder::new().connect_http(rpc_url).erased();
        let contract = IVnft::new(contract_address, provider.clone());
        Self {
            provider,
            contract,
            contract_address,
            chunk_size: LOG_QUERY_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn filter(&self, event: ContractEventKind, filter: LogFilter) -> Filter {
        let mut query = Filter::new()
            .address(self.contract_address)
            .event_signature(event.signature_hash());
        if event == ContractEventKind::Transfer {
            if let Some(from) = filter.from {
                query = query.topic1(from.into_word());
            }
            if let Some(to) = filter.to {
                query = query.topic2(to.into_word());
            }
        }
        query
    }
}

impl ChainQuery for AlloyChainQuery {
    async fn current_block_number(&self) -> anyhow::Result<u64> {
        self.provider
            .get_block_number()
            .await
            .context("eth_blockNumber")
    }

    async fn past_logs(
        &self,
        event: ContractEventKind,
        filter: LogFilter,
        from_block: u64,
        to_block: u64,
    ) -> anyhow::Result<Vec<Log>> {
        let filter = self.filter(event, filter);
        let mut logs = Vec::new();
        let mut current_from = from_block;
        while current_from <= to_block {
            let current_to = current_from
                .saturating_add(self.chunk_size - 1)
                .min(to_block);
            let chunk_filter = filter
                .clone()
                .from_block(BlockNumberOrTag::Number(current_from))
                .to_block(BlockNumberOrTag::Number(current_to));
            let chunk = self.provider.get_logs(&chunk_filter).await.with_context(|| {
                format!(
                    "eth_getLogs for {} in blocks {current_from}..={current_to}",
                    event.name()
                )
            })?;
            tracing::debug!(
                "{} {} logs in blocks {current_from}..={current_to}",
                chunk.len(),
                event.name()
            );
            logs.extend(chunk);
            if current_to == u64::MAX {
                break;
            }
            current_from = current_to + 1;
        }
        Ok(logs)
    }

    async fn live_info(&self, token_id: TokenId) -> Result<VnftInfo, LiveReadError> {
        let info = self
            .contract
            .getVnftInfo(token_id.0)
            .call()
            .await
            .map_err(|e| LiveReadError::Reverted {
                token_id,
                reason: e.to_string(),
            })?;
        Ok(VnftInfo {
            owner: info._owner,
            level: saturating_u64(info._level),
            time_until_starving: saturating_instant(info._timeUntilStarving),
            score: saturating_u64(info._score),
            last_time_mined: saturating_instant(info._lastTimeMined),
            expected_reward: info._expectedReward,
        })
    }
}

fn saturating_u64(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

fn saturating_instant(value: U256) -> i64 {
    i64::try_from(saturating_u64(value)).unwrap_or(i64::MAX)
}
