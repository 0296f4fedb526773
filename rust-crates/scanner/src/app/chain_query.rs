use crate::{
    events::{
        ContractEventKind,
        LogFilter,
        TokenId,
    },
    records::VnftInfo,
};
use alloy::rpc::types::Log;

/// Failure of a single live read. Never fatal to a scan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiveReadError {
    #[error("token {0} does not exist")]
    NotFound(TokenId),
    #[error("live read of token {token_id} reverted: {reason}")]
    Reverted { token_id: TokenId, reason: String },
}

pub trait ChainQuery {
    fn current_block_number(&self) -> impl Future<Output = anyhow::Result<u64>>;

    /// Logs of `event` emitted by the contract in `[from_block, to_block]`.
    fn past_logs(
        &self,
        event: ContractEventKind,
        filter: LogFilter,
        from_block: u64,
        to_block: u64,
    ) -> impl Future<Output = anyhow::Result<Vec<Log>>>;

    fn live_info(
        &self,
        token_id: TokenId,
    ) -> impl Future<Output = Result<VnftInfo, LiveReadError>>;
}
