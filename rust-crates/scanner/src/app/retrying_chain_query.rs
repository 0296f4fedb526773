use crate::{
    app::chain_query::{
        ChainQuery,
        LiveReadError,
    },
    config::RetryPolicy,
    events::{
        ContractEventKind,
        LogFilter,
        TokenId,
    },
    records::VnftInfo,
};
use alloy::rpc::types::Log;

/// Retries block-number and log queries with exponential backoff. Live reads are
/// passed through untouched since their failures are already tolerated per token.
pub struct RetryingChainQuery<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C> RetryingChainQuery<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn with_retries<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut delay = self.policy.base_delay;
        let mut tries = 1;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) if tries < max_attempts => {
                    tracing::warn!(
                        "{operation} failed (attempt {tries}/{max_attempts}), retrying in {delay:?}: {e:#}"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    tries += 1;
                }
                Err(e) => {
                    return Err(e.context(format!(
                        "{operation} failed after {tries} attempts"
                    )));
                }
            }
        }
    }
}

impl<C: ChainQuery> ChainQuery for RetryingChainQuery<C> {
    async fn current_block_number(&self) -> anyhow::Result<u64> {
        let inner = &self.inner;
        self.with_retries("block number query", move || inner.current_block_number())
            .await
    }

    async fn past_logs(
        &self,
        event: ContractEventKind,
        filter: LogFilter,
        from_block: u64,
        to_block: u64,
    ) -> anyhow::Result<Vec<Log>> {
        let inner = &self.inner;
        self.with_retries(event.name(), move || {
            inner.past_logs(event, filter, from_block, to_block)
        })
        .await
    }

    async fn live_info(&self, token_id: TokenId) -> Result<VnftInfo, LiveReadError> {
        self.inner.live_info(token_id).await
    }
}
