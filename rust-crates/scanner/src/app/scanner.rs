use crate::{
    Error,
    Result,
    app::{
        chain_query::ChainQuery,
        dedup::latest_by_key,
        ownership::resolve_owned,
        ranking,
        risk::classify_market,
        single_flight::{
            ScanKind,
            SingleFlight,
        },
        staleness::StalenessEstimator,
    },
    config::ScanConfig,
    events::{
        ContractEventKind,
        KeyedEvent,
        LogFilter,
        decode_consumptions,
        decode_transfers,
    },
    records::{
        DerivedTokenRecord,
        MarketRisk,
        OwnedDashboard,
    },
};
use alloy::primitives::Address;

pub trait Clock {
    /// Current unix time in seconds.
    fn now(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

/// What a front end hands to every scan: a connected chain and, once a wallet is
/// connected, the account.
#[derive(Debug)]
pub struct Session<'a, C> {
    pub chain: &'a C,
    pub account: Option<Address>,
}

impl<'a, C> Session<'a, C> {
    pub fn new(chain: &'a C) -> Self {
        Self {
            chain,
            account: None,
        }
    }

    pub fn with_account(mut self, account: Address) -> Self {
        self.account = Some(account);
        self
    }
}

pub struct Scanner<K = SystemClock> {
    config: ScanConfig,
    clock: K,
    owned_flight: SingleFlight,
    market_flight: SingleFlight,
}

impl Scanner<SystemClock> {
    pub fn new(config: ScanConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<K> Scanner<K> {
    pub fn with_clock(config: ScanConfig, clock: K) -> Self {
        Self {
            config,
            clock,
            owned_flight: SingleFlight::new(ScanKind::Owned),
            market_flight: SingleFlight::new(ScanKind::Market),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }
}

impl<K: Clock> Scanner<K> {
    /// Dashboard of every token the session account holds at the chain head.
    pub async fn owned_records<C: ChainQuery>(
        &self,
        session: &Session<'_, C>,
    ) -> Result<OwnedDashboard> {
        let account = session.account.ok_or(Error::NoAccount)?;
        let _flight = self.owned_flight.try_begin()?;
        let chain = session.chain;

        let head = current_block(chain).await?;
        let logs = chain
            .past_logs(
                ContractEventKind::Transfer,
                LogFilter::sent_to(account),
                self.config.creation_block,
                head,
            )
            .await
            .map_err(|e| Error::upstream("incoming transfer query", e))?;
        let transfers = decode_transfers(&logs)?;

        let owned = resolve_owned(chain, account, &transfers).await;
        let now = self.clock.now();
        let records = owned
            .iter()
            .map(|(token_id, info)| DerivedTokenRecord::from_live(*token_id, info, now))
            .collect();
        let dashboard = ranking::owned_dashboard(records);
        tracing::info!(
            "{account} owns {} tokens at block {head}",
            dashboard.total_owned
        );
        Ok(dashboard)
    }

    /// Classify every minted token, spending live reads only near expiry.
    pub async fn market_risk<C: ChainQuery>(
        &self,
        session: &Session<'_, C>,
    ) -> Result<MarketRisk> {
        let _flight = self.market_flight.try_begin()?;
        let chain = session.chain;

        let head = current_block(chain).await?;
        let now = self.clock.now();
        let mint_logs = chain
            .past_logs(
                ContractEventKind::Transfer,
                LogFilter::sent_from(Address::ZERO),
                self.config.creation_block,
                head,
            )
            .await
            .map_err(|e| Error::upstream("mint query", e))?;
        let consume_logs = chain
            .past_logs(
                ContractEventKind::VnftConsumed,
                LogFilter::any(),
                self.config.creation_block,
                head,
            )
            .await
            .map_err(|e| Error::upstream("consumption query", e))?;

        let minted = decode_transfers(&mint_logs)?
            .into_iter()
            .filter(|transfer| transfer.is_mint());
        let mut mints = latest_by_key(minted).into_values().collect::<Vec<_>>();
        mints.sort_by_key(|mint| mint.order());
        let consumptions = latest_by_key(decode_consumptions(&consume_logs)?);
        tracing::info!(
            "{} mints and {} fed tokens up to block {head}",
            mints.len(),
            consumptions.len()
        );

        let estimator = StalenessEstimator::new(head, self.config.avg_block_secs);
        let classification =
            classify_market(chain, &self.config, &mints, &consumptions, &estimator, now)
                .await;
        let report = ranking::market_report(mints.len(), consumptions.len(), classification);
        tracing::info!(
            "market summary: {} minted, {} fed, {} dying soon, {} live reads",
            report.total_minted,
            report.total_consumed,
            report.total_dying_soon(),
            report.live_reads
        );
        Ok(report)
    }
}

async fn current_block<C: ChainQuery>(chain: &C) -> Result<u64> {
    chain
        .current_block_number()
        .await
        .map_err(|e| Error::upstream("block number query", e))
}
