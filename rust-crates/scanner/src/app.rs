use crate::{
    Result,
    app::{
        chain_query::ChainQuery,
        query_api::{
            Query,
            QueryAPI,
        },
        scanner::{
            Clock,
            Scanner,
            Session,
            SystemClock,
        },
    },
};

pub mod actix_query_api;
pub mod alloy_chain_query;
pub mod chain_query;
pub mod dedup;
pub mod in_memory_chain_query;
pub mod ownership;
pub mod query_api;
pub mod ranking;
pub mod retrying_chain_query;
pub mod risk;
pub mod scanner;
pub mod single_flight;
pub mod staleness;


pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Continue,
    Exit,
}

/// Serves scan queries against one chain client until interrupted.
pub struct App<Chain, API, K = SystemClock> {
    chain: Chain,
    api: API,
    scanner: Scanner<K>,
}

impl<Chain, API, K> App<Chain, API, K> {
    pub fn new(chain: Chain, api: API, scanner: Scanner<K>) -> Self {
        Self {
            chain,
            api,
            scanner,
        }
    }
}

impl<Chain: ChainQuery, API: QueryAPI, K: Clock> App<Chain, API, K> {
    /// Waits for the next query and answers it. Queries are answered one at a time.
    pub async fn run(
        &mut self,
        interrupt: impl Future<Output = ()>,
    ) -> Result<RunState> {
        let query = tokio::select! {
            _ = interrupt => return Ok(RunState::Exit),
            query = self.api.query() => query,
        };
        match query {
            Ok(query) => {
                self.handle_query(query).await;
                Ok(RunState::Continue)
            }
            Err(e) => {
                tracing::error!("query API stopped: {e:#}");
                Ok(RunState::Exit)
            }
        }
    }

    async fn handle_query(&self, query: Query) {
        match query {
            Query::OwnedRecords {
                account,
                respond_to,
            } => {
                tracing::info!("scanning tokens owned by {account}");
                let session = Session::new(&self.chain).with_account(account);
                let outcome = self.scanner.owned_records(&session).await;
                if respond_to.send(outcome).is_err() {
                    tracing::warn!("owned records requester went away");
                }
            }
            Query::MarketRisk { respond_to } => {
                tracing::info!("scanning market");
                let session = Session::new(&self.chain);
                let outcome = self.scanner.market_risk(&session).await;
                if respond_to.send(outcome).is_err() {
                    tracing::warn!("market risk requester went away");
                }
            }
        }
    }
}
