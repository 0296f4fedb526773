use crate::records::{
    MarketRisk,
    OwnedDashboard,
};
use alloy::primitives::Address;
use tokio::sync::oneshot;

pub trait QueryAPI {
    fn query(&mut self) -> impl Future<Output = anyhow::Result<Query>>;
}

#[derive(Debug)]
pub enum Query {
    OwnedRecords {
        account: Address,
        respond_to: oneshot::Sender<crate::Result<OwnedDashboard>>,
    },
    MarketRisk {
        respond_to: oneshot::Sender<crate::Result<MarketRisk>>,
    },
}
