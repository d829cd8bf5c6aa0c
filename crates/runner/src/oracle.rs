//! Price feed reads

use std::sync::Arc;

use borrowflow_types::{Address, Amount, BorrowflowError, BorrowflowResult, LedgerQuery, PriceQuote};
use tracing::info;

use crate::gateway::{read_decimals, LedgerGateway};

/// Reads Chainlink-style aggregator feeds
pub struct PriceOracle {
    gateway: Arc<dyn LedgerGateway>,
}

impl PriceOracle {
    pub fn new(gateway: Arc<dyn LedgerGateway>) -> Self {
        Self { gateway }
    }

    /// Latest answer of `feed`, tagged with the feed's own precision
    pub async fn latest_price(&self, feed: &Address) -> BorrowflowResult<PriceQuote> {
        let decimals = read_decimals(self.gateway.as_ref(), feed).await?;
        let round = self
            .gateway
            .read_state(feed, LedgerQuery::LatestRoundData)
            .await?
            .into_round()?;

        if round.round_id == 0 {
            return Err(BorrowflowError::ledger_unavailable(&format!(
                "feed {} has no completed round",
                feed
            )));
        }

        let answer = Amount::new(round.answer, decimals);
        info!("Price from feed {} is {} (round {})", feed, answer, round.round_id);

        Ok(PriceQuote {
            feed: *feed,
            round_id: round.round_id,
            answer,
        })
    }
}
