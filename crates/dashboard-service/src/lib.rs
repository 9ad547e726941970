use dashboard_core::{
    normalize_magnitude, DashboardError, DashboardResult, FinancialDataProvider,
    FinancialSnapshot,
};
use ratio_engine::RatioEngine;
use std::sync::Arc;

/// Request handler for one dashboard query: fetch, normalize, compute,
/// assemble. One snapshot per query, owned by the query, no caching.
pub struct DashboardService {
    provider: Arc<dyn FinancialDataProvider>,
    engine: RatioEngine,
}

impl DashboardService {
    pub fn new(provider: Arc<dyn FinancialDataProvider>) -> Self {
        Self {
            provider,
            engine: RatioEngine::new(),
        }
    }

    pub async fn compute_dashboard(&self, ticker: &str) -> Result<DashboardResult, DashboardError> {
        let symbol = ticker.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(DashboardError::Api("ticker must not be empty".to_string()));
        }

        tracing::info!("Computing dashboard for {}", symbol);

        let records = self.provider.fetch_company(&symbol).await?;
        let market_cap = normalize_magnitude(&records.market_cap)?;
        let snapshot = FinancialSnapshot::assemble(records, market_cap)?;

        let overview = self.engine.overview(&snapshot);
        let profitability = self.engine.profitability(&snapshot);
        let liquidity = self.engine.liquidity(&snapshot);
        let leverage = self.engine.leverage(&snapshot);
        let efficiency = self.engine.efficiency(&snapshot);

        tracing::info!(
            "Dashboard ready for {} (fiscal year end {})",
            symbol,
            snapshot.year_end
        );

        Ok(DashboardResult {
            symbol,
            year_end: snapshot.year_end,
            prices: snapshot.prices,
            overview,
            profitability,
            liquidity,
            leverage,
            efficiency,
        })
    }
}
