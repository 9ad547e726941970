use crate::{CompanyRecords, DashboardError};
use async_trait::async_trait;

/// External financial-data collaborator. Owns network fetch, retry, and
/// rate-limit handling; the core only sees the assembled records.
#[async_trait]
pub trait FinancialDataProvider: Send + Sync {
    async fn fetch_company(&self, symbol: &str) -> Result<CompanyRecords, DashboardError>;
}
