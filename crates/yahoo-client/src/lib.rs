use async_trait::async_trait;
use chrono::DateTime;
use dashboard_core::{
    CompanyRecords, DashboardError, FinancialDataProvider, PricePoint, RawBalanceSheet,
    RawCashFlow, RawIncomeStatement,
};
use reqwest::Client;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://query1.finance.yahoo.com";

const QUOTE_SUMMARY_MODULES: &str = "summaryDetail,defaultKeyStatistics,\
incomeStatementHistory,balanceSheetHistory,cashflowStatementHistory";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            let wait_until = ts.front().unwrap().checked_add(self.window).unwrap();
            let sleep_dur = wait_until.duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!(
                "Rate limiter: waiting {:.1}s for Yahoo API slot",
                sleep_dur.as_secs_f64()
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Financial-data provider backed by the public Yahoo Finance endpoints:
/// quoteSummary for the statements and market cap, v8 chart for the
/// trailing 2-year adjusted-close series.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl YahooClient {
    pub fn new() -> Self {
        // Yahoo throttles unauthenticated clients aggressively; 60 req/min
        // keeps one dashboard per second comfortably inside the budget.
        let rate_limit: usize = std::env::var("YAHOO_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let base_url =
            std::env::var("YAHOO_BASE_URL").unwrap_or_else(|_| BASE_URL.to_string());

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; finboard/0.1)")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, DashboardError> {
        let request = builder
            .build()
            .map_err(|e| DashboardError::Api(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| DashboardError::Api("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| DashboardError::Api(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 15u64;
            tracing::warn!(
                "Yahoo 429 rate limited, waiting {}s before retry {}/3",
                wait_secs,
                attempt + 1
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(DashboardError::Api(
            "Rate limited by Yahoo after 3 retries".to_string(),
        ))
    }

    async fn get_quote_summary(&self, symbol: &str) -> Result<QuoteSummaryResult, DashboardError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol);

        let response = self
            .send_request(
                self.client
                    .get(&url)
                    .query(&[("modules", QUOTE_SUMMARY_MODULES)]),
            )
            .await?;

        if !response.status().is_success() {
            return Err(DashboardError::Api(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let envelope: QuoteSummaryEnvelope = response
            .json()
            .await
            .map_err(|e| DashboardError::Api(e.to_string()))?;

        envelope
            .quote_summary
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| DashboardError::Api(format!("no quote summary for {symbol}")))
    }

    /// Trailing ~2-year daily adjusted-close series.
    async fn get_price_history(&self, symbol: &str) -> Result<Vec<PricePoint>, DashboardError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let response = self
            .send_request(
                self.client
                    .get(&url)
                    .query(&[("range", "2y"), ("interval", "1d")]),
            )
            .await?;

        if !response.status().is_success() {
            return Err(DashboardError::Api(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let envelope: ChartEnvelope = response
            .json()
            .await
            .map_err(|e| DashboardError::Api(e.to_string()))?;

        let result = envelope
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| DashboardError::Api(format!("no price history for {symbol}")))?;

        Ok(price_points(result))
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FinancialDataProvider for YahooClient {
    async fn fetch_company(&self, symbol: &str) -> Result<CompanyRecords, DashboardError> {
        let (summary, prices) = tokio::join!(
            self.get_quote_summary(symbol),
            self.get_price_history(symbol),
        );

        records_from_summary(symbol, summary?, prices?)
    }
}

/// Assemble provider records from a parsed quote summary. Market cap and
/// fiscal year end must be present; statement fields stay optional here and
/// are validated later, at snapshot construction.
fn records_from_summary(
    symbol: &str,
    summary: QuoteSummaryResult,
    prices: Vec<PricePoint>,
) -> Result<CompanyRecords, DashboardError> {
    let market_cap = summary
        .summary_detail
        .as_ref()
        .and_then(|d| d.market_cap.as_ref())
        .and_then(|v| v.fmt.clone())
        .ok_or_else(|| DashboardError::Api(format!("no market cap for {symbol}")))?;

    let year_end = summary
        .default_key_statistics
        .as_ref()
        .and_then(|s| s.last_fiscal_year_end.as_ref())
        .and_then(|v| v.fmt.clone())
        .ok_or_else(|| DashboardError::Api(format!("no fiscal year end for {symbol}")))?;

    // Histories are ordered most recent first; the dashboard is a single
    // fiscal snapshot, so only the head entry is kept.
    let income = summary
        .income_statement_history
        .and_then(|h| h.income_statement_history.into_iter().next())
        .ok_or_else(|| DashboardError::Api(format!("no income statement for {symbol}")))?;

    let balance = summary
        .balance_sheet_history
        .and_then(|h| h.balance_sheet_statements.into_iter().next())
        .ok_or_else(|| DashboardError::Api(format!("no balance sheet for {symbol}")))?;

    let cash_flow = summary
        .cashflow_statement_history
        .and_then(|h| h.cashflow_statements.into_iter().next())
        .ok_or_else(|| DashboardError::Api(format!("no cash flow statement for {symbol}")))?;

    Ok(CompanyRecords {
        symbol: symbol.to_string(),
        market_cap,
        year_end,
        income: RawIncomeStatement {
            total_revenue: value(&income.total_revenue),
            gross_profit: value(&income.gross_profit),
            ebit: value(&income.ebit),
            interest_expense: value(&income.interest_expense),
            net_income: value(&income.net_income),
        },
        balance: RawBalanceSheet {
            total_assets: value(&balance.total_assets),
            total_current_assets: value(&balance.total_current_assets),
            total_current_liabilities: value(&balance.total_current_liabilities),
            short_long_term_debt: value(&balance.short_long_term_debt),
            long_term_debt: value(&balance.long_term_debt),
            cash: value(&balance.cash),
            inventory: value(&balance.inventory),
            net_receivables: value(&balance.net_receivables),
            accounts_payable: value(&balance.accounts_payable),
            total_stockholder_equity: value(&balance.total_stockholder_equity),
        },
        cash_flow: RawCashFlow {
            total_cash_from_operating_activities: value(
                &cash_flow.total_cash_from_operating_activities,
            ),
            total_cashflows_from_investing_activities: value(
                &cash_flow.total_cashflows_from_investing_activities,
            ),
            total_cash_from_financing_activities: value(
                &cash_flow.total_cash_from_financing_activities,
            ),
            capital_expenditures: value(&cash_flow.capital_expenditures),
        },
        prices,
    })
}

fn price_points(result: ChartResult) -> Vec<PricePoint> {
    let adj_close = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|series| series.adjclose)
        .unwrap_or_default();

    result
        .timestamp
        .into_iter()
        .zip(adj_close)
        .filter_map(|(ts, close)| {
            // Yahoo pads holidays with nulls; skip them.
            let close = close?;
            let date = DateTime::from_timestamp(ts, 0)?.date_naive();
            Some(PricePoint {
                date,
                adj_close: close,
            })
        })
        .collect()
}

fn value(field: &Option<WrappedValue>) -> Option<f64> {
    field.as_ref().and_then(|v| v.raw)
}

// --- Yahoo response shapes ---
//
// Yahoo wraps every figure as {"raw": 123.0, "fmt": "123"}; either half may
// be missing or null.

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct WrappedValue {
    raw: Option<f64>,
    fmt: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct QuoteSummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryBody,
}

#[derive(Debug, serde::Deserialize)]
struct QuoteSummaryBody {
    result: Option<Vec<QuoteSummaryResult>>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct QuoteSummaryResult {
    summary_detail: Option<SummaryDetail>,
    default_key_statistics: Option<KeyStatistics>,
    income_statement_history: Option<IncomeStatementHistory>,
    balance_sheet_history: Option<BalanceSheetHistory>,
    cashflow_statement_history: Option<CashflowStatementHistory>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummaryDetail {
    market_cap: Option<WrappedValue>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct KeyStatistics {
    last_fiscal_year_end: Option<WrappedValue>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct IncomeStatementHistory {
    income_statement_history: Vec<IncomeStatementEntry>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct IncomeStatementEntry {
    total_revenue: Option<WrappedValue>,
    gross_profit: Option<WrappedValue>,
    ebit: Option<WrappedValue>,
    interest_expense: Option<WrappedValue>,
    net_income: Option<WrappedValue>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct BalanceSheetHistory {
    balance_sheet_statements: Vec<BalanceSheetEntry>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct BalanceSheetEntry {
    total_assets: Option<WrappedValue>,
    total_current_assets: Option<WrappedValue>,
    total_current_liabilities: Option<WrappedValue>,
    short_long_term_debt: Option<WrappedValue>,
    long_term_debt: Option<WrappedValue>,
    cash: Option<WrappedValue>,
    inventory: Option<WrappedValue>,
    net_receivables: Option<WrappedValue>,
    accounts_payable: Option<WrappedValue>,
    total_stockholder_equity: Option<WrappedValue>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CashflowStatementHistory {
    cashflow_statements: Vec<CashflowEntry>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CashflowEntry {
    total_cash_from_operating_activities: Option<WrappedValue>,
    total_cashflows_from_investing_activities: Option<WrappedValue>,
    total_cash_from_financing_activities: Option<WrappedValue>,
    capital_expenditures: Option<WrappedValue>,
}

#[derive(Debug, serde::Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, serde::Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ChartResult {
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ChartIndicators {
    adjclose: Vec<AdjCloseSeries>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct AdjCloseSeries {
    adjclose: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTE_SUMMARY_FIXTURE: &str = r#"{
        "quoteSummary": {
            "result": [{
                "summaryDetail": {
                    "marketCap": {"raw": 1820000000000.0, "fmt": "1.82T"}
                },
                "defaultKeyStatistics": {
                    "lastFiscalYearEnd": {"raw": 1727654400, "fmt": "Sep 30, 2024"}
                },
                "incomeStatementHistory": {
                    "incomeStatementHistory": [
                        {
                            "totalRevenue": {"raw": 1000.0},
                            "grossProfit": {"raw": 400.0},
                            "ebit": {"raw": 200.0},
                            "interestExpense": {"raw": -50.0},
                            "netIncome": {"raw": 100.0}
                        },
                        {
                            "totalRevenue": {"raw": 900.0},
                            "grossProfit": {"raw": 350.0},
                            "ebit": {"raw": 180.0},
                            "interestExpense": {"raw": -55.0},
                            "netIncome": {"raw": 80.0}
                        }
                    ]
                },
                "balanceSheetHistory": {
                    "balanceSheetStatements": [{
                        "totalAssets": {"raw": 2000.0},
                        "totalCurrentAssets": {"raw": 500.0},
                        "totalCurrentLiabilities": {"raw": 250.0},
                        "longTermDebt": {"raw": 300.0},
                        "cash": {"raw": 100.0},
                        "netReceivables": {"raw": 80.0},
                        "accountsPayable": {"raw": 40.0},
                        "totalStockholderEquity": {"raw": 700.0}
                    }]
                },
                "cashflowStatementHistory": {
                    "cashflowStatements": [{
                        "totalCashFromOperatingActivities": {"raw": 220.0},
                        "totalCashflowsFromInvestingActivities": {"raw": -90.0},
                        "totalCashFromFinancingActivities": {"raw": -60.0},
                        "capitalExpenditures": {"raw": -70.0}
                    }]
                }
            }],
            "error": null
        }
    }"#;

    const CHART_FIXTURE: &str = r#"{
        "chart": {
            "result": [{
                "timestamp": [1704067200, 1704153600, 1704240000],
                "indicators": {
                    "adjclose": [{"adjclose": [185.5, null, 187.25]}]
                }
            }],
            "error": null
        }
    }"#;

    fn parsed_summary() -> QuoteSummaryResult {
        let envelope: QuoteSummaryEnvelope =
            serde_json::from_str(QUOTE_SUMMARY_FIXTURE).unwrap();
        envelope
            .quote_summary
            .result
            .unwrap()
            .into_iter()
            .next()
            .unwrap()
    }

    #[test]
    fn test_records_from_summary_takes_latest_annual_statement() {
        let records = records_from_summary("AAPL", parsed_summary(), Vec::new()).unwrap();

        assert_eq!(records.market_cap, "1.82T");
        assert_eq!(records.year_end, "Sep 30, 2024");
        // Head of the history, not the older entry.
        assert_eq!(records.income.total_revenue, Some(1000.0));
        assert_eq!(records.income.interest_expense, Some(-50.0));
        assert_eq!(records.balance.total_stockholder_equity, Some(700.0));
        assert_eq!(records.cash_flow.capital_expenditures, Some(-70.0));
    }

    #[test]
    fn test_optional_balance_fields_stay_none() {
        let records = records_from_summary("AAPL", parsed_summary(), Vec::new()).unwrap();

        // The fixture carries neither inventory nor short-term debt; both
        // must pass through as None, not fail the mapping.
        assert_eq!(records.balance.inventory, None);
        assert_eq!(records.balance.short_long_term_debt, None);
    }

    #[test]
    fn test_missing_market_cap_is_api_error() {
        let mut summary = parsed_summary();
        summary.summary_detail = None;

        assert!(matches!(
            records_from_summary("AAPL", summary, Vec::new()),
            Err(DashboardError::Api(_))
        ));
    }

    #[test]
    fn test_price_points_skip_null_closes() {
        let envelope: ChartEnvelope = serde_json::from_str(CHART_FIXTURE).unwrap();
        let result = envelope.chart.result.unwrap().into_iter().next().unwrap();

        let points = price_points(result);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date.to_string(), "2024-01-01");
        assert_eq!(points[0].adj_close, 185.5);
        assert_eq!(points[1].date.to_string(), "2024-01-03");
        assert_eq!(points[1].adj_close, 187.25);
    }
}
