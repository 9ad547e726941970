use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{format_thousands, DashboardError};

/// Daily adjusted-close observation for the price chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub adj_close: f64,
}

/// Latest annual income statement as reported by the provider.
///
/// Every field is optional here; requiredness is decided in one place, at
/// snapshot construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawIncomeStatement {
    pub total_revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub ebit: Option<f64>,
    pub interest_expense: Option<f64>,
    pub net_income: Option<f64>,
}

/// Latest annual balance sheet as reported by the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBalanceSheet {
    pub total_assets: Option<f64>,
    pub total_current_assets: Option<f64>,
    pub total_current_liabilities: Option<f64>,
    pub short_long_term_debt: Option<f64>,
    pub long_term_debt: Option<f64>,
    pub cash: Option<f64>,
    pub inventory: Option<f64>,
    pub net_receivables: Option<f64>,
    pub accounts_payable: Option<f64>,
    pub total_stockholder_equity: Option<f64>,
}

/// Latest annual cash flow statement as reported by the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCashFlow {
    pub total_cash_from_operating_activities: Option<f64>,
    pub total_cashflows_from_investing_activities: Option<f64>,
    pub total_cash_from_financing_activities: Option<f64>,
    pub capital_expenditures: Option<f64>,
}

/// Everything the data provider hands over for one ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRecords {
    pub symbol: String,
    /// Abbreviated magnitude string, e.g. "1.82T".
    pub market_cap: String,
    /// Fiscal year-end display label.
    pub year_end: String,
    pub income: RawIncomeStatement,
    pub balance: RawBalanceSheet,
    pub cash_flow: RawCashFlow,
    pub prices: Vec<PricePoint>,
}

/// One fiscal snapshot of a company, normalized and with derived figures
/// filled in. Built once per query, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub symbol: String,
    pub year_end: String,
    pub prices: Vec<PricePoint>,

    // Income statement
    pub sales: f64,
    pub gross_profit: f64,
    pub ebit: f64,
    /// Interest expense stored as a positive magnitude (raw figure is negative).
    pub interest: f64,
    pub net_income: f64,

    // Balance sheet
    pub total_assets: f64,
    pub current_assets: f64,
    pub current_liabilities: f64,
    pub cash: f64,
    /// Absent for most service companies. Ratios that need it degrade to 0.
    pub inventory: Option<f64>,
    pub receivables: f64,
    pub payables: f64,
    pub equity: f64,

    // Cash flow statement
    pub operating_cf: f64,
    pub investing_cf: f64,
    pub financing_cf: f64,
    /// Capex stored as a positive magnitude (raw figure is negative).
    pub capex: f64,

    // Derived
    pub market_cap: i64,
    pub working_capital: f64,
    pub debt: f64,
    pub net_debt: f64,
    /// Kept as a float: ratios divide the full value, only the display row
    /// truncates to a whole amount.
    pub enterprise_value: f64,
    pub free_cash_flow: f64,
}

impl FinancialSnapshot {
    /// Build a snapshot from raw provider records and an already-normalized
    /// market cap.
    ///
    /// Any required field that is absent fails the whole query with
    /// `MissingField`. The only optional statement fields are inventory and
    /// the short-term debt component: inventory stays `None`, short-term
    /// debt falls back to zero so that `debt` is long-term debt alone.
    pub fn assemble(records: CompanyRecords, market_cap: i64) -> Result<Self, DashboardError> {
        fn required(value: Option<f64>, name: &'static str) -> Result<f64, DashboardError> {
            value.ok_or(DashboardError::MissingField(name))
        }

        let income = &records.income;
        let balance = &records.balance;
        let cash_flow = &records.cash_flow;

        let sales = required(income.total_revenue, "totalRevenue")?;
        let gross_profit = required(income.gross_profit, "grossProfit")?;
        let ebit = required(income.ebit, "ebit")?;
        let interest = -required(income.interest_expense, "interestExpense")?;
        let net_income = required(income.net_income, "netIncome")?;

        let total_assets = required(balance.total_assets, "totalAssets")?;
        let current_assets = required(balance.total_current_assets, "totalCurrentAssets")?;
        let current_liabilities =
            required(balance.total_current_liabilities, "totalCurrentLiabilities")?;
        let long_term_debt = required(balance.long_term_debt, "longTermDebt")?;
        let cash = required(balance.cash, "cash")?;
        let receivables = required(balance.net_receivables, "netReceivables")?;
        let payables = required(balance.accounts_payable, "accountsPayable")?;
        let equity = required(balance.total_stockholder_equity, "totalStockholderEquity")?;

        let operating_cf = required(
            cash_flow.total_cash_from_operating_activities,
            "totalCashFromOperatingActivities",
        )?;
        let investing_cf = required(
            cash_flow.total_cashflows_from_investing_activities,
            "totalCashflowsFromInvestingActivities",
        )?;
        let financing_cf = required(
            cash_flow.total_cash_from_financing_activities,
            "totalCashFromFinancingActivities",
        )?;
        let capex = -required(cash_flow.capital_expenditures, "capitalExpenditures")?;

        let working_capital = current_assets - current_liabilities;
        let debt = balance.short_long_term_debt.unwrap_or(0.0) + long_term_debt;
        let net_debt = debt - cash;
        let enterprise_value = market_cap as f64 + net_debt;
        let free_cash_flow = operating_cf - capex;

        Ok(Self {
            symbol: records.symbol,
            year_end: records.year_end,
            prices: records.prices,
            sales,
            gross_profit,
            ebit,
            interest,
            net_income,
            total_assets,
            current_assets,
            current_liabilities,
            cash,
            inventory: balance.inventory,
            receivables,
            payables,
            equity,
            operating_cf,
            investing_cf,
            financing_cf,
            capex,
            market_cap,
            working_capital,
            debt,
            net_debt,
            enterprise_value,
            free_cash_flow,
        })
    }
}

/// A single table cell in a ratio group.
///
/// `Undefined` is the recovered form of a zero denominator: it degrades the
/// one affected ratio and is rendered as "NaN", never surfaced as an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    /// An absolute currency amount, displayed with thousands separators.
    Amount(i64),
    Ratio(f64),
    Undefined,
}

impl MetricValue {
    /// Checked division: a zero denominator yields `Undefined` instead of
    /// panicking or returning an error.
    pub fn from_quotient(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            MetricValue::Undefined
        } else {
            MetricValue::Ratio(numerator / denominator)
        }
    }

    pub fn as_ratio(&self) -> Option<f64> {
        match self {
            MetricValue::Ratio(r) => Some(*r),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Amount(n) => write!(f, "{}", format_thousands(*n)),
            MetricValue::Ratio(r) => write!(f, "{r}"),
            MetricValue::Undefined => write!(f, "NaN"),
        }
    }
}

/// One labelled row of a ratio table.
#[derive(Debug, Clone, Serialize)]
pub struct RatioRow {
    pub label: &'static str,
    pub value: MetricValue,
}

/// A named, ordered group of ratio rows.
#[derive(Debug, Clone, Serialize)]
pub struct RatioGroup {
    pub name: &'static str,
    pub rows: Vec<RatioRow>,
}

/// The full dashboard for one ticker: five ratio groups plus the raw price
/// series for charting.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardResult {
    pub symbol: String,
    pub year_end: String,
    pub prices: Vec<PricePoint>,
    pub overview: RatioGroup,
    pub profitability: RatioGroup,
    pub liquidity: RatioGroup,
    pub leverage: RatioGroup,
    pub efficiency: RatioGroup,
}
