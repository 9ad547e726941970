use dashboard_core::{FinancialSnapshot, MetricValue, RatioGroup, RatioRow};

/// Stateless computation of the five ratio groups over one snapshot.
///
/// The groups are independent: none reads another's output, only the base
/// snapshot, so evaluation order never matters.
pub struct RatioEngine;

impl RatioEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn overview(&self, snapshot: &FinancialSnapshot) -> RatioGroup {
        RatioGroup {
            name: "Company overview",
            rows: vec![
                RatioRow {
                    label: "Enterprise value",
                    // Truncated to a whole amount for display only.
                    value: MetricValue::Amount(snapshot.enterprise_value as i64),
                },
                RatioRow {
                    label: "Market cap",
                    value: MetricValue::Amount(snapshot.market_cap),
                },
                RatioRow {
                    label: "EV/sales ratio",
                    value: MetricValue::from_quotient(snapshot.enterprise_value, snapshot.sales),
                },
                RatioRow {
                    label: "P/E ratio",
                    value: MetricValue::from_quotient(
                        snapshot.market_cap as f64,
                        snapshot.net_income,
                    ),
                },
            ],
        }
    }

    pub fn profitability(&self, snapshot: &FinancialSnapshot) -> RatioGroup {
        RatioGroup {
            name: "Profit margins",
            rows: vec![
                RatioRow {
                    label: "Gross margin",
                    value: MetricValue::from_quotient(snapshot.gross_profit, snapshot.sales),
                },
                RatioRow {
                    label: "Operating margin",
                    value: MetricValue::from_quotient(snapshot.ebit, snapshot.sales),
                },
                RatioRow {
                    label: "Net margin",
                    value: MetricValue::from_quotient(snapshot.net_income, snapshot.sales),
                },
            ],
        }
    }

    pub fn liquidity(&self, snapshot: &FinancialSnapshot) -> RatioGroup {
        // Quick ratio needs inventory; without it the row degrades to the 0
        // sentinel rather than erroring (common for service companies).
        let quick_ratio = match snapshot.inventory {
            Some(inventory) => MetricValue::from_quotient(
                snapshot.current_assets - inventory,
                snapshot.current_liabilities,
            ),
            None => MetricValue::Ratio(0.0),
        };

        RatioGroup {
            name: "Liquidity ratios",
            rows: vec![
                RatioRow {
                    label: "Current ratio",
                    value: MetricValue::from_quotient(
                        snapshot.current_assets,
                        snapshot.current_liabilities,
                    ),
                },
                RatioRow {
                    label: "Quick ratio",
                    value: quick_ratio,
                },
                RatioRow {
                    label: "Cash ratio",
                    value: MetricValue::from_quotient(snapshot.cash, snapshot.current_liabilities),
                },
            ],
        }
    }

    pub fn leverage(&self, snapshot: &FinancialSnapshot) -> RatioGroup {
        RatioGroup {
            name: "Leverage ratios",
            rows: vec![
                RatioRow {
                    label: "Debt/total assets ratio",
                    value: MetricValue::from_quotient(snapshot.debt, snapshot.total_assets),
                },
                RatioRow {
                    label: "Debt/equity ratio",
                    value: MetricValue::from_quotient(snapshot.debt, snapshot.equity),
                },
                RatioRow {
                    label: "Interest coverage ratio",
                    value: MetricValue::from_quotient(snapshot.ebit, snapshot.interest),
                },
            ],
        }
    }

    pub fn efficiency(&self, snapshot: &FinancialSnapshot) -> RatioGroup {
        let inventory_turnover = match snapshot.inventory {
            Some(inventory) => MetricValue::from_quotient(
                snapshot.sales - snapshot.gross_profit,
                inventory,
            ),
            None => MetricValue::Ratio(0.0),
        };

        RatioGroup {
            name: "Efficiency ratios",
            rows: vec![
                RatioRow {
                    label: "Asset turnover",
                    value: MetricValue::from_quotient(snapshot.sales, snapshot.total_assets),
                },
                RatioRow {
                    label: "Receivables turnover",
                    value: MetricValue::from_quotient(snapshot.sales, snapshot.receivables),
                },
                RatioRow {
                    label: "Inventory turnover",
                    value: inventory_turnover,
                },
            ],
        }
    }
}

impl Default for RatioEngine {
    fn default() -> Self {
        Self::new()
    }
}
