use crate::schema::{HouseholdDocument, MonthRecord, DEFAULT_CATEGORY};
use crate::stats::StatsCalculator;
use crate::utils::MonthKey;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_TREND_MONTHS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "owner", rename_all = "snake_case")]
pub enum ReportScope {
    All,
    Owner(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowSummary {
    pub income: Decimal,
    pub costs: Decimal,
    pub net: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurdenEntry {
    pub owner: String,
    pub fixed: Decimal,
    pub free: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Decimal,
    /// Fraction of all categorized spend, 0..=1.
    pub share: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub month: MonthKey,
    pub income: Decimal,
    pub expenses: Decimal,
}

pub struct ReportBuilder<'a> {
    document: &'a HouseholdDocument,
    stats: StatsCalculator<'a>,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(document: &'a HouseholdDocument) -> Self {
        Self {
            document,
            stats: StatsCalculator::new(document),
        }
    }

    fn record(&self, month: MonthKey) -> MonthRecord {
        self.document.month(month).cloned().unwrap_or_default()
    }

    /// Money in versus money out. Only a positive rollover counts as income;
    /// a carried deficit shows up in the member's free cash instead.
    pub fn cash_flow(&self, month: MonthKey, scope: &ReportScope) -> CashFlowSummary {
        let record = self.record(month);

        let (income, costs) = match scope {
            ReportScope::All => {
                let income = self
                    .document
                    .config
                    .owners
                    .iter()
                    .map(|owner| self.owner_income_with_rollover(&record, month, owner))
                    .sum();
                (income, record.total_bills())
            }
            ReportScope::Owner(owner) => {
                let stats = self.stats.person_stats(month, owner);
                (
                    self.owner_income_with_rollover(&record, month, owner),
                    stats.fixed_costs(),
                )
            }
        };

        CashFlowSummary {
            income,
            costs,
            net: income - costs,
        }
    }

    fn owner_income_with_rollover(&self, record: &MonthRecord, month: MonthKey, owner: &str) -> Decimal {
        let rollover = self.stats.person_stats(month, owner).rollover;
        record.income(owner).total() + rollover.max(Decimal::ZERO)
    }

    /// Fixed costs against total free cash for each member.
    pub fn burden(&self, month: MonthKey) -> Vec<BurdenEntry> {
        self.stats
            .household_stats(month)
            .into_iter()
            .map(|(owner, stats)| BurdenEntry {
                owner,
                fixed: stats.fixed_costs(),
                free: stats.total_free,
            })
            .collect()
    }

    /// Bill totals per category, largest first. Empty categories are omitted.
    pub fn category_breakdown(&self, month: MonthKey, scope: &ReportScope) -> Vec<CategoryTotal> {
        let record = self.record(month);

        let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
        for bill in &record.bills {
            if let ReportScope::Owner(owner) = scope {
                if &bill.owner != owner {
                    continue;
                }
            }
            let category = if bill.category.trim().is_empty() {
                DEFAULT_CATEGORY.to_string()
            } else {
                bill.category.clone()
            };
            *totals.entry(category).or_default() += bill.amount;
        }

        let grand_total: Decimal = totals.values().copied().sum();
        let mut breakdown: Vec<CategoryTotal> = totals
            .into_iter()
            .filter(|(_, total)| *total > Decimal::ZERO)
            .map(|(category, total)| CategoryTotal {
                category,
                total,
                share: total / grand_total,
            })
            .collect();
        breakdown.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
        breakdown
    }

    /// Income and expenses for the most recent `limit` stored months, oldest first.
    pub fn trend(&self, limit: usize) -> Vec<TrendPoint> {
        let months = &self.document.months;
        let skip = months.len().saturating_sub(limit);

        months
            .iter()
            .skip(skip)
            .map(|(key, record)| TrendPoint {
                month: *key,
                income: self
                    .document
                    .config
                    .owners
                    .iter()
                    .map(|owner| record.income(owner).total())
                    .sum(),
                expenses: record.total_bills(),
            })
            .collect()
    }
}
