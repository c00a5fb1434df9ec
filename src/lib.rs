//! # Paycheck Budget Engine
//!
//! The calculation core of a paycheck-cycle household budget: bills are
//! assigned to one of two paychecks each month, and each member's unspent
//! cash is carried forward from month to month.
//!
//! ## Core Concepts
//!
//! - **Balancing**: a greedy "water level" pass that places the largest bills
//!   first, always on the paycheck with more free cash left
//! - **Scopes**: every member is balanced against their own two paychecks; the
//!   shared pool is balanced against zero income and split evenly afterwards
//! - **Rollover**: free cash carried into a month, found by walking back
//!   through history until the start month or a closed month
//! - **Closed months**: confirmed bank balances that replace the computed
//!   rollover for that month
//! - **Savings goals**: running totals moved by paying, unpaying or removing
//!   the bills linked to them
//!
//! ## Example
//!
//! ```rust,ignore
//! use paycheck_budget_engine::*;
//! use rust_decimal_macros::dec;
//!
//! let buckets = balance(
//!     dec!(1000),
//!     dec!(1000),
//!     vec![
//!         Bill::new("rent", dec!(600), "Alice"),
//!         Bill::new("car", dec!(300), "Alice"),
//!         Bill::new("phone", dec!(100), "Alice"),
//!     ],
//! );
//! assert_eq!(buckets.pay1_free, dec!(400));
//! assert_eq!(buckets.pay2_free, dec!(600));
//!
//! let document = HouseholdDocument::from_json_str(&std::fs::read_to_string("household.json")?)?;
//! let budget = HouseholdBudget::new(&document)?;
//! let stats = budget.person_stats("2024-03".parse()?, "Alice");
//! println!("Total free: {}", stats.total_free);
//! ```

pub mod balancer;
pub mod edits;
pub mod error;
pub mod forecast;
pub mod reports;
pub mod rollover;
pub mod savings;
pub mod schema;
pub mod stats;
pub mod utils;

pub use balancer::{
    align_bills_by_date, balance, balance_month, AssignmentStrategy, BalancedBuckets,
    HouseholdBalancer,
};
pub use edits::{EditOutcome, MonthEdit, MonthEdits};
pub use error::{BudgetError, Result};
pub use forecast::{running_balance, DailyBalance, ForecastBuilder};
pub use reports::{
    BurdenEntry, CashFlowSummary, CategoryTotal, ReportBuilder, ReportScope, TrendPoint,
    DEFAULT_TREND_MONTHS,
};
pub use rollover::{RolloverAccumulator, RolloverContext, RolloverWalk, WalkStop, MAX_WALK_MONTHS};
pub use savings::{active_goals, SavingsGoal};
pub use schema::*;
pub use stats::{PersonStats, SharedSplit, StatsCalculator};
pub use utils::*;

use log::{debug, info};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Read-only view over a validated household document.
pub struct HouseholdBudget<'a> {
    document: &'a HouseholdDocument,
}

impl<'a> HouseholdBudget<'a> {
    pub fn new(document: &'a HouseholdDocument) -> Result<Self> {
        document.validate()?;

        info!(
            "Loaded household with {} members, {} months of history, starting {}",
            document.config.owners.len(),
            document.months.len(),
            document.config.start_month
        );
        debug!(
            "Shared pool '{}' enabled: {}",
            document.config.shared_pool.name, document.config.shared_pool.enabled
        );

        Ok(Self { document })
    }

    pub fn document(&self) -> &HouseholdDocument {
        self.document
    }

    fn record(&self, month: MonthKey) -> MonthRecord {
        self.document.month(month).cloned().unwrap_or_default()
    }

    /// A re-balanced copy of the month. The caller decides whether to store it.
    pub fn balance_month(&self, month: MonthKey, strategy: AssignmentStrategy) -> MonthRecord {
        HouseholdBalancer::new(&self.document.config)
            .with_strategy(strategy)
            .balance_month(&self.record(month))
    }

    pub fn balance_scope(&self, month: MonthKey, scope: &str) -> Result<MonthRecord> {
        HouseholdBalancer::new(&self.document.config).balance_scope(&self.record(month), scope)
    }

    pub fn rollover(&self, month: MonthKey, person: &str) -> RolloverWalk {
        RolloverAccumulator::from_document(self.document).rollover(month, person)
    }

    pub fn person_stats(&self, month: MonthKey, person: &str) -> PersonStats {
        StatsCalculator::new(self.document).person_stats(month, person)
    }

    pub fn household_stats(&self, month: MonthKey) -> Vec<(String, PersonStats)> {
        StatsCalculator::new(self.document).household_stats(month)
    }

    /// Each member's projected total free cash, used to pre-fill the
    /// close-the-books form.
    pub fn proposed_closing_balances(&self, month: MonthKey) -> BTreeMap<String, Decimal> {
        self.household_stats(month)
            .into_iter()
            .map(|(owner, stats)| (owner, stats.total_free))
            .collect()
    }

    /// Confirmed balance minus projected total free cash, for members with a
    /// confirmed balance. Empty while the month is open.
    pub fn closing_variance(&self, month: MonthKey) -> BTreeMap<String, Decimal> {
        let Some(closing) = self
            .document
            .month(month)
            .and_then(|record| record.closing_balances.as_ref())
        else {
            return BTreeMap::new();
        };

        let projected = self.proposed_closing_balances(month);
        closing
            .iter()
            .filter_map(|(owner, actual)| {
                projected
                    .get(owner)
                    .map(|expected| (owner.clone(), *actual - *expected))
            })
            .collect()
    }

    pub fn apply_edits(&self, month: MonthKey, edits: &MonthEdits) -> Result<MonthRecord> {
        edits.apply(&self.record(month))
    }

    /// Applies `edits` and returns the month together with the household's
    /// savings goals as they stand afterwards.
    pub fn apply_edits_with_goals(&self, month: MonthKey, edits: &MonthEdits) -> Result<EditOutcome> {
        edits.apply_with_goals(&self.record(month), &self.document.savings_goals)
    }

    pub fn forecast(&self, month: MonthKey) -> Vec<DailyBalance> {
        ForecastBuilder::new(self.document).daily_balances(month)
    }

    pub fn cash_flow(&self, month: MonthKey, scope: &ReportScope) -> CashFlowSummary {
        ReportBuilder::new(self.document).cash_flow(month, scope)
    }

    pub fn burden(&self, month: MonthKey) -> Vec<BurdenEntry> {
        ReportBuilder::new(self.document).burden(month)
    }

    pub fn category_breakdown(&self, month: MonthKey, scope: &ReportScope) -> Vec<CategoryTotal> {
        ReportBuilder::new(self.document).category_breakdown(month, scope)
    }

    pub fn trend(&self, limit: usize) -> Vec<TrendPoint> {
        ReportBuilder::new(self.document).trend(limit)
    }
}

/// Balances every scope of `month` using the water-level strategy.
pub fn balance_household(document: &HouseholdDocument, month: MonthKey) -> Result<MonthRecord> {
    let budget = HouseholdBudget::new(document)?;
    Ok(budget.balance_month(month, AssignmentStrategy::WaterLevel))
}
