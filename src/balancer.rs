use crate::error::{BudgetError, Result};
use crate::schema::{Bill, HouseholdConfig, MonthRecord, OwnerIncome, PayPeriod};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_PAY1_DAY: u32 = 1;
pub const DEFAULT_PAY2_DAY: u32 = 15;

/// Result of one water-level pass: the two buckets plus what is left of each
/// paycheck after its bills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalancedBuckets {
    pub pay1: Vec<Bill>,
    pub pay2: Vec<Bill>,
    pub pay1_free: Decimal,
    pub pay2_free: Decimal,
}

impl BalancedBuckets {
    fn empty(income1: Decimal, income2: Decimal) -> Self {
        Self {
            pay1: Vec::new(),
            pay2: Vec::new(),
            pay1_free: income1,
            pay2_free: income2,
        }
    }

    fn assign(&mut self, mut bill: Bill, column: PayPeriod) {
        bill.column = column;
        match column {
            PayPeriod::Pay1 => {
                self.pay1_free -= bill.amount;
                self.pay1.push(bill);
            }
            PayPeriod::Pay2 => {
                self.pay2_free -= bill.amount;
                self.pay2.push(bill);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.pay1.len() + self.pay2.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gap between the two remaining free cash figures.
    pub fn imbalance(&self) -> Decimal {
        (self.pay1_free - self.pay2_free).abs()
    }

    /// Bucket 1 followed by bucket 2.
    pub fn into_bills(self) -> Vec<Bill> {
        let mut bills = self.pay1;
        bills.extend(self.pay2);
        bills
    }
}

/// Splits `bills` across two paychecks so that the free cash left on each is
/// as level as possible.
///
/// Largest bills are placed first, each one going to whichever paycheck has
/// more money left (ties go to the first paycheck). Equal amounts are ordered
/// by bill id, so the outcome depends only on the set of bills and never on
/// the order they were passed in. Re-balancing an already balanced set is a
/// fixed point.
///
/// This is a greedy heuristic, not an exact minimum-imbalance solver.
/// Negative remainders are a deficit signal for the caller, not an error.
pub fn balance(income1: Decimal, income2: Decimal, bills: Vec<Bill>) -> BalancedBuckets {
    let mut sorted = bills;
    sorted.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.id.cmp(&b.id)));

    let mut buckets = BalancedBuckets::empty(income1, income2);
    for bill in sorted {
        let column = if buckets.pay1_free >= buckets.pay2_free {
            PayPeriod::Pay1
        } else {
            PayPeriod::Pay2
        };
        buckets.assign(bill, column);
    }

    buckets
}

/// Seeds columns by due-date proximity: each bill goes to the paycheck whose
/// pay day is closest to its due day, ties to the first paycheck.
///
/// Non-optimizing; used for initial placement only. Input order is preserved.
pub fn align_bills_by_date(pay_day1: u32, pay_day2: u32, bills: Vec<Bill>) -> Vec<Bill> {
    bills
        .into_iter()
        .map(|mut bill| {
            let dist1 = bill.due_day.abs_diff(pay_day1);
            let dist2 = bill.due_day.abs_diff(pay_day2);
            bill.column = if dist1 <= dist2 {
                PayPeriod::Pay1
            } else {
                PayPeriod::Pay2
            };
            bill
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    /// Greedy free-cash leveling.
    #[default]
    WaterLevel,
    /// Nearest pay day to each bill's due day.
    DueDate,
}

/// Balances a whole month scope by scope: the shared pool against zero
/// income, each member against their own paychecks. Bills whose owner is
/// neither pass through untouched. Paid bills keep their column.
pub struct HouseholdBalancer<'a> {
    config: &'a HouseholdConfig,
    strategy: AssignmentStrategy,
}

impl<'a> HouseholdBalancer<'a> {
    pub fn new(config: &'a HouseholdConfig) -> Self {
        Self {
            config,
            strategy: AssignmentStrategy::WaterLevel,
        }
    }

    pub fn with_strategy(mut self, strategy: AssignmentStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn balance_month(&self, record: &MonthRecord) -> MonthRecord {
        info!(
            "Balancing {} bills across {} members (strategy: {:?})",
            record.bills.len(),
            self.config.owners.len(),
            self.strategy
        );

        let mut balanced = Vec::with_capacity(record.bills.len());
        let mut done: HashSet<&str> = HashSet::new();

        for (scope, income) in self.scopes(record) {
            if !done.insert(scope) {
                warn!("Scope '{}' appears more than once; balancing it once", scope);
                continue;
            }
            let bills = self.scope_bills(record, scope);
            balanced.extend(self.balance_scope_bills(scope, bills, &income));
        }

        let unknown: Vec<Bill> = record
            .bills
            .iter()
            .filter(|b| !done.contains(b.owner.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            debug!(
                "{} bills belong to unrecognized owners and were left in place",
                unknown.len()
            );
        }
        balanced.extend(unknown);

        MonthRecord {
            bills: balanced,
            ..record.clone()
        }
    }

    /// Balances one member or the shared pool, leaving every other bill as is.
    pub fn balance_scope(&self, record: &MonthRecord, scope: &str) -> Result<MonthRecord> {
        if !self.config.is_known_scope(scope) {
            return Err(BudgetError::UnknownOwner(scope.to_string()));
        }

        let income = if self.config.is_owner(scope) {
            record.income(scope)
        } else {
            OwnerIncome::default()
        };

        let mut bills: Vec<Bill> = record
            .bills
            .iter()
            .filter(|b| b.owner != scope)
            .cloned()
            .collect();
        let scope_bills = self.scope_bills(record, scope);
        bills.extend(self.balance_scope_bills(scope, scope_bills, &income));

        Ok(MonthRecord {
            bills,
            ..record.clone()
        })
    }

    /// Balancing order: the shared pool, then members in config order. A pool
    /// named after a member is treated as that member.
    fn scopes(&self, record: &MonthRecord) -> Vec<(&'a str, OwnerIncome)> {
        let config: &'a HouseholdConfig = self.config;
        let mut scopes = Vec::with_capacity(config.owners.len() + 1);
        if let Some(pool) = config.active_shared_pool() {
            if config.is_owner(&pool.name) {
                warn!(
                    "Shared pool '{}' has the same name as a member; its bills use that member's income",
                    pool.name
                );
            } else {
                scopes.push((pool.name.as_str(), OwnerIncome::default()));
            }
        }
        for owner in &config.owners {
            scopes.push((owner.as_str(), record.income(owner)));
        }
        scopes
    }

    fn scope_bills(&self, record: &MonthRecord, scope: &str) -> Vec<Bill> {
        record.bills_for(scope).cloned().collect()
    }

    fn balance_scope_bills(&self, scope: &str, bills: Vec<Bill>, income: &OwnerIncome) -> Vec<Bill> {
        let (pinned, open): (Vec<Bill>, Vec<Bill>) = bills.into_iter().partition(|b| b.is_paid);

        let placed = match self.strategy {
            AssignmentStrategy::WaterLevel => {
                let mut income1 = income.pay1;
                let mut income2 = income.pay2;
                for bill in &pinned {
                    match bill.column {
                        PayPeriod::Pay1 => income1 -= bill.amount,
                        PayPeriod::Pay2 => income2 -= bill.amount,
                    }
                }

                let buckets = balance(income1, income2, open);
                debug!(
                    "{}: {} paid bills pinned, {} in pay1, {} in pay2, free cash {} / {} (gap {})",
                    scope,
                    pinned.len(),
                    buckets.pay1.len(),
                    buckets.pay2.len(),
                    buckets.pay1_free,
                    buckets.pay2_free,
                    buckets.imbalance()
                );
                buckets.into_bills()
            }
            AssignmentStrategy::DueDate => {
                let day1 = income.pay1_day.unwrap_or(DEFAULT_PAY1_DAY);
                let day2 = income.pay2_day.unwrap_or(DEFAULT_PAY2_DAY);
                debug!(
                    "{}: aligning {} bills to pay days {} and {}",
                    scope,
                    open.len(),
                    day1,
                    day2
                );
                align_bills_by_date(day1, day2, open)
            }
        };

        pinned.into_iter().chain(placed).collect()
    }
}

pub fn balance_month(config: &HouseholdConfig, record: &MonthRecord) -> MonthRecord {
    HouseholdBalancer::new(config).balance_month(record)
}
