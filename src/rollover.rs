use crate::error::{BudgetError, Result};
use crate::schema::{HouseholdDocument, MonthHistory, MonthRecord, PayPeriod, SharedPool};
use crate::stats::SharedSplit;
use crate::utils::{months_between, MonthKey};
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ten years. A walk longer than this means the start month is missing or
/// corrupted.
pub const MAX_WALK_MONTHS: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "month", rename_all = "snake_case")]
pub enum WalkStop {
    /// Target month is at or before the start month; the starting balance is returned as is.
    AtOrBeforeStart,
    /// Walked back past the start month and added the starting balance.
    StartingBalance,
    /// Hit a month with a confirmed closing balance for the person.
    ClosedMonth(MonthKey),
    /// Ran out of iterations. The amount is a partial sum.
    IterationCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverWalk {
    pub amount: Decimal,
    pub stop: WalkStop,
    /// Open months whose generated surplus was recomputed.
    pub months_walked: u32,
}

impl RolloverWalk {
    pub fn is_truncated(&self) -> bool {
        self.stop == WalkStop::IterationCap
    }
}

/// Everything a rollover walk reads. Borrowed and never mutated.
#[derive(Debug, Clone, Copy)]
pub struct RolloverContext<'a> {
    pub history: &'a MonthHistory,
    pub start_month: MonthKey,
    pub starting_balances: &'a BTreeMap<String, Decimal>,
    pub shared_pool: Option<&'a SharedPool>,
    /// Current member count; historical months are split with it too.
    pub member_count: usize,
}

impl<'a> RolloverContext<'a> {
    pub fn from_document(document: &'a HouseholdDocument) -> Self {
        let config = &document.config;
        Self {
            history: &document.months,
            start_month: config.start_month,
            starting_balances: &config.starting_balances,
            shared_pool: config.active_shared_pool(),
            member_count: config.member_count(),
        }
    }

    fn starting_balance(&self, person: &str) -> Decimal {
        self.starting_balances
            .get(person)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

pub struct RolloverAccumulator<'a> {
    context: RolloverContext<'a>,
}

impl<'a> RolloverAccumulator<'a> {
    pub fn new(context: RolloverContext<'a>) -> Self {
        Self { context }
    }

    pub fn from_document(document: &'a HouseholdDocument) -> Self {
        Self::new(RolloverContext::from_document(document))
    }

    /// Free cash `person` carries into `target` from every earlier month.
    pub fn rollover(&self, target: MonthKey, person: &str) -> RolloverWalk {
        let start = self.context.start_month;
        if target <= start {
            return RolloverWalk {
                amount: self.context.starting_balance(person),
                stop: WalkStop::AtOrBeforeStart,
                months_walked: 0,
            };
        }

        let mut total = Decimal::ZERO;
        let mut current = target;
        let mut walked = 0;

        for _ in 0..MAX_WALK_MONTHS {
            let prev = current.prev();

            if prev < start {
                total += self.context.starting_balance(person);
                debug!(
                    "Rollover for {} into {}: reached start month after {} months",
                    person, target, walked
                );
                return RolloverWalk {
                    amount: total,
                    stop: WalkStop::StartingBalance,
                    months_walked: walked,
                };
            }

            let closing = self
                .context
                .history
                .get(&prev)
                .and_then(|record| record.closing_balance(person));
            if let Some(closing) = closing {
                total += closing;
                debug!(
                    "Rollover for {} into {}: closed month {} after {} months",
                    person, target, prev, walked
                );
                return RolloverWalk {
                    amount: total,
                    stop: WalkStop::ClosedMonth(prev),
                    months_walked: walked,
                };
            }

            total += self.month_generated(prev, person);
            walked += 1;
            current = prev;
        }

        warn!(
            "Rollover for {} into {} stopped after {} months, {} months short of start month {}; returning partial total {}",
            person,
            target,
            MAX_WALK_MONTHS,
            months_between(start, current),
            start,
            total
        );
        RolloverWalk {
            amount: total,
            stop: WalkStop::IterationCap,
            months_walked: walked,
        }
    }

    pub fn rollover_amount(&self, target: MonthKey, person: &str) -> Decimal {
        self.rollover(target, person).amount
    }

    /// Same as [`rollover`](Self::rollover) but reports a truncated walk as an error.
    pub fn rollover_strict(&self, target: MonthKey, person: &str) -> Result<Decimal> {
        let walk = self.rollover(target, person);
        if walk.is_truncated() {
            return Err(BudgetError::RolloverWalkExhausted {
                person: person.to_string(),
                target: target.to_string(),
                partial: walk.amount,
            });
        }
        Ok(walk.amount)
    }

    /// Parses `target` (YYYY-MM) before walking.
    pub fn rollover_for_key(&self, target: &str, person: &str) -> Result<RolloverWalk> {
        let key: MonthKey = target.parse()?;
        Ok(self.rollover(key, person))
    }

    /// Surplus (or deficit) `person` generated in `month`, recomputed from its
    /// bills and incomes. A month that was never created generates nothing.
    pub fn month_generated(&self, month: MonthKey, person: &str) -> Decimal {
        match self.context.history.get(&month) {
            Some(record) => self.record_generated(record, person),
            None => Decimal::ZERO,
        }
    }

    fn record_generated(&self, record: &MonthRecord, person: &str) -> Decimal {
        let income = record.income(person);
        let split = SharedSplit::for_month(record, self.context.shared_pool, self.context.member_count);

        let period_free = |period: PayPeriod| {
            let due = record.column_total(person, period) + split.per_member(period);
            income.for_period(period) - due
        };

        period_free(PayPeriod::Pay1) + period_free(PayPeriod::Pay2) + income.extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Bill, HouseholdConfig, OwnerIncome};
    use rust_decimal_macros::dec;

    fn month(key: &str) -> MonthKey {
        key.parse().unwrap()
    }

    fn document(start: &str, owners: &[&str]) -> HouseholdDocument {
        HouseholdDocument::new(HouseholdConfig::new(
            owners.iter().map(|o| o.to_string()).collect(),
            month(start),
        ))
    }

    fn surplus_month(owner: &str, surplus: Decimal) -> MonthRecord {
        MonthRecord::new(vec![Bill::new(format!("{}-bill", owner), dec!(100), owner)])
            .with_income(owner, OwnerIncome::new(dec!(100) + surplus, dec!(0)))
    }

    #[test]
    fn test_base_case_returns_starting_balance() {
        let mut doc = document("2024-01", &["Alice"]);
        doc.config
            .starting_balances
            .insert("Alice".to_string(), dec!(500));
        let acc = RolloverAccumulator::from_document(&doc);

        let walk = acc.rollover(month("2024-01"), "Alice");
        assert_eq!(walk.amount, dec!(500));
        assert_eq!(walk.stop, WalkStop::AtOrBeforeStart);

        assert_eq!(acc.rollover_amount(month("2023-06"), "Alice"), dec!(500));
        assert_eq!(acc.rollover_amount(month("2024-01"), "Bob"), dec!(0));
    }

    #[test]
    fn test_closed_month_short_circuits() {
        let mut record = surplus_month("Alice", dec!(9999));
        record.closing_balances = Some(BTreeMap::from([("Alice".to_string(), dec!(250))]));
        let doc = document("2023-06", &["Alice"]).with_month(month("2024-01"), record);

        let walk = RolloverAccumulator::from_document(&doc).rollover(month("2024-02"), "Alice");
        assert_eq!(walk.amount, dec!(250));
        assert_eq!(walk.stop, WalkStop::ClosedMonth(month("2024-01")));
        assert_eq!(walk.months_walked, 0);
    }

    #[test]
    fn test_closed_month_without_entry_is_recomputed() {
        let mut record = surplus_month("Alice", dec!(40));
        record.closing_balances = Some(BTreeMap::from([("Bob".to_string(), dec!(250))]));
        let doc = document("2024-01", &["Alice", "Bob"]).with_month(month("2024-01"), record);
        let acc = RolloverAccumulator::from_document(&doc);

        assert_eq!(acc.rollover_amount(month("2024-02"), "Alice"), dec!(40));
        assert_eq!(acc.rollover_amount(month("2024-02"), "Bob"), dec!(250));
    }

    #[test]
    fn test_chain_of_open_months() {
        let doc = document("2024-01", &["Alice"])
            .with_month(month("2024-01"), surplus_month("Alice", dec!(100)))
            .with_month(month("2024-02"), surplus_month("Alice", dec!(100)));

        let walk = RolloverAccumulator::from_document(&doc).rollover(month("2024-03"), "Alice");
        assert_eq!(walk.amount, dec!(200));
        assert_eq!(walk.stop, WalkStop::StartingBalance);
        assert_eq!(walk.months_walked, 2);
    }

    #[test]
    fn test_walk_crosses_year_boundary() {
        let mut doc = document("2023-11", &["Alice"])
            .with_month(month("2023-11"), surplus_month("Alice", dec!(10)))
            .with_month(month("2023-12"), surplus_month("Alice", dec!(20)))
            .with_month(month("2024-01"), surplus_month("Alice", dec!(-5)));
        doc.config
            .starting_balances
            .insert("Alice".to_string(), dec!(1000));

        let amount = RolloverAccumulator::from_document(&doc).rollover_amount(month("2024-02"), "Alice");
        assert_eq!(amount, dec!(1025));
    }

    #[test]
    fn test_missing_months_count_as_zero() {
        let mut doc = document("2024-01", &["Alice"])
            .with_month(month("2024-02"), surplus_month("Alice", dec!(75)));
        doc.config
            .starting_balances
            .insert("Alice".to_string(), dec!(25));

        let walk = RolloverAccumulator::from_document(&doc).rollover(month("2024-06"), "Alice");
        assert_eq!(walk.amount, dec!(100));
        assert_eq!(walk.months_walked, 5);
    }

    #[test]
    fn test_shared_pool_split_and_extra_income() {
        let mut doc = document("2024-01", &["Alice", "Bob"]);
        doc.config.shared_pool = SharedPool::enabled("Joint");

        let mut income = OwnerIncome::new(dec!(2000), dec!(1500));
        income.extra = dec!(50);
        let record = MonthRecord::new(vec![
            Bill::new("rent", dec!(1000), "Joint"),
            Bill::new("power", dec!(300), "Joint").with_column(PayPeriod::Pay2),
            Bill::new("car", dec!(400), "Alice").with_column(PayPeriod::Pay2),
            Bill::new("gym", dec!(40), "Alice").paid(),
        ])
        .with_income("Alice", income);
        let doc = doc.with_month(month("2024-01"), record);

        // pay1: 2000 - (40 + 500) = 1460; pay2: 1500 - (400 + 150) = 950; extra 50
        let acc = RolloverAccumulator::from_document(&doc);
        assert_eq!(acc.month_generated(month("2024-01"), "Alice"), dec!(2460));
        assert_eq!(acc.rollover_amount(month("2024-02"), "Alice"), dec!(2460));
        // Bob has no income and still owes half of the pool.
        assert_eq!(acc.rollover_amount(month("2024-02"), "Bob"), dec!(-650));
    }

    #[test]
    fn test_disabled_pool_is_not_split() {
        let record = MonthRecord::new(vec![Bill::new("rent", dec!(1000), "Shared")])
            .with_income("Alice", OwnerIncome::new(dec!(100), dec!(0)));
        let doc = document("2024-01", &["Alice"]).with_month(month("2024-01"), record);

        let amount = RolloverAccumulator::from_document(&doc).rollover_amount(month("2024-02"), "Alice");
        assert_eq!(amount, dec!(100));
    }

    #[test]
    fn test_iteration_cap_returns_partial_sum() {
        let mut doc = document("2000-01", &["Alice"]);
        doc.config
            .starting_balances
            .insert("Alice".to_string(), dec!(500));
        let doc = doc.with_month(month("2023-12"), surplus_month("Alice", dec!(30)));
        let acc = RolloverAccumulator::from_document(&doc);

        let walk = acc.rollover(month("2024-01"), "Alice");
        assert!(walk.is_truncated());
        assert_eq!(walk.amount, dec!(30));
        assert_eq!(walk.months_walked, MAX_WALK_MONTHS);

        match acc.rollover_strict(month("2024-01"), "Alice") {
            Err(BudgetError::RolloverWalkExhausted { partial, .. }) => {
                assert_eq!(partial, dec!(30))
            }
            other => panic!("expected exhausted walk, got {:?}", other),
        }
    }

    #[test]
    fn test_longest_complete_walk_reaches_start() {
        let doc = document("2014-02", &["Alice"]);
        let acc = RolloverAccumulator::from_document(&doc);

        // 119 months after the start still fits inside the cap.
        let walk = acc.rollover(month("2024-01"), "Alice");
        assert_eq!(walk.stop, WalkStop::StartingBalance);
        assert_eq!(walk.months_walked, 119);
        assert!(acc.rollover_strict(month("2024-01"), "Alice").is_ok());
    }

    #[test]
    fn test_rollover_for_key_rejects_malformed_keys() {
        let doc = document("2024-01", &["Alice"]);
        let acc = RolloverAccumulator::from_document(&doc);
        assert!(matches!(
            acc.rollover_for_key("2024/02", "Alice"),
            Err(BudgetError::InvalidMonthKey(_))
        ));
        assert!(acc.rollover_for_key("2024-02", "Alice").is_ok());
    }
}
