use crate::rollover::{RolloverAccumulator, WalkStop};
use crate::schema::{HouseholdDocument, MonthRecord, PayPeriod, SharedPool};
use crate::utils::MonthKey;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Shared-pool bill totals for one month and each member's even share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedSplit {
    pub pay1_total: Decimal,
    pub pay2_total: Decimal,
    pub members: usize,
}

impl SharedSplit {
    /// Totals are zero when there is no active pool.
    pub fn for_month(record: &MonthRecord, pool: Option<&SharedPool>, member_count: usize) -> Self {
        let (pay1_total, pay2_total) = match pool {
            Some(pool) => (
                record.column_total(&pool.name, PayPeriod::Pay1),
                record.column_total(&pool.name, PayPeriod::Pay2),
            ),
            None => (Decimal::ZERO, Decimal::ZERO),
        };

        Self {
            pay1_total,
            pay2_total,
            members: member_count.max(1),
        }
    }

    pub fn total(&self, period: PayPeriod) -> Decimal {
        match period {
            PayPeriod::Pay1 => self.pay1_total,
            PayPeriod::Pay2 => self.pay2_total,
        }
    }

    pub fn per_member(&self, period: PayPeriod) -> Decimal {
        self.total(period) / Decimal::from(self.members)
    }

    pub fn per_member_total(&self) -> Decimal {
        (self.pay1_total + self.pay2_total) / Decimal::from(self.members)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonStats {
    /// Own pay1 bills plus the shared pay1 split.
    pub due1: Decimal,
    pub due2: Decimal,
    pub free1: Decimal,
    pub free2: Decimal,
    pub extra: Decimal,
    pub rollover: Decimal,
    pub rollover_stop: WalkStop,
    pub total_free: Decimal,
}

impl PersonStats {
    pub fn fixed_costs(&self) -> Decimal {
        self.due1 + self.due2
    }
}

pub struct StatsCalculator<'a> {
    document: &'a HouseholdDocument,
    rollover: RolloverAccumulator<'a>,
}

impl<'a> StatsCalculator<'a> {
    pub fn new(document: &'a HouseholdDocument) -> Self {
        Self {
            document,
            rollover: RolloverAccumulator::from_document(document),
        }
    }

    pub fn shared_split(&self, month: MonthKey) -> SharedSplit {
        let config = &self.document.config;
        match self.document.month(month) {
            Some(record) => {
                SharedSplit::for_month(record, config.active_shared_pool(), config.member_count())
            }
            None => SharedSplit::for_month(
                &MonthRecord::default(),
                config.active_shared_pool(),
                config.member_count(),
            ),
        }
    }

    pub fn person_stats(&self, month: MonthKey, person: &str) -> PersonStats {
        let empty = MonthRecord::default();
        let record = self.document.month(month).unwrap_or(&empty);
        let split = self.shared_split(month);
        let income = record.income(person);

        let due1 = record.column_total(person, PayPeriod::Pay1) + split.per_member(PayPeriod::Pay1);
        let due2 = record.column_total(person, PayPeriod::Pay2) + split.per_member(PayPeriod::Pay2);
        let free1 = income.pay1 - due1;
        let free2 = income.pay2 - due2;

        let walk = self.rollover.rollover(month, person);

        PersonStats {
            due1,
            due2,
            free1,
            free2,
            extra: income.extra,
            rollover: walk.amount,
            rollover_stop: walk.stop,
            total_free: free1 + free2 + income.extra + walk.amount,
        }
    }

    /// Stats for every member, in configured order.
    pub fn household_stats(&self, month: MonthKey) -> Vec<(String, PersonStats)> {
        self.document
            .config
            .owners
            .iter()
            .map(|owner| (owner.clone(), self.person_stats(month, owner)))
            .collect()
    }
}
