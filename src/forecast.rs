use crate::balancer::{DEFAULT_PAY1_DAY, DEFAULT_PAY2_DAY};
use crate::rollover::RolloverAccumulator;
use crate::schema::{HouseholdDocument, MonthRecord};
use crate::utils::MonthKey;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Household cash at the end of one day of the month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBalance {
    pub day: u32,
    pub income: Decimal,
    pub expenses: Decimal,
    pub balance: Decimal,
    /// Bills charged on this day.
    pub bill_ids: Vec<String>,
}

/// Day-by-day household balance for one month.
///
/// Starts from `opening`, adds every member's extra income on day 1 and each
/// paycheck on its pay day, and charges every bill on its due day. Days past
/// the end of a short month land on the last day.
pub fn running_balance(
    month: MonthKey,
    record: &MonthRecord,
    owners: &[String],
    opening: Decimal,
) -> Vec<DailyBalance> {
    let last_day = month.days_in_month();
    let mut balance = opening;

    (1..=last_day)
        .map(|day| {
            let mut income = Decimal::ZERO;
            for owner in owners {
                let owner_income = record.income(owner);
                if day == 1 {
                    income += owner_income.extra;
                }
                if owner_income.pay1_day.unwrap_or(DEFAULT_PAY1_DAY).min(last_day) == day {
                    income += owner_income.pay1;
                }
                if owner_income.pay2_day.unwrap_or(DEFAULT_PAY2_DAY).min(last_day) == day {
                    income += owner_income.pay2;
                }
            }

            let due: Vec<_> = record
                .bills
                .iter()
                .filter(|b| b.due_day.min(last_day) == day)
                .collect();
            let expenses: Decimal = due.iter().map(|b| b.amount).sum();

            balance += income - expenses;
            DailyBalance {
                day,
                income,
                expenses,
                balance,
                bill_ids: due.iter().map(|b| b.id.clone()).collect(),
            }
        })
        .collect()
}

pub struct ForecastBuilder<'a> {
    document: &'a HouseholdDocument,
    rollover: RolloverAccumulator<'a>,
}

impl<'a> ForecastBuilder<'a> {
    pub fn new(document: &'a HouseholdDocument) -> Self {
        Self {
            document,
            rollover: RolloverAccumulator::from_document(document),
        }
    }

    /// Sum of every member's rollover into `month`.
    pub fn opening_balance(&self, month: MonthKey) -> Decimal {
        self.document
            .config
            .owners
            .iter()
            .map(|owner| self.rollover.rollover_amount(month, owner))
            .sum()
    }

    pub fn daily_balances(&self, month: MonthKey) -> Vec<DailyBalance> {
        let empty = MonthRecord::default();
        let record = self.document.month(month).unwrap_or(&empty);
        let opening = self.opening_balance(month);
        debug!("Forecasting {} from opening balance {}", month, opening);

        running_balance(month, record, &self.document.config.owners, opening)
    }

    /// The day with the lowest balance; the earliest one on ties.
    pub fn low_point(&self, month: MonthKey) -> Option<DailyBalance> {
        self.daily_balances(month)
            .into_iter()
            .reduce(|low, day| if day.balance < low.balance { day } else { low })
    }
}
