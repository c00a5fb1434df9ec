use crate::error::{BudgetError, Result};
use crate::savings::SavingsGoal;
use crate::schema::{Bill, IncomeSlot, MonthRecord, PayPeriod};
use crate::utils::MonthKey;
use log::warn;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An ordered batch of changes to one month.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MonthEdits {
    pub month: Option<MonthKey>,

    #[serde(default)]
    #[schemars(description = "Applied in order. Later edits see the effect of earlier ones.")]
    pub edits: Vec<MonthEdit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MonthEdit {
    /// Add a one-off bill to the month.
    AddBill { bill: Bill },

    /// Remove a bill from this month only.
    RemoveBill { bill_id: String },

    /// Drag a bill to another paycheck and/or another owner.
    MoveBill {
        bill_id: String,
        #[schemars(description = "New owner. The previous owner is remembered as original_owner the first time it changes.")]
        owner: String,
        column: PayPeriod,
    },

    SetPaid { bill_id: String, paid: bool },

    TogglePaid { bill_id: String },

    SetIncome {
        owner: String,
        slot: IncomeSlot,
        amount: Decimal,
    },

    /// Record confirmed bank balances and close the books.
    Close { balances: BTreeMap<String, Decimal> },

    /// Drop the closing balances so the month is recomputed again.
    Reopen,
}

/// A month and the savings goals after a batch of edits.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub record: MonthRecord,
    pub goals: Vec<SavingsGoal>,
}

impl MonthEdits {
    pub fn new(edits: Vec<MonthEdit>) -> Self {
        Self { month: None, edits }
    }

    /// Applies every edit to a copy of `base`. The base record is left as is.
    pub fn apply(&self, base: &MonthRecord) -> Result<MonthRecord> {
        Ok(self.apply_with_goals(base, &[])?.record)
    }

    /// Like [`apply`](Self::apply), also moving the totals of the savings
    /// goals that paid or unpaid bills are linked to.
    pub fn apply_with_goals(&self, base: &MonthRecord, goals: &[SavingsGoal]) -> Result<EditOutcome> {
        let mut record = base.clone();
        let mut goals = goals.to_vec();
        for edit in &self.edits {
            self.apply_single(&mut record, &mut goals, edit)?;
        }
        Ok(EditOutcome { record, goals })
    }

    fn month_label(&self) -> String {
        self.month
            .map(|m| m.to_string())
            .unwrap_or_else(|| "month".to_string())
    }

    fn apply_single(
        &self,
        record: &mut MonthRecord,
        goals: &mut [SavingsGoal],
        edit: &MonthEdit,
    ) -> Result<()> {
        match edit {
            MonthEdit::AddBill { bill } => {
                bill.validate()?;
                if record.find_bill(&bill.id).is_some() {
                    return Err(BudgetError::DuplicateBillId {
                        month: self.month_label(),
                        bill_id: bill.id.clone(),
                    });
                }
                if bill.is_paid {
                    self.move_goal_total(goals, bill, true);
                }
                record.bills.push(bill.clone());
            }

            MonthEdit::RemoveBill { bill_id } => {
                match record.bills.iter().position(|b| &b.id == bill_id) {
                    Some(index) => {
                        let removed = record.bills.remove(index);
                        if removed.is_paid {
                            self.move_goal_total(goals, &removed, false);
                        }
                    }
                    None => {
                        warn!("Cannot remove bill '{}': not in {}", bill_id, self.month_label());
                    }
                }
            }

            MonthEdit::MoveBill {
                bill_id,
                owner,
                column,
            } => {
                if let Some(bill) = self.find_bill_mut(record, bill_id) {
                    if &bill.owner != owner && bill.original_owner.is_none() {
                        bill.original_owner = Some(bill.owner.clone());
                    }
                    bill.owner = owner.clone();
                    bill.column = *column;
                }
            }

            MonthEdit::SetPaid { bill_id, paid } => {
                if let Some(bill) = self.find_bill_mut(record, bill_id) {
                    if bill.is_paid != *paid {
                        bill.is_paid = *paid;
                        self.move_goal_total(goals, bill, *paid);
                    }
                }
            }

            MonthEdit::TogglePaid { bill_id } => {
                if let Some(bill) = self.find_bill_mut(record, bill_id) {
                    bill.is_paid = !bill.is_paid;
                    self.move_goal_total(goals, bill, bill.is_paid);
                }
            }

            MonthEdit::SetIncome {
                owner,
                slot,
                amount,
            } => {
                if *amount < Decimal::ZERO {
                    return Err(BudgetError::ValidationError {
                        month: self.month_label(),
                        details: format!("Income for {} ({:?}) cannot be negative", owner, slot),
                    });
                }
                record
                    .incomes
                    .entry(owner.clone())
                    .or_default()
                    .set(*slot, *amount);
            }

            MonthEdit::Close { balances } => {
                record.closing_balances = Some(balances.clone());
            }

            MonthEdit::Reopen => {
                record.closing_balances = None;
            }
        }

        Ok(())
    }

    fn find_bill_mut<'r>(&self, record: &'r mut MonthRecord, bill_id: &str) -> Option<&'r mut Bill> {
        let found = record.bills.iter_mut().find(|b| b.id == bill_id);
        if found.is_none() {
            warn!("Skipping edit for bill '{}': not in {}", bill_id, self.month_label());
        }
        found
    }

    /// Credits or reverses `bill` against the goal it pays into, if any.
    fn move_goal_total(&self, goals: &mut [SavingsGoal], bill: &Bill, paid: bool) {
        let Some(goal_id) = bill.goal_id.as_deref() else {
            return;
        };
        match goals.iter_mut().find(|g| g.id == goal_id) {
            Some(goal) => goal.record_payment(bill.amount, paid),
            None => warn!(
                "Bill '{}' in {} points at unknown savings goal '{}'",
                bill.id,
                self.month_label(),
                goal_id
            ),
        }
    }

    pub fn get_json_schema() -> serde_json::Result<String> {
        let schema = schemars::schema_for!(MonthEdits);
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::OwnerIncome;
    use rust_decimal_macros::dec;

    fn base() -> MonthRecord {
        MonthRecord::new(vec![
            Bill::new("rent", dec!(1200), "Shared"),
            Bill::new("car", dec!(300), "Alice").with_column(PayPeriod::Pay2),
        ])
        .with_income("Alice", OwnerIncome::new(dec!(1000), dec!(1000)))
    }

    #[test]
    fn test_move_bill_records_original_owner_once() {
        let edits = MonthEdits::new(vec![
            MonthEdit::MoveBill {
                bill_id: "car".to_string(),
                owner: "Bob".to_string(),
                column: PayPeriod::Pay1,
            },
            MonthEdit::MoveBill {
                bill_id: "car".to_string(),
                owner: "Shared".to_string(),
                column: PayPeriod::Pay2,
            },
        ]);

        let record = edits.apply(&base()).unwrap();
        let car = record.find_bill("car").unwrap();
        assert_eq!(car.owner, "Shared");
        assert_eq!(car.column, PayPeriod::Pay2);
        assert_eq!(car.original_owner.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_column_only_move_keeps_original_owner_empty() {
        let edits = MonthEdits::new(vec![MonthEdit::MoveBill {
            bill_id: "rent".to_string(),
            owner: "Shared".to_string(),
            column: PayPeriod::Pay2,
        }]);
        let record = edits.apply(&base()).unwrap();
        let rent = record.find_bill("rent").unwrap();
        assert_eq!(rent.column, PayPeriod::Pay2);
        assert!(rent.original_owner.is_none());
    }

    #[test]
    fn test_paid_flags() {
        let edits = MonthEdits::new(vec![
            MonthEdit::TogglePaid {
                bill_id: "rent".to_string(),
            },
            MonthEdit::SetPaid {
                bill_id: "car".to_string(),
                paid: true,
            },
            MonthEdit::TogglePaid {
                bill_id: "car".to_string(),
            },
        ]);
        let record = edits.apply(&base()).unwrap();
        assert!(record.find_bill("rent").unwrap().is_paid);
        assert!(!record.find_bill("car").unwrap().is_paid);
    }

    #[test]
    fn test_add_and_remove_bills() {
        let edits = MonthEdits::new(vec![
            MonthEdit::AddBill {
                bill: Bill::new("gift", dec!(60), "Alice").with_name("(One-Time) Gift"),
            },
            MonthEdit::RemoveBill {
                bill_id: "rent".to_string(),
            },
            MonthEdit::RemoveBill {
                bill_id: "missing".to_string(),
            },
        ]);
        let record = edits.apply(&base()).unwrap();
        let ids: Vec<&str> = record.bills.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["car", "gift"]);
    }

    #[test]
    fn test_add_bill_rejects_bad_input() {
        let negative = MonthEdits::new(vec![MonthEdit::AddBill {
            bill: Bill::new("refund", dec!(-20), "Alice"),
        }]);
        assert!(matches!(
            negative.apply(&base()),
            Err(BudgetError::NegativeAmount { .. })
        ));

        let duplicate = MonthEdits::new(vec![MonthEdit::AddBill {
            bill: Bill::new("rent", dec!(20), "Alice"),
        }]);
        assert!(matches!(
            duplicate.apply(&base()),
            Err(BudgetError::DuplicateBillId { .. })
        ));
    }

    #[test]
    fn test_set_income() {
        let edits = MonthEdits::new(vec![
            MonthEdit::SetIncome {
                owner: "Bob".to_string(),
                slot: IncomeSlot::Extra,
                amount: dec!(250),
            },
            MonthEdit::SetIncome {
                owner: "Alice".to_string(),
                slot: IncomeSlot::Pay2,
                amount: dec!(1100.50),
            },
        ]);
        let record = edits.apply(&base()).unwrap();
        assert_eq!(record.income("Bob").extra, dec!(250));
        assert_eq!(record.income("Alice").pay1, dec!(1000));
        assert_eq!(record.income("Alice").pay2, dec!(1100.50));

        let negative = MonthEdits::new(vec![MonthEdit::SetIncome {
            owner: "Bob".to_string(),
            slot: IncomeSlot::Pay1,
            amount: dec!(-1),
        }]);
        assert!(negative.apply(&base()).is_err());
    }

    #[test]
    fn test_close_and_reopen() {
        let close = MonthEdits::new(vec![MonthEdit::Close {
            balances: BTreeMap::from([("Alice".to_string(), dec!(812.40))]),
        }]);
        let closed = close.apply(&base()).unwrap();
        assert!(closed.is_closed());
        assert_eq!(closed.closing_balance("Alice"), Some(dec!(812.40)));

        let reopened = MonthEdits::new(vec![MonthEdit::Reopen]).apply(&closed).unwrap();
        assert!(!reopened.is_closed());
        assert_eq!(reopened.bills, closed.bills);
    }

    #[test]
    fn test_edits_from_json() {
        let json = r#"{
            "month": "2024-03",
            "edits": [
                { "action": "move_bill", "bill_id": "rent", "owner": "Alice", "column": "pay2" },
                { "action": "toggle_paid", "bill_id": "rent" },
                { "action": "reopen" }
            ]
        }"#;
        let edits: MonthEdits = serde_json::from_str(json).unwrap();
        assert_eq!(edits.edits.len(), 3);

        let record = edits.apply(&base()).unwrap();
        let rent = record.find_bill("rent").unwrap();
        assert_eq!(rent.owner, "Alice");
        assert_eq!(rent.original_owner.as_deref(), Some("Shared"));
        assert!(rent.is_paid);
    }

    #[test]
    fn test_schema_generation() {
        let schema = MonthEdits::get_json_schema().unwrap();
        assert!(schema.contains("move_bill"));
        assert!(schema.contains("close"));
    }

    fn goals() -> Vec<SavingsGoal> {
        vec![SavingsGoal::new("trip", "Alice", dec!(1000)).with_monthly_min(dec!(200))]
    }

    fn savings_month() -> MonthRecord {
        let mut record = base();
        record
            .bills
            .push(Bill::new("trip-mar", dec!(200), "Alice").for_goal("trip"));
        record
    }

    #[test]
    fn test_paying_savings_bill_moves_goal_total() {
        let pay = MonthEdits::new(vec![MonthEdit::TogglePaid {
            bill_id: "trip-mar".to_string(),
        }]);
        let paid = pay.apply_with_goals(&savings_month(), &goals()).unwrap();
        assert!(paid.record.find_bill("trip-mar").unwrap().is_paid);
        assert_eq!(paid.goals[0].total_paid, dec!(200));
        assert_eq!(paid.goals[0].progress_percent(), 20);

        let unpaid = pay.apply_with_goals(&paid.record, &paid.goals).unwrap();
        assert_eq!(unpaid.goals[0].total_paid, dec!(0));
    }

    #[test]
    fn test_set_paid_only_counts_real_changes() {
        let edits = MonthEdits::new(vec![
            MonthEdit::SetPaid {
                bill_id: "trip-mar".to_string(),
                paid: true,
            },
            MonthEdit::SetPaid {
                bill_id: "trip-mar".to_string(),
                paid: true,
            },
            MonthEdit::SetPaid {
                bill_id: "rent".to_string(),
                paid: true,
            },
        ]);
        let outcome = edits.apply_with_goals(&savings_month(), &goals()).unwrap();
        assert_eq!(outcome.goals[0].total_paid, dec!(200));
    }

    #[test]
    fn test_removing_paid_savings_bill_reverses_payment() {
        let edits = MonthEdits::new(vec![
            MonthEdit::SetPaid {
                bill_id: "trip-mar".to_string(),
                paid: true,
            },
            MonthEdit::RemoveBill {
                bill_id: "trip-mar".to_string(),
            },
        ]);
        let outcome = edits.apply_with_goals(&savings_month(), &goals()).unwrap();
        assert!(outcome.record.find_bill("trip-mar").is_none());
        assert_eq!(outcome.goals[0].total_paid, dec!(0));

        // Removing an unpaid savings bill leaves the goal alone.
        let mut funded = goals();
        funded[0].total_paid = dec!(400);
        let remove = MonthEdits::new(vec![MonthEdit::RemoveBill {
            bill_id: "trip-mar".to_string(),
        }]);
        let outcome = remove.apply_with_goals(&savings_month(), &funded).unwrap();
        assert_eq!(outcome.goals[0].total_paid, dec!(400));
    }

    #[test]
    fn test_extra_paid_contribution_and_unknown_goal() {
        let edits = MonthEdits::new(vec![
            MonthEdit::AddBill {
                bill: Bill::new("trip-extra", dec!(75), "Alice")
                    .for_goal("trip")
                    .paid(),
            },
            MonthEdit::AddBill {
                bill: Bill::new("orphan", dec!(50), "Alice").for_goal("gone").paid(),
            },
        ]);
        let outcome = edits.apply_with_goals(&base(), &goals()).unwrap();
        assert_eq!(outcome.goals.len(), 1);
        assert_eq!(outcome.goals[0].total_paid, dec!(75));
        assert_eq!(outcome.record.bills.len(), 4);
    }
}
