use crate::error::{BudgetError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A sinking fund or repayment that monthly savings bills pay into.
///
/// `total_paid` is a running ledger: it moves whenever a bill linked to the
/// goal is marked paid or unpaid, or a paid one is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SavingsGoal {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[schemars(description = "Member or shared pool the goal belongs to")]
    pub owner: String,

    #[schemars(description = "Total amount to save or repay")]
    pub target: Decimal,

    #[serde(default)]
    #[schemars(description = "Base payment added to each month while the goal is active")]
    pub monthly_min: Decimal,

    #[serde(default)]
    pub total_paid: Decimal,
}

impl SavingsGoal {
    pub fn new(id: impl Into<String>, owner: impl Into<String>, target: Decimal) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            owner: owner.into(),
            target,
            monthly_min: Decimal::ZERO,
            total_paid: Decimal::ZERO,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_monthly_min(mut self, monthly_min: Decimal) -> Self {
        self.monthly_min = monthly_min;
        self
    }

    pub fn is_complete(&self) -> bool {
        self.total_paid >= self.target
    }

    pub fn remaining(&self) -> Decimal {
        (self.target - self.total_paid).max(Decimal::ZERO)
    }

    /// Whole-number percentage of the target paid so far, capped at 100.
    /// Halves round up.
    pub fn progress_percent(&self) -> u32 {
        if self.target <= Decimal::ZERO {
            return 100;
        }

        (self.total_paid / self.target * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
            .to_u32()
            .unwrap_or(0)
    }

    /// Credits (`paid == true`) or reverses a payment of `amount`.
    pub fn record_payment(&mut self, amount: Decimal, paid: bool) {
        if paid {
            self.total_paid += amount;
        } else {
            self.total_paid -= amount;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |details: &str| BudgetError::InvalidSavingsGoal {
            goal_id: self.id.clone(),
            details: details.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if self.target < Decimal::ZERO {
            return Err(invalid("target cannot be negative"));
        }
        if self.monthly_min < Decimal::ZERO {
            return Err(invalid("monthly minimum cannot be negative"));
        }
        Ok(())
    }
}

/// Goals that still need money, in stored order.
pub fn active_goals(goals: &[SavingsGoal]) -> impl Iterator<Item = &SavingsGoal> {
    goals.iter().filter(|goal| !goal.is_complete())
}
