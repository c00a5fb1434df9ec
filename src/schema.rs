use crate::error::{BudgetError, Result};
use crate::savings::{active_goals, SavingsGoal};
use crate::utils::{validate_day_of_month, MonthKey};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub const DEFAULT_CATEGORY: &str = "other";
pub const DEFAULT_SHARED_POOL_NAME: &str = "Shared";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PayPeriod {
    #[schemars(description = "The first paycheck of the month")]
    Pay1,

    #[schemars(description = "The second paycheck of the month")]
    Pay2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum IncomeSlot {
    Pay1,
    Pay2,
    #[schemars(description = "Income outside the two paychecks (bonus, side work). Not matched against bills.")]
    Extra,
}

impl From<PayPeriod> for IncomeSlot {
    fn from(period: PayPeriod) -> Self {
        match period {
            PayPeriod::Pay1 => IncomeSlot::Pay1,
            PayPeriod::Pay2 => IncomeSlot::Pay2,
        }
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_due_day() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Bill {
    #[schemars(description = "Stable identifier, unique within a month. Never changes after creation.")]
    pub id: String,

    #[serde(default)]
    #[schemars(description = "Display label (e.g., 'Rent', 'Car Insurance')")]
    pub name: String,

    #[schemars(description = "Non-negative amount owed")]
    pub amount: Decimal,

    #[schemars(description = "The household member or shared pool responsible for paying this bill")]
    pub owner: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Owner before the bill was first reassigned to someone else")]
    pub original_owner: Option<String>,

    #[schemars(description = "Which paycheck this bill is paid from")]
    pub column: PayPeriod,

    #[serde(default = "default_category")]
    #[schemars(description = "Reporting category. Irrelevant to balancing.")]
    pub category: String,

    #[serde(default)]
    #[schemars(description = "Set once the bill has been paid. Paid bills keep their column when the household is re-balanced.")]
    pub is_paid: bool,

    #[serde(default = "default_due_day")]
    #[schemars(description = "Day of month the bill is due (1-31)")]
    pub due_day: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Savings goal this bill pays into. Paying or unpaying it moves the goal's total.")]
    pub goal_id: Option<String>,
}

impl Bill {
    pub fn new(id: impl Into<String>, amount: Decimal, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            amount,
            owner: owner.into(),
            original_owner: None,
            column: PayPeriod::Pay1,
            category: default_category(),
            is_paid: false,
            due_day: default_due_day(),
            goal_id: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_column(mut self, column: PayPeriod) -> Self {
        self.column = column;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_due_day(mut self, due_day: u32) -> Self {
        self.due_day = due_day;
        self
    }

    pub fn paid(mut self) -> Self {
        self.is_paid = true;
        self
    }

    pub fn for_goal(mut self, goal_id: impl Into<String>) -> Self {
        self.goal_id = Some(goal_id.into());
        self
    }

    pub fn is_savings(&self) -> bool {
        self.goal_id.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if self.amount < Decimal::ZERO {
            return Err(BudgetError::NegativeAmount {
                bill_id: self.id.clone(),
                amount: self.amount,
            });
        }
        if !validate_day_of_month(self.due_day) {
            return Err(BudgetError::InvalidDueDay {
                bill_id: self.id.clone(),
                day: self.due_day,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OwnerIncome {
    #[serde(default)]
    pub pay1: Decimal,

    #[serde(default)]
    pub pay2: Decimal,

    #[serde(default)]
    pub extra: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Day of month the first paycheck lands (1-31)")]
    pub pay1_day: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Day of month the second paycheck lands (1-31)")]
    pub pay2_day: Option<u32>,
}

impl OwnerIncome {
    pub fn new(pay1: Decimal, pay2: Decimal) -> Self {
        Self {
            pay1,
            pay2,
            ..Default::default()
        }
    }

    pub fn get(&self, slot: IncomeSlot) -> Decimal {
        match slot {
            IncomeSlot::Pay1 => self.pay1,
            IncomeSlot::Pay2 => self.pay2,
            IncomeSlot::Extra => self.extra,
        }
    }

    pub fn set(&mut self, slot: IncomeSlot, amount: Decimal) {
        match slot {
            IncomeSlot::Pay1 => self.pay1 = amount,
            IncomeSlot::Pay2 => self.pay2 = amount,
            IncomeSlot::Extra => self.extra = amount,
        }
    }

    pub fn for_period(&self, period: PayPeriod) -> Decimal {
        self.get(period.into())
    }

    pub fn total(&self) -> Decimal {
        self.pay1 + self.pay2 + self.extra
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MonthRecord {
    #[serde(default)]
    pub bills: Vec<Bill>,

    #[serde(default)]
    #[schemars(description = "Income per owner for this month")]
    pub incomes: BTreeMap<String, OwnerIncome>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "Human-confirmed actual balances per owner. Presence marks the month closed and freezes its rollover contribution."
    )]
    pub closing_balances: Option<BTreeMap<String, Decimal>>,
}

impl MonthRecord {
    pub fn new(bills: Vec<Bill>) -> Self {
        Self {
            bills,
            ..Default::default()
        }
    }

    pub fn with_income(mut self, owner: impl Into<String>, income: OwnerIncome) -> Self {
        self.incomes.insert(owner.into(), income);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closing_balances.is_some()
    }

    pub fn closing_balance(&self, owner: &str) -> Option<Decimal> {
        self.closing_balances
            .as_ref()
            .and_then(|balances| balances.get(owner))
            .copied()
    }

    /// Income for `owner`; owners with no entry earn nothing this month.
    pub fn income(&self, owner: &str) -> OwnerIncome {
        self.incomes.get(owner).cloned().unwrap_or_default()
    }

    pub fn find_bill(&self, bill_id: &str) -> Option<&Bill> {
        self.bills.iter().find(|b| b.id == bill_id)
    }

    pub fn bills_for<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a Bill> + 'a {
        self.bills.iter().filter(move |b| b.owner == owner)
    }

    pub fn column_total(&self, owner: &str, column: PayPeriod) -> Decimal {
        self.bills_for(owner)
            .filter(|b| b.column == column)
            .map(|b| b.amount)
            .sum()
    }

    pub fn total_bills(&self) -> Decimal {
        self.bills.iter().map(|b| b.amount).sum()
    }

    pub fn validate(&self, month: MonthKey) -> Result<()> {
        let mut seen = HashSet::new();
        for bill in &self.bills {
            bill.validate()?;
            if !seen.insert(bill.id.as_str()) {
                return Err(BudgetError::DuplicateBillId {
                    month: month.to_string(),
                    bill_id: bill.id.clone(),
                });
            }
        }

        for (owner, income) in &self.incomes {
            for day in [income.pay1_day, income.pay2_day].into_iter().flatten() {
                if !validate_day_of_month(day) {
                    return Err(BudgetError::InvalidPayDay {
                        owner: owner.clone(),
                        day,
                    });
                }
            }
        }

        Ok(())
    }
}

pub type MonthHistory = BTreeMap<MonthKey, MonthRecord>;

fn default_shared_pool_name() -> String {
    DEFAULT_SHARED_POOL_NAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SharedPool {
    #[serde(default = "default_shared_pool_name")]
    #[schemars(description = "Owner name used on bills that belong to the shared pool")]
    pub name: String,

    #[serde(default)]
    #[schemars(
        description = "When true, shared bills are split evenly across all household members. The pool has no income of its own."
    )]
    pub enabled: bool,
}

impl Default for SharedPool {
    fn default() -> Self {
        Self {
            name: default_shared_pool_name(),
            enabled: false,
        }
    }
}

impl SharedPool {
    pub fn enabled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HouseholdConfig {
    #[schemars(description = "Household members in display order")]
    pub owners: Vec<String>,

    #[serde(default)]
    pub shared_pool: SharedPool,

    #[schemars(description = "First month the household tracked (YYYY-MM). Rollover walks stop here.")]
    pub start_month: MonthKey,

    #[serde(default)]
    #[schemars(description = "Free cash each member had at the start month")]
    pub starting_balances: BTreeMap<String, Decimal>,
}

impl HouseholdConfig {
    pub fn new(owners: Vec<String>, start_month: MonthKey) -> Self {
        Self {
            owners,
            shared_pool: SharedPool::default(),
            start_month,
            starting_balances: BTreeMap::new(),
        }
    }

    /// Shared bills are split across the current member count, never zero.
    pub fn member_count(&self) -> usize {
        self.owners.len().max(1)
    }

    pub fn active_shared_pool(&self) -> Option<&SharedPool> {
        self.shared_pool.enabled.then_some(&self.shared_pool)
    }

    pub fn is_owner(&self, name: &str) -> bool {
        self.owners.iter().any(|o| o == name)
    }

    /// True for members and, when enabled, the shared pool.
    pub fn is_known_scope(&self, name: &str) -> bool {
        self.is_owner(name)
            || self
                .active_shared_pool()
                .is_some_and(|pool| pool.name == name)
    }

    pub fn validate(&self) -> Result<()> {
        let config_scope = self.start_month.to_string();
        let mut seen = HashSet::new();
        for owner in &self.owners {
            if owner.trim().is_empty() {
                return Err(BudgetError::ValidationError {
                    month: config_scope,
                    details: "Owner names must not be empty".to_string(),
                });
            }
            if !seen.insert(owner.as_str()) {
                return Err(BudgetError::ValidationError {
                    month: config_scope,
                    details: format!("Owner '{}' is listed more than once", owner),
                });
            }
        }

        if self.shared_pool.enabled && self.is_owner(&self.shared_pool.name) {
            return Err(BudgetError::ValidationError {
                month: config_scope,
                details: format!(
                    "Shared pool name '{}' collides with a household member",
                    self.shared_pool.name
                ),
            });
        }

        for owner in self.starting_balances.keys() {
            if !self.is_owner(owner) {
                return Err(BudgetError::UnknownOwner(owner.clone()));
            }
        }

        Ok(())
    }
}

/// The whole household state as the host application stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HouseholdDocument {
    pub config: HouseholdConfig,

    #[serde(default)]
    #[schemars(description = "Month records keyed by YYYY-MM. Months never visited are absent.")]
    pub months: MonthHistory,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub savings_goals: Vec<SavingsGoal>,
}

impl HouseholdDocument {
    pub fn new(config: HouseholdConfig) -> Self {
        Self {
            config,
            months: MonthHistory::new(),
            savings_goals: Vec::new(),
        }
    }

    pub fn with_goal(mut self, goal: SavingsGoal) -> Self {
        self.savings_goals.push(goal);
        self
    }

    pub fn goal(&self, goal_id: &str) -> Option<&SavingsGoal> {
        self.savings_goals.iter().find(|g| g.id == goal_id)
    }

    pub fn active_savings_goals(&self) -> Vec<&SavingsGoal> {
        active_goals(&self.savings_goals).collect()
    }

    pub fn with_month(mut self, key: MonthKey, record: MonthRecord) -> Self {
        self.months.insert(key, record);
        self
    }

    pub fn month(&self, key: MonthKey) -> Option<&MonthRecord> {
        self.months.get(&key)
    }

    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        for (key, record) in &self.months {
            record.validate(*key)?;
        }

        let mut goal_ids = HashSet::new();
        for goal in &self.savings_goals {
            goal.validate()?;
            if !goal_ids.insert(goal.id.as_str()) {
                return Err(BudgetError::InvalidSavingsGoal {
                    goal_id: goal.id.clone(),
                    details: "id is used by more than one goal".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Parses and validates a stored document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: HouseholdDocument = serde_json::from_str(json)?;
        document.validate()?;
        Ok(document)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(HouseholdDocument)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
