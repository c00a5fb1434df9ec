use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BudgetError {
    #[error("Invalid month key '{0}': expected YYYY-MM")]
    InvalidMonthKey(String),

    #[error("Bill '{bill_id}' has negative amount {amount}")]
    NegativeAmount { bill_id: String, amount: Decimal },

    #[error("Bill '{bill_id}' has invalid due day {day}: must be between 1 and 31")]
    InvalidDueDay { bill_id: String, day: u32 },

    #[error("Owner '{owner}' has invalid pay day {day}: must be between 1 and 31")]
    InvalidPayDay { owner: String, day: u32 },

    #[error("Month {month} contains bill id '{bill_id}' more than once")]
    DuplicateBillId { month: String, bill_id: String },

    #[error("Savings goal '{goal_id}' is invalid: {details}")]
    InvalidSavingsGoal { goal_id: String, details: String },

    #[error("Unknown owner: {0}")]
    UnknownOwner(String),

    #[error("Validation error in {month}: {details}")]
    ValidationError { month: String, details: String },

    #[error("Rollover walk for {person} from {target} hit the iteration cap (partial total {partial}); check the start month")]
    RolloverWalkExhausted {
        person: String,
        target: String,
        partial: Decimal,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BudgetError>;
