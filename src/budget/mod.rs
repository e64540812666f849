//! Monthly spending caps per category and the progress made against them.

mod core;
mod create_endpoint;
mod progress;
mod progress_endpoint;

pub use core::{
    Budget, BudgetId, BudgetWithCategory, create_budget, create_budget_table,
    list_budgets_for_period,
};
pub use create_endpoint::{CreateBudgetRequest, create_budget_endpoint};
pub use progress::{BudgetProgress, build_budget_progress};
pub use progress_endpoint::budget_progress_endpoint;

pub(crate) use create_endpoint::CreateBudgetState;
pub(crate) use progress_endpoint::BudgetProgressState;
