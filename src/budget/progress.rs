//! Turns budgets and spending totals into progress figures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    budget::core::{BudgetId, BudgetWithCategory},
    category::CategoryId,
};

/// How far through a budget's cap the month's spending has gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetProgress {
    /// The ID of the budget.
    pub budget_id: BudgetId,
    /// The ID of the category the cap applies to.
    pub category_id: CategoryId,
    /// The display name of the category.
    pub category_name: String,
    /// The spending cap in dollars.
    pub amount: f64,
    /// The total spent in the category this month.
    pub spent: f64,
    /// The fraction of the cap used, from 0.0 to 1.0. Overspending is clamped
    /// to 1.0.
    pub progress: f64,
    /// The cap minus the spending, negative when overspent.
    pub remaining: f64,
}

/// Combine budgets with the month's spending totals per category.
///
/// Budgets with no recorded spending show zero spent. A cap of zero or less
/// counts as fully used as soon as anything is spent.
pub fn build_budget_progress(
    budgets: &[BudgetWithCategory],
    spent_by_category: &HashMap<CategoryId, f64>,
) -> Vec<BudgetProgress> {
    budgets
        .iter()
        .map(|entry| {
            let spent = spent_by_category
                .get(&entry.budget.category_id)
                .copied()
                .unwrap_or(0.0);
            let amount = entry.budget.amount;

            BudgetProgress {
                budget_id: entry.budget.id,
                category_id: entry.budget.category_id,
                category_name: entry.category_name.clone(),
                amount,
                spent,
                progress: progress_fraction(spent, amount),
                remaining: amount - spent,
            }
        })
        .collect()
}

fn progress_fraction(spent: f64, cap: f64) -> f64 {
    if cap > 0.0 {
        (spent / cap).min(1.0)
    } else if spent > 0.0 {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod build_budget_progress_tests {
    use std::collections::HashMap;

    use time::Month;

    use crate::{
        budget::core::{Budget, BudgetWithCategory},
        period::Period,
        user::UserID,
    };

    use super::build_budget_progress;

    fn budget_with_category(id: i64, category_id: i64, amount: f64) -> BudgetWithCategory {
        BudgetWithCategory {
            budget: Budget {
                id,
                user_id: UserID::new(1),
                category_id,
                period: Period::new(2025, Month::June),
                amount,
            },
            category_name: format!("category {category_id}"),
        }
    }

    #[test]
    fn partial_spending_gives_fraction_of_cap() {
        let budgets = vec![budget_with_category(1, 1, 100.0)];
        let spent = HashMap::from([(1, 90.0)]);

        let progress = build_budget_progress(&budgets, &spent);

        assert_eq!(progress.len(), 1);
        assert_eq!(progress[0].progress, 0.9);
        assert_eq!(progress[0].remaining, 10.0);
    }

    #[test]
    fn overspending_clamps_progress_but_not_remaining() {
        let budgets = vec![budget_with_category(1, 1, 100.0)];
        let spent = HashMap::from([(1, 150.0)]);

        let progress = build_budget_progress(&budgets, &spent);

        assert_eq!(progress[0].progress, 1.0);
        assert_eq!(progress[0].remaining, -50.0);
    }

    #[test]
    fn no_spending_gives_zero_progress() {
        let budgets = vec![budget_with_category(1, 1, 100.0)];
        let spent = HashMap::new();

        let progress = build_budget_progress(&budgets, &spent);

        assert_eq!(progress[0].spent, 0.0);
        assert_eq!(progress[0].progress, 0.0);
        assert_eq!(progress[0].remaining, 100.0);
    }

    #[test]
    fn zero_cap_counts_as_fully_used_once_anything_is_spent() {
        let budgets = vec![budget_with_category(1, 1, 0.0)];

        let untouched = build_budget_progress(&budgets, &HashMap::new());
        assert_eq!(untouched[0].progress, 0.0);

        let spent = build_budget_progress(&budgets, &HashMap::from([(1, 0.01)]));
        assert_eq!(spent[0].progress, 1.0);
    }

    #[test]
    fn negative_cap_behaves_like_zero_cap() {
        let budgets = vec![budget_with_category(1, 1, -50.0)];
        let spent = HashMap::from([(1, 10.0)]);

        let progress = build_budget_progress(&budgets, &spent);

        assert_eq!(progress[0].progress, 1.0);
        assert_eq!(progress[0].remaining, -60.0);
    }

    #[test]
    fn spending_is_matched_by_category() {
        let budgets = vec![
            budget_with_category(1, 1, 100.0),
            budget_with_category(2, 2, 200.0),
        ];
        let spent = HashMap::from([(2, 50.0)]);

        let progress = build_budget_progress(&budgets, &spent);

        assert_eq!(progress[0].spent, 0.0);
        assert_eq!(progress[1].spent, 50.0);
        assert_eq!(progress[1].progress, 0.25);
    }
}
