use crate::config::EngineConfig;
use crate::schema::{ExpenseRecord, PlannedVsActualCategory, SpendingPlan};
use crate::utils::{round_to_two_decimals, MonthWindow};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};

/// Compares a spending plan's category budgets with what was actually spent in
/// one month. Expenses are attributed to the month of their due date.
pub struct PlannedVsActualReconciler<'a> {
    config: &'a EngineConfig,
    labels: &'a HashMap<String, String>,
}

impl<'a> PlannedVsActualReconciler<'a> {
    pub fn new(config: &'a EngineConfig, labels: &'a HashMap<String, String>) -> Self {
        Self { config, labels }
    }

    /// Rows for every budgeted category that saw spending, ordered by category
    /// key, followed by one row for all unbudgeted spending. Empty when the
    /// month has no expenses or there is no active plan.
    pub fn reconcile(
        &self,
        expenses: &[ExpenseRecord],
        plan: Option<&SpendingPlan>,
        window: &MonthWindow,
    ) -> Vec<PlannedVsActualCategory> {
        let actual = actual_by_category(expenses, window);
        if actual.is_empty() {
            debug!(
                "No expenses due in {:04}-{:02}; nothing to reconcile",
                window.year(),
                window.month()
            );
            return Vec::new();
        }

        let Some(plan) = plan.filter(|p| p.has_active_budgets()) else {
            debug!("No active spending plan; nothing to reconcile");
            return Vec::new();
        };

        let mut planned: BTreeMap<&str, f64> = BTreeMap::new();
        for budget in plan.active_budgets() {
            *planned.entry(budget.category.trim()).or_insert(0.0) += budget.amount;
        }

        let income = plan.monthly_income;
        let mut rows = Vec::with_capacity(planned.len() + 1);

        for (&category, &planned_amount) in &planned {
            let Some(&actual_amount) = actual.get(category) else {
                continue;
            };
            rows.push(PlannedVsActualCategory {
                category: category.to_string(),
                label: self.label_for(category),
                planned_amount: round_to_two_decimals(planned_amount),
                actual_amount: round_to_two_decimals(actual_amount),
                spent_percentage: spent_percentage(actual_amount, income),
            });
        }

        let unlisted: f64 = actual
            .iter()
            .filter(|(category, _)| !planned.contains_key(category.as_str()))
            .map(|(_, amount)| amount)
            .sum();

        if unlisted != 0.0 {
            rows.push(PlannedVsActualCategory {
                category: self.config.unlisted_category_key.clone(),
                label: self.config.unlisted_category_label.clone(),
                planned_amount: 0.0,
                actual_amount: round_to_two_decimals(unlisted),
                spent_percentage: spent_percentage(unlisted, income),
            });
        }

        debug!("Reconciled {} categories", rows.len());
        rows
    }

    fn label_for(&self, category: &str) -> String {
        match self.labels.get(category) {
            Some(label) if !label.trim().is_empty() => label.clone(),
            _ => category.to_string(),
        }
    }
}

/// Share of monthly income, not of the category budget.
pub fn spent_percentage(actual: f64, monthly_income: f64) -> f64 {
    if monthly_income <= 0.0 {
        return 0.0;
    }
    round_to_two_decimals(actual / monthly_income * 100.0)
}

fn actual_by_category(expenses: &[ExpenseRecord], window: &MonthWindow) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();

    for expense in expenses {
        match expense.due_date() {
            Ok(due) if window.contains_date(due) => {
                *totals
                    .entry(expense.category.trim().to_string())
                    .or_insert(0.0) += expense.amount;
            }
            Ok(_) => {}
            Err(e) => warn!("Skipping expense {} in reconciliation: {}", expense.id, e),
        }
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CategoryBudget;

    fn expense(category: &str, amount: f64, due: &str) -> ExpenseRecord {
        ExpenseRecord {
            id: format!("{}-{}", category, due),
            category: category.to_string(),
            due_date: due.to_string(),
            amount,
            user_id: "u".to_string(),
            ..Default::default()
        }
    }

    fn plan(income: f64, budgets: &[(&str, f64)]) -> SpendingPlan {
        SpendingPlan {
            user_id: "u".to_string(),
            monthly_income: income,
            category_budgets: budgets
                .iter()
                .map(|(category, amount)| CategoryBudget {
                    category: category.to_string(),
                    amount: *amount,
                    percentage: 0.0,
                })
                .collect(),
            ..Default::default()
        }
    }

    fn march() -> MonthWindow {
        MonthWindow::for_month(2024, 3).unwrap()
    }

    #[test]
    fn test_budgeted_and_unlisted_rows() {
        let config = EngineConfig::default();
        let labels = HashMap::new();
        let reconciler = PlannedVsActualReconciler::new(&config, &labels);

        let expenses = vec![
            expense("food", 50.0, "2024-03-03"),
            expense("food", 25.0, "2024-03-20"),
            expense("taxi", 10.0, "2024-03-11"),
            expense("food", 400.0, "2024-04-01"),
        ];
        let plan = plan(1000.0, &[("food", 100.0)]);

        let rows = reconciler.reconcile(&expenses, Some(&plan), &march());
        assert_eq!(
            rows,
            vec![
                PlannedVsActualCategory {
                    category: "food".to_string(),
                    label: "food".to_string(),
                    planned_amount: 100.0,
                    actual_amount: 75.0,
                    spent_percentage: 7.5,
                },
                PlannedVsActualCategory {
                    category: "unlisted".to_string(),
                    label: "Not budgeted".to_string(),
                    planned_amount: 0.0,
                    actual_amount: 10.0,
                    spent_percentage: 1.0,
                },
            ]
        );
    }

    #[test]
    fn test_no_expenses_in_period_is_empty() {
        let config = EngineConfig::default();
        let labels = HashMap::new();
        let reconciler = PlannedVsActualReconciler::new(&config, &labels);

        let expenses = vec![expense("food", 50.0, "2024-02-03")];
        let plan = plan(1000.0, &[("food", 100.0)]);
        assert!(reconciler.reconcile(&expenses, Some(&plan), &march()).is_empty());
    }

    #[test]
    fn test_missing_or_inactive_plan_is_empty() {
        let config = EngineConfig::default();
        let labels = HashMap::new();
        let reconciler = PlannedVsActualReconciler::new(&config, &labels);
        let expenses = vec![expense("food", 50.0, "2024-03-03")];

        assert!(reconciler.reconcile(&expenses, None, &march()).is_empty());

        let inactive = plan(1000.0, &[("food", 0.0)]);
        assert!(reconciler.reconcile(&expenses, Some(&inactive), &march()).is_empty());
    }

    #[test]
    fn test_budgets_without_spend_are_omitted_and_sorted() {
        let config = EngineConfig::default();
        let mut labels = HashMap::new();
        labels.insert("rent".to_string(), "Housing".to_string());
        labels.insert("food".to_string(), String::new());
        let reconciler = PlannedVsActualReconciler::new(&config, &labels);

        let expenses = vec![
            expense("rent", 900.0, "2024-03-01"),
            expense("food", 20.0, "2024-03-02"),
        ];
        let plan = plan(
            3000.0,
            &[("rent", 1000.0), ("travel", 200.0), ("food", 150.0), ("food", 50.0)],
        );

        let rows = reconciler.reconcile(&expenses, Some(&plan), &march());
        let categories: Vec<_> = rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["food", "rent"]);

        assert_eq!(rows[0].label, "food");
        assert_eq!(rows[0].planned_amount, 200.0);
        assert_eq!(rows[1].label, "Housing");
        assert_eq!(rows[1].spent_percentage, 30.0);
    }

    #[test]
    fn test_inactive_budget_spend_counts_as_unlisted() {
        let config = EngineConfig::default();
        let labels = HashMap::new();
        let reconciler = PlannedVsActualReconciler::new(&config, &labels);

        let expenses = vec![
            expense("food", 30.0, "2024-03-03"),
            expense("gifts", 12.5, "2024-03-04"),
            expense("", 2.5, "2024-03-05"),
            expense("bad", 99.0, "March 5th"),
        ];
        let plan = plan(500.0, &[("food", 100.0), ("gifts", 0.0)]);

        let rows = reconciler.reconcile(&expenses, Some(&plan), &march());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].category, "unlisted");
        assert_eq!(rows[1].actual_amount, 15.0);
        assert_eq!(rows[1].spent_percentage, 3.0);
    }

    #[test]
    fn test_spent_percentage_uses_income() {
        assert_eq!(spent_percentage(75.0, 1000.0), 7.5);
        assert_eq!(spent_percentage(1.0, 3.0), 33.33);
        assert_eq!(spent_percentage(50.0, 0.0), 0.0);
    }
}
