//! # Finance Dashboard Engine
//!
//! Turns independently stored ledger records into the derived views of a
//! personal-finance dashboard, and caches the assembled result per user.
//!
//! ## Core Concepts
//!
//! - **Paid expense**: an expense whose payment date is set and not after today
//! - **Upcoming bill**: an unpaid expense due within the forward window (30 days by default)
//! - **Snapshot**: one fully assembled dashboard pass (balances, charts, bills)
//! - **Reconciliation**: comparing a spending plan's category budgets with actual spend
//! - **Unlisted category**: the synthetic row collecting spend without a budget
//!
//! All month boundaries are computed in UTC.
//!
//! ## Example
//!
//! ```rust,ignore
//! use finance_dashboard_engine::*;
//! use std::sync::Arc;
//!
//! let ledger = Arc::new(InMemoryLedger::new());
//! ledger.add_account(
//!     "user-1",
//!     Account {
//!         id: "checking".to_string(),
//!         display_name: "Checking".to_string(),
//!         bank_name: "First Bank".to_string(),
//!     },
//! );
//!
//! let engine = DashboardEngine::new(
//!     DashboardSources::from_ledger(ledger.clone()),
//!     Arc::new(SystemClock),
//!     EngineConfig::default(),
//! )
//! .unwrap();
//!
//! let snapshot = engine.dashboard("user-1").unwrap();
//! println!("Total balance: {:.2}", snapshot.summary_cards.total_balance);
//!
//! let rows = engine.compute_planned_vs_actual("user-1", 0, 0).unwrap();
//! ```

pub mod balance;
pub mod bills;
pub mod cache;
pub mod charts;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod goals;
pub mod reconciler;
pub mod recurrence;
pub mod schema;
pub mod sources;
pub mod utils;

pub use balance::{select_paid_expenses, BalanceCalculator, PaidExpense};
pub use bills::{select_upcoming_bills, DEFAULT_UPCOMING_WINDOW_DAYS};
pub use cache::SnapshotCache;
pub use charts::{expense_categories_for_month, revenue_expense_series, DEFAULT_TRAILING_MONTHS};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{DashboardEngine, DashboardSources};
pub use error::{DashboardError, Result};
pub use goals::{format_goals_progress, GOALS_UNAVAILABLE, NO_GOALS_DEFINED};
pub use reconciler::{spent_percentage, PlannedVsActualReconciler};
pub use recurrence::{create_expense_record, expand_occurrences, ExpansionOutcome, RecurringExpander};
pub use schema::*;
pub use sources::*;
pub use utils::*;

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Reconciles one month of expenses against `plan` with default labels and
/// the default unlisted bucket.
pub fn reconcile_month(
    expenses: &[ExpenseRecord],
    plan: Option<&SpendingPlan>,
    year: i32,
    month: u32,
) -> Result<Vec<PlannedVsActualCategory>> {
    let window = MonthWindow::for_month(year, month)?;
    let config = EngineConfig::default();
    let labels = HashMap::new();
    Ok(PlannedVsActualReconciler::new(&config, &labels).reconcile(expenses, plan, &window))
}

/// Total balance across `accounts` as of `now`.
pub fn total_balance(
    accounts: &[Account],
    incomes: &[IncomeRecord],
    expenses: &[ExpenseRecord],
    now: DateTime<Utc>,
) -> f64 {
    let paid = select_paid_expenses(expenses, now.date_naive());
    BalanceCalculator::new(accounts, incomes, paid).total_balance()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_reconcile_month_rejects_bad_month() {
        assert!(matches!(
            reconcile_month(&[], None, 2024, 13),
            Err(DashboardError::InvalidInput(_))
        ));
        assert!(reconcile_month(&[], None, 2024, 2).unwrap().is_empty());
    }

    #[test]
    fn test_total_balance_ignores_future_payments() {
        let accounts = vec![Account {
            id: "a".to_string(),
            ..Default::default()
        }];
        let incomes = vec![IncomeRecord {
            id: "i".to_string(),
            bank_account_id: "a".to_string(),
            amount: 100.0,
            receipt_date: "2024-03-01".to_string(),
            user_id: "u".to_string(),
            ..Default::default()
        }];
        let expenses = vec![
            ExpenseRecord {
                id: "now".to_string(),
                due_date: "2024-03-02".to_string(),
                payment_date: Some("2024-03-02".to_string()),
                amount: 30.0,
                bank_paid_from: Some("a".to_string()),
                user_id: "u".to_string(),
                ..Default::default()
            },
            ExpenseRecord {
                id: "later".to_string(),
                due_date: "2024-04-02".to_string(),
                payment_date: Some("2024-04-02".to_string()),
                amount: 50.0,
                bank_paid_from: Some("a".to_string()),
                user_id: "u".to_string(),
                ..Default::default()
            },
        ];

        let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        assert_eq!(total_balance(&accounts, &incomes, &expenses, now), 70.0);
    }
}
