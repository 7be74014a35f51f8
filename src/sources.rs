//! Collaborator interfaces the engine consumes, plus an in-memory ledger that
//! implements all of them.

use crate::error::{DashboardError, Result};
use crate::schema::{
    Account, ExpenseRecord, IncomeRecord, IncomeRecordFilter, ProfileGoals, SpendingPlan,
};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

pub const ACCOUNTS_SOURCE: &str = "accounts";
pub const INCOMES_SOURCE: &str = "incomes";
pub const EXPENSES_SOURCE: &str = "expenses";
pub const SPENDING_PLAN_SOURCE: &str = "spending_plan";
pub const GOALS_SOURCE: &str = "goals";
pub const CATEGORIES_SOURCE: &str = "categories";
pub const CREATE_EXPENSE_SOURCE: &str = "create_expense";

pub trait AccountSource: Send + Sync {
    fn list_accounts(&self, user_id: &str) -> Result<Vec<Account>>;
}

pub trait IncomeSource: Send + Sync {
    fn list_income_records(
        &self,
        user_id: &str,
        filter: &IncomeRecordFilter,
    ) -> Result<Vec<IncomeRecord>>;
}

pub trait ExpenseSource: Send + Sync {
    fn list_expense_records(&self, user_id: &str) -> Result<Vec<ExpenseRecord>>;
}

/// Persists one expense record and returns it as stored (with its id).
pub trait ExpenseSink: Send + Sync {
    fn create_expense_record(&self, record: &ExpenseRecord) -> Result<ExpenseRecord>;
}

pub trait SpendingPlanSource: Send + Sync {
    /// `Ok(None)` when the user has no plan.
    fn spending_plan(&self, user_id: &str) -> Result<Option<SpendingPlan>>;
}

pub trait GoalSource: Send + Sync {
    fn profile_goals(&self, user_id: &str) -> Result<Option<ProfileGoals>>;
}

/// Human-readable labels keyed by category key.
pub trait CategoryCatalog: Send + Sync {
    fn category_labels(&self) -> Result<HashMap<String, String>>;
}

/// Outcome of a best-effort load. `degraded` names the source when the load
/// failed and `value` is the empty fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    pub degraded: Option<String>,
}

impl<T: Default> Loaded<T> {
    pub fn best_effort(source_name: &str, user_id: &str, result: Result<T>) -> Self {
        match result {
            Ok(value) => Self {
                value,
                degraded: None,
            },
            Err(e) => {
                warn!(
                    "Source '{}' failed for user {}: {}. Continuing with an empty value.",
                    source_name, user_id, e
                );
                Self {
                    value: T::default(),
                    degraded: Some(source_name.to_string()),
                }
            }
        }
    }
}

impl<T> Loaded<T> {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

#[derive(Debug, Default)]
struct LedgerData {
    accounts: HashMap<String, Vec<Account>>,
    incomes: HashMap<String, Vec<IncomeRecord>>,
    expenses: HashMap<String, Vec<ExpenseRecord>>,
    plans: HashMap<String, SpendingPlan>,
    goals: HashMap<String, ProfileGoals>,
    category_labels: HashMap<String, String>,
    failing_sources: HashSet<String>,
    rejected_due_dates: HashSet<String>,
}

/// Thread-safe in-memory ledger keyed by user id. Individual sources can be
/// switched into a failing state to exercise degraded aggregation.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    data: RwLock<LedgerData>,
    next_id: AtomicU64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&self, user_id: &str, account: Account) {
        self.write().accounts.entry(user_id.to_string()).or_default().push(account);
    }

    pub fn add_income(&self, income: IncomeRecord) {
        self.write()
            .incomes
            .entry(income.user_id.clone())
            .or_default()
            .push(income);
    }

    pub fn add_expense(&self, expense: ExpenseRecord) {
        self.write()
            .expenses
            .entry(expense.user_id.clone())
            .or_default()
            .push(expense);
    }

    pub fn set_spending_plan(&self, plan: SpendingPlan) {
        self.write().plans.insert(plan.user_id.clone(), plan);
    }

    pub fn set_profile_goals(&self, user_id: &str, goals: ProfileGoals) {
        self.write().goals.insert(user_id.to_string(), goals);
    }

    pub fn set_category_label(&self, category: &str, label: &str) {
        self.write()
            .category_labels
            .insert(category.to_string(), label.to_string());
    }

    /// Makes every call to `source_name` fail until restored.
    pub fn fail_source(&self, source_name: &str) {
        self.write().failing_sources.insert(source_name.to_string());
    }

    pub fn restore_source(&self, source_name: &str) {
        self.write().failing_sources.remove(source_name);
    }

    /// Makes `create_expense_record` fail for records due on `due_date`.
    pub fn reject_expense_due_on(&self, due_date: &str) {
        self.write().rejected_due_dates.insert(due_date.to_string());
    }

    pub fn expenses_for(&self, user_id: &str) -> Vec<ExpenseRecord> {
        self.read().expenses.get(user_id).cloned().unwrap_or_default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, LedgerData> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, LedgerData> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    fn check(data: &LedgerData, source_name: &str) -> Result<()> {
        if data.failing_sources.contains(source_name) {
            return Err(DashboardError::upstream(source_name, "simulated outage"));
        }
        Ok(())
    }
}

impl AccountSource for InMemoryLedger {
    fn list_accounts(&self, user_id: &str) -> Result<Vec<Account>> {
        let data = self.read();
        Self::check(&data, ACCOUNTS_SOURCE)?;
        Ok(data.accounts.get(user_id).cloned().unwrap_or_default())
    }
}

impl IncomeSource for InMemoryLedger {
    fn list_income_records(
        &self,
        user_id: &str,
        filter: &IncomeRecordFilter,
    ) -> Result<Vec<IncomeRecord>> {
        filter.validate()?;
        let data = self.read();
        Self::check(&data, INCOMES_SOURCE)?;
        Ok(data
            .incomes
            .get(user_id)
            .map(|records| filter.apply(records))
            .unwrap_or_default())
    }
}

impl ExpenseSource for InMemoryLedger {
    fn list_expense_records(&self, user_id: &str) -> Result<Vec<ExpenseRecord>> {
        let data = self.read();
        Self::check(&data, EXPENSES_SOURCE)?;
        Ok(data.expenses.get(user_id).cloned().unwrap_or_default())
    }
}

impl ExpenseSink for InMemoryLedger {
    fn create_expense_record(&self, record: &ExpenseRecord) -> Result<ExpenseRecord> {
        let mut data = self.write();
        Self::check(&data, CREATE_EXPENSE_SOURCE)?;
        if data.rejected_due_dates.contains(&record.due_date) {
            return Err(DashboardError::upstream(
                CREATE_EXPENSE_SOURCE,
                format!("write rejected for due date {}", record.due_date),
            ));
        }

        let mut stored = record.clone();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        stored.id = format!("exp-{}", id);
        debug!("Stored expense {} for user {}", stored.id, stored.user_id);

        data.expenses
            .entry(stored.user_id.clone())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }
}

impl SpendingPlanSource for InMemoryLedger {
    fn spending_plan(&self, user_id: &str) -> Result<Option<SpendingPlan>> {
        let data = self.read();
        Self::check(&data, SPENDING_PLAN_SOURCE)?;
        Ok(data.plans.get(user_id).cloned())
    }
}

impl GoalSource for InMemoryLedger {
    fn profile_goals(&self, user_id: &str) -> Result<Option<ProfileGoals>> {
        let data = self.read();
        Self::check(&data, GOALS_SOURCE)?;
        Ok(data.goals.get(user_id).cloned())
    }
}

impl CategoryCatalog for InMemoryLedger {
    fn category_labels(&self) -> Result<HashMap<String, String>> {
        let data = self.read();
        Self::check(&data, CATEGORIES_SOURCE)?;
        Ok(data.category_labels.clone())
    }
}
