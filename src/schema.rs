use crate::error::{DashboardError, Result};
use crate::utils::{format_record_date, parse_record_date};
use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,

    #[serde(default)]
    #[schemars(description = "User-chosen name for the account; may be empty")]
    pub display_name: String,

    #[serde(default)]
    pub bank_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncomeRecord {
    pub id: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub description: Option<String>,

    #[schemars(description = "Account credited by this income")]
    pub bank_account_id: String,

    pub amount: f64,

    #[schemars(description = "Receipt date in YYYY-MM-DD format")]
    pub receipt_date: String,

    #[serde(default)]
    pub is_recurring: bool,

    #[serde(default)]
    pub recurrence_number: u32,

    pub user_id: String,
}

impl IncomeRecord {
    pub fn receipt_date(&self) -> Result<NaiveDate> {
        parse_record_date(&self.receipt_date)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    pub id: String,

    #[schemars(description = "Free-text category key, e.g. 'food'")]
    pub category: String,

    #[serde(default)]
    pub subcategory: String,

    #[serde(default)]
    pub description: Option<String>,

    #[schemars(description = "Due date in YYYY-MM-DD format")]
    pub due_date: String,

    #[serde(default)]
    #[schemars(
        description = "Payment date in YYYY-MM-DD format. Absent or blank means the expense is still pending."
    )]
    pub payment_date: Option<String>,

    pub amount: f64,

    #[serde(default)]
    #[schemars(description = "Account the expense was paid from")]
    pub bank_paid_from: Option<String>,

    #[serde(default)]
    pub is_recurring: bool,

    #[serde(default)]
    #[schemars(description = "How many monthly occurrences a recurring template expands into")]
    pub recurrence_count: u32,

    #[serde(default)]
    #[schemars(description = "1-based position of this record within its recurring series")]
    pub recurrence_number: u32,

    pub user_id: String,
}

impl ExpenseRecord {
    pub fn new(
        category: impl Into<String>,
        due_date: NaiveDate,
        amount: f64,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            due_date: format_record_date(due_date),
            amount,
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn due_date(&self) -> Result<NaiveDate> {
        parse_record_date(&self.due_date)
    }

    /// `Ok(None)` while the expense is pending.
    pub fn payment_date(&self) -> Result<Option<NaiveDate>> {
        match self.payment_date.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse_record_date(value).map(Some),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.payment_date
            .as_deref()
            .map_or(true, |value| value.trim().is_empty())
    }

    pub fn paying_account(&self) -> Option<&str> {
        self.bank_paid_from
            .as_deref()
            .filter(|account| !account.trim().is_empty())
    }

    pub fn description_or_category(&self) -> &str {
        match self.description.as_deref() {
            Some(description) if !description.trim().is_empty() => description,
            _ => &self.category,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBudget {
    pub category: String,

    #[schemars(description = "Planned monthly amount. Entries with 0 are inactive.")]
    pub amount: f64,

    #[serde(default)]
    #[schemars(description = "Share of monthly income, informational only")]
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpendingPlan {
    pub user_id: String,

    pub monthly_income: f64,

    #[serde(default)]
    pub category_budgets: Vec<CategoryBudget>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SpendingPlan {
    pub fn active_budgets(&self) -> impl Iterator<Item = &CategoryBudget> {
        self.category_budgets.iter().filter(|b| b.amount > 0.0)
    }

    pub fn has_active_budgets(&self) -> bool {
        self.active_budgets().next().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlannedVsActualCategory {
    pub category: String,
    pub label: String,
    pub planned_amount: f64,
    pub actual_amount: f64,

    #[schemars(description = "Actual amount as a percentage of the plan's monthly income")]
    pub spent_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub name: String,

    #[serde(default)]
    pub target_amount: f64,

    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileGoals {
    #[serde(default)]
    pub goals_two_years: Vec<Goal>,

    #[serde(default)]
    pub goals_five_years: Vec<Goal>,

    #[serde(default)]
    pub goals_ten_years: Vec<Goal>,
}

impl ProfileGoals {
    pub fn all(&self) -> impl Iterator<Item = &Goal> {
        self.goals_two_years
            .iter()
            .chain(&self.goals_five_years)
            .chain(&self.goals_ten_years)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum IncomeSortKey {
    Category,
    Amount,
    ReceiptDate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Query over a user's income records. Every field is optional; an empty
/// filter returns records untouched and in their stored order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncomeRecordFilter {
    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    #[schemars(description = "Case-insensitive substring match on the description")]
    pub description: Option<String>,

    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    #[serde(default)]
    pub sort_key: Option<IncomeSortKey>,

    #[serde(default)]
    pub sort_direction: SortDirection,
}

impl IncomeRecordFilter {
    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(DashboardError::InvalidInput(format!(
                    "income filter end date {} is before start date {}",
                    end, start
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, record: &IncomeRecord) -> bool {
        if let Some(category) = &self.category {
            if !record.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }

        if let Some(needle) = &self.description {
            let needle = needle.to_lowercase();
            let found = record
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !found {
                return false;
            }
        }

        if self.start_date.is_some() || self.end_date.is_some() {
            let Ok(receipt) = record.receipt_date() else {
                return false;
            };
            if self.start_date.is_some_and(|start| receipt < start) {
                return false;
            }
            if self.end_date.is_some_and(|end| receipt > end) {
                return false;
            }
        }

        true
    }

    pub fn apply(&self, records: &[IncomeRecord]) -> Vec<IncomeRecord> {
        let mut selected: Vec<IncomeRecord> =
            records.iter().filter(|r| self.matches(r)).cloned().collect();

        if let Some(key) = self.sort_key {
            selected.sort_by(|a, b| {
                let ordering = compare_income(a, b, key);
                match self.sort_direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        selected
    }
}

fn compare_income(a: &IncomeRecord, b: &IncomeRecord, key: IncomeSortKey) -> Ordering {
    match key {
        IncomeSortKey::Category => a.category.cmp(&b.category),
        IncomeSortKey::Amount => a.amount.total_cmp(&b.amount),
        // Unparsable dates sort first.
        IncomeSortKey::ReceiptDate => a.receipt_date().ok().cmp(&b.receipt_date().ok()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCards {
    pub total_balance: f64,
    pub monthly_revenue: f64,
    pub monthly_expenses: f64,
    pub goals_progress: String,
    pub upcoming_bills_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub account_id: String,
    pub account_name: String,
    pub bank_name: String,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingBill {
    pub expense_id: String,
    pub bill_name: String,
    pub category: String,
    pub amount: f64,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevenueExpensePoint {
    #[schemars(description = "Month label such as 'Jan/24'")]
    pub month: String,
    pub month_start: NaiveDate,
    pub revenue: f64,
    pub expenses: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryChartItem {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub recommendation_id: String,
    pub title: String,
    pub description_text: String,
    pub category: String,
}

/// One fully assembled dashboard aggregation pass for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub user_id: String,
    pub generated_at: DateTime<Utc>,
    pub summary_cards: SummaryCards,
    pub account_summaries: Vec<AccountSummary>,
    pub upcoming_bills: Vec<UpcomingBill>,

    #[schemars(description = "Trailing months, oldest first")]
    pub revenue_expense_chart: Vec<RevenueExpensePoint>,

    #[schemars(description = "Current-month paid expenses per category, largest first")]
    pub expense_category_chart: Vec<CategoryChartItem>,

    pub recommendations: Vec<Recommendation>,

    #[serde(default)]
    #[schemars(description = "Sources that failed to load and were treated as empty")]
    pub degraded_sources: Vec<String>,
}

impl DashboardSnapshot {
    pub fn is_degraded(&self) -> bool {
        !self.degraded_sources.is_empty()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DashboardSnapshot)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
