use crate::balance::{select_paid_expenses, BalanceCalculator};
use crate::bills::select_upcoming_bills;
use crate::cache::SnapshotCache;
use crate::charts::{expense_categories_for_month, revenue_expense_series};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{DashboardError, Result};
use crate::goals::{format_goals_progress, GOALS_UNAVAILABLE};
use crate::reconciler::PlannedVsActualReconciler;
use crate::recurrence::RecurringExpander;
use crate::schema::{
    DashboardSnapshot, ExpenseRecord, IncomeRecordFilter, PlannedVsActualCategory, SummaryCards,
};
use crate::sources::{
    AccountSource, CategoryCatalog, ExpenseSink, ExpenseSource, GoalSource, InMemoryLedger,
    IncomeSource, Loaded, SpendingPlanSource, ACCOUNTS_SOURCE, CATEGORIES_SOURCE,
    EXPENSES_SOURCE, GOALS_SOURCE, INCOMES_SOURCE, SPENDING_PLAN_SOURCE,
};
use crate::utils::MonthWindow;
use chrono::{Datelike, Duration};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// The collaborators a dashboard pass reads from and writes expenses to.
#[derive(Clone)]
pub struct DashboardSources {
    pub accounts: Arc<dyn AccountSource>,
    pub incomes: Arc<dyn IncomeSource>,
    pub expenses: Arc<dyn ExpenseSource>,
    pub expense_sink: Arc<dyn ExpenseSink>,
    pub plans: Arc<dyn SpendingPlanSource>,
    pub goals: Arc<dyn GoalSource>,
    pub categories: Option<Arc<dyn CategoryCatalog>>,
}

impl DashboardSources {
    /// Every source backed by the same ledger.
    pub fn from_ledger(ledger: Arc<InMemoryLedger>) -> Self {
        Self {
            accounts: ledger.clone(),
            incomes: ledger.clone(),
            expenses: ledger.clone(),
            expense_sink: ledger.clone(),
            plans: ledger.clone(),
            goals: ledger.clone(),
            categories: Some(ledger),
        }
    }
}

pub struct DashboardEngine {
    sources: DashboardSources,
    cache: Arc<SnapshotCache>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl DashboardEngine {
    /// Builds an engine with a private snapshot cache driven by `clock`.
    pub fn new(sources: DashboardSources, clock: Arc<dyn Clock>, config: EngineConfig) -> Result<Self> {
        let cache = Arc::new(SnapshotCache::new(clock.clone()));
        Self::with_cache(sources, cache, clock, config)
    }

    /// Builds an engine around a cache that may be shared with other engines.
    pub fn with_cache(
        sources: DashboardSources,
        cache: Arc<SnapshotCache>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sources,
            cache,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    /// Runs a full aggregation pass for `user_id` and stores the result in the
    /// snapshot cache. Failing sources are treated as empty and listed in
    /// `degraded_sources`; only an empty user id is an error.
    pub fn compute_dashboard_snapshot(&self, user_id: &str) -> Result<DashboardSnapshot> {
        require_user_id(user_id)?;

        let now = self.clock.now();
        let today = now.date_naive();
        info!("Computing dashboard snapshot for user {}", user_id);

        let accounts = Loaded::best_effort(
            ACCOUNTS_SOURCE,
            user_id,
            self.sources.accounts.list_accounts(user_id),
        );
        let incomes = Loaded::best_effort(
            INCOMES_SOURCE,
            user_id,
            self.sources
                .incomes
                .list_income_records(user_id, &IncomeRecordFilter::default()),
        );
        let expenses = Loaded::best_effort(
            EXPENSES_SOURCE,
            user_id,
            self.sources.expenses.list_expense_records(user_id),
        );

        let mut degraded_sources: Vec<String> =
            [&accounts.degraded, &incomes.degraded, &expenses.degraded]
                .into_iter()
                .flatten()
                .cloned()
                .collect();

        let goals_progress = match self.sources.goals.profile_goals(user_id) {
            Ok(goals) => format_goals_progress(goals.as_ref()),
            Err(e) => {
                warn!("Goals unavailable for user {}: {}", user_id, e);
                degraded_sources.push(GOALS_SOURCE.to_string());
                GOALS_UNAVAILABLE.to_string()
            }
        };

        debug!(
            "Loaded {} accounts, {} incomes and {} expenses for user {}",
            accounts.value.len(),
            incomes.value.len(),
            expenses.value.len(),
            user_id
        );

        let paid_expenses = select_paid_expenses(&expenses.value, today);
        let calculator = BalanceCalculator::new(&accounts.value, &incomes.value, paid_expenses);
        let current_month = MonthWindow::containing(now);

        let upcoming_bills = select_upcoming_bills(
            &expenses.value,
            today,
            self.config.upcoming_window_days,
            self.config.upcoming_bills_limit,
        );

        let snapshot = DashboardSnapshot {
            user_id: user_id.to_string(),
            generated_at: now,
            summary_cards: SummaryCards {
                total_balance: calculator.total_balance(),
                monthly_revenue: calculator.monthly_revenue(&current_month),
                monthly_expenses: calculator.monthly_expenses(&current_month),
                goals_progress,
                upcoming_bills_count: upcoming_bills.len(),
            },
            account_summaries: calculator.account_summaries(),
            upcoming_bills,
            revenue_expense_chart: revenue_expense_series(
                &calculator,
                now,
                self.config.trailing_months,
            ),
            expense_category_chart: expense_categories_for_month(
                calculator.paid_expenses(),
                &current_month,
                &self.config.other_category_label,
            ),
            recommendations: Vec::new(),
            degraded_sources,
        };

        if snapshot.is_degraded() {
            warn!(
                "Dashboard for user {} built without: {}",
                user_id,
                snapshot.degraded_sources.join(", ")
            );
        }

        if let Err(e) = self
            .cache
            .put(user_id, snapshot.clone(), self.config.cache_ttl())
        {
            warn!("Failed to cache dashboard for user {}: {}", user_id, e);
        }

        Ok(snapshot)
    }

    /// The cached snapshot when still fresh, otherwise a newly computed one.
    pub fn dashboard(&self, user_id: &str) -> Result<Arc<DashboardSnapshot>> {
        if let Some(snapshot) = self.cache.get(user_id)? {
            debug!("Serving cached dashboard for user {}", user_id);
            return Ok(snapshot);
        }
        self.compute_dashboard_snapshot(user_id).map(Arc::new)
    }

    pub fn invalidate(&self, user_id: &str) -> Result<()> {
        self.cache.delete(user_id)
    }

    /// Planned-vs-actual rows for `month`/`year`. Zero selects the current
    /// month or year. A failing expense source is an error, while a missing or
    /// failing spending plan yields no rows.
    pub fn compute_planned_vs_actual(
        &self,
        user_id: &str,
        month: u32,
        year: i32,
    ) -> Result<Vec<PlannedVsActualCategory>> {
        require_user_id(user_id)?;

        let today = self.clock.today();
        let month = if month == 0 { today.month() } else { month };
        let year = if year == 0 { today.year() } else { year };
        let window = MonthWindow::for_month(year, month)?;

        info!(
            "Computing planned vs actual for user {} ({:04}-{:02})",
            user_id, year, month
        );

        let expenses = self.sources.expenses.list_expense_records(user_id)?;

        let plan = match self.sources.plans.spending_plan(user_id) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(
                    "Source '{}' failed for user {}: {}. Reporting no planned spending.",
                    SPENDING_PLAN_SOURCE, user_id, e
                );
                None
            }
        };

        let labels = match &self.sources.categories {
            Some(catalog) => {
                Loaded::best_effort(CATEGORIES_SOURCE, user_id, catalog.category_labels()).value
            }
            None => HashMap::new(),
        };

        let reconciler = PlannedVsActualReconciler::new(&self.config, &labels);
        Ok(reconciler.reconcile(&expenses, plan.as_ref(), &window))
    }

    /// Persists `template` (every occurrence when recurring) and drops the
    /// owner's cached dashboard. Returns the first stored occurrence.
    pub fn create_expense_record(&self, template: &ExpenseRecord) -> Result<ExpenseRecord> {
        let created = RecurringExpander::new(self.sources.expense_sink.as_ref()).create(template)?;
        self.invalidate(&template.user_id)?;
        Ok(created)
    }

    pub fn cache_get(&self, user_id: &str) -> Result<Option<Arc<DashboardSnapshot>>> {
        self.cache.get(user_id)
    }

    pub fn cache_put(&self, user_id: &str, snapshot: DashboardSnapshot, ttl: Duration) -> Result<()> {
        self.cache.put(user_id, snapshot, ttl)
    }

    pub fn cache_delete(&self, user_id: &str) -> Result<()> {
        self.cache.delete(user_id)
    }
}

fn require_user_id(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(DashboardError::InvalidInput(
            "user id must not be empty".to_string(),
        ));
    }
    Ok(())
}
