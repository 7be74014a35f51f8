use crate::balance::{BalanceCalculator, PaidExpense};
use crate::schema::{CategoryChartItem, RevenueExpensePoint};
use crate::utils::MonthWindow;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

pub const DEFAULT_TRAILING_MONTHS: u32 = 6;

/// Revenue and expenses for the `months` calendar months ending with the month
/// of `reference`, oldest first.
pub fn revenue_expense_series(
    calculator: &BalanceCalculator<'_>,
    reference: DateTime<Utc>,
    months: u32,
) -> Vec<RevenueExpensePoint> {
    let current = MonthWindow::containing(reference);

    (0..months)
        .rev()
        .map(|back| {
            let window = current.months_back(back);
            RevenueExpensePoint {
                month: window.label(),
                month_start: window.first_day(),
                revenue: calculator.monthly_revenue(&window),
                expenses: calculator.monthly_expenses(&window),
            }
        })
        .collect()
}

/// Paid expenses of `window` grouped by category, largest first. Ties are
/// ordered by category name. Blank categories go to `other_label`.
pub fn expense_categories_for_month(
    paid_expenses: &[PaidExpense<'_>],
    window: &MonthWindow,
    other_label: &str,
) -> Vec<CategoryChartItem> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();

    for paid in paid_expenses {
        if !window.contains_date(paid.paid_on) {
            continue;
        }
        let category = paid.record.category.trim();
        let name = if category.is_empty() { other_label } else { category };
        *totals.entry(name).or_insert(0.0) += paid.record.amount;
    }

    let mut items: Vec<CategoryChartItem> = totals
        .into_iter()
        .map(|(name, value)| CategoryChartItem {
            name: name.to_string(),
            value,
        })
        .collect();

    // Stable sort keeps the name order from the BTreeMap for equal values.
    items.sort_by(|a, b| b.value.total_cmp(&a.value));
    items
}
