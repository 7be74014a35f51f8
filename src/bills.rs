use crate::schema::{ExpenseRecord, UpcomingBill};
use chrono::{Days, NaiveDate};
use log::warn;

pub const DEFAULT_UPCOMING_WINDOW_DAYS: u64 = 30;

/// Unpaid expenses due between `today` and `today + window_days` (both
/// inclusive), soonest first. Unparsable due dates are skipped.
pub fn select_upcoming_bills(
    expenses: &[ExpenseRecord],
    today: NaiveDate,
    window_days: u64,
    limit: Option<usize>,
) -> Vec<UpcomingBill> {
    let window_end = today.checked_add_days(Days::new(window_days)).unwrap_or(NaiveDate::MAX);

    let mut bills: Vec<UpcomingBill> = expenses
        .iter()
        .filter(|expense| expense.is_pending())
        .filter_map(|expense| match expense.due_date() {
            Ok(due) => Some((expense, due)),
            Err(e) => {
                warn!("Skipping expense {} in upcoming bills: {}", expense.id, e);
                None
            }
        })
        .filter(|(_, due)| today <= *due && *due <= window_end)
        .map(|(expense, due)| UpcomingBill {
            expense_id: expense.id.clone(),
            bill_name: expense.description_or_category().to_string(),
            category: expense.category.clone(),
            amount: expense.amount,
            due_date: due,
        })
        .collect();

    bills.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then_with(|| a.bill_name.cmp(&b.bill_name))
    });

    if let Some(limit) = limit {
        bills.truncate(limit);
    }

    bills
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bill(id: &str, due: &str, paid: Option<&str>) -> ExpenseRecord {
        ExpenseRecord {
            id: id.to_string(),
            category: format!("cat-{}", id),
            due_date: due.to_string(),
            payment_date: paid.map(str::to_string),
            amount: 10.0,
            user_id: "u".to_string(),
            ..Default::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn test_window_and_payment_state() {
        let expenses = vec![
            bill("late", "2024-04-20", None),
            bill("soon", "2024-03-20", None),
            bill("today", "2024-03-15", None),
            bill("edge", "2024-04-14", None),
            bill("past", "2024-03-14", None),
            bill("paid", "2024-03-18", Some("2024-03-10")),
            bill("broken", "20-03-2024", None),
        ];

        let bills = select_upcoming_bills(&expenses, today(), DEFAULT_UPCOMING_WINDOW_DAYS, None);
        let ids: Vec<_> = bills.iter().map(|b| b.expense_id.as_str()).collect();
        assert_eq!(ids, vec!["today", "soon", "edge"]);
    }

    #[test]
    fn test_bill_name_prefers_description() {
        let mut named = bill("a", "2024-03-16", None);
        named.description = Some("Internet".to_string());
        let bills = select_upcoming_bills(&[named, bill("b", "2024-03-17", None)], today(), 30, None);

        assert_eq!(bills[0].bill_name, "Internet");
        assert_eq!(bills[1].bill_name, "cat-b");
    }

    #[test]
    fn test_limit_keeps_soonest() {
        let expenses = vec![
            bill("c", "2024-03-25", None),
            bill("a", "2024-03-16", None),
            bill("b", "2024-03-20", None),
        ];
        let bills = select_upcoming_bills(&expenses, today(), 30, Some(2));
        let ids: Vec<_> = bills.iter().map(|b| b.expense_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
