use crate::error::{DashboardError, Result};
use crate::schema::ExpenseRecord;
use crate::sources::{ExpenseSink, CREATE_EXPENSE_SOURCE};
use crate::utils::{add_months, format_record_date};
use log::{debug, info, warn};

/// What happened when a template was persisted. Writes are not transactional:
/// occurrences created before a failure stay created.
#[derive(Debug, Clone, Default)]
pub struct ExpansionOutcome {
    pub created: Vec<ExpenseRecord>,
    /// `(recurrence_number, error message)` for every occurrence that failed.
    pub failed: Vec<(u32, String)>,
}

impl ExpansionOutcome {
    pub fn is_partial(&self) -> bool {
        !self.created.is_empty() && !self.failed.is_empty()
    }
}

pub struct RecurringExpander<'a> {
    sink: &'a dyn ExpenseSink,
}

impl<'a> RecurringExpander<'a> {
    pub fn new(sink: &'a dyn ExpenseSink) -> Self {
        Self { sink }
    }

    /// Persists the template (all of its occurrences when recurring) and
    /// returns the first record that was stored.
    pub fn create(&self, template: &ExpenseRecord) -> Result<ExpenseRecord> {
        let mut outcome = self.create_all(template)?;

        if outcome.created.is_empty() {
            let details = outcome
                .failed
                .into_iter()
                .map(|(n, e)| format!("#{}: {}", n, e))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(DashboardError::upstream(CREATE_EXPENSE_SOURCE, details));
        }

        Ok(outcome.created.swap_remove(0))
    }

    pub fn create_all(&self, template: &ExpenseRecord) -> Result<ExpansionOutcome> {
        let occurrences = expand_occurrences(template)?;
        let total = occurrences.len();
        let mut outcome = ExpansionOutcome::default();

        if total > 1 {
            info!(
                "Expanding recurring expense '{}' for user {} into {} occurrences",
                template.category, template.user_id, total
            );
        }

        for occurrence in occurrences {
            match self.sink.create_expense_record(&occurrence) {
                Ok(stored) => {
                    debug!(
                        "Created occurrence {}/{} due {}",
                        occurrence.recurrence_number, total, stored.due_date
                    );
                    outcome.created.push(stored);
                }
                Err(e) => {
                    warn!(
                        "Failed to create occurrence {}/{} due {}: {}",
                        occurrence.recurrence_number, total, occurrence.due_date, e
                    );
                    outcome
                        .failed
                        .push((occurrence.recurrence_number, e.to_string()));
                }
            }
        }

        if outcome.is_partial() {
            warn!(
                "Recurring expense for user {} only partially created: {} of {} occurrences",
                template.user_id,
                outcome.created.len(),
                total
            );
        }

        Ok(outcome)
    }
}

/// Builds the records a template stands for without persisting them.
///
/// A recurring template with `recurrence_count = N >= 1` yields N records:
/// occurrence 1 keeps the original due date and occurrence `i` is due `i - 1`
/// calendar months later. Anything else yields the template itself.
pub fn expand_occurrences(template: &ExpenseRecord) -> Result<Vec<ExpenseRecord>> {
    if template.user_id.trim().is_empty() {
        return Err(DashboardError::InvalidInput(
            "expense record has no user id".to_string(),
        ));
    }

    let original_due = template.due_date().map_err(|e| {
        DashboardError::InvalidInput(format!("expense template has a bad due date: {}", e))
    })?;

    if !template.is_recurring || template.recurrence_count == 0 {
        return Ok(vec![template.clone()]);
    }

    (0..template.recurrence_count)
        .map(|offset| {
            let due = add_months(original_due, offset).ok_or_else(|| {
                DashboardError::InvalidInput(format!(
                    "due date {} cannot be advanced by {} months",
                    original_due, offset
                ))
            })?;

            let mut occurrence = template.clone();
            occurrence.due_date = format_record_date(due);
            occurrence.recurrence_number = offset + 1;
            Ok(occurrence)
        })
        .collect()
}

pub fn create_expense_record(
    sink: &dyn ExpenseSink,
    template: &ExpenseRecord,
) -> Result<ExpenseRecord> {
    RecurringExpander::new(sink).create(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::InMemoryLedger;
    use chrono::NaiveDate;

    fn template(due: &str, count: u32) -> ExpenseRecord {
        ExpenseRecord {
            category: "gym".to_string(),
            due_date: due.to_string(),
            amount: 89.9,
            bank_paid_from: Some("acc-1".to_string()),
            is_recurring: true,
            recurrence_count: count,
            user_id: "alice".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_expansion_steps_by_calendar_month() {
        let occurrences = expand_occurrences(&template("2023-11-15", 4)).unwrap();
        let dues: Vec<_> = occurrences.iter().map(|o| o.due_date.as_str()).collect();
        assert_eq!(
            dues,
            vec!["2023-11-15", "2023-12-15", "2024-01-15", "2024-02-15"]
        );

        let numbers: Vec<_> = occurrences.iter().map(|o| o.recurrence_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);

        for occurrence in &occurrences {
            assert_eq!(occurrence.category, "gym");
            assert_eq!(occurrence.amount, 89.9);
            assert_eq!(occurrence.bank_paid_from.as_deref(), Some("acc-1"));
        }
    }

    #[test]
    fn test_expansion_from_month_end_is_strictly_increasing() {
        let occurrences = expand_occurrences(&template("2024-01-31", 4)).unwrap();
        let dues: Vec<NaiveDate> = occurrences.iter().map(|o| o.due_date().unwrap()).collect();
        assert_eq!(
            dues,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
                NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
            ]
        );
        assert!(dues.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_non_recurring_template_is_single_record() {
        let mut single = template("2024-05-01", 3);
        single.is_recurring = false;
        assert_eq!(expand_occurrences(&single).unwrap().len(), 1);

        let zero_count = template("2024-05-01", 0);
        assert_eq!(expand_occurrences(&zero_count).unwrap().len(), 1);
    }

    #[test]
    fn test_bad_template_is_input_error() {
        assert!(matches!(
            expand_occurrences(&template("05/01/2024", 2)),
            Err(DashboardError::InvalidInput(_))
        ));

        let mut anonymous = template("2024-05-01", 2);
        anonymous.user_id = String::new();
        assert!(matches!(
            expand_occurrences(&anonymous),
            Err(DashboardError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_create_persists_every_occurrence() {
        let ledger = InMemoryLedger::new();
        let first = create_expense_record(&ledger, &template("2024-01-10", 3)).unwrap();

        assert_eq!(first.due_date, "2024-01-10");
        assert_eq!(first.recurrence_number, 1);
        assert!(!first.id.is_empty());
        assert_eq!(ledger.expenses_for("alice").len(), 3);
    }

    #[test]
    fn test_partial_failure_keeps_created_occurrences() {
        let ledger = InMemoryLedger::new();
        ledger.reject_expense_due_on("2024-02-10");

        let expander = RecurringExpander::new(&ledger);
        let outcome = expander.create_all(&template("2024-01-10", 3)).unwrap();

        assert!(outcome.is_partial());
        assert_eq!(outcome.created.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, 2);
        assert_eq!(ledger.expenses_for("alice").len(), 2);
    }

    #[test]
    fn test_first_successful_occurrence_is_returned() {
        let ledger = InMemoryLedger::new();
        ledger.reject_expense_due_on("2024-01-10");

        let first = create_expense_record(&ledger, &template("2024-01-10", 3)).unwrap();
        assert_eq!(first.due_date, "2024-02-10");
        assert_eq!(first.recurrence_number, 2);
    }

    #[test]
    fn test_total_failure_is_upstream_error() {
        let ledger = InMemoryLedger::new();
        ledger.fail_source(CREATE_EXPENSE_SOURCE);

        let result = create_expense_record(&ledger, &template("2024-01-10", 2));
        assert!(matches!(result, Err(DashboardError::Upstream { .. })));
    }
}
