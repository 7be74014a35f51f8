use crate::schema::{Account, AccountSummary, ExpenseRecord, IncomeRecord};
use crate::utils::MonthWindow;
use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::HashMap;

/// An expense that has been paid on or before the reference day.
#[derive(Debug, Clone, Copy)]
pub struct PaidExpense<'a> {
    pub record: &'a ExpenseRecord,
    pub paid_on: NaiveDate,
}

/// Keeps expenses with a parseable payment date that is not after `today`.
/// Malformed payment dates are logged and skipped.
pub fn select_paid_expenses(expenses: &[ExpenseRecord], today: NaiveDate) -> Vec<PaidExpense<'_>> {
    expenses
        .iter()
        .filter_map(|record| match record.payment_date() {
            Ok(Some(paid_on)) if paid_on <= today => Some(PaidExpense { record, paid_on }),
            Ok(_) => None,
            Err(e) => {
                warn!("Skipping expense {}: bad payment date: {}", record.id, e);
                None
            }
        })
        .collect()
}

/// Joins accounts, incomes and paid expenses of one user.
pub struct BalanceCalculator<'a> {
    accounts: &'a [Account],
    incomes: Vec<(&'a IncomeRecord, Option<NaiveDate>)>,
    paid_expenses: Vec<PaidExpense<'a>>,
}

impl<'a> BalanceCalculator<'a> {
    pub fn new(
        accounts: &'a [Account],
        incomes: &'a [IncomeRecord],
        paid_expenses: Vec<PaidExpense<'a>>,
    ) -> Self {
        let incomes = incomes
            .iter()
            .map(|income| match income.receipt_date() {
                Ok(date) => (income, Some(date)),
                Err(e) => {
                    warn!(
                        "Income {} has a bad receipt date and is left out of monthly totals: {}",
                        income.id, e
                    );
                    (income, None)
                }
            })
            .collect();

        Self {
            accounts,
            incomes,
            paid_expenses,
        }
    }

    pub fn paid_expenses(&self) -> &[PaidExpense<'a>] {
        &self.paid_expenses
    }

    /// Balance per known account id. Records pointing at an account that is
    /// not in the list do not contribute.
    pub fn account_balances(&self) -> HashMap<&'a str, f64> {
        let mut balances: HashMap<&'a str, f64> = self
            .accounts
            .iter()
            .map(|account| (account.id.as_str(), 0.0))
            .collect();

        for (income, _) in &self.incomes {
            match balances.get_mut(income.bank_account_id.as_str()) {
                Some(balance) => *balance += income.amount,
                None => debug!(
                    "Income {} credits unknown account '{}'",
                    income.id, income.bank_account_id
                ),
            }
        }

        for paid in &self.paid_expenses {
            let Some(account_id) = paid.record.paying_account() else {
                continue;
            };
            match balances.get_mut(account_id) {
                Some(balance) => *balance -= paid.record.amount,
                None => debug!(
                    "Expense {} debits unknown account '{}'",
                    paid.record.id, account_id
                ),
            }
        }

        balances
    }

    pub fn account_balance(&self, account_id: &str) -> f64 {
        self.account_balances()
            .get(account_id)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn total_balance(&self) -> f64 {
        self.account_balances().values().sum()
    }

    /// Sum of incomes received inside `window`.
    pub fn monthly_revenue(&self, window: &MonthWindow) -> f64 {
        self.incomes
            .iter()
            .filter(|(_, received)| received.is_some_and(|d| window.contains_date(d)))
            .map(|(income, _)| income.amount)
            .sum()
    }

    /// Sum of paid expenses whose payment date falls inside `window`.
    pub fn monthly_expenses(&self, window: &MonthWindow) -> f64 {
        self.paid_expenses
            .iter()
            .filter(|paid| window.contains_date(paid.paid_on))
            .map(|paid| paid.record.amount)
            .sum()
    }

    pub fn account_summaries(&self) -> Vec<AccountSummary> {
        let balances = self.account_balances();

        self.accounts
            .iter()
            .map(|account| {
                let account_name = if account.display_name.trim().is_empty() {
                    account.bank_name.clone()
                } else {
                    account.display_name.clone()
                };
                AccountSummary {
                    account_id: account.id.clone(),
                    account_name,
                    bank_name: account.bank_name.clone(),
                    balance: balances.get(account.id.as_str()).copied().unwrap_or(0.0),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn account(id: &str, display: &str, bank: &str) -> Account {
        Account {
            id: id.to_string(),
            display_name: display.to_string(),
            bank_name: bank.to_string(),
        }
    }

    fn income(id: &str, account: &str, amount: f64, date: &str) -> IncomeRecord {
        IncomeRecord {
            id: id.to_string(),
            bank_account_id: account.to_string(),
            amount,
            receipt_date: date.to_string(),
            user_id: "u".to_string(),
            ..Default::default()
        }
    }

    fn expense(id: &str, account: Option<&str>, amount: f64, paid: Option<&str>) -> ExpenseRecord {
        ExpenseRecord {
            id: id.to_string(),
            category: "misc".to_string(),
            due_date: "2024-03-01".to_string(),
            payment_date: paid.map(str::to_string),
            amount,
            bank_paid_from: account.map(str::to_string),
            user_id: "u".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_select_paid_expenses() {
        let expenses = vec![
            expense("pending", Some("a"), 10.0, None),
            expense("blank", Some("a"), 10.0, Some("")),
            expense("paid", Some("a"), 10.0, Some("2024-03-10")),
            expense("today", Some("a"), 10.0, Some("2024-03-15")),
            expense("future", Some("a"), 10.0, Some("2024-03-16")),
            expense("garbled", Some("a"), 10.0, Some("15/03/2024")),
        ];

        let ids: Vec<_> = select_paid_expenses(&expenses, day(2024, 3, 15))
            .iter()
            .map(|p| p.record.id.as_str())
            .collect();
        assert_eq!(ids, vec!["paid", "today"]);
    }

    #[test]
    fn test_account_balances_and_total() {
        let accounts = vec![account("a", "Checking", "Bank A"), account("b", "", "Bank B"), account("c", "Empty", "Bank C")];
        let incomes = vec![
            income("i1", "a", 1000.0, "2024-03-01"),
            income("i2", "b", 250.0, "2024-02-01"),
            income("i3", "ghost", 999.0, "2024-03-01"),
        ];
        let expenses = vec![
            expense("e1", Some("a"), 300.0, Some("2024-03-05")),
            expense("e2", Some("b"), 50.0, Some("2024-03-06")),
            expense("e3", None, 75.0, Some("2024-03-06")),
            expense("e4", Some("a"), 500.0, None),
        ];

        let paid = select_paid_expenses(&expenses, day(2024, 3, 15));
        let calc = BalanceCalculator::new(&accounts, &incomes, paid);

        assert_eq!(calc.account_balance("a"), 700.0);
        assert_eq!(calc.account_balance("b"), 200.0);
        assert_eq!(calc.account_balance("c"), 0.0);
        assert_eq!(calc.account_balance("ghost"), 0.0);

        let sum: f64 = calc.account_balances().values().sum();
        assert_eq!(calc.total_balance(), sum);
        assert_eq!(calc.total_balance(), 900.0);
    }

    #[test]
    fn test_monthly_revenue_respects_window() {
        let incomes = vec![
            income("in", "a", 100.0, "2024-03-01"),
            income("in-end", "a", 20.0, "2024-03-31"),
            income("before", "a", 1000.0, "2024-02-29"),
            income("after", "a", 1000.0, "2024-04-01"),
            income("bad", "a", 1000.0, "March"),
        ];
        let calc = BalanceCalculator::new(&[], &incomes, Vec::new());
        let march = MonthWindow::for_month(2024, 3).unwrap();

        assert_eq!(calc.monthly_revenue(&march), 120.0);
    }

    #[test]
    fn test_monthly_expenses_use_payment_date() {
        let expenses = vec![
            expense("march", Some("a"), 40.0, Some("2024-03-02")),
            expense("feb", Some("a"), 60.0, Some("2024-02-28")),
        ];
        let paid = select_paid_expenses(&expenses, day(2024, 3, 20));
        let calc = BalanceCalculator::new(&[], &[], paid);

        assert_eq!(calc.monthly_expenses(&MonthWindow::for_month(2024, 3).unwrap()), 40.0);
        assert_eq!(calc.monthly_expenses(&MonthWindow::for_month(2024, 2).unwrap()), 60.0);
    }

    #[test]
    fn test_account_summary_falls_back_to_bank_name() {
        let accounts = vec![account("a", "Checking", "Bank A"), account("b", " ", "Bank B")];
        let incomes = vec![income("i1", "b", 42.0, "2024-01-01")];
        let calc = BalanceCalculator::new(&accounts, &incomes, Vec::new());

        let summaries = calc.account_summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].account_name, "Checking");
        assert_eq!(summaries[0].balance, 0.0);
        assert_eq!(summaries[1].account_name, "Bank B");
        assert_eq!(summaries[1].balance, 42.0);
    }
}
