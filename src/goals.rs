use crate::schema::ProfileGoals;

pub const GOALS_UNAVAILABLE: &str = "N/A (data unavailable)";
pub const NO_GOALS_DEFINED: &str = "No goals defined";

/// Summary-card text for the user's goals, e.g. "50% (1 of 2 goals)".
/// `None` means the user has never set any goals.
pub fn format_goals_progress(goals: Option<&ProfileGoals>) -> String {
    let Some(goals) = goals else {
        return NO_GOALS_DEFINED.to_string();
    };

    let total = goals.all().count();
    if total == 0 {
        return NO_GOALS_DEFINED.to_string();
    }

    let completed = goals.all().filter(|g| g.completed).count();
    let percentage = completed as f64 / total as f64 * 100.0;

    format!("{:.0}% ({} of {} goals)", percentage, completed, total)
}
