use super::outcome::{Outcome, ResultCode};

const ELLIPSIS: &str = "...";
const RULE_WIDTH: usize = 60;

/// Renders the summary table and derives the process result.
///
/// Outcomes are listed by name. The result is `Failure` if anything failed,
/// else `Cancelled` if anything was cancelled, else `Success`.
pub fn summarize(outcomes: &[Outcome], name_width: usize) -> (String, ResultCode) {
    let mut sorted: Vec<&Outcome> = outcomes.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let rule = "*".repeat(RULE_WIDTH);
    let mut text = String::new();
    text.push_str(&rule);
    text.push('\n');
    for outcome in &sorted {
        let name = truncate_name(&outcome.name, name_width);
        text.push_str(&format!("{name:<name_width$} : {}\n", outcome.message));
    }
    text.push_str(&rule);
    text.push('\n');

    let count = |code: ResultCode| outcomes.iter().filter(|o| o.code == code).count();
    text.push_str(&format!(
        "{} succeeded, {} failed, {} cancelled\n",
        count(ResultCode::Success),
        count(ResultCode::Failure),
        count(ResultCode::Cancelled)
    ));

    (text, overall_code(outcomes))
}

/// Failure outranks Cancelled, which outranks Success.
pub fn overall_code(outcomes: &[Outcome]) -> ResultCode {
    if outcomes.iter().any(|o| o.code == ResultCode::Failure) {
        ResultCode::Failure
    } else if outcomes.iter().any(|o| o.code == ResultCode::Cancelled) {
        ResultCode::Cancelled
    } else {
        ResultCode::Success
    }
}

/// Shortens `name` to exactly `width` characters, ending in `...`, when it is longer.
pub fn truncate_name(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let keep = width.saturating_sub(ELLIPSIS.len());
    let mut short: String = name.chars().take(keep).collect();
    short.push_str(ELLIPSIS);
    short
}
