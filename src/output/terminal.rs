// Colored terminal output for evaluations and the ban list.
//
// main.rs delegates all terminal formatting here.

use colored::Colorize;

use crate::db::BanRecord;
use crate::scoring::breakdown::Factor;
use crate::scoring::evaluate::{EvaluationResult, Outcome};
use crate::scoring::policy::{Action, PolicyTable};
use crate::scoring::TrustCategory;

/// Display one evaluation: header, factor table, action and reasons.
pub fn display_evaluation(result: &EvaluationResult) {
    println!(
        "\n{}",
        format!("=== Evaluation for {} ===", result.identity).bold()
    );

    match result.outcome {
        Outcome::Exempt => {
            println!("  {}", "Exempt: all checks skipped".dimmed());
            return;
        }
        Outcome::HistoryMatch => {
            println!("  {}", "Previously detected alt (history match)".red().bold());
        }
        Outcome::Scored => {}
    }

    println!(
        "  Trust level: {} {}",
        result.category.emoji(),
        colorize_category(result.category)
    );
    println!("  Score: {:.1}", result.total_score);
    println!("  Action: {}", colorize_action(result.action));

    if !result.breakdown.is_empty() {
        println!();
        println!(
            "  {:<12} {:>6}  {:>6}  {:>8}",
            "Factor".dimmed(),
            "Raw".dimmed(),
            "Weight".dimmed(),
            "Weighted".dimmed(),
        );
        println!("  {}", "-".repeat(38).dimmed());
        for factor in Factor::ALL {
            if !result.breakdown.per_factor.contains_key(&factor) {
                continue;
            }
            let weighted = result.breakdown.weighted(factor);
            let weighted_str = format!("{weighted:>8.1}");
            let weighted_str = if weighted > 0.0 {
                weighted_str.red().to_string()
            } else if weighted < 0.0 {
                weighted_str.green().to_string()
            } else {
                weighted_str.normal().to_string()
            };
            println!(
                "  {:<12} {:>6.1}  {:>6.2}  {}",
                factor.label(),
                result.breakdown.raw(factor),
                result.breakdown.weights.get(&factor).copied().unwrap_or(1.0),
                weighted_str,
            );
        }
    }

    if !result.reasons.is_empty() {
        println!("\n  Reasons:");
        for reason in &result.reasons {
            println!("    - {reason}");
        }
    }
    println!();
}

/// Display stored ban records, newest first.
pub fn display_ban_list(records: &[BanRecord]) {
    if records.is_empty() {
        println!("No ban records yet.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Ban Records ({}) ===", records.len()).bold()
    );
    println!();
    println!(
        "  {:<20} {:<18} {:>6}  {:<20}  {}",
        "Identity".dimmed(),
        "Trust level".dimmed(),
        "Score".dimmed(),
        "Recorded".dimmed(),
        "Reason".dimmed(),
    );
    println!("  {}", "-".repeat(90).dimmed());

    for record in records {
        println!(
            "  {:<20} {:<18} {:>6.1}  {:<20}  {}",
            record.identity,
            colorize_category(record.category),
            record.score,
            record.recorded_at.format("%Y-%m-%d %H:%M"),
            super::truncate_chars(&record.reason, 60).dimmed(),
        );
    }
    println!();
}

/// Show the trust levels that carry an action other than none.
pub fn display_policy(policy: &PolicyTable) {
    println!("Trust level actions:");
    for (category, action) in policy.active_entries() {
        println!(
            "  {} {:<18} {}",
            category.emoji(),
            category.as_str(),
            colorize_action(action)
        );
    }
}

/// Colorize a trust category by severity.
pub fn colorize_category(category: TrustCategory) -> colored::ColoredString {
    let text = category.as_str();
    match category {
        TrustCategory::MegaSuspicious => text.red().bold(),
        TrustCategory::HighlySuspicious => text.bright_red(),
        TrustCategory::Suspicious => text.yellow(),
        TrustCategory::Newbie => text.bright_yellow(),
        TrustCategory::Normal => text.normal(),
        TrustCategory::Trusted | TrustCategory::HighlyTrusted => text.green(),
    }
}

fn colorize_action(action: Action) -> colored::ColoredString {
    let text = action.as_str();
    match action {
        Action::Ban => text.red().bold(),
        Action::Kick => text.yellow(),
        Action::Log => text.cyan(),
        Action::None => text.dimmed(),
    }
}
