//! Plain-text rendering of a session.

use std::fmt::Write as _;

use clausewatch_report::Score;

use crate::state::{ResultStep, Session, View};

const GAUGE_WIDTH: usize = 20;

/// `[██████████░░░░░░░░░░]  50/100`
#[must_use]
pub fn score_gauge(score: Score) -> String {
    let filled = usize::from(score.get()) * GAUGE_WIDTH / 100;
    format!(
        "[{}{}] {:>3}/100",
        "█".repeat(filled),
        "░".repeat(GAUGE_WIDTH - filled),
        score.get()
    )
}

fn heading(out: &mut String, step: ResultStep) {
    let position = ResultStep::ALL
        .iter()
        .position(|s| *s == step)
        .unwrap_or_default()
        + 1;
    let _ = writeln!(
        out,
        "== {} ({}/{}) ==",
        step.title(),
        position,
        ResultStep::ALL.len()
    );
}

#[must_use]
pub fn render_overview(session: &Session) -> String {
    let summary = &session.risk_summary;
    let mut out = String::new();
    heading(&mut out, ResultStep::Overview);
    let _ = writeln!(out, "Risk score : {}", score_gauge(summary.score));
    let _ = writeln!(out, "Risk tier  : {}", summary.risk_tier);
    let _ = writeln!(out, "Traps found: {}", summary.trap_count);
    if !session.selected_model_id.is_empty() {
        let _ = writeln!(out, "Model      : {}", session.selected_model_id);
    }
    out
}

#[must_use]
pub fn render_detail(session: &Session) -> String {
    let mut out = String::new();
    heading(&mut out, ResultStep::Detail);
    out.push_str(session.analysis_report.trim_end());
    out.push('\n');
    out
}

#[must_use]
pub fn render_negotiation(session: &Session) -> String {
    let mut out = String::new();
    heading(&mut out, ResultStep::Negotiation);
    out.push_str(session.negotiation_script.trim_end());
    out.push('\n');
    out
}

#[must_use]
pub fn render_step(session: &Session, step: ResultStep) -> String {
    match step {
        ResultStep::Overview => render_overview(session),
        ResultStep::Detail => render_detail(session),
        ResultStep::Negotiation => render_negotiation(session),
    }
}

/// Render whatever the session is currently showing.
#[must_use]
pub fn render(session: &Session) -> String {
    match session.current_view {
        View::Input => {
            let chars = session.contract_text.chars().count();
            if chars == 0 {
                "No contract text yet.\n".to_string()
            } else {
                format!("Contract text ready ({chars} characters).\n")
            }
        }
        View::Result(step) => render_step(session, step),
    }
}

/// All result steps in order, separated by a blank line.
#[must_use]
pub fn render_all_steps(session: &Session) -> String {
    ResultStep::ALL
        .iter()
        .map(|step| render_step(session, *step))
        .collect::<Vec<_>>()
        .join("\n")
}
