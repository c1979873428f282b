//! Scenario replay

use anyhow::{Context, Result};
use forma_inputs::{FormaConfig, InputContext};
use serde::Serialize;
use serde_json::Value;

use crate::harness::{mount, state_summary, CallbackLog, LogEntry};
use crate::scenario::{Action, Scenario};

/// Outcome of one replayed step
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub action: &'static str,
    pub callbacks: Vec<LogEntry>,
    pub state: Value,
    pub properties: Value,
}

/// Mount the scenario's component and replay its steps
///
/// The scheduler runs one turn after every step, so each report carries the
/// callbacks the step caused.
pub fn run_scenario(scenario: &Scenario, config: FormaConfig) -> Result<Vec<StepReport>> {
    let mut ctx = InputContext::with_config(config);
    let log = CallbackLog::default();
    let observed = scenario.observed()?;

    let mut harness = mount(&mut ctx, scenario.kind, &scenario.props(), &observed, &log)
        .context("Failed to mount component")?;
    ctx.run_turn();
    log.drain();

    let mut reports = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        let number = index + 1;
        tracing::debug!(step = number, action = step.action.name(), "replaying step");

        match &step.action {
            Action::Turn => {}
            Action::Commit => {
                let effects = ctx.commit();
                tracing::debug!(effects, "committed");
            }
            Action::Render { props } => harness
                .render(&mut ctx, props.as_ref())
                .with_context(|| format!("Step {number} failed"))?,
            _ => {
                ctx.batch(|ctx| harness.apply(ctx, step))
                    .with_context(|| format!("Step {number} ({}) failed", step.action.name()))?;
                if ctx.take_render_request() {
                    tracing::trace!(step = number, "render requested");
                }
            }
        }
        ctx.run_turn();

        reports.push(StepReport {
            step: number,
            action: step.action.name(),
            callbacks: log.drain(),
            state: state_summary(harness.state()),
            properties: harness.snapshot(),
        });
    }
    Ok(reports)
}

/// Human readable rendering of the reports
pub fn format_reports(reports: &[StepReport]) -> String {
    let mut out = String::new();
    for report in reports {
        out.push_str(&format!("[{}] {}\n", report.step, report.action));
        for entry in &report.callbacks {
            out.push_str(&format!("    {} -> {}\n", entry.callback, entry.value));
        }
        out.push_str(&format!(
            "    value: {}\n    state: {}\n",
            report.properties.get("value").unwrap_or(&Value::Null),
            report.state
        ));
    }
    out
}
