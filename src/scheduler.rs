use chrono::{DateTime, Local};
use cron::Schedule;
use std::str::FromStr;
use tracing::info;

use crate::error::{Result, SubfillError};
use crate::workflow::Workflow;

/// Persistent mode: compute the next cron occurrence from current local
/// time, sleep exactly that long, run both batch drivers, repeat. No drift
/// correction beyond recomputing from "now", no catch-up for missed runs.
pub struct Scheduler {
    schedule: Schedule,
    workflow: Workflow,
}

impl Scheduler {
    pub fn new(expression: &str, workflow: Workflow) -> Result<Self> {
        Ok(Self {
            schedule: parse_schedule(expression)?,
            workflow,
        })
    }

    pub async fn run_forever(&self) -> Result<()> {
        loop {
            let now = Local::now();
            let next = next_run(&self.schedule, now)?;
            let wait = (next - now).to_std().unwrap_or_default();

            info!("Next run scheduled at {}", next.format("%Y-%m-%d %H:%M:%S"));
            info!("Waiting for {} seconds...", wait.as_secs());
            tokio::time::sleep(wait).await;

            info!("Starting the translate run...");
            self.workflow.run_all().await;
        }
    }
}

fn next_run(schedule: &Schedule, after: DateTime<Local>) -> Result<DateTime<Local>> {
    schedule
        .after(&after)
        .next()
        .ok_or_else(|| SubfillError::Schedule("No upcoming run in schedule".to_string()))
}

/// Parse a cron expression. Standard 5-field expressions are accepted by
/// prepending the seconds field the `cron` crate expects.
pub fn parse_schedule(expression: &str) -> Result<Schedule> {
    let expression = expression.trim();
    let normalized = if expression.split_whitespace().count() == 5 {
        format!("0 {}", expression)
    } else {
        expression.to_string()
    };

    Schedule::from_str(&normalized).map_err(|e| {
        SubfillError::Schedule(format!("Invalid cron expression '{}': {}", expression, e))
    })
}
