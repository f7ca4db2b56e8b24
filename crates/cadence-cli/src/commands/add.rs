use anyhow::{anyhow, Result};
use cadence_core::models::NewTaskData;
use cadence_core::repository::{SqliteRepository, TaskRepository};
use cadence_core::rule::{weekday_from_code, RuleBuilder};
use chrono::Weekday;
use owo_colors::OwoColorize;
use uuid::Uuid;

use crate::cli::{AddCommand, CadenceKind};

pub async fn add_task(
    repo: &SqliteRepository,
    tenant_id: Uuid,
    owner_id: Uuid,
    cmd: AddCommand,
) -> Result<()> {
    let recurrence_rule = match (&cmd.repeat, cmd.every) {
        (Some(raw), _) => Some(raw.clone()),
        (None, Some(kind)) => Some(build_rule(kind, &cmd)?),
        (None, None) => None,
    };

    let task = repo
        .add_task(NewTaskData {
            tenant_id,
            owner_id,
            name: cmd.name,
            description: cmd.description,
            priority: cmd.priority,
            duration_minutes: cmd.duration,
            auto_schedule: cmd.auto_schedule,
            context: cmd.context,
            due_date: cmd.due,
            recurrence_rule,
            ..Default::default()
        })
        .await?;

    println!("Created task: {} {}", task.id, task.name.bold());
    if let Some(rule) = &task.recurrence_rule {
        let anchor = task
            .recurrence_anchor
            .map(|a| a.to_string())
            .unwrap_or_default();
        println!("  repeats {} (anchored {})", rule.cyan(), anchor);
    }
    Ok(())
}

fn build_rule(kind: CadenceKind, cmd: &AddCommand) -> Result<String> {
    let mut builder = match kind {
        CadenceKind::Daily => RuleBuilder::daily(),
        CadenceKind::Weekly => RuleBuilder::weekly(),
        CadenceKind::Biweekly => RuleBuilder::weekly().every(2),
        CadenceKind::Monthly => RuleBuilder::monthly(),
    };

    if !cmd.on.is_empty() {
        let days: Vec<Weekday> = cmd
            .on
            .iter()
            .map(|code| {
                weekday_from_code(code).ok_or_else(|| anyhow!("unknown weekday code: {code}"))
            })
            .collect::<Result<_>>()?;
        builder = builder.on_weekdays(&days);
    }
    if let Some(day) = cmd.day_of_month {
        builder = builder.on_month_day(day);
    }
    if let Some(until) = cmd.until {
        builder = builder.until(until);
    }

    Ok(builder.build()?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clap::Parser;

    fn add_cmd(args: &[&str]) -> AddCommand {
        let mut full = vec!["cadence", "add"];
        full.extend_from_slice(args);
        match crate::cli::Cli::parse_from(full).command {
            crate::cli::Commands::Add(cmd) => cmd,
            _ => unreachable!(),
        }
    }

    #[test]
    fn builder_flags_produce_the_canonical_weekly_rule() {
        let cmd = add_cmd(&["Standup", "--on", "MO,WE,FR", "--until", "2025-06-01"]);
        let rule = build_rule(CadenceKind::Weekly, &cmd).unwrap();
        assert_eq!(rule, "FREQ=WEEKLY;BYDAY=MO,WE,FR;UNTIL=20250601T235959Z");
    }

    #[test]
    fn biweekly_shorthand_sets_the_interval() {
        let cmd = add_cmd(&["Sprint", "--on", "TU"]);
        let rule = build_rule(CadenceKind::Biweekly, &cmd).unwrap();
        assert_eq!(rule, "FREQ=WEEKLY;INTERVAL=2;BYDAY=TU");
    }

    #[test]
    fn monthly_day_flag_lands_in_bymonthday() {
        let cmd = add_cmd(&["Rent", "--day-of-month", "31"]);
        let rule = build_rule(CadenceKind::Monthly, &cmd).unwrap();
        assert_eq!(rule, "FREQ=MONTHLY;BYMONTHDAY=31");
    }

    #[test]
    fn bad_weekday_code_is_rejected() {
        let cmd = add_cmd(&["X", "--on", "ZZ"]);
        assert!(build_rule(CadenceKind::Weekly, &cmd).is_err());
    }

    #[test]
    fn until_parses_as_date() {
        let cmd = add_cmd(&["X", "--until", "2024-12-31"]);
        assert_eq!(cmd.until, Some(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
    }
}
