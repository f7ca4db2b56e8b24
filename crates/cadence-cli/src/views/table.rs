use cadence_core::models::{Task, TaskStatus};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};

/// Renders tasks as a table. Roots show their rule, instances the day they
/// materialized for, committed tasks their committed day.
pub fn render(tasks: &[Task]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Name", "Status", "Priority", "Do", "Committed", "Repeats"]);

    for task in tasks {
        let status = match task.status {
            TaskStatus::Todo => Cell::new("todo"),
            TaskStatus::Done => Cell::new("done").fg(Color::Green),
            TaskStatus::Cancelled => Cell::new("cancelled").fg(Color::DarkGrey),
        };
        let repeats = match (&task.recurrence_rule, task.parent_task_id) {
            (Some(rule), _) => {
                let mut cell = rule.clone();
                if task.is_paused() {
                    cell.push_str(" (paused)");
                }
                cell
            }
            (None, Some(_)) => "↻ instance".to_string(),
            (None, None) => String::new(),
        };

        table.add_row(vec![
            Cell::new(short_id(task)),
            Cell::new(&task.name),
            status,
            Cell::new(format!("{:?}", task.priority).to_lowercase()),
            Cell::new(task.do_date.map(|d| d.to_string()).unwrap_or_default()),
            Cell::new(task.committed_date.map(|d| d.to_string()).unwrap_or_default()),
            Cell::new(repeats),
        ]);
    }
    table
}

fn short_id(task: &Task) -> String {
    task.id.to_string().chars().take(8).collect()
}
