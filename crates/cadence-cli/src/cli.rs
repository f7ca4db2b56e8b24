use cadence_core::models::TaskPriority;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    name = "cadence",
    about = "Recurring-task engine for the cadence operations dashboard",
    version
)]
pub struct Cli {
    /// Act as this owner (defaults to the configured owner)
    #[arg(long, global = true)]
    pub owner: Option<Uuid>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a task, optionally as a recurring series root
    Add(AddCommand),
    /// List tasks
    List(ListCommand),
    /// Run a reconciliation pass (materialize due occurrences)
    Reconcile(ReconcileCommand),
    /// Commit a task to a specific day
    Commit(CommitCommand),
    /// Return a committed task to the backlog
    Uncommit(UncommitCommand),
    /// Pause a recurring series (instances stop materializing)
    Pause(SeriesCommand),
    /// Resume a paused series
    Resume(SeriesCommand),
    /// Delete a task
    Delete(DeleteCommand),
}

/// Shorthand cadences offered by the rule-building flags. `biweekly` is
/// weekly with INTERVAL=2.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CadenceKind {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

#[derive(Args, Debug)]
pub struct AddCommand {
    /// Task name
    pub name: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// none, low, medium, or high
    #[arg(long, short = 'p')]
    pub priority: Option<TaskPriority>,

    /// Due date (YYYY-MM-DD); also anchors a recurring series
    #[arg(long)]
    pub due: Option<NaiveDate>,

    /// Estimated duration in minutes
    #[arg(long)]
    pub duration: Option<i64>,

    /// Free-form context label (e.g. home, office)
    #[arg(long)]
    pub context: Option<String>,

    /// Mark the task eligible for the external auto-scheduler
    #[arg(long)]
    pub auto_schedule: bool,

    /// Raw recurrence rule, e.g. "FREQ=WEEKLY;BYDAY=MO,WE,FR"
    #[arg(long, conflicts_with = "every")]
    pub repeat: Option<String>,

    /// Build a rule from a shorthand cadence instead
    #[arg(long, value_enum)]
    pub every: Option<CadenceKind>,

    /// Weekday codes for weekly cadences (MO,TU,WE,TH,FR,SA,SU)
    #[arg(long, value_delimiter = ',')]
    pub on: Vec<String>,

    /// Day of month for monthly cadences (clamped in short months)
    #[arg(long)]
    pub day_of_month: Option<u32>,

    /// Last date the series may produce an occurrence (inclusive)
    #[arg(long)]
    pub until: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct ListCommand {
    /// Include tasks of every owner
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct ReconcileCommand {
    /// Reconcile every series across all tenants (periodic mode)
    #[arg(long, conflicts_with = "task")]
    pub all: bool,

    /// Narrow the pass to one series root
    #[arg(long)]
    pub task: Option<Uuid>,

    /// Window start (YYYY-MM-DD); requires --to
    #[arg(long, requires = "to")]
    pub from: Option<NaiveDate>,

    /// Window end, inclusive (YYYY-MM-DD); requires --from
    #[arg(long, requires = "from")]
    pub to: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct CommitCommand {
    /// Task id
    pub id: Uuid,

    /// Day to commit to (defaults to today)
    #[arg(long)]
    pub on: Option<NaiveDate>,

    /// Also mark the task eligible for the external auto-scheduler
    #[arg(long)]
    pub auto_schedule: bool,
}

#[derive(Args, Debug)]
pub struct UncommitCommand {
    /// Task id
    pub id: Uuid,
}

#[derive(Args, Debug)]
pub struct SeriesCommand {
    /// Series root task id
    pub id: Uuid,
}

#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Task id
    pub id: Uuid,
}
