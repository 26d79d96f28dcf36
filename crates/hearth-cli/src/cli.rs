use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "hearth")]
#[command(about = "Shared live map, gallery and work dashboard from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to a JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in, sign out or show the stored session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Show everyone's last shared location
    Map {
        /// Keep running and print location changes as they arrive
        #[arg(long)]
        watch: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Publish your position once
    Share {
        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
    /// Work tasks
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Calendar events and dated tasks
    Calendar {
        #[command(subcommand)]
        command: CalendarCommands,
    },
    /// Shared photo gallery
    Gallery {
        #[command(subcommand)]
        command: GalleryCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with Google. Without --redirect-url, prints the URL to open.
    Login {
        /// URL the browser landed on after signing in
        #[arg(long, value_name = "URL")]
        redirect_url: Option<String>,
        /// Where the provider should send the browser back to
        #[arg(long, value_name = "URL", default_value = "http://localhost:3000")]
        redirect_to: String,
    },
    /// Show who is signed in
    Status,
    /// Sign out and clear the stored session
    Logout,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SortArg {
    Newest,
    Priority,
    Due,
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// List tasks in pinned, pending and completed columns
    List {
        /// Ordering of the pending column
        #[arg(long, value_enum, default_value_t = SortArg::Newest)]
        sort: SortArg,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a task
    #[command(alias = "new")]
    Add {
        /// Task content
        content: Vec<String>,
        #[arg(short, long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,
        /// Due date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        due: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Toggle a task's completed state
    Done { id: i64 },
    /// Toggle a task's pinned state
    Pin { id: i64 },
    /// Delete a task
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum CalendarCommands {
    /// List events and dated tasks in a date range
    List {
        /// First day (YYYY-MM-DD); defaults to the first of this month
        #[arg(long, value_name = "DATE")]
        from: Option<String>,
        /// Last day (YYYY-MM-DD); defaults to the end of the month of --from
        #[arg(long, value_name = "DATE")]
        to: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move an event or task, e.g. `hearth calendar move task:3 --to 2024-06-12`
    Move {
        /// Item as kind:id (event:5, task:3)
        item: String,
        /// New start: a date for all-day items or an RFC 3339 timestamp
        #[arg(long, value_name = "WHEN")]
        to: String,
        /// Any day of the month the item is currently in; defaults to today
        #[arg(long, value_name = "DATE")]
        month: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum GalleryCommands {
    /// List photos, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload a photo
    Upload {
        /// Image file
        path: PathBuf,
    },
    /// Delete a photo and its stored file
    Delete { id: i64 },
}
