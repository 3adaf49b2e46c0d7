use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

pub fn styled_command() -> clap::Command {
    Cli::command()
}

#[derive(Debug, Parser)]
#[command(name = "kabu")]
#[command(bin_name = "kabu")]
#[command(version)]
#[command(about = "Strawberry plant inventory and lifecycle tracker")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        env = "KABU_DB_PATH",
        default_value = ".kabu/kabu.sqlite",
        global = true,
        help = "Path to the SQLite inventory database."
    )]
    pub db: String,

    #[arg(
        short = 'L',
        long,
        env = "KABU_LAYOUT",
        global = true,
        help = "Shelf layout TOML used by `init` (built-in layout when omitted)."
    )]
    pub layout: Option<PathBuf>,

    #[arg(
        long = "timeout-ms",
        env = "KABU_TIMEOUT_MS",
        default_value_t = 5000,
        global = true,
        help = "Upper bound in milliseconds for each store write."
    )]
    pub timeout_ms: u64,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Log debug output to stderr (overridden by KABU_LOG)."
    )]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Create the database and seed shelves, levels, and positions.")]
    Init(JsonArgs),
    #[command(about = "List the plant lifecycle states.")]
    StateTypes(JsonArgs),
    #[command(about = "Register a plant at a free position.")]
    Register(RegisterArgs),
    #[command(about = "Record a lifecycle state for a plant.")]
    State(StateArgs),
    #[command(about = "Record a watering for a plant.")]
    Water(WaterArgs),
    #[command(about = "Show one plant with its state and watering history.")]
    Show(ShowArgs),
    #[command(about = "List the inventory with sorting and shelf filtering.")]
    Ls(ListArgs),
    #[command(about = "Show the shelf grid and the inventory.")]
    Overview,
    #[command(about = "List shelves with occupancy.")]
    Shelves(JsonArgs),
    #[command(about = "List the levels of a shelf.")]
    Levels(LevelsArgs),
    #[command(about = "List the positions of a level with their occupants.")]
    Positions(PositionsArgs),
    #[command(about = "Validate stored plants, locations, and state events.")]
    Check(JsonArgs),
    #[command(about = "Generate or install shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct JsonArgs {
    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "Register a plant.")]
pub struct RegisterArgs {
    #[arg(short = 's', long, help = "Shelf name.")]
    pub shelf: String,

    #[arg(short = 'l', long, help = "Level number on the shelf.")]
    pub level: i64,

    #[arg(short = 'p', long, help = "Position number on the level.")]
    pub position: i64,

    #[arg(short = 't', long, help = "Initial lifecycle state.")]
    pub state: String,

    #[arg(
        short = 'w',
        long = "harvest-amount",
        help = "Harvest weight in grams (required for harvested)."
    )]
    pub harvest_amount: Option<f64>,

    #[arg(
        short = 'e',
        long = "entry-date",
        help = "Entry date (defaults to today, UTC)."
    )]
    pub entry_date: Option<String>,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "Record a plant state.")]
pub struct StateArgs {
    #[arg(help = "Plant id.")]
    pub plant_id: i64,

    #[arg(help = "Lifecycle state.")]
    pub state: String,

    #[arg(
        short = 'w',
        long = "weight",
        help = "Harvest weight in grams (required for harvested)."
    )]
    pub weight: Option<f64>,

    #[arg(long, help = "State date (defaults to today, UTC).")]
    pub date: Option<String>,

    #[arg(short = 'n', long, help = "Free-text note.")]
    pub note: Option<String>,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "Record a watering.")]
pub struct WaterArgs {
    #[arg(help = "Plant id.")]
    pub plant_id: i64,

    #[arg(short = 'r', long, default_value = "", help = "Fertilizer recipe name.")]
    pub recipe: String,

    #[arg(short = 'a', long, help = "Amount in millilitres.")]
    pub amount: f64,

    #[arg(long, help = "Watering date (defaults to today, UTC).")]
    pub date: Option<String>,

    #[arg(short = 'n', long, help = "Free-text note.")]
    pub note: Option<String>,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "Show plant details.")]
pub struct ShowArgs {
    #[arg(help = "Plant id.")]
    pub plant_id: i64,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "List inventory rows.")]
pub struct ListArgs {
    #[arg(short = 's', long, help = "Only show plants on this shelf.")]
    pub shelf: Option<String>,

    #[arg(
        long,
        help = "Sort key: plant_id, shelf, level, position, entry_date, state_date. \
                Repeating a key cycles it like a column header: asc, desc, default."
    )]
    pub sort: Vec<String>,

    #[arg(
        long,
        help = "Pin the direction of the last --sort key: asc, desc, or none."
    )]
    pub direction: Option<String>,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "List levels.")]
pub struct LevelsArgs {
    #[arg(help = "Shelf name.")]
    pub shelf: String,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "List positions.")]
pub struct PositionsArgs {
    #[arg(help = "Shelf name.")]
    pub shelf: String,

    #[arg(help = "Level number.")]
    pub level: i64,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "Generate or install shell completions.")]
pub struct CompletionsArgs {
    #[arg(help = "Shell name (bash, zsh, fish). Auto-detected if omitted.")]
    pub shell: Option<String>,

    #[arg(
        short = 'i',
        long = "install",
        help = "Write completions to the canonical path for the shell."
    )]
    pub install: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
