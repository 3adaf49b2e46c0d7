mod app;
mod check;
mod cli;
mod completions;
mod db;
mod domain;
mod history;
mod inventory;
mod layout;
mod listing;
mod registration;
mod registry;
mod store;
mod ui;

use std::str::FromStr;
use std::time::Duration;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("KABU_LOG").unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("kabu=debug")
        } else {
            EnvFilter::new("kabu=warn")
        }
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

fn run() -> Result<(), app::AppError> {
    use clap::Parser;
    use cli::Commands;

    let cli = cli::Cli::parse();
    setup_tracing(cli.verbose);

    if let Commands::Completions(args) = &cli.command {
        return completions::run_completions_command(args.shell.as_deref(), args.install);
    }

    let timeout = Duration::from_millis(cli.timeout_ms);
    let mut app = app::App::open(&cli.db, timeout)?;

    match cli.command {
        Commands::Init(args) => {
            let layout = layout::Layout::load(cli.layout.as_deref())?;
            let summary = app.init(&layout)?;
            if args.json {
                print_json(&summary);
            } else {
                println!(
                    "kabu init completed: {} shelves, {} positions ({} new)",
                    summary.shelves, summary.positions_total, summary.positions_created
                );
            }
        }
        Commands::StateTypes(args) => {
            if args.json {
                print_json(&app.state_types());
            } else {
                ui::print_state_types(app.state_types());
            }
        }
        Commands::Register(args) => {
            let detail = app.register(&app::RegisterRequest {
                shelf: args.shelf,
                level: args.level,
                position: args.position,
                state: args.state,
                harvest_amount: args.harvest_amount,
                entry_date: args.entry_date,
            })?;
            if args.json {
                print_json(&detail);
            } else {
                println!(
                    "registered plant {} at {} [{}]",
                    detail.plant_id, detail.location, detail.current_state
                );
            }
        }
        Commands::State(args) => {
            let event = app.record_state(&app::StateRequest {
                plant_id: args.plant_id,
                state: &args.state,
                harvest_weight: args.weight,
                date: args.date.as_deref(),
                note: args.note.as_deref(),
            })?;
            if args.json {
                print_json(&event);
            } else {
                println!(
                    "plant {} -> {} on {}",
                    event.plant_id, event.state_type, event.state_date
                );
            }
        }
        Commands::Water(args) => {
            let event = app.record_watering(&app::WateringRequest {
                plant_id: args.plant_id,
                recipe: &args.recipe,
                amount: args.amount,
                date: args.date.as_deref(),
                note: args.note.as_deref(),
            })?;
            if args.json {
                print_json(&event);
            } else {
                println!(
                    "plant {} watered {} ml on {}",
                    event.plant_id, event.amount, event.watering_date
                );
            }
        }
        Commands::Show(args) => {
            let detail = app.show_plant(args.plant_id)?;
            if args.json {
                print_json(&detail);
            } else {
                ui::print_plant_detail(&detail);
            }
        }
        Commands::Ls(args) => {
            let keys = args
                .sort
                .iter()
                .map(|raw| listing::SortKey::from_str(raw))
                .collect::<Result<Vec<_>, _>>()
                .map_err(app::AppError::InvalidArgument)?;
            let direction = args
                .direction
                .as_deref()
                .map(listing::SortDirection::from_str)
                .transpose()
                .map_err(app::AppError::InvalidArgument)?;
            let sort = listing::SortConfig::from_clicks(&keys, direction);
            let rows = app.list_inventory(&app::InventoryQuery {
                shelf: args.shelf.clone(),
                sort,
            })?;
            if args.json {
                print_json(&rows);
            } else {
                ui::print_inventory(&rows, args.shelf.as_deref(), &sort);
            }
        }
        Commands::Overview => {
            ui::print_overview(app.shelf_overview(), app.inventory());
        }
        Commands::Shelves(args) => {
            let shelves = app.shelf_overview()?;
            if args.json {
                print_json(&shelves);
            } else {
                ui::print_shelves(&shelves);
            }
        }
        Commands::Levels(args) => {
            let levels = app.list_levels(&args.shelf)?;
            if args.json {
                print_json(&levels);
            } else {
                ui::print_levels(args.shelf.trim(), &levels);
            }
        }
        Commands::Positions(args) => {
            let slots = app.list_positions(&args.shelf, args.level)?;
            if args.json {
                print_json(&slots);
            } else {
                ui::print_positions(&slots);
            }
        }
        Commands::Check(args) => {
            let report = app.check()?;
            if args.json {
                print_json(&report);
            } else {
                println!(
                    "check scanned_plants={} scanned_locations={} issues={}",
                    report.plants_scanned,
                    report.locations_scanned,
                    report.issues.len()
                );
                for issue in &report.issues {
                    println!("  - {}: {}", issue.subject, issue.message);
                }
            }
            if !report.ok() {
                return Err(app::AppError::Validation(format!(
                    "check found {} issue(s)",
                    report.issues.len()
                )));
            }
        }
        Commands::Completions(_) => {}
    }
    Ok(())
}
