use clap::Parser;

use super::{Cli, Commands};

fn parse(args: &[&str]) -> Cli {
    Cli::parse_from(args)
}

#[test]
fn register_parses_full_slot_and_harvest_amount() {
    let cli = parse(&[
        "kabu",
        "register",
        "--shelf",
        "A",
        "--level",
        "2",
        "--position",
        "3",
        "--state",
        "harvested",
        "--harvest-amount",
        "42.5",
        "--entry-date",
        "2024-05-01",
    ]);
    match cli.command {
        Commands::Register(args) => {
            assert_eq!(args.shelf, "A");
            assert_eq!((args.level, args.position), (2, 3));
            assert_eq!(args.state, "harvested");
            assert_eq!(args.harvest_amount, Some(42.5));
            assert_eq!(args.entry_date.as_deref(), Some("2024-05-01"));
            assert!(!args.json);
        }
        other => panic!("expected Register, got {:?}", other),
    }
}

#[test]
fn ls_parses_sort_and_shelf() {
    let cli = parse(&[
        "kabu",
        "ls",
        "--shelf",
        "B",
        "--sort",
        "state_date",
        "--direction",
        "desc",
        "--json",
    ]);
    match cli.command {
        Commands::Ls(args) => {
            assert_eq!(args.shelf.as_deref(), Some("B"));
            assert_eq!(args.sort, vec!["state_date".to_string()]);
            assert_eq!(args.direction.as_deref(), Some("desc"));
            assert!(args.json);
        }
        other => panic!("expected Ls, got {:?}", other),
    }
}

#[test]
fn ls_sort_repeats_and_direction_is_optional() {
    let cli = parse(&["kabu", "ls", "--sort", "level", "--sort", "level"]);
    match cli.command {
        Commands::Ls(args) => {
            assert_eq!(args.sort, vec!["level".to_string(), "level".to_string()]);
            assert_eq!(args.direction, None);
        }
        other => panic!("expected Ls, got {:?}", other),
    }
}

#[test]
fn state_parses_weight_date_and_note() {
    let cli = parse(&[
        "kabu", "state", "7", "harvested", "-w", "120", "--date", "2024-06-01", "-n", "late",
    ]);
    match cli.command {
        Commands::State(args) => {
            assert_eq!(args.plant_id, 7);
            assert_eq!(args.weight, Some(120.0));
            assert_eq!(args.date.as_deref(), Some("2024-06-01"));
            assert_eq!(args.note.as_deref(), Some("late"));
        }
        other => panic!("expected State, got {:?}", other),
    }
}

#[test]
fn water_recipe_defaults_to_empty() {
    let cli = parse(&["kabu", "water", "3", "--amount", "250"]);
    match cli.command {
        Commands::Water(args) => {
            assert_eq!(args.recipe, "");
            assert_eq!(args.amount, 250.0);
        }
        other => panic!("expected Water, got {:?}", other),
    }
}

#[test]
fn global_flags_parse_after_subcommand() {
    let cli = parse(&[
        "kabu",
        "positions",
        "C",
        "1",
        "--db",
        "/tmp/x.sqlite",
        "--timeout-ms",
        "250",
        "-v",
    ]);
    assert_eq!(cli.db, "/tmp/x.sqlite");
    assert_eq!(cli.timeout_ms, 250);
    assert!(cli.verbose);
    match cli.command {
        Commands::Positions(args) => {
            assert_eq!(args.shelf, "C");
            assert_eq!(args.level, 1);
        }
        other => panic!("expected Positions, got {:?}", other),
    }
}

#[test]
fn non_numeric_plant_id_is_rejected() {
    assert!(Cli::try_parse_from(["kabu", "show", "abc"]).is_err());
}
