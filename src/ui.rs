use std::fmt::Display;
use std::io::{self, IsTerminal};

use crate::app::{LevelSummary, PlantDetail, ShelfSummary, SlotView};
use crate::domain::plant::StateEvent;
use crate::domain::state::StateType;
use crate::inventory::InventoryRow;
use crate::listing::SortConfig;

pub fn print_inventory(rows: &[InventoryRow], shelf: Option<&str>, sort: &SortConfig) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Inventory"));
    if let Some(summary) = filter_summary(shelf, sort) {
        println!("{}", palette.dim(&format!("view: {summary}")));
    }
    for line in inventory_lines(rows, &palette) {
        println!("{line}");
    }
}

/// Shelf grid and inventory table as separate regions. A failed region
/// prints one error line; the other still renders.
pub fn print_overview<E: Display>(
    shelves: Result<Vec<ShelfSummary>, E>,
    inventory: Result<Vec<InventoryRow>, E>,
) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Shelves"));
    match shelves {
        Ok(shelves) => {
            for line in shelf_grid_lines(&shelves, &palette) {
                println!("{line}");
            }
        }
        Err(err) => println!("{}", region_error(&err, &palette)),
    }
    println!();
    println!("{}", palette.heading("Inventory"));
    match inventory {
        Ok(rows) => {
            for line in inventory_lines(&rows, &palette) {
                println!("{line}");
            }
        }
        Err(err) => println!("{}", region_error(&err, &palette)),
    }
}

pub fn print_shelves(shelves: &[ShelfSummary]) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Shelves"));
    for line in shelf_grid_lines(shelves, &palette) {
        println!("{line}");
    }
}

pub fn print_levels(shelf: &str, levels: &[LevelSummary]) {
    let palette = Palette::auto();
    println!("{}", palette.heading(&format!("Shelf {shelf}")));
    if levels.is_empty() {
        println!("{}", palette.dim("no levels"));
        return;
    }
    for level in levels {
        println!(
            "  level {:<3} {} {}",
            level.level,
            occupancy_bar(level.occupied, level.slots, &palette),
            palette.dim(&format!("{}/{}", level.occupied, level.slots))
        );
    }
}

pub fn print_positions(slots: &[SlotView]) {
    let palette = Palette::auto();
    if slots.is_empty() {
        println!("{}", palette.dim("no positions"));
        return;
    }
    for slot in slots {
        println!("{}", format_slot(slot, &palette));
    }
}

pub fn print_plant_detail(detail: &PlantDetail) {
    let palette = Palette::auto();
    for line in plant_detail_lines(detail, &palette) {
        println!("{line}");
    }
}

pub fn print_state_types(states: &[StateType]) {
    let palette = Palette::auto();
    for state in states {
        let note = if state.requires_harvest_weight() {
            palette.dim(" (requires harvest weight)")
        } else {
            String::new()
        };
        println!("{}{}", palette.state(state.as_str()), note);
    }
}

fn inventory_lines(rows: &[InventoryRow], palette: &Palette) -> Vec<String> {
    if rows.is_empty() {
        return vec![palette.dim("no plants registered")];
    }
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(palette.dim(&format!(
        "{:>5}  {:<10} {:<10}  {:<12} {:<10}",
        "id", "slot", "entry", "state", "since"
    )));
    for row in rows {
        lines.push(format_inventory_row(row, palette));
    }
    lines.push(palette.dim(&format!("{} plant(s)", rows.len())));
    lines
}

fn format_inventory_row(row: &InventoryRow, palette: &Palette) -> String {
    let slot = format!("{}/{}/{}", row.shelf, row.level, row.position);
    let label = row.state_label();
    let mut line = format!(
        "{}  {:<10} {:<10}  {} {}",
        palette.id(&format!("{:>5}", row.plant_id)),
        slot,
        row.entry_date,
        palette.state(&format!("{label:<10}")),
        row.state_date.as_deref().unwrap_or("-"),
    );
    if let Some(weight) = row.harvest_weight {
        line.push(' ');
        line.push_str(&palette.dim(&format!("{weight} g")));
    }
    line
}

fn shelf_grid_lines(shelves: &[ShelfSummary], palette: &Palette) -> Vec<String> {
    if shelves.is_empty() {
        return vec![palette.dim("no shelves; run `kabu init`")];
    }
    shelves
        .iter()
        .map(|shelf| {
            format!(
                "  {:<8} {} {}",
                shelf.shelf,
                occupancy_bar(shelf.occupied, shelf.slots, palette),
                palette.dim(&format!(
                    "{}/{} occupied, {} level(s)",
                    shelf.occupied, shelf.slots, shelf.levels
                ))
            )
        })
        .collect()
}

fn occupancy_bar(occupied: usize, slots: usize, palette: &Palette) -> String {
    let filled = "#".repeat(occupied.min(slots));
    let free = ".".repeat(slots.saturating_sub(occupied));
    format!("[{}{}]", palette.id(&filled), palette.dim(&free))
}

fn format_slot(slot: &SlotView, palette: &Palette) -> String {
    match slot.plant_id {
        Some(plant_id) => format!(
            "  {:<10} {}",
            slot.location.to_string(),
            palette.id(&format!("plant {plant_id}"))
        ),
        None => format!("  {:<10} {}", slot.location.to_string(), palette.dim("free")),
    }
}

fn plant_detail_lines(detail: &PlantDetail, palette: &Palette) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{} {} {}",
            palette.id(&format!("plant {}", detail.plant_id)),
            palette.state(detail.current_state),
            detail.location
        ),
        format!("  entry_date: {}", detail.entry_date),
    ];

    lines.push(palette.heading("  states"));
    if detail.history.is_empty() {
        lines.push(palette.dim("    none recorded"));
    }
    for event in &detail.history {
        lines.push(format_state_event(event, palette));
    }

    lines.push(palette.heading("  watering"));
    if detail.watering.is_empty() {
        lines.push(palette.dim("    none recorded"));
    }
    for event in &detail.watering {
        let recipe = if event.fertilizer_recipe_name.is_empty() {
            "-"
        } else {
            event.fertilizer_recipe_name.as_str()
        };
        let mut line = format!("    {} {} ml {}", event.watering_date, event.amount, recipe);
        if !event.description.is_empty() {
            line.push(' ');
            line.push_str(&palette.dim(&event.description));
        }
        lines.push(line);
    }
    lines
}

fn format_state_event(event: &StateEvent, palette: &Palette) -> String {
    let mut line = format!(
        "    {} {}",
        event.state_date,
        palette.state(event.state_type.as_str())
    );
    if let Some(weight) = event.harvest_weight {
        line.push_str(&format!(" {weight} g"));
    }
    if let Some(description) = event.description.as_deref() {
        line.push(' ');
        line.push_str(&palette.dim(description));
    }
    line
}

fn region_error<E: Display>(err: &E, palette: &Palette) -> String {
    palette.error(&format!("error: {err}"))
}

fn filter_summary(shelf: Option<&str>, sort: &SortConfig) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(shelf) = shelf.map(str::trim).filter(|value| !value.is_empty()) {
        parts.push(format!("shelf={shelf}"));
    }
    if let Some(key) = sort.key.filter(|_| !sort.is_default()) {
        parts.push(format!("sort={}:{}", key, sort.direction.as_str()));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn error(&self, text: &str) -> String {
        self.paint("1;31", text)
    }

    fn state(&self, state: &str) -> String {
        self.paint(state_color_code(state), state)
    }
}

fn state_color_code(state: &str) -> &'static str {
    match state.trim().to_ascii_lowercase().as_str() {
        "planted" => "34",
        "growing" => "32",
        "flowering" => "35",
        "fruiting" => "33",
        "harvested" => "31",
        "withered" => "90",
        _ => "37",
    }
}

#[cfg(test)]
mod tests {
    use super::{
        filter_summary, format_inventory_row, inventory_lines, plant_detail_lines,
        region_error, shelf_grid_lines, state_color_code, Palette,
    };
    use crate::app::{PlantDetail, ShelfSummary};
    use crate::domain::location::Location;
    use crate::domain::plant::{StateEvent, WateringEvent};
    use crate::domain::state::StateType;
    use crate::inventory::InventoryRow;
    use crate::listing::{SortConfig, SortDirection, SortKey};

    const PLAIN: Palette = Palette { enabled: false };

    fn row(plant_id: i64, state_type: Option<StateType>) -> InventoryRow {
        InventoryRow {
            plant_id,
            shelf: "A".to_string(),
            level: 1,
            position: 2,
            entry_date: "2024-01-01".to_string(),
            state_type,
            state_date: state_type.map(|_| "2024-02-01".to_string()),
            harvest_weight: None,
        }
    }

    #[test]
    fn inventory_row_shows_unset_for_plants_without_events() {
        let line = format_inventory_row(&row(3, None), &PLAIN);
        assert!(line.contains("A/1/2"));
        assert!(line.contains("unset"));
        assert!(line.trim_end().ends_with('-'));

        let harvested = InventoryRow {
            harvest_weight: Some(80.0),
            ..row(4, Some(StateType::Harvested))
        };
        let line = format_inventory_row(&harvested, &PLAIN);
        assert!(line.contains("harvested"));
        assert!(line.ends_with("80 g"));
    }

    #[test]
    fn empty_inventory_renders_placeholder() {
        assert_eq!(inventory_lines(&[], &PLAIN), vec!["no plants registered"]);
        let lines = inventory_lines(&[row(1, Some(StateType::Growing))], &PLAIN);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "1 plant(s)");
    }

    #[test]
    fn shelf_grid_shows_occupancy() {
        let lines = shelf_grid_lines(
            &[ShelfSummary {
                shelf: "B".to_string(),
                levels: 2,
                slots: 4,
                occupied: 1,
            }],
            &PLAIN,
        );
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("[#...]"));
        assert!(lines[0].contains("1/4 occupied, 2 level(s)"));
        assert!(shelf_grid_lines(&[], &PLAIN)[0].contains("kabu init"));
    }

    #[test]
    fn region_error_is_a_single_line() {
        let line = region_error(&"store unavailable", &PLAIN);
        assert_eq!(line, "error: store unavailable");
    }

    #[test]
    fn plant_detail_lists_states_and_watering() {
        let detail = PlantDetail {
            plant_id: 9,
            location: Location {
                id: 5,
                shelf: "C".to_string(),
                level: 3,
                position: 1,
            },
            entry_date: "2024-01-01".to_string(),
            current_state: "harvested",
            current: None,
            history: vec![StateEvent {
                plant_id: 9,
                state_date: "2024-04-01".to_string(),
                state_type: StateType::Harvested,
                harvest_weight: Some(42.5),
                description: Some("sweet".to_string()),
            }],
            watering: vec![WateringEvent {
                plant_id: 9,
                watering_date: "2024-03-01".to_string(),
                fertilizer_recipe_name: String::new(),
                amount: 150.0,
                description: String::new(),
            }],
        };
        let lines = plant_detail_lines(&detail, &PLAIN);
        assert_eq!(lines[0], "plant 9 harvested C/3/1");
        assert!(lines.iter().any(|line| line == "    2024-04-01 harvested 42.5 g sweet"));
        assert!(lines.iter().any(|line| line == "    2024-03-01 150 ml -"));
    }

    #[test]
    fn filter_summary_reports_only_active_view_options() {
        assert!(filter_summary(None, &SortConfig::default()).is_none());
        let sort = SortConfig::new(Some(SortKey::StateDate), SortDirection::Desc);
        assert_eq!(
            filter_summary(Some(" A "), &sort).as_deref(),
            Some("shelf=A sort=state_date:desc")
        );
    }

    #[test]
    fn palette_wraps_only_when_enabled() {
        let colored = Palette { enabled: true };
        assert_eq!(colored.state("growing"), "\x1b[32mgrowing\x1b[0m");
        assert_eq!(PLAIN.state("growing"), "growing");
        assert_eq!(state_color_code("mystery"), "37");
    }
}
