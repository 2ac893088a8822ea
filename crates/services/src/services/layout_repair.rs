//! Layout repair for tab grids.
//!
//! Takes whatever layout and fidget instances a tab currently holds (after a
//! migration, a concurrent edit or partial corruption) and returns a layout
//! that is structurally valid: every placement references an instance, every
//! instance is placed, nothing sits outside the grid and nothing overlaps.
//! Valid placements are left where they are; earlier items in the layout win
//! conflicts against later ones.
//!
//! Repair is pure and never fails. Callers persist the result only when
//! `has_changes` is set.

use std::collections::{BTreeMap, HashSet};

use convert_case::{Case, Casing};
use db::models::{fidget::FidgetInstanceDatum, grid_layout::GridItem, tab_config::TabConfiguration};
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_COLS: i32 = 12;
pub const FEED_COLS: i32 = 6;
pub const DEFAULT_ROWS: i32 = 10;
pub const PROFILE_ROWS: i32 = 8;

/// Grid dimensions for a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBounds {
    pub cols: i32,
    pub max_rows: i32,
}

impl GridBounds {
    pub fn new(has_profile: bool, has_feed: bool) -> Self {
        Self {
            cols: if has_feed { FEED_COLS } else { DEFAULT_COLS },
            max_rows: if has_profile { PROFILE_ROWS } else { DEFAULT_ROWS },
        }
    }

    /// Bounds implied by the fidget kinds present in `config`.
    pub fn for_tab(config: &TabConfiguration) -> Self {
        Self::new(config.has_profile(), config.has_feed())
    }
}

/// Output of [`repair`].
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRepair {
    pub cleaned_layout: Vec<GridItem>,
    pub cleaned_fidget_instance_datums: BTreeMap<String, FidgetInstanceDatum>,
    /// Items that fit nowhere on the grid and were dropped with their instances
    pub removed_fidget_ids: Vec<String>,
    pub has_changes: bool,
}

/// Repair `layout` against `fidget_instance_datums` on the grid implied by
/// the profile / feed flags.
pub fn repair(
    layout: &[GridItem],
    fidget_instance_datums: &BTreeMap<String, FidgetInstanceDatum>,
    has_profile: bool,
    has_feed: bool,
) -> LayoutRepair {
    let bounds = GridBounds::new(has_profile, has_feed);
    let mut has_changes = false;

    let normalized = normalize(layout);
    if normalized.len() != layout.len() || normalized.iter().zip(layout).any(|(a, b)| a != b) {
        has_changes = true;
    }

    let (surviving, orphans_dropped) = drop_orphans(normalized, fidget_instance_datums);
    if orphans_dropped > 0 {
        has_changes = true;
    }

    // Settings migration for placed instances, pruning of unplaced ones
    let placed_ids: HashSet<&str> = surviving.iter().map(|item| item.i.as_str()).collect();
    let mut datums = BTreeMap::new();
    let mut unused_pruned = 0usize;
    for (id, datum) in fidget_instance_datums {
        if !placed_ids.contains(id.as_str()) {
            unused_pruned += 1;
            has_changes = true;
            continue;
        }
        let mut datum = datum.clone();
        if migrate_settings_keys(&mut datum.config.settings) {
            has_changes = true;
        }
        datums.insert(id.clone(), datum);
    }

    let (cleaned_layout, removed_fidget_ids) = resolve_overlaps(&surviving, bounds);

    for id in &removed_fidget_ids {
        datums.remove(id);
        has_changes = true;
    }

    let before: BTreeMap<&str, &GridItem> = surviving
        .iter()
        .map(|item| (item.i.as_str(), item))
        .collect();
    let moved = cleaned_layout
        .iter()
        .filter(|item| {
            before
                .get(item.i.as_str())
                .is_none_or(|original| !original.same_placement(item))
        })
        .count();
    if moved > 0 {
        has_changes = true;
    }

    if has_changes {
        debug!(
            orphans_dropped,
            unused_pruned,
            moved,
            unplaceable = removed_fidget_ids.len(),
            cols = bounds.cols,
            max_rows = bounds.max_rows,
            "Layout repaired"
        );
    }

    LayoutRepair {
        cleaned_layout,
        cleaned_fidget_instance_datums: datums,
        removed_fidget_ids,
        has_changes,
    }
}

/// Repair a whole tab configuration in place using the bounds its fidgets imply.
/// Returns whether anything changed.
pub fn repair_tab(config: &mut TabConfiguration) -> bool {
    let result = repair(
        config.layout(),
        &config.fidget_instance_datums,
        config.has_profile(),
        config.has_feed(),
    );
    if result.has_changes {
        *config.layout_mut() = result.cleaned_layout;
        config.fidget_instance_datums = result.cleaned_fidget_instance_datums;
    }
    result.has_changes
}

/// Place every item on a `bounds` grid without overlaps.
///
/// Items are taken in order. An item whose current rectangle (after clamping
/// its size to the grid) is in bounds and clear of everything already placed
/// stays put. Otherwise the first free slot is used, scanning columns left to
/// right and, within a column, rows top to bottom. Items with no free slot are
/// returned in the second list and occupy nothing.
///
/// `static` items get no special treatment.
pub fn resolve_overlaps(layout: &[GridItem], bounds: GridBounds) -> (Vec<GridItem>, Vec<String>) {
    let mut placed: Vec<GridItem> = Vec::with_capacity(layout.len());
    let mut removed = Vec::new();

    for item in layout {
        let mut candidate = item.clone();
        candidate.w = candidate.w.min(bounds.cols).max(1);
        candidate.h = candidate.h.min(bounds.max_rows).max(1);

        let keep_in_place = candidate.fits_within(bounds.cols, bounds.max_rows)
            && !collides(&candidate, &placed);
        if keep_in_place {
            placed.push(candidate);
            continue;
        }

        match find_free_slot(&candidate, &placed, bounds) {
            Some((x, y)) => {
                candidate.x = x;
                candidate.y = y;
                placed.push(candidate);
            }
            None => removed.push(candidate.i),
        }
    }

    (placed, removed)
}

fn collides(candidate: &GridItem, placed: &[GridItem]) -> bool {
    placed.iter().any(|other| other.overlaps(candidate))
}

fn find_free_slot(candidate: &GridItem, placed: &[GridItem], bounds: GridBounds) -> Option<(i32, i32)> {
    let mut probe = candidate.clone();
    for x in 0..=(bounds.cols - candidate.w) {
        for y in 0..=(bounds.max_rows - candidate.h) {
            probe.x = x;
            probe.y = y;
            if !collides(&probe, placed) {
                return Some((x, y));
            }
        }
    }
    None
}

/// Placements whose instance still exists, and how many were dropped.
fn drop_orphans(
    layout: Vec<GridItem>,
    fidget_instance_datums: &BTreeMap<String, FidgetInstanceDatum>,
) -> (Vec<GridItem>, usize) {
    let before = layout.len();
    let surviving: Vec<GridItem> = layout
        .into_iter()
        .filter(|item| fidget_instance_datums.contains_key(&item.i))
        .collect();
    let dropped = before - surviving.len();
    (surviving, dropped)
}

/// Keep the first occurrence of each id and give degenerate sizes one cell.
fn normalize(layout: &[GridItem]) -> Vec<GridItem> {
    let mut seen = HashSet::new();
    layout
        .iter()
        .filter(|item| seen.insert(item.i.as_str()))
        .map(|item| {
            let mut item = item.clone();
            item.w = item.w.max(1);
            item.h = item.h.max(1);
            item
        })
        .collect()
}

/// Rename legacy settings keys (ones containing whitespace, e.g.
/// `"fidget Shadow"`) to their camelCase form. An existing camelCase value
/// wins over the legacy one. Returns whether any key was touched.
pub fn migrate_settings_keys(settings: &mut BTreeMap<String, Value>) -> bool {
    let legacy: Vec<String> = settings
        .keys()
        .filter(|key| key.chars().any(char::is_whitespace))
        .cloned()
        .collect();

    for key in &legacy {
        if let Some(value) = settings.remove(key) {
            let current = key.to_case(Case::Camel);
            settings.entry(current).or_insert(value);
        }
    }

    !legacy.is_empty()
}
