//! Sheet selection by layered name matching.
//!
//! Workbooks in the wild name their sheets inconsistently, so each view has a
//! canonical target phrase and matching degrades through ever looser layers.
//! Exact phrases are trusted most; the keyword fallback exists only for the
//! travel-cost sheet, whose naming is the least reliable.

use clap::ValueEnum;
use log::debug;

/// Which analysis view a sheet is being selected for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ViewKind {
    /// Meeting statistics sheet.
    #[default]
    Default,
    /// Travel cost settlement sheet.
    TravelCost,
}

const DEFAULT_TARGET: &str = "会议信息统计表【Monthly】";
const TRAVEL_COST_TARGET: &str = "会议差旅【Monthly】";
const TRAVEL_PRIMARY_KEYWORD: &str = "会议差旅";
const TRAVEL_PERIOD_QUALIFIER: &str = "Monthly";
const TRAVEL_KEYWORDS: [&str; 3] = ["差旅", "travel", "cost"];
const BRACKET_CHARS: [char; 6] = ['【', '】', '[', ']', '(', ')'];
const FULLWIDTH_PARENS: [char; 2] = ['（', '）'];

impl ViewKind {
    fn target(self) -> &'static str {
        match self {
            ViewKind::Default => DEFAULT_TARGET,
            ViewKind::TravelCost => TRAVEL_COST_TARGET,
        }
    }
}

/// Finds the sheet best matching a target phrase, trying layers in order:
/// exact containment, bracket-stripped containment, case-insensitive
/// containment in either direction, then travel keywords for travel targets.
pub fn find_matching_sheet<'a>(sheet_names: &'a [String], target: &str) -> Option<&'a str> {
    if sheet_names.is_empty() {
        return None;
    }

    if let Some(name) = sheet_names.iter().find(|name| name.contains(target)) {
        return Some(name);
    }

    let simplified = strip_brackets(target);
    if let Some(name) = sheet_names.iter().find(|name| name.contains(&simplified)) {
        debug!("sheet '{name}' matched simplified target '{simplified}'");
        return Some(name);
    }

    let target_lower = target.to_lowercase();
    if let Some(name) = sheet_names.iter().find(|name| {
        let name_lower = name.to_lowercase();
        name_lower.contains(&target_lower) || target_lower.contains(&name_lower)
    }) {
        return Some(name);
    }

    if target.contains(TRAVEL_PRIMARY_KEYWORD)
        && let Some(name) = sheet_names.iter().find(|name| {
            let lower = name.to_lowercase();
            TRAVEL_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
        })
    {
        return Some(name);
    }

    None
}

fn strip_brackets(target: &str) -> String {
    target
        .chars()
        .filter(|c| !BRACKET_CHARS.contains(c) && !FULLWIDTH_PARENS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Picks the sheet for a view, falling back to the first sheet when nothing
/// matches. Returns `None` only for an empty workbook.
pub fn select_sheet(sheet_names: &[String], view: ViewKind) -> Option<&str> {
    let first = sheet_names.first().map(String::as_str)?;
    if let Some(name) = find_matching_sheet(sheet_names, view.target()) {
        return Some(name);
    }
    if view == ViewKind::TravelCost {
        // The exact travel sheet name drifts between exports; accept any
        // sheet pairing the primary keyword with the period qualifier, then
        // any travel keyword at all.
        if let Some(name) = sheet_names.iter().find(|name| {
            name.contains(TRAVEL_PRIMARY_KEYWORD) && name.contains(TRAVEL_PERIOD_QUALIFIER)
        }) {
            return Some(name);
        }
        if let Some(name) = sheet_names.iter().find(|name| {
            let lower = name.to_lowercase();
            TRAVEL_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
        }) {
            return Some(name);
        }
    }
    Some(first)
}
