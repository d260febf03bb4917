//! Column role inference for loosely structured meeting sheets.
//!
//! Input sheets carry no reliable schema: header rows may be missing, header
//! text mixes English and Chinese, and some fields are only recognizable from
//! the values in the column. Each semantic [`Role`] is resolved through an
//! ordered chain of matchers:
//!
//! 1. strict header rules against the header row,
//! 2. a one-time global fallback that re-runs the strict rules against the
//!    first data row and promotes it to header when the original header row
//!    matched nothing at all,
//! 3. loose header rules for roles with known alternate spellings,
//! 4. content scoring over sampled data rows for the roles that resist
//!    name matching,
//! 5. a fixed column position kept for one legacy layout.
//!
//! A role that survives the whole chain unresolved is a normal outcome, not
//! an error; consumers treat it as "field unavailable".

use std::{fmt, str::FromStr, sync::OnceLock};

use itertools::Itertools;
use log::debug;
use regex::Regex;
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::filter::CANCELLATION_MARKER;
use crate::stats::{YesNo, normalize_yes_no};
use crate::workbook::{Row, cell_at};

/// Rows sampled by the event-type content scorer.
const EVENT_TYPE_SAMPLE_ROWS: usize = 50;
/// Rows sampled by the yes/no density and cancellation-marker scorers.
const CONTENT_SAMPLE_ROWS: usize = 20;
/// Minimum event-type score for a column to be accepted.
const EVENT_TYPE_SCORE_FLOOR: i32 = 20;
/// Header containing a date keyword is never an event-type candidate.
const EVENT_TYPE_DATE_PENALTY: i32 = -100;
/// Minimum yes/no density for a column to be accepted as a flag column.
const YES_NO_RATIO_FLOOR: f64 = 0.7;

const EVENT_TYPE_KEYWORDS: [&str; 3] = ["campaign", "one time", "sub event"];

/// A semantic field the resolver tries to locate a column for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Year,
    Month,
    Region,
    Brand,
    EssName,
    EssOffline,
    EssOnline,
    Cancellation,
    EventType,
    Budget,
    TravelCost,
    SpeakerContract,
    SanofiPaidSpeaker,
    SpeakerFee,
}

impl Role {
    pub const ALL: [Role; 14] = [
        Role::Year,
        Role::Month,
        Role::Region,
        Role::Brand,
        Role::EssName,
        Role::EssOffline,
        Role::EssOnline,
        Role::Cancellation,
        Role::EventType,
        Role::Budget,
        Role::TravelCost,
        Role::SpeakerContract,
        Role::SanofiPaidSpeaker,
        Role::SpeakerFee,
    ];

    /// Stable machine-readable key used in JSON output and CLI overrides.
    pub fn key(self) -> &'static str {
        match self {
            Role::Year => "year",
            Role::Month => "month",
            Role::Region => "region",
            Role::Brand => "brand",
            Role::EssName => "ess_name",
            Role::EssOffline => "ess_offline",
            Role::EssOnline => "ess_online",
            Role::Cancellation => "cancellation",
            Role::EventType => "event_type",
            Role::Budget => "budget",
            Role::TravelCost => "travel_cost",
            Role::SpeakerContract => "speaker_contract",
            Role::SanofiPaidSpeaker => "sanofi_paid_speaker",
            Role::SpeakerFee => "speaker_fee",
        }
    }

    /// Human-readable label for table output.
    pub fn label(self) -> &'static str {
        match self {
            Role::Year => "Year",
            Role::Month => "Month",
            Role::Region => "Region",
            Role::Brand => "Brand/Team",
            Role::EssName => "ESS Name",
            Role::EssOffline => "ESS Offline",
            Role::EssOnline => "ESS Online",
            Role::Cancellation => "Cancellation",
            Role::EventType => "Event Type",
            Role::Budget => "Budget",
            Role::TravelCost => "Travel Cost",
            Role::SpeakerContract => "Speaker Contracts",
            Role::SanofiPaidSpeaker => "Sanofi Paid Speakers",
            Role::SpeakerFee => "Speaker Fee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let canon = input.trim().to_lowercase().replace('-', "_");
        Role::ALL
            .into_iter()
            .find(|role| role.key() == canon)
            .ok_or_else(|| {
                format!(
                    "unknown column role '{input}' (expected one of: {})",
                    Role::ALL.iter().map(|role| role.key()).join(", ")
                )
            })
    }
}

/// Mapping from roles to resolved column indices. A missing entry means the
/// role could not be located; the JSON form renders it as `-1`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    slots: [Option<usize>; Role::ALL.len()],
}

impl Schema {
    pub fn column(&self, role: Role) -> Option<usize> {
        self.slots[role as usize]
    }

    pub fn assign(&mut self, role: Role, index: usize) {
        self.slots[role as usize] = Some(index);
    }

    /// True when no role has been resolved at all.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn resolved(&self) -> impl Iterator<Item = (Role, usize)> + '_ {
        Role::ALL
            .into_iter()
            .filter_map(|role| self.column(role).map(|index| (role, index)))
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Role::ALL.len()))?;
        for role in Role::ALL {
            let index = self.column(role).map_or(-1i64, |index| index as i64);
            map.serialize_entry(role.key(), &index)?;
        }
        map.end()
    }
}

/// Declarative header-matching rule. A header matches when none of the
/// excluded keywords appear and any positive condition holds: an exact
/// token, a substring keyword, or a group whose keywords must all co-occur.
#[derive(Debug, Clone, Copy)]
pub struct HeaderRule {
    equals: &'static [&'static str],
    contains: &'static [&'static str],
    any_group: &'static [&'static [&'static str]],
    excludes: &'static [&'static str],
}

impl HeaderRule {
    pub fn matches(&self, header: &str) -> bool {
        let canon = canon(header);
        if canon.is_empty() {
            return false;
        }
        if self.excludes.iter().any(|keyword| canon.contains(keyword)) {
            return false;
        }
        if self.equals.iter().any(|token| canon == *token) {
            return true;
        }
        if self.contains.iter().any(|keyword| canon.contains(keyword)) {
            return true;
        }
        self.any_group
            .iter()
            .any(|group| group.iter().all(|keyword| canon.contains(keyword)))
    }
}

fn canon(text: &str) -> String {
    text.trim().to_lowercase()
}

const NONE: &[&str] = &[];
const NO_GROUPS: &[&[&str]] = &[];

const YEAR_HEADER: HeaderRule = HeaderRule {
    equals: &["year", "fiscal year", "fy"],
    contains: &["年份"],
    any_group: NO_GROUPS,
    excludes: NONE,
};
const MONTH_HEADER: HeaderRule = HeaderRule {
    equals: &["month"],
    contains: NONE,
    any_group: NO_GROUPS,
    excludes: NONE,
};
const MONTH_LOOSE: HeaderRule = HeaderRule {
    equals: &["m"],
    contains: &["month", "月"],
    any_group: NO_GROUPS,
    excludes: NONE,
};
const REGION_HEADER: HeaderRule = HeaderRule {
    equals: &["region"],
    contains: NONE,
    any_group: NO_GROUPS,
    excludes: NONE,
};
const REGION_LOOSE: HeaderRule = HeaderRule {
    equals: &["r"],
    contains: &["region", "区域", "地区"],
    any_group: NO_GROUPS,
    excludes: NONE,
};
const BRAND_HEADER: HeaderRule = HeaderRule {
    equals: NONE,
    contains: &["brand", "team"],
    any_group: NO_GROUPS,
    excludes: NONE,
};
const ESS_NAME_HEADER: HeaderRule = HeaderRule {
    equals: &["ess name"],
    contains: NONE,
    any_group: &[&["ess", "name"]],
    excludes: NONE,
};
const ESS_NAME_LOOSE: HeaderRule = HeaderRule {
    equals: NONE,
    contains: &["ess", "name", "人员", "人名"],
    any_group: NO_GROUPS,
    excludes: NONE,
};
const ESS_OFFLINE_HEADER: HeaderRule = HeaderRule {
    equals: &["是否需要ess线下参会"],
    contains: &["ess参会", "线下参会", "ess线下"],
    any_group: NO_GROUPS,
    excludes: NONE,
};
const ESS_ONLINE_HEADER: HeaderRule = HeaderRule {
    equals: &["是否需要ess线上参会"],
    contains: &["ess线上", "线上参会"],
    any_group: NO_GROUPS,
    excludes: NONE,
};
const ESS_ONLINE_LOOSE: HeaderRule = HeaderRule {
    equals: NONE,
    contains: &[
        "ess线上",
        "线上参会",
        "线上参加",
        "participation",
        "attend",
        "meeting",
    ],
    any_group: NO_GROUPS,
    excludes: NONE,
};
const CANCELLATION_HEADER: HeaderRule = HeaderRule {
    equals: NONE,
    contains: &["取消", "cancel"],
    any_group: NO_GROUPS,
    excludes: NONE,
};
const CANCELLATION_LOOSE: HeaderRule = HeaderRule {
    equals: NONE,
    contains: &["状态", "status", "state"],
    any_group: NO_GROUPS,
    excludes: NONE,
};
const EVENT_TYPE_HEADER: HeaderRule = HeaderRule {
    equals: &["event type"],
    contains: &["event type (campaign", "event taxonomy", "会议种类"],
    any_group: &[&["campaign", "one time", "sub event"]],
    excludes: NONE,
};
// "Event Start Date" contains "event"; the exclusions keep date columns out.
const EVENT_TYPE_LOOSE: HeaderRule = HeaderRule {
    equals: NONE,
    contains: &["event type"],
    any_group: &[&["event", "type"]],
    excludes: &["start", "date", "日期"],
};
const BUDGET_EXACT: HeaderRule = HeaderRule {
    equals: &["会议申请金额含税"],
    contains: NONE,
    any_group: NO_GROUPS,
    excludes: NONE,
};
const BUDGET_FUZZY: HeaderRule = HeaderRule {
    equals: NONE,
    contains: &["会议申请金额", "申请金额", "amount"],
    any_group: NO_GROUPS,
    excludes: NONE,
};
const TRAVEL_COST_HEADER: HeaderRule = HeaderRule {
    equals: NONE,
    contains: &["结算-差旅总", "结算—差旅总", "结算-总计", "结算—总计"],
    any_group: NO_GROUPS,
    excludes: NONE,
};
// Settlement totals under alternate wording; planned-cost columns share the
// settlement keyword and must not match.
const TRAVEL_COST_LOOSE: HeaderRule = HeaderRule {
    equals: NONE,
    contains: NONE,
    any_group: &[
        &["结算", "总计"],
        &["结算", "总额"],
        &["结算", "合计"],
        &["结算", "差旅"],
    ],
    excludes: &["计划"],
};
const SPEAKER_CONTRACT_HEADER: HeaderRule = HeaderRule {
    equals: NONE,
    contains: &[
        "# of speaker contract",
        "speaker contract",
        "speakers",
        "贡献者人数",
        "演讲者数量",
    ],
    any_group: NO_GROUPS,
    excludes: NONE,
};
const SANOFI_PAID_SPEAKER_HEADER: HeaderRule = HeaderRule {
    equals: NONE,
    contains: &[
        "# of sanofi paid speaker",
        "sanofi paid speaker",
        "赛诺菲支付贡献者",
        "赛诺菲贡献者",
    ],
    any_group: NO_GROUPS,
    excludes: NONE,
};
const SPEAKER_FEE_HEADER: HeaderRule = HeaderRule {
    equals: NONE,
    contains: &[
        "total speaker fee by sanofi",
        "speaker fee",
        "劳务金额",
        "赛诺菲支付劳务",
    ],
    any_group: NO_GROUPS,
    excludes: NONE,
};

/// One strategy in a role's resolution chain.
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// Strict header rule; also re-run against the first data row in the
    /// global promotion pass.
    Header(HeaderRule),
    /// Relaxed header rule tried only after every strict pass failed.
    LooseHeader(HeaderRule),
    /// Score columns by event-type keyword density in the data.
    EventTypeContent,
    /// Score columns by the share of cells that normalize to yes/no.
    YesNoContent,
    /// Pick the column with the most cancellation-marker cells.
    CancellationMarkerContent,
    /// Legacy layout shim: a hard-wired column position.
    FixedColumn(usize),
}

/// Resolution chain per role, in declared priority order.
pub fn matchers(role: Role) -> &'static [Matcher] {
    use Matcher::*;
    match role {
        Role::Year => &[Header(YEAR_HEADER)],
        Role::Month => &[Header(MONTH_HEADER), LooseHeader(MONTH_LOOSE)],
        Role::Region => &[Header(REGION_HEADER), LooseHeader(REGION_LOOSE)],
        Role::Brand => &[Header(BRAND_HEADER), FixedColumn(9)],
        Role::EssName => &[Header(ESS_NAME_HEADER), LooseHeader(ESS_NAME_LOOSE)],
        Role::EssOffline => &[Header(ESS_OFFLINE_HEADER)],
        Role::EssOnline => &[
            Header(ESS_ONLINE_HEADER),
            LooseHeader(ESS_ONLINE_LOOSE),
            YesNoContent,
        ],
        Role::Cancellation => &[
            Header(CANCELLATION_HEADER),
            LooseHeader(CANCELLATION_LOOSE),
            CancellationMarkerContent,
        ],
        Role::EventType => &[
            Header(EVENT_TYPE_HEADER),
            LooseHeader(EVENT_TYPE_LOOSE),
            EventTypeContent,
        ],
        Role::Budget => &[Header(BUDGET_EXACT), Header(BUDGET_FUZZY)],
        Role::TravelCost => &[Header(TRAVEL_COST_HEADER), LooseHeader(TRAVEL_COST_LOOSE)],
        Role::SpeakerContract => &[Header(SPEAKER_CONTRACT_HEADER)],
        Role::SanofiPaidSpeaker => &[Header(SANOFI_PAID_SPEAKER_HEADER)],
        Role::SpeakerFee => &[Header(SPEAKER_FEE_HEADER)],
    }
}

/// Outcome of schema inference. When the header row matched nothing and the
/// first data row did, that row is promoted: `promoted_headers` carries its
/// text and callers must drop the row from their data set.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub schema: Schema,
    pub promoted_headers: Option<Vec<String>>,
}

/// Decides whether a sheet's first row is a header row.
///
/// A row mentioning a structural keyword is a header; a majority-numeric row
/// is data; anything else defaults to header.
pub fn is_header_row(row: &Row) -> bool {
    if row.is_empty() {
        return false;
    }
    let joined = row
        .iter()
        .filter_map(|cell| cell.text())
        .join(" ")
        .to_lowercase();
    if joined.contains("month") || joined.contains("region") {
        return true;
    }
    let numeric = row.iter().filter(|cell| cell.is_number()).count();
    if numeric * 2 > row.len() {
        return false;
    }
    true
}

/// Resolves every role against the given headers and data rows.
pub fn resolve(headers: &[String], rows: &[Row]) -> Resolution {
    let mut schema = Schema::default();
    for role in Role::ALL {
        if let Some(index) = strict_header_match(role, headers) {
            schema.assign(role, index);
        }
    }

    // Global one-time correction: when the header row matched nothing at
    // all, the true header may be sitting in the first data row.
    let mut promoted_headers = None;
    if schema.is_empty()
        && let Some(first) = rows.first()
    {
        let candidate: Vec<String> = first
            .iter()
            .map(|cell| cell.text().unwrap_or_default())
            .collect();
        let mut fallback = Schema::default();
        for role in Role::ALL {
            if let Some(index) = strict_header_match(role, &candidate) {
                fallback.assign(role, index);
            }
        }
        if !fallback.is_empty() {
            debug!("promoted first data row to header after empty header match");
            schema = fallback;
            promoted_headers = Some(candidate);
        }
    }

    let active_headers: &[String] = promoted_headers.as_deref().unwrap_or(headers);
    let data: &[Row] = if promoted_headers.is_some() {
        &rows[1..]
    } else {
        rows
    };

    for role in Role::ALL {
        if schema.column(role).is_some() {
            continue;
        }
        if let Some(index) = loose_header_match(role, active_headers) {
            schema.assign(role, index);
        }
    }

    for role in Role::ALL {
        if schema.column(role).is_some() {
            continue;
        }
        for matcher in matchers(role) {
            let found = match matcher {
                Matcher::EventTypeContent => score_event_type(active_headers, data),
                Matcher::YesNoContent => score_yes_no_density(active_headers.len(), data),
                Matcher::CancellationMarkerContent => {
                    score_cancellation_marker(active_headers.len(), data)
                }
                _ => None,
            };
            if let Some(index) = found {
                debug!(
                    "resolved {} to column {index} by content scoring",
                    role.key()
                );
                schema.assign(role, index);
                break;
            }
        }
    }

    for role in Role::ALL {
        if schema.column(role).is_some() {
            continue;
        }
        for matcher in matchers(role) {
            if let Matcher::FixedColumn(index) = matcher
                && active_headers.len() > *index
            {
                schema.assign(role, *index);
            }
        }
    }

    Resolution {
        schema,
        promoted_headers,
    }
}

fn strict_header_match(role: Role, headers: &[String]) -> Option<usize> {
    for matcher in matchers(role) {
        if let Matcher::Header(rule) = matcher
            && let Some(index) = headers.iter().position(|header| rule.matches(header))
        {
            return Some(index);
        }
    }
    None
}

fn loose_header_match(role: Role, headers: &[String]) -> Option<usize> {
    for matcher in matchers(role) {
        if let Matcher::LooseHeader(rule) = matcher
            && let Some(index) = headers.iter().position(|header| rule.matches(header))
        {
            return Some(index);
        }
    }
    None
}

/// Scores every column by how strongly its values resemble the fixed
/// event-type vocabulary, penalizing date-shaped values. The winner must
/// clear a fixed floor; ties keep the leftmost column.
fn score_event_type(headers: &[String], rows: &[Row]) -> Option<usize> {
    let mut scores: Vec<i32> = headers
        .iter()
        .map(|header| {
            let canon = canon(header);
            if canon.contains("date") || canon.contains("start") {
                EVENT_TYPE_DATE_PENALTY
            } else {
                0
            }
        })
        .collect();

    for row in rows.iter().take(EVENT_TYPE_SAMPLE_ROWS) {
        for (index, score) in scores.iter_mut().enumerate() {
            if *score < 0 {
                continue;
            }
            let Some(value) = cell_at(row, index).text() else {
                continue;
            };
            let value = value.to_lowercase();
            if EVENT_TYPE_KEYWORDS.contains(&value.as_str()) {
                *score += 10;
            } else if EVENT_TYPE_KEYWORDS
                .iter()
                .any(|keyword| value.contains(keyword))
            {
                *score += 3;
            } else if looks_like_date(&value) {
                *score -= 5;
            }
        }
    }

    let mut best: Option<(usize, i32)> = None;
    for (index, score) in scores.into_iter().enumerate() {
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((index, score));
        }
    }
    best.filter(|(_, score)| *score > EVENT_TYPE_SCORE_FLOOR)
        .map(|(index, _)| index)
}

fn looks_like_date(value: &str) -> bool {
    if value.contains('/') || value.contains('-') {
        return true;
    }
    static YEAR_TOKEN: OnceLock<Regex> = OnceLock::new();
    YEAR_TOKEN
        .get_or_init(|| Regex::new(r"\d{4}").expect("valid pattern"))
        .is_match(value)
}

/// Picks the column whose sampled cells are most dominated by yes/no tokens.
/// Columns where fewer than half the sampled rows carry any value are not
/// candidates.
fn score_yes_no_density(column_count: usize, rows: &[Row]) -> Option<usize> {
    let sampled = rows.len().min(CONTENT_SAMPLE_ROWS);
    if sampled == 0 {
        return None;
    }

    #[derive(Default, Clone)]
    struct Tally {
        yes: usize,
        no: usize,
        other: usize,
    }
    let mut tallies = vec![Tally::default(); column_count];
    for row in rows.iter().take(sampled) {
        for (index, tally) in tallies.iter_mut().enumerate() {
            let Some(value) = cell_at(row, index).text() else {
                continue;
            };
            match normalize_yes_no(&value) {
                YesNo::Yes => tally.yes += 1,
                YesNo::No => tally.no += 1,
                YesNo::Unknown => tally.other += 1,
            }
        }
    }

    let mut best: Option<(usize, f64)> = None;
    for (index, tally) in tallies.iter().enumerate() {
        let total = tally.yes + tally.no + tally.other;
        if (total as f64) <= sampled as f64 * 0.5 {
            continue;
        }
        let ratio = (tally.yes + tally.no) as f64 / total as f64;
        if best.is_none_or(|(_, top)| ratio > top) {
            best = Some((index, ratio));
        }
    }
    best.filter(|(_, ratio)| *ratio > YES_NO_RATIO_FLOOR)
        .map(|(index, _)| index)
}

/// Last resort for the cancellation role: the column with the most cells
/// equal to the cancellation marker, if any.
fn score_cancellation_marker(column_count: usize, rows: &[Row]) -> Option<usize> {
    let mut counts = vec![0usize; column_count];
    for row in rows.iter().take(CONTENT_SAMPLE_ROWS) {
        for (index, count) in counts.iter_mut().enumerate() {
            if let Some(value) = cell_at(row, index).text()
                && value.trim().eq_ignore_ascii_case(CANCELLATION_MARKER)
            {
                *count += 1;
            }
        }
    }

    let mut best: Option<(usize, usize)> = None;
    for (index, count) in counts.into_iter().enumerate() {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((index, count));
        }
    }
    best.filter(|(_, count)| *count > 0).map(|(index, _)| index)
}
