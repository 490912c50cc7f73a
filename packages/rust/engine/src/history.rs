//! The canonical merged record: typed model and serializer.
//!
//! An article history block carries a numbered list of actions, a handful of
//! schema-known top-level parameters, and per-family date slots. Anything
//! else is kept verbatim in an overflow map and re-emitted on output.

use std::collections::HashSet;
use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;

use crate::params::ParamMap;

/// Per-action field suffixes in emission order; the empty suffix is the
/// action kind itself (`action1=GAN`).
pub const ACTION_SUFFIXES: [&str; 5] = ["", "date", "link", "result", "oldid"];

/// Schema-known top-level fields emitted right after the actions.
const STATUS_FIELDS: [&str; 2] = ["currentstatus", "maindate"];

/// Schema-known cosmetic tail, emitted after the family slots.
const COSMETIC_FIELDS: [&str; 10] = [
    "four", "aciddate", "ftname", "ftmain", "ft2name", "ft2main", "ft3name", "ft3main", "topic",
    "small",
];

/// `actionN` / `actionNdate` / ... — the exact parameter shape consumed by
/// the action scan.
static ACTION_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^action\d+(?:date|link|result|oldid)?$").expect("action key regex"));

// ---------------------------------------------------------------------------
// Families
// ---------------------------------------------------------------------------

/// One secondary field of an event family.
#[derive(Debug, Clone, Copy)]
pub struct SecondaryField {
    /// Parameter suffix (`link`, `oldid`, `entry`).
    pub suffix: &'static str,
    /// Whether the parameter is written even when its value is empty.
    pub always_written: bool,
}

/// One of the three merge families and its slot schema.
#[derive(Debug, Clone, Copy)]
pub struct Family {
    /// Slot prefix in the record (`itn`, `otd`, `dyk`).
    pub code: &'static str,
    /// Secondary fields carried next to each date, in emission order.
    pub secondary: &'static [SecondaryField],
}

/// Families in their fixed serialization order.
pub const FAMILIES: [Family; 3] = [
    Family {
        code: "itn",
        secondary: &[SecondaryField {
            suffix: "link",
            always_written: false,
        }],
    },
    Family {
        code: "otd",
        secondary: &[
            SecondaryField {
                suffix: "oldid",
                always_written: true,
            },
            SecondaryField {
                suffix: "link",
                always_written: false,
            },
        ],
    },
    Family {
        code: "dyk",
        secondary: &[SecondaryField {
            suffix: "entry",
            always_written: false,
        }],
    },
];

impl Family {
    /// The parameter name for the slot at `index` (0-based) and `suffix`.
    /// The first slot is unnumbered; later slots count from 2.
    fn slot_key(&self, index: usize, suffix: &str) -> String {
        if index == 0 {
            format!("{}{}", self.code, suffix)
        } else {
            format!("{}{}{}", self.code, index + 1, suffix)
        }
    }

    /// Whether `key` belongs to this family's slot naming.
    fn owns_key(&self, key: &str) -> bool {
        let Some(rest) = key.strip_prefix(self.code) else {
            return false;
        };
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
        rest == "date" || self.secondary.iter().any(|f| f.suffix == rest)
    }
}

// ---------------------------------------------------------------------------
// Action / EventRecord
// ---------------------------------------------------------------------------

/// One historical event already recorded in the block. Identity is purely
/// positional; built once during parsing and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub kind: String,
    pub date: String,
    pub link: String,
    pub result: String,
    pub oldid: String,
}

impl Action {
    /// Field values in the fixed [`ACTION_SUFFIXES`] order.
    fn fields(&self) -> [&str; 5] {
        [&self.kind, &self.date, &self.link, &self.result, &self.oldid]
    }
}

/// A normalized per-family entry: a date plus that family's secondary
/// fields. Produced by the extractors and the slot inverse lookup, consumed
/// by the chronological merge, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub date: String,
    pub secondary: Vec<String>,
}

impl EventRecord {
    /// An entry with no secondary fields.
    pub fn dated(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            secondary: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// HistoryRecord
// ---------------------------------------------------------------------------

/// The canonical merged record.
#[derive(Debug, Clone, Default)]
pub struct HistoryRecord {
    /// Ordered actions; the 1-based parameter index is implied by position.
    pub actions: Vec<Action>,
    /// Everything that is not an action parameter, in first-seen order.
    pub other_parameters: ParamMap,
}

impl HistoryRecord {
    /// Build a record from a parsed parameter map.
    ///
    /// `action1`, `action2`, … are scanned until the next index is absent;
    /// each action's five fields come from the index plus the fixed
    /// suffixes, defaulting to empty. Stray action-shaped keys outside the
    /// contiguous range are dropped; every other key is kept verbatim.
    pub fn from_params(mut params: ParamMap) -> Self {
        let mut actions = Vec::new();

        loop {
            let prefix = format!("action{}", actions.len() + 1);
            if !params.contains(&prefix) {
                break;
            }
            actions.push(Action {
                kind: params.remove(&prefix).unwrap_or_default(),
                date: params.remove(&format!("{prefix}date")).unwrap_or_default(),
                link: params.remove(&format!("{prefix}link")).unwrap_or_default(),
                result: params
                    .remove(&format!("{prefix}result"))
                    .unwrap_or_default(),
                oldid: params.remove(&format!("{prefix}oldid")).unwrap_or_default(),
            });
        }

        params.retain(|key, _| !ACTION_KEY_RE.is_match(key));

        Self {
            actions,
            other_parameters: params,
        }
    }

    // -- family slots -------------------------------------------------------

    /// Read a family's existing entries out of the parameter slots: the
    /// unnumbered slot first, then numbered slots from 2 until a gap.
    pub fn family_entries(&self, family: &Family) -> Vec<EventRecord> {
        let mut entries = Vec::new();
        let mut index = 0;

        while let Some(date) = self.other_parameters.get(&family.slot_key(index, "date")) {
            let secondary = family
                .secondary
                .iter()
                .map(|field| {
                    self.other_parameters
                        .get(&family.slot_key(index, field.suffix))
                        .unwrap_or("")
                        .to_string()
                })
                .collect();
            entries.push(EventRecord {
                date: date.to_string(),
                secondary,
            });
            index += 1;
        }

        entries
    }

    /// Drop every parameter that belongs to `family`'s slot naming.
    pub fn clear_family(&mut self, family: &Family) {
        self.other_parameters.retain(|key, _| !family.owns_key(key));
    }

    /// Replace a family's slots with `entries`, renumbering from scratch:
    /// first entry unnumbered, the rest numbered 2..=N with no gaps.
    pub fn set_family_entries(&mut self, family: &Family, entries: &[EventRecord]) {
        self.clear_family(family);

        for (index, entry) in entries.iter().enumerate() {
            self.other_parameters
                .insert(family.slot_key(index, "date"), entry.date.clone());
            for (pos, field) in family.secondary.iter().enumerate() {
                let value = entry.secondary.get(pos).map(String::as_str).unwrap_or("");
                if field.always_written || !value.is_empty() {
                    self.other_parameters
                        .insert(family.slot_key(index, field.suffix), value);
                }
            }
        }
    }

    // -- serialization ------------------------------------------------------

    /// Canonical wikitext rendering of the record.
    ///
    /// Emission order is fixed by enumeration: actions, status fields,
    /// family slots in family order, cosmetic tail, then any overflow
    /// parameters in first-seen order.
    pub fn to_wikitext(&self) -> String {
        let mut out = String::from("{{article history");
        let mut covered: HashSet<String> = HashSet::new();

        for (index, action) in self.actions.iter().enumerate() {
            let number = index + 1;
            let fields = action.fields();
            // Trailing empty fields are omitted; interior empties keep their
            // position. The kind line always goes out so numbering stays
            // contiguous.
            let last = fields.iter().rposition(|v| !v.is_empty()).unwrap_or(0);
            for (suffix, value) in ACTION_SUFFIXES.iter().zip(fields).take(last + 1) {
                let _ = write!(out, "\n|action{number}{suffix}={value}");
            }
            out.push('\n');
        }

        for key in STATUS_FIELDS {
            self.emit_param(&mut out, &mut covered, key);
        }

        for family in &FAMILIES {
            let suffixes: Vec<&str> = std::iter::once("date")
                .chain(family.secondary.iter().map(|f| f.suffix))
                .collect();

            for suffix in &suffixes {
                self.emit_param(&mut out, &mut covered, &family.slot_key(0, suffix));
            }

            let mut index = 1;
            while self
                .other_parameters
                .contains(&family.slot_key(index, "date"))
            {
                for suffix in &suffixes {
                    self.emit_param(&mut out, &mut covered, &family.slot_key(index, suffix));
                }
                index += 1;
            }
        }

        for key in COSMETIC_FIELDS {
            self.emit_param(&mut out, &mut covered, key);
        }

        for (key, value) in self.other_parameters.iter() {
            if !covered.contains(key) {
                let _ = write!(out, "\n|{key}={value}");
            }
        }

        out.push_str("\n}}");
        out
    }

    /// Append `|key=value` if the parameter is present, marking it covered.
    fn emit_param(&self, out: &mut String, covered: &mut HashSet<String>, key: &str) {
        if let Some(value) = self.other_parameters.get(key) {
            let _ = write!(out, "\n|{key}={value}");
            covered.insert(key.to_string());
        }
    }
}
