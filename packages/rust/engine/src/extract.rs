//! Event extractors: one per source-template family.
//!
//! Each family has its own ad-hoc grammar, but the capability is the same —
//! pull event records and their source spans out of a document — so the
//! three variants sit behind one trait and the pipeline treats them
//! uniformly.

use std::sync::LazyLock;

use regex::Regex;

use histmerge_shared::{HistmergeError, Result};

use crate::history::{EventRecord, FAMILIES, Family};
use crate::locate::{self, Span};
use crate::params;

static ITN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^itn ?talk\s*(?:\||$)").expect("itn tag regex"));

static OTD_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^on this day\s*(?:\||$)").expect("otd tag regex"));

static DYK_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^dyk ?talk\s*(?:\||$)").expect("dyk tag regex"));

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// What one family's extraction produced.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Event records parsed from the source templates, encounter order.
    pub entries: Vec<EventRecord>,
    /// Spans of the consumed source templates, for deletion.
    pub spans: Vec<Span>,
    /// Parameters written to the record directly, outside the date-list
    /// model (the dyk entry when no date could be derived).
    pub direct: Vec<(String, String)>,
}

/// Extract one family's event records and source spans from a document.
pub trait EventExtractor {
    /// The family whose slots this extractor feeds.
    fn family(&self) -> &'static Family;

    /// Parse every relevant source template in `text`.
    /// Returns `None` when the document carries none.
    fn extract(&self, text: &str) -> Result<Option<Extraction>>;
}

/// The extractors in family serialization order.
pub fn all() -> [Box<dyn EventExtractor>; 3] {
    [
        Box::new(ShortFormExtractor),
        Box::new(NumberedPairExtractor),
        Box::new(SingleEntryExtractor),
    ]
}

/// Positional and keyed fields of a template body, tag segment dropped.
fn body_fields(body: &str) -> Vec<&str> {
    body.split('|').skip(1).collect()
}

// ---------------------------------------------------------------------------
// Short-form family (itn)
// ---------------------------------------------------------------------------

/// `{{ITN talk}}`: either two positional fields (`DD monthname|YYYY`) that
/// concatenate into one date, or keyed fields where every key containing
/// `date` contributes one entry.
pub struct ShortFormExtractor;

impl EventExtractor for ShortFormExtractor {
    fn family(&self) -> &'static Family {
        &FAMILIES[0]
    }

    fn extract(&self, text: &str) -> Result<Option<Extraction>> {
        let spans = locate::find_blocks(text, &ITN_TAG_RE);
        if spans.is_empty() {
            return Ok(None);
        }

        let mut entries = Vec::new();
        for span in &spans {
            let fields = body_fields(span.body(text));

            let positional_pair =
                fields.len() >= 2 && !fields[0].contains('=') && !fields[1].contains('=');
            if positional_pair {
                entries.push(EventRecord::dated(format!(
                    "{} {}",
                    fields[0].trim(),
                    fields[1].trim()
                )));
                continue;
            }

            for field in &fields {
                if let Some((key, value)) = field.split_once('=') {
                    if key.contains("date") {
                        entries.push(EventRecord::dated(value.trim()));
                    }
                }
            }
        }

        Ok(Some(Extraction {
            entries,
            spans,
            direct: Vec::new(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Numbered-pair family (otd)
// ---------------------------------------------------------------------------

/// `{{On this day}}`: entirely keyed; `date1`, `date2`, … scanned until a
/// gap, each paired with an optional `oldidN` and an empty reserved link.
pub struct NumberedPairExtractor;

impl EventExtractor for NumberedPairExtractor {
    fn family(&self) -> &'static Family {
        &FAMILIES[1]
    }

    fn extract(&self, text: &str) -> Result<Option<Extraction>> {
        let spans = locate::find_blocks(text, &OTD_TAG_RE);
        if spans.is_empty() {
            return Ok(None);
        }

        let mut entries = Vec::new();
        for span in &spans {
            let fields = params::parse(span.body(text))?;

            let mut index = 1;
            while let Some(date) = fields.get(&format!("date{index}")) {
                let oldid = fields.get(&format!("oldid{index}")).unwrap_or("");
                entries.push(EventRecord {
                    date: date.to_string(),
                    secondary: vec![oldid.to_string(), String::new()],
                });
                index += 1;
            }
        }

        Ok(Some(Extraction {
            entries,
            spans,
            direct: Vec::new(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Single-entry family (dyk)
// ---------------------------------------------------------------------------

/// `{{DYK talk}}`: the first occurrence only. A field whose key starts with
/// `entry` is mandatory. The date comes from the positional fields: one is
/// used verbatim; two are disambiguated by length (the 4-character field is
/// the year) and joined as `month-day year`.
pub struct SingleEntryExtractor;

impl EventExtractor for SingleEntryExtractor {
    fn family(&self) -> &'static Family {
        &FAMILIES[2]
    }

    fn extract(&self, text: &str) -> Result<Option<Extraction>> {
        let Some(span) = locate::find_blocks(text, &DYK_TAG_RE).into_iter().next() else {
            return Ok(None);
        };

        let fields = body_fields(span.body(text));

        let entry = fields
            .iter()
            .find_map(|field| {
                let (key, value) = field.split_once('=')?;
                key.trim().starts_with("entry").then(|| value.trim().to_string())
            })
            .ok_or_else(|| HistmergeError::missing_field("entry"))?;

        let positional: Vec<&str> = fields
            .iter()
            .filter(|field| !field.contains('='))
            .map(|field| field.trim())
            .collect();

        let date = match positional.as_slice() {
            [only] => Some((*only).to_string()),
            [first, second] => {
                let (month_day, year) = if first.len() == 4 {
                    (second, first)
                } else {
                    (first, second)
                };
                Some(format!("{month_day} {year}"))
            }
            _ => None,
        };

        let extraction = match date {
            Some(date) => Extraction {
                entries: vec![EventRecord {
                    date,
                    secondary: vec![entry],
                }],
                spans: vec![span],
                direct: Vec::new(),
            },
            // No usable date: the mandatory entry still lands on the record.
            None => Extraction {
                entries: Vec::new(),
                spans: vec![span],
                direct: vec![("dykentry".to_string(), entry)],
            },
        };

        Ok(Some(extraction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_form_positional_pair() {
        let text = "{{ITN talk|25 May|2010}}";
        let extraction = ShortFormExtractor.extract(text).unwrap().unwrap();
        assert_eq!(extraction.entries, vec![EventRecord::dated("25 May 2010")]);
        assert_eq!(extraction.spans.len(), 1);
    }

    #[test]
    fn short_form_keyed_dates() {
        let text = "{{ITN talk|date1=12 September 2009|date2=24 December 2013}}";
        let extraction = ShortFormExtractor.extract(text).unwrap().unwrap();
        assert_eq!(
            extraction.entries,
            vec![
                EventRecord::dated("12 September 2009"),
                EventRecord::dated("24 December 2013"),
            ]
        );
    }

    #[test]
    fn short_form_multiple_templates_keep_encounter_order() {
        let text = "{{ITN talk|date1=1 June 2010}}\nx\n{{ITN talk|date1=1 June 2009}}";
        let extraction = ShortFormExtractor.extract(text).unwrap().unwrap();
        assert_eq!(
            extraction.entries,
            vec![
                EventRecord::dated("1 June 2010"),
                EventRecord::dated("1 June 2009"),
            ]
        );
        assert_eq!(extraction.spans.len(), 2);
    }

    #[test]
    fn short_form_absent_is_none() {
        assert!(ShortFormExtractor.extract("nothing here").unwrap().is_none());
    }

    #[test]
    fn numbered_pair_scans_until_gap() {
        let text = "{{On this day|date1=1 July 2020|oldid1=123|date2=3 July 2020|date4=skipped}}";
        let extraction = NumberedPairExtractor.extract(text).unwrap().unwrap();
        assert_eq!(
            extraction.entries,
            vec![
                EventRecord {
                    date: "1 July 2020".into(),
                    secondary: vec!["123".into(), String::new()],
                },
                EventRecord {
                    date: "3 July 2020".into(),
                    secondary: vec![String::new(), String::new()],
                },
            ]
        );
    }

    #[test]
    fn numbered_pair_keyless_field_is_malformed() {
        let text = "{{On this day|date1=1 July 2020|stray}}";
        let err = NumberedPairExtractor.extract(text).unwrap_err();
        assert!(matches!(err, HistmergeError::MalformedParameter { .. }));
    }

    #[test]
    fn single_entry_two_positional_fields() {
        let text = "{{dyktalk|6 April|2015|entry=... that the sky is blue?}}";
        let extraction = SingleEntryExtractor.extract(text).unwrap().unwrap();
        assert_eq!(
            extraction.entries,
            vec![EventRecord {
                date: "6 April 2015".into(),
                secondary: vec!["... that the sky is blue?".into()],
            }]
        );
    }

    #[test]
    fn single_entry_year_first_still_resolves() {
        let text = "{{DYK talk|2015|6 April|entry=... that?}}";
        let extraction = SingleEntryExtractor.extract(text).unwrap().unwrap();
        assert_eq!(extraction.entries[0].date, "6 April 2015");
    }

    #[test]
    fn single_entry_one_positional_field_used_verbatim() {
        let text = "{{DYK talk|6 April 2015|entry=... that?}}";
        let extraction = SingleEntryExtractor.extract(text).unwrap().unwrap();
        assert_eq!(extraction.entries[0].date, "6 April 2015");
    }

    #[test]
    fn single_entry_without_date_writes_entry_directly() {
        let text = "{{DYK talk|entry=... that?}}";
        let extraction = SingleEntryExtractor.extract(text).unwrap().unwrap();
        assert!(extraction.entries.is_empty());
        assert_eq!(
            extraction.direct,
            vec![("dykentry".to_string(), "... that?".to_string())]
        );
    }

    #[test]
    fn single_entry_missing_entry_is_fatal() {
        let err = SingleEntryExtractor.extract("{{DYK talk|6 April|2015}}").unwrap_err();
        assert!(matches!(err, HistmergeError::MissingMandatoryField { .. }));
    }

    #[test]
    fn single_entry_takes_first_occurrence_only() {
        let text = "{{DYK talk|1 May 2010|entry=a}}\n{{DYK talk|2 May 2011|entry=b}}";
        let extraction = SingleEntryExtractor.extract(text).unwrap().unwrap();
        assert_eq!(extraction.spans.len(), 1);
        assert_eq!(extraction.entries[0].date, "1 May 2010");
    }
}
