//! The merge pipeline: one document in, one document out.
//!
//! Protect piped links → locate the record → parse → extract each family →
//! merge chronologically → delete consumed source lines → substitute the
//! re-serialized record → restore piped links. Linear, synchronous, and
//! referentially transparent: the same input text always yields the same
//! output text.

use tracing::debug;

use histmerge_shared::Result;

use crate::history::HistoryRecord;
use crate::{dates, extract, locate, params, wikilinks};

/// Lines whose only content is this comment are dropped alongside the
/// consumed source templates.
pub const DELETE_LINE_COMMENT: &str = "<!-- Delete this line. -->";

/// Merge every redundant event-notice banner in `input` into its article
/// history record and return the rewritten document.
///
/// A document without a record passes through unchanged. All failures are
/// fatal to the whole document: no partial output is ever produced.
pub fn process(input: &str) -> Result<String> {
    let (protected, piped_links) = wikilinks::protect(input);

    let Some(record_span) = locate::locate_record(&protected) else {
        debug!("no record block; passing document through");
        return Ok(input.to_string());
    };

    let mut record = HistoryRecord::from_params(params::parse(record_span.body(&protected))?);

    let mut consumed: Vec<String> = Vec::new();
    for extractor in extract::all() {
        let Some(extraction) = extractor.extract(&protected)? else {
            continue;
        };
        let family = extractor.family();
        debug!(
            family = family.code,
            templates = extraction.spans.len(),
            entries = extraction.entries.len(),
            "source templates extracted"
        );

        let mut entries = record.family_entries(family);
        entries.extend(extraction.entries);
        if !entries.is_empty() {
            let sorted = dates::sort_chronological(entries)?;
            record.set_family_entries(family, &sorted);
        }

        for (key, value) in extraction.direct {
            record.other_parameters.insert(key, value);
        }

        consumed.extend(
            extraction
                .spans
                .iter()
                .map(|span| span.slice(&protected).to_string()),
        );
    }

    let old_record_text = record_span.slice(&protected);
    let cleaned = delete_source_lines(&protected, &consumed);
    let rewritten = cleaned.replacen(old_record_text, &record.to_wikitext(), 1);

    Ok(wikilinks::restore(&rewritten, &piped_links))
}

/// Drop every line run that is exactly one consumed span (a multi-line span
/// drops all of its lines) and, in the same pass, any line holding only the
/// delete-marker comment.
fn delete_source_lines(text: &str, spans: &[String]) -> String {
    let span_lines: Vec<Vec<&str>> = spans.iter().map(|span| span.split('\n').collect()).collect();
    let lines: Vec<&str> = text.split('\n').collect();

    let mut kept: Vec<&str> = Vec::with_capacity(lines.len());
    let mut i = 0;
    'line: while i < lines.len() {
        if lines[i].trim() == DELETE_LINE_COMMENT {
            i += 1;
            continue;
        }
        for span in &span_lines {
            if lines[i..].starts_with(span.as_slice()) {
                i += span.len();
                continue 'line;
            }
        }
        kept.push(lines[i]);
        i += 1;
    }

    kept.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_without_record() {
        for text in ["", "plain talk page", "{{WikiProject Mathematics}}\n== Section =="] {
            assert_eq!(process(text).unwrap(), text);
        }
    }

    #[test]
    fn merges_keyed_short_form_notice() {
        let input = "\n{{article history\n|action1=GAN\n|action1date=12:52, 7 December 2005\n\
                     |action1result=listed\n|action1oldid=30462537\n|currentstatus=GA\n|topic=math\n}}\n\
                     {{ITN talk|date1=12 September 2009|date2=24 December 2013}}";
        let expected = "\n{{article history\n\
                        |action1=GAN\n\
                        |action1date=12:52, 7 December 2005\n\
                        |action1link=\n\
                        |action1result=listed\n\
                        |action1oldid=30462537\n\
                        \n\
                        |currentstatus=GA\n\
                        |itndate=12 September 2009\n\
                        |itn2date=24 December 2013\n\
                        |topic=math\n\
                        }}";
        assert_eq!(process(input).unwrap(), expected);
    }

    #[test]
    fn merges_numbered_pair_notice() {
        let input = "\n{{Article history}}\n\
                     {{On this day|date1=2004-05-28|oldid1=6717950|date2=2005-05-28|oldid2=16335227}}";
        let expected = "\n{{article history\n\
                        |otddate=2004-05-28\n\
                        |otdoldid=6717950\n\
                        |otd2date=2005-05-28\n\
                        |otd2oldid=16335227\n\
                        }}";
        assert_eq!(process(input).unwrap(), expected);
    }

    #[test]
    fn merges_single_entry_notice() {
        let input = "\n{{Article history\n| action1       =  GAN\n| action1date   = 14:45, 22 March 2015 (UTC)\n\
                     | action1link   = Talk:Dyslexia/GA1\n| action1result = Passed\n| action1oldid  = 653061069\n}}\n\
                     {{dyktalk|6 April|2015|entry=... that '''[[dyslexia]]''' is common?}}";
        let expected = "\n{{article history\n\
                        |action1=GAN\n\
                        |action1date=14:45, 22 March 2015 (UTC)\n\
                        |action1link=Talk:Dyslexia/GA1\n\
                        |action1result=Passed\n\
                        |action1oldid=653061069\n\
                        \n\
                        |dykdate=6 April 2015\n\
                        |dykentry=... that '''[[dyslexia]]''' is common?\n\
                        }}";
        assert_eq!(process(input).unwrap(), expected);
    }

    #[test]
    fn merges_into_existing_unnumbered_slot() {
        let input = "\n{{Article history|itndate=1 June 2009}}\n{{ITN talk|date1=1 June 2010}}";
        let expected = "\n{{article history\n|itndate=1 June 2009\n|itn2date=1 June 2010\n}}";
        assert_eq!(process(input).unwrap(), expected);
    }

    #[test]
    fn sorts_notices_from_multiple_templates() {
        let input = "\n{{Article history}}\n{{ITN talk|date1=1 June 2010}}\n{{ITN talk|date1=1 June 2009}}";
        let expected = "\n{{article history\n|itndate=1 June 2009\n|itn2date=1 June 2010\n}}";
        assert_eq!(process(input).unwrap(), expected);
    }

    #[test]
    fn short_form_scenario_keeps_earlier_existing_entry_first() {
        let input = "\n{{Article history|itndate=June 1, 2021}}\n{{ITN talk|date1=June 5, 2021}}\ntail";
        let expected = "\n{{article history\n|itndate=June 1, 2021\n|itn2date=June 5, 2021\n}}\ntail";
        assert_eq!(process(input).unwrap(), expected);
    }

    #[test]
    fn numbered_pair_scenario_fills_oldid_slots() {
        let input = "\n{{Article history}}\n{{On this day|date1=1 July 2020|oldid1=123|date2=3 July 2020}}";
        let output = process(input).unwrap();
        assert!(output.contains("|otddate=1 July 2020\n|otdoldid=123\n|otd2date=3 July 2020\n|otd2oldid=\n"));
        assert!(!output.contains("On this day"));
    }

    #[test]
    fn missing_mandatory_entry_aborts() {
        let input = "{{Article history}}\n{{DYK talk|6 April|2015}}";
        assert!(process(input).is_err());
    }

    #[test]
    fn unparseable_date_aborts() {
        let input = "{{Article history}}\n{{ITN talk|date1=whenever}}";
        assert!(process(input).is_err());
    }

    #[test]
    fn piped_links_survive_untouched() {
        let input = "[[Main Page|the wiki]]\n{{Article history|itndate=1 June 2009}}\n\
                     {{ITN talk|date1=1 June 2010}}\n[[a|b]]";
        let output = process(input).unwrap();
        assert!(output.starts_with("[[Main Page|the wiki]]\n"));
        assert!(output.ends_with("\n[[a|b]]"));
    }

    #[test]
    fn piped_link_inside_entry_survives() {
        let input = "{{Article history}}\n{{dyktalk|6 April|2015|entry=... that [[water|ice]] melts?}}";
        let output = process(input).unwrap();
        assert!(output.contains("|dykentry=... that [[water|ice]] melts?"));
    }

    #[test]
    fn delete_marker_lines_are_removed() {
        let input = "{{Article history}}\n<!-- Delete this line. -->\n{{ITN talk|date1=1 June 2009}}\nrest";
        let expected = "{{article history\n|itndate=1 June 2009\n}}\nrest";
        assert_eq!(process(input).unwrap(), expected);
    }

    #[test]
    fn multi_line_source_template_is_fully_removed() {
        let input = "{{Article history}}\n{{On this day\n|date1=1 July 2020\n|oldid1=123\n}}\nrest";
        let output = process(input).unwrap();
        assert!(!output.contains("On this day"));
        assert!(!output.contains("|oldid1=123"));
        assert!(output.ends_with("\nrest"));
        assert!(output.contains("|otddate=1 July 2020\n|otdoldid=123\n"));
    }

    #[test]
    fn process_is_idempotent_once_converted() {
        let inputs = [
            "\n{{Article history|itndate=1 June 2009}}\n{{ITN talk|date1=1 June 2010}}",
            "\n{{Article history}}\n{{On this day|date1=2004-05-28|oldid1=1|date2=2005-05-28}}",
            "\n{{Article history}}\n{{dyktalk|6 April|2015|entry=... that [[a|b]]?}}",
        ];
        for input in inputs {
            let once = process(input).unwrap();
            assert_eq!(process(&once).unwrap(), once);
        }
    }

    #[test]
    fn talk_page_fixture_merges_cleanly() {
        let input = std::fs::read_to_string("../../../fixtures/talk/dyslexia.txt")
            .expect("read fixture");
        let output = process(&input).expect("process fixture");

        // Both banners consumed.
        assert!(!output.contains("DYK talk"));
        assert!(!output.contains("ITN talk"));
        // Their content landed in the record.
        assert!(output.contains("|dykdate=6 April 2015\n"));
        assert!(output.contains(
            "|dykentry=... that '''[[dyslexia]]''' is the most common \
             [[learning disability|learning disability]]?\n"
        ));
        assert!(output.contains("|itndate=12 September 2009\n"));
        // Unrelated templates and discussion are untouched.
        assert!(output.contains("{{WikiProject Medicine|class=GA|importance=high}}"));
        assert!(output.contains("[[Dyslexia (disambiguation)|disambiguation]]"));
        assert!(output.contains("== Requested move =="));
        // Converged: a second pass changes nothing.
        assert_eq!(process(&output).expect("reprocess"), output);
    }

    #[test]
    fn malformed_record_parameter_aborts() {
        let input = "{{Article history|itndate=1 June 2009|stray}}\n{{ITN talk|date1=1 June 2010}}";
        assert!(process(input).is_err());
    }
}
