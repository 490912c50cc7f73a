//! MediaWiki driver for histmerge.
//!
//! Everything I/O-shaped lives here: authenticating, fetching and saving
//! page text, and walking the work queue of record-template transclusions.
//! The merge engine itself never touches the network.

pub mod api;

pub use api::{MediaWikiClient, WorkQueuePage};

use histmerge_shared::SOURCE_TEMPLATE_TAGS;

/// Quick pre-check: does the lead section (before the first `==`) open any
/// of the redundant banners? Saves a full pipeline run on the many pages
/// that transclude the record template but have nothing to merge.
pub fn has_redundant_banners(text: &str) -> bool {
    let lowered = text.to_lowercase();
    let lead = match lowered.find("==") {
        Some(end) => &lowered[..end],
        None => lowered.as_str(),
    };
    SOURCE_TEMPLATE_TAGS
        .iter()
        .any(|tag| lead.contains(&format!("{{{{{tag}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_banner_in_lead() {
        assert!(has_redundant_banners("{{Article history}}\n{{ITN talk|date1=1 June 2009}}"));
        assert!(has_redundant_banners("{{On This Day|date1=2004-05-28}}\n== Section =="));
        assert!(has_redundant_banners("{{DYK talk|6 April|2015|entry=...}}"));
    }

    #[test]
    fn ignores_banner_below_first_section() {
        assert!(!has_redundant_banners(
            "{{Article history}}\n== Old notices ==\n{{ITN talk|date1=1 June 2009}}"
        ));
    }

    #[test]
    fn plain_page_has_nothing_to_merge() {
        assert!(!has_redundant_banners("{{Article history}}\njust discussion"));
    }
}
