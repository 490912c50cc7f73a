//! Piped-wikilink protection.
//!
//! `[[target|label]]` constructs share the `|` separator with template
//! parameters, so they are swapped for positional placeholder tokens before
//! any pipe-based splitting and swapped back once serialization is done.

use std::sync::LazyLock;

use regex::Regex;

/// A piped link: `[[` ... `|` ... `]]`, with no nested brackets before the pipe.
static PIPED_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[[^\[\]|]*\|[^\[\]]*\]\]").expect("piped link regex"));

/// The placeholder shape produced by [`protect`].
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!!!(\d+)!!!").expect("placeholder regex"));

/// Replace every piped link with a unique positional placeholder.
///
/// Returns the rewritten text plus the originals in placeholder order;
/// [`restore`] inverts the substitution.
pub fn protect(text: &str) -> (String, Vec<String>) {
    let mut originals: Vec<String> = Vec::new();

    let protected = PIPED_LINK_RE.replace_all(text, |caps: &regex::Captures| {
        let token = format!("!!!{}!!!", originals.len());
        originals.push(caps[0].to_string());
        token
    });

    tracing::debug!(count = originals.len(), "piped links protected");
    (protected.into_owned(), originals)
}

/// Substitute the protected originals back into `text`.
///
/// Placeholders with no matching original (never produced by [`protect`])
/// are left untouched.
pub fn restore(text: &str, originals: &[String]) -> String {
    PLACEHOLDER_RE
        .replace_all(text, |caps: &regex::Captures| {
            match caps[1].parse::<usize>().ok().and_then(|i| originals.get(i)) {
                Some(original) => original.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
