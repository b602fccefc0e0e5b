//! Copyright, holder and author summaries.
//!
//! Each resource's values are merged with its children's summaries, then
//! normalized and clustered so that small spelling variants of the same
//! holder are counted together.

use std::cmp::Reverse;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::codebase::{Codebase, ResourceId};

/// One summarized value and the number of times it was seen. A `None`
/// value counts files where nothing was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub value: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub copyrights: Vec<SummaryEntry>,
    pub holders: Vec<SummaryEntry>,
    pub authors: Vec<SummaryEntry>,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Copyrights,
    Holders,
    Authors,
}

impl Field {
    fn entries(self, summary: &Summary) -> &[SummaryEntry] {
        match self {
            Field::Copyrights => &summary.copyrights,
            Field::Holders => &summary.holders,
            Field::Authors => &summary.authors,
        }
    }
}

static YEARS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:19|20)\d{2}\b(?:\s*(?:-|,|to)\s*(?:(?:19|20)\d{2}|\d{2})\b)*,?").unwrap()
});

static SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_\W]+").unwrap());

static JUNK_HOLDERS: &[&str] = &[
    "advanced computing",
    "inc",
    "llc",
    "ltd",
    "berlin",
    "munich",
    "massachusetts",
    "maynard",
    "cambridge",
    "norway",
    "and",
    "is",
    "a",
    "cedar rapids",
    "iowa",
    "u.s.a",
    "u.s.a.",
    "usa",
    "source code",
    "mountain view",
    "england",
    "web applications",
    "menlo park",
    "california",
    "irvine",
    "pune",
    "india",
    "stockholm",
    "sweden",
    "sweden)",
    "software",
    "france",
    "concord",
    "date here",
    "not",
];

/// Abbreviated or suffix-less names of common holders, keyed by their
/// letters and digits only.
static COMMON_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("3dfxinteractiveinc", "3dfx Interactive, Inc."),
        ("cern", "CERN - European Organization for Nuclear Research"),
        ("ciscosystemsinc", "Cisco Systems, Inc."),
        ("ciscosystems", "Cisco Systems, Inc."),
        ("cisco", "Cisco Systems, Inc."),
        ("daisy", "Daisy Ltd."),
        ("fsf", "Free Software Foundation, Inc."),
        ("freesoftwarefoundation", "Free Software Foundation, Inc."),
        ("freesoftwarefoundationinc", "Free Software Foundation, Inc."),
        ("thefreesoftwarefoundation", "Free Software Foundation, Inc."),
        ("thefreesoftwarefoundationinc", "Free Software Foundation, Inc."),
        ("hp", "Hewlett-Packard, Inc."),
        ("hewlettpackard", "Hewlett-Packard, Inc."),
        ("hewlettpackardco", "Hewlett-Packard, Inc."),
        ("hpcompany", "Hewlett-Packard, Inc."),
        ("hpdevelopmentcompanylp", "Hewlett-Packard, Inc."),
        ("hpdevelopmentcompany", "Hewlett-Packard, Inc."),
        ("hewlettpackardcompany", "Hewlett-Packard, Inc."),
        ("theandroidopensourceproject", "The Android Open Source Project, Inc."),
        ("androidopensourceproject", "The Android Open Source Project, Inc."),
        ("ibm", "IBM Corporation"),
        ("redhat", "Red Hat, Inc."),
        ("redhatinc", "Red Hat, Inc."),
        ("softwareinthepublicinterest", "Software in the Public Interest, Inc."),
        ("spiinc", "Software in the Public Interest, Inc."),
        ("suse", "SuSE, Inc."),
        ("suseinc", "SuSE, Inc."),
        ("sunmicrosystems", "Sun Microsystems, Inc."),
        ("sunmicrosystemsinc", "Sun Microsystems, Inc."),
        ("sunmicro", "Sun Microsystems, Inc."),
        ("thaiopensourcesoftwarecenter", "Thai Open Source Software Center Ltd."),
        ("apachefoundation", "The Apache Software Foundation"),
        ("apachegroup", "The Apache Software Foundation"),
        ("apache", "The Apache Software Foundation"),
        ("apachesoftwarefoundation", "The Apache Software Foundation"),
        ("theapachegroup", "The Apache Software Foundation"),
        ("eclipse", "The Eclipse Foundation"),
        ("eclipsefoundation", "The Eclipse Foundation"),
        (
            "regentsoftheuniversityofcalifornia",
            "The Regents of the University of California",
        ),
        ("borland", "Borland Corp."),
        ("microsoft", "Microsoft Corp."),
        ("microsoftcorp", "Microsoft Corp."),
        ("google", "Google Inc."),
        ("googlellc", "Google Inc."),
        ("googleinc", "Google Inc."),
        ("intel", "Intel Corporation"),
    ]
    .into_iter()
    .collect()
});

const STRIPPED_SUFFIXES: &[&str] = &["(minizip)"];

/// A value being summarized: `key` is progressively normalized into a
/// clustering key while `original` is what gets reported.
#[derive(Debug, Clone)]
struct Text {
    key: String,
    original: String,
    count: usize,
}

impl Text {
    fn new(value: String, count: usize) -> Self {
        Self {
            key: value.clone(),
            original: value,
            count,
        }
    }

    fn normalize(&mut self) {
        let key = SPACES_RE
            .replace_all(&self.key.to_lowercase(), " ")
            .trim()
            .trim_matches(['.', ','])
            .trim()
            .replace("a. m.", "a.m.");
        self.key = key.trim_matches(['.', ',']).trim().to_string();
    }

    fn is_junk(&self) -> bool {
        self.key.is_empty()
            || JUNK_HOLDERS.contains(&self.key.as_str())
            || self.key.chars().all(|c| c.is_ascii_digit())
            || self.key.chars().count() == 1
    }

    fn transliterate(&mut self) {
        self.key = deunicode::deunicode(&self.key);
    }

    fn fingerprint(&mut self) {
        let key = NON_WORD_RE.replace_all(&self.key.to_lowercase(), " ").into_owned();
        self.key = key.split_whitespace().collect::<Vec<_>>().join(" ");
    }
}

/// Remove copyright years and year ranges from a statement.
pub fn strip_years(statement: &str) -> String {
    let stripped = YEARS_RE.replace_all(statement, " ");
    SPACES_RE
        .replace_all(&stripped, " ")
        .replace(" ,", ",")
        .trim()
        .trim_end_matches(',')
        .trim()
        .to_string()
}

/// Canonical form of a holder or author name.
pub fn canonical_holder(name: &str) -> String {
    let compact = NON_WORD_RE.replace_all(name, "").to_lowercase();
    let name = COMMON_NAMES.get(compact.as_str()).copied().unwrap_or(name);

    let mut words: Vec<&str> = name.split_whitespace().collect();
    while let Some(last) = words.last() {
        let last = last.trim_matches(['.', ',']).to_lowercase();
        if STRIPPED_SUFFIXES.contains(&last.as_str()) {
            words.pop();
        } else {
            break;
        }
    }
    words.join(" ")
}

/// Cluster texts by fingerprint; the longest original represents each
/// cluster and the counts are summed.
fn summarize(mut texts: Vec<Text>) -> Vec<(String, usize)> {
    for text in &mut texts {
        text.normalize();
    }
    let mut texts: Vec<Text> = texts.into_iter().filter(|t| !t.is_junk()).collect();
    for text in &mut texts {
        text.normalize();
        text.transliterate();
        text.fingerprint();
    }

    let mut order: Vec<String> = Vec::new();
    let mut clusters: HashMap<String, (String, usize)> = HashMap::new();
    for text in texts.into_iter().filter(|t| !t.key.is_empty()) {
        match clusters.get_mut(&text.key) {
            Some((representative, count)) => {
                if text.original.chars().count() > representative.chars().count() {
                    *representative = text.original;
                }
                *count += text.count;
            }
            None => {
                order.push(text.key.clone());
                clusters.insert(text.key, (text.original, text.count));
            }
        }
    }

    // Distinct clusters can share a representative
    let mut merged: Vec<(String, usize)> = Vec::new();
    for key in order {
        if let Some((value, count)) = clusters.remove(&key) {
            match merged.iter_mut().find(|(v, _)| *v == value) {
                Some((_, total)) => *total += count,
                None => merged.push((value, count)),
            }
        }
    }
    merged
}

/// Sort by count descending then value, with `None` after values of the
/// same count.
fn sorted_entries(mut entries: Vec<SummaryEntry>) -> Vec<SummaryEntry> {
    entries.sort_by(|a, b| {
        (Reverse(a.count), a.value.is_none(), &a.value).cmp(&(
            Reverse(b.count),
            b.value.is_none(),
            &b.value,
        ))
    });
    entries
}

fn own_values(codebase: &Codebase, id: ResourceId, field: Field) -> Vec<String> {
    let resource = codebase.get(id);
    let values: Vec<String> = match field {
        Field::Copyrights => resource
            .package_data
            .iter()
            .filter_map(|d| d.copyright.as_deref())
            .map(strip_years)
            .collect(),
        Field::Holders => resource
            .package_data
            .iter()
            .flat_map(|d| d.party_names("owner"))
            .map(canonical_holder)
            .collect(),
        Field::Authors => resource
            .package_data
            .iter()
            .flat_map(|d| d.party_names("author"))
            .map(canonical_holder)
            .collect(),
    };
    values.into_iter().filter(|v| !v.is_empty()).collect()
}

fn summarize_field(
    codebase: &Codebase,
    id: ResourceId,
    field: Field,
    summaries: &[Option<Summary>],
) -> Vec<SummaryEntry> {
    let resource = codebase.get(id);
    let mut texts: Vec<Text> = Vec::new();
    let mut undetected = 0;

    let values = own_values(codebase, id, field);
    if values.is_empty() && resource.is_file() {
        undetected += 1;
    }
    texts.extend(values.into_iter().map(|v| Text::new(v, 1)));

    for &child in codebase.children(id) {
        let Some(child_summary) = &summaries[child] else {
            continue;
        };
        for entry in field.entries(child_summary) {
            match &entry.value {
                Some(value) => texts.push(Text::new(value.clone(), entry.count)),
                None => undetected += entry.count,
            }
        }
    }

    let mut entries: Vec<SummaryEntry> = summarize(texts)
        .into_iter()
        .map(|(value, count)| SummaryEntry {
            value: Some(value),
            count,
        })
        .collect();
    if undetected > 0 {
        entries.push(SummaryEntry {
            value: None,
            count: undetected,
        });
    }
    sorted_entries(entries)
}

/// Summarize every resource bottom-up and return the root summary.
///
/// With `keep_details` every directory also keeps its own summary.
pub fn summarize_codebase(codebase: &mut Codebase, keep_details: bool) -> Summary {
    let mut summaries: Vec<Option<Summary>> = vec![None; codebase.len()];

    for id in codebase.walk_bottomup(0) {
        let summary = Summary {
            copyrights: summarize_field(codebase, id, Field::Copyrights, &summaries),
            holders: summarize_field(codebase, id, Field::Holders, &summaries),
            authors: summarize_field(codebase, id, Field::Authors, &summaries),
        };
        summaries[id] = Some(summary);
    }

    if keep_details {
        for id in codebase.walk_topdown(0) {
            let resource = codebase.get_mut(id);
            if !resource.is_file() {
                resource.summary = summaries[id].clone();
            }
        }
    }

    summaries[0].take().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(value: &str, count: usize) -> SummaryEntry {
        SummaryEntry {
            value: Some(value.into()),
            count,
        }
    }

    #[test]
    fn strips_copyright_years() {
        assert_eq!(
            strip_years("Copyright (c) 1995-2017 Jean-loup Gailly and Mark Adler"),
            "Copyright (c) Jean-loup Gailly and Mark Adler"
        );
        assert_eq!(
            strip_years("Copyright 2001, 2002, 2010 Acme, Inc."),
            "Copyright Acme, Inc."
        );
    }

    #[test]
    fn canonicalizes_common_names() {
        assert_eq!(canonical_holder("FSF"), "Free Software Foundation, Inc.");
        assert_eq!(canonical_holder("Red Hat"), "Red Hat, Inc.");
        assert_eq!(canonical_holder("Gilles Vollant (minizip)"), "Gilles Vollant");
        assert_eq!(canonical_holder("Jane Doe"), "Jane Doe");
    }

    #[test]
    fn clusters_spelling_variants() {
        let texts = vec![
            Text::new("Jean-loup Gailly".into(), 1),
            Text::new("jean loup gailly".into(), 2),
            Text::new("Jéan-loup Gailly".into(), 1),
            Text::new("Mark Adler".into(), 1),
        ];
        let summarized = summarize(texts);
        assert_eq!(
            summarized,
            vec![
                ("Jean-loup Gailly".to_string(), 4),
                ("Mark Adler".to_string(), 1)
            ]
        );
    }

    #[test]
    fn junk_is_dropped() {
        let texts = vec![
            Text::new("Inc.".into(), 1),
            Text::new("2019".into(), 1),
            Text::new("x".into(), 1),
            Text::new("California".into(), 1),
        ];
        assert!(summarize(texts).is_empty());
    }

    #[test]
    fn null_sorts_last_among_equal_counts() {
        let sorted = sorted_entries(vec![
            SummaryEntry {
                value: None,
                count: 2,
            },
            entry("b", 2),
            entry("a", 1),
            entry("a", 2),
        ]);
        assert_eq!(
            sorted,
            vec![
                entry("a", 2),
                entry("b", 2),
                SummaryEntry {
                    value: None,
                    count: 2
                },
                entry("a", 1),
            ]
        );
    }

    #[test]
    fn summarizes_a_tree() {
        use crate::config::ScanConfig;
        use crate::models::{PackageData, Party};

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("a/one.ABOUT"), "").unwrap();
        std::fs::write(dir.path().join("a/two.ABOUT"), "").unwrap();
        std::fs::write(dir.path().join("README"), "").unwrap();

        let mut codebase = Codebase::collect(dir.path(), &ScanConfig::default()).unwrap();
        let a = codebase.child_named(0, "a").unwrap();
        for name in ["one.ABOUT", "two.ABOUT"] {
            let id = codebase.child_named(a, name).unwrap();
            let mut data = PackageData::new("about_file", "about");
            data.copyright = Some("Copyright (c) 2020 Acme Corp.".into());
            data.parties.push(Party::person("owner", Some("Acme Corp".into()), None));
            codebase.get_mut(id).package_data.push(data);
        }

        let summary = summarize_codebase(&mut codebase, true);
        assert_eq!(
            summary.copyrights,
            vec![
                entry("Copyright (c) Acme Corp.", 2),
                SummaryEntry {
                    value: None,
                    count: 1
                }
            ]
        );
        assert_eq!(summary.holders[0], entry("Acme Corp", 2));
        assert_eq!(
            summary.authors,
            vec![SummaryEntry {
                value: None,
                count: 3
            }]
        );
        assert!(codebase.get(a).summary.is_some());
        assert!(codebase.root().summary.is_some());
    }
}
