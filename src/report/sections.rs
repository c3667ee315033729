//! Section routing for generated report text.
//!
//! The generated document is free-form text. [`KeywordSectionRouter`] walks it
//! line by line and sends each line to one of four buckets. A line switches
//! the active bucket when it contains a `#` and one of the keywords
//! `insight`, `quality` or `recommend` (checked in that order, case
//! insensitive). Every other line goes to whichever bucket is active, which
//! starts as [`Section::Intro`].
//!
//! The rules are deliberately loose: a `#` anywhere on the line counts as a
//! heading marker, and heading levels are ignored. Callers depend on the
//! [`SectionRouter`] trait so a structured parser can replace it later.

use serde::Serialize;

/// The closed set of report sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Intro,
    Insights,
    Quality,
    Recommendations,
}

impl Section {
    /// All sections in display order.
    pub const ALL: [Section; 4] = [
        Section::Intro,
        Section::Insights,
        Section::Quality,
        Section::Recommendations,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Section::Intro => "intro",
            Section::Insights => "insights",
            Section::Quality => "quality",
            Section::Recommendations => "recommendations",
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Routed text, one accumulator per [`Section`].
///
/// Each bucket holds its lines in document order, each followed by `\n`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionMap {
    intro: String,
    insights: String,
    quality: String,
    recommendations: String,
    #[serde(skip)]
    line_order: Vec<Section>,
}

impl SectionMap {
    pub fn get(&self, section: Section) -> &str {
        match section {
            Section::Intro => &self.intro,
            Section::Insights => &self.insights,
            Section::Quality => &self.quality,
            Section::Recommendations => &self.recommendations,
        }
    }

    pub fn intro(&self) -> &str {
        &self.intro
    }

    pub fn insights(&self) -> &str {
        &self.insights
    }

    pub fn quality(&self) -> &str {
        &self.quality
    }

    pub fn recommendations(&self) -> &str {
        &self.recommendations
    }

    /// Whether a bucket holds nothing but whitespace.
    pub fn is_blank(&self, section: Section) -> bool {
        self.get(section).trim().is_empty()
    }

    /// Buckets in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Section, &str)> {
        Section::ALL.into_iter().map(move |s| (s, self.get(s)))
    }

    /// Number of lines routed.
    pub fn line_count(&self) -> usize {
        self.line_order.len()
    }

    /// Rebuilds the routed document in its original line order.
    pub fn reconstruct(&self) -> String {
        let mut buckets: Vec<std::str::Split<'_, char>> = Section::ALL
            .iter()
            .map(|&s| bucket_lines(self.get(s)))
            .collect();

        let lines: Vec<&str> = self
            .line_order
            .iter()
            .filter_map(|&section| buckets[section as usize].next())
            .collect();
        lines.join("\n")
    }

    fn push_line(&mut self, section: Section, line: &str) {
        let bucket = match section {
            Section::Intro => &mut self.intro,
            Section::Insights => &mut self.insights,
            Section::Quality => &mut self.quality,
            Section::Recommendations => &mut self.recommendations,
        };
        bucket.push_str(line);
        bucket.push('\n');
        self.line_order.push(section);
    }
}

fn bucket_lines(text: &str) -> std::str::Split<'_, char> {
    // every routed line ends in '\n', so dropping the last one leaves a clean split
    text.strip_suffix('\n').unwrap_or(text).split('\n')
}

/// Partitions a document into a [`SectionMap`].
pub trait SectionRouter: Send + Sync {
    fn route(&self, document: &str) -> SectionMap;
}

/// Heading-keyword line classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordSectionRouter;

impl KeywordSectionRouter {
    const HEADING_MARKER: char = '#';

    const KEYWORDS: [(&'static str, Section); 3] = [
        ("insight", Section::Insights),
        ("quality", Section::Quality),
        ("recommend", Section::Recommendations),
    ];

    fn classify(line: &str) -> Option<Section> {
        if !line.contains(Self::HEADING_MARKER) {
            return None;
        }
        let lower = line.to_lowercase();
        Self::KEYWORDS
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|(_, section)| *section)
    }
}

impl SectionRouter for KeywordSectionRouter {
    fn route(&self, document: &str) -> SectionMap {
        let mut map = SectionMap::default();
        let mut current = Section::Intro;

        for line in document.split('\n') {
            if let Some(section) = Self::classify(line) {
                current = section;
            }
            map.push_line(current, line);
        }

        map
    }
}

/// Routes `document` with the keyword router.
pub fn route(document: &str) -> SectionMap {
    KeywordSectionRouter.route(document)
}
