//! Header matching, parent resolution and section boundaries.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use layered_context::{
    read_config_file, AttributeMapping, ConfigError, ConfigResult, Document, Match, MatchAttr,
    RuleId, SpanAttributes, Target, TokenRange, UnifiedMatcher,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{DocumentSections, Section, SectionId, SectionRule};

const DEFAULT_RULES: &str = include_str!("../resources/section_patterns.json");

/// Trailing whitespace that ends a line.
pub const DEFAULT_NEWLINE_PATTERN: &str = r"[\n\r]+[\s]*$";

/// Section category → attribute table used by [`SectionAttrs::Default`].
pub fn default_section_attributes() -> AttributeMapping {
    AttributeMapping::new()
        .with("past_medical_history", "is_historical", true)
        .with("sexual_and_social_history", "is_historical", true)
        .with("family_history", "is_family", true)
        .with("patient_instructions", "is_hypothetical", true)
        .with("education", "is_hypothetical", true)
        .with("allergy", "is_hypothetical", true)
}

/// Which attributes targets inherit from their section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionAttrs {
    #[default]
    #[serde(rename = "none")]
    Disabled,
    /// [`default_section_attributes`]
    Default,
    Custom(BTreeMap<String, BTreeMap<String, bool>>),
}

impl SectionAttrs {
    pub fn mapping(&self) -> AttributeMapping {
        match self {
            SectionAttrs::Disabled => AttributeMapping::new(),
            SectionAttrs::Default => default_section_attributes(),
            SectionAttrs::Custom(table) => {
                let mut mapping = AttributeMapping::new();
                for (category, assignments) in table {
                    for (attribute, value) in assignments {
                        mapping.insert(category, attribute, *value);
                    }
                }
                mapping
            }
        }
    }
}

/// Settings of a [`Sectionizer`].
///
/// ```toml
/// max_section_length = 200
/// require_start_line = true
/// add_attrs = "default"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SectionizerConfig {
    /// Longest body in tokens, unless the rule sets its own `max_scope`
    pub max_section_length: Option<i64>,
    pub phrase_matcher_attr: MatchAttr,
    /// Keep only headers that begin a line
    pub require_start_line: bool,
    /// Keep only headers that end a line
    pub require_end_line: bool,
    pub newline_pattern: String,
    pub add_attrs: SectionAttrs,
}

impl Default for SectionizerConfig {
    fn default() -> Self {
        Self {
            max_section_length: None,
            phrase_matcher_attr: MatchAttr::Lower,
            require_start_line: false,
            require_end_line: false,
            newline_pattern: DEFAULT_NEWLINE_PATTERN.to_string(),
            add_attrs: SectionAttrs::Disabled,
        }
    }
}

impl SectionizerConfig {
    pub fn from_toml_str(toml: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(toml)?)
    }

    pub fn from_toml_file(path: &Path) -> ConfigResult<Self> {
        Self::from_toml_str(&read_config_file(path)?)
    }
}

/// A recovered problem in the registered rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionWarning {
    /// The category was declared again with parents; all parents are kept.
    MergedParents { category: String },
    /// Declarations disagree on `parent_required`; the parent became optional.
    ConflictingParentRequired { category: String },
}

impl std::fmt::Display for SectionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionWarning::MergedParents { category } => write!(
                f,
                "duplicate section category '{}', merging parents",
                category
            ),
            SectionWarning::ConflictingParentRequired { category } => write!(
                f,
                "duplicate section category '{}' has different parent_required options, setting parent_required to false",
                category
            ),
        }
    }
}

/// A header match that survived parent resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedHeader {
    pub rule: RuleId,
    pub range: TokenRange,
    /// Index of the parent header in the resolved list
    pub parent: Option<usize>,
}

/// Splits documents into sections at header matches.
#[derive(Debug)]
pub struct Sectionizer {
    config: SectionizerConfig,
    max_section_length: Option<usize>,
    newline: Regex,
    matcher: UnifiedMatcher<SectionRule>,
    parent_sections: BTreeMap<String, BTreeSet<String>>,
    parent_required: BTreeMap<String, bool>,
    mapping: AttributeMapping,
    warnings: Vec<SectionWarning>,
}

impl Sectionizer {
    /// A sectionizer with no rules.
    pub fn new(config: SectionizerConfig) -> ConfigResult<Self> {
        let max_section_length = match config.max_section_length {
            Some(n) if n <= 0 => {
                return Err(ConfigError::NonPositive {
                    literal: "sectionizer".to_string(),
                    field: "max_section_length",
                })
            }
            Some(n) => Some(n as usize),
            None => None,
        };
        let newline = Regex::new(&config.newline_pattern).map_err(|source| {
            ConfigError::InvalidPattern {
                literal: "newline_pattern".to_string(),
                source,
            }
        })?;
        Ok(Sectionizer {
            matcher: UnifiedMatcher::new(config.phrase_matcher_attr),
            mapping: config.add_attrs.mapping(),
            config,
            max_section_length,
            newline,
            parent_sections: BTreeMap::new(),
            parent_required: BTreeMap::new(),
            warnings: Vec::new(),
        })
    }

    /// A sectionizer loaded with the packaged English headers.
    pub fn with_default_rules(config: SectionizerConfig) -> ConfigResult<Self> {
        let mut sectionizer = Self::new(config)?;
        sectionizer.add(SectionRule::from_json_str(DEFAULT_RULES)?)?;
        Ok(sectionizer)
    }

    /// Register header rules. Nothing is registered if any rule is rejected.
    ///
    /// Rules sharing a category share one parent set. Later declarations add
    /// their parents to it, and disagreeing `parent_required` flags resolve
    /// to `false`. Both cases are reported through [`Sectionizer::warnings`].
    pub fn add<I: IntoIterator<Item = SectionRule>>(&mut self, rules: I) -> ConfigResult<()> {
        let rules: Vec<SectionRule> = rules.into_iter().collect();
        let mut parent_sections = self.parent_sections.clone();
        let mut parent_required = self.parent_required.clone();
        let mut warnings = Vec::new();

        for rule in &rules {
            rule.validate()?;
            let category = rule.category();
            match parent_sections.get_mut(category) {
                Some(parents) => {
                    if !rule.parents().is_empty() {
                        tracing::warn!(category, "duplicate section category, merging parents");
                        warnings.push(SectionWarning::MergedParents {
                            category: category.to_string(),
                        });
                        parents.extend(rule.parents().iter().cloned());
                    }
                }
                None => {
                    parent_sections.insert(category.to_string(), rule.parents().iter().cloned().collect());
                }
            }
            match parent_required.get(category).copied() {
                Some(previous) if previous != rule.parent_required() => {
                    tracing::warn!(
                        category,
                        "duplicate section category with different parent_required, setting it to false"
                    );
                    warnings.push(SectionWarning::ConflictingParentRequired {
                        category: category.to_string(),
                    });
                    parent_required.insert(category.to_string(), false);
                }
                Some(_) => {}
                None => {
                    parent_required.insert(category.to_string(), rule.parent_required());
                }
            }
        }

        self.matcher.add(rules)?;
        self.parent_sections = parent_sections;
        self.parent_required = parent_required;
        self.warnings.extend(warnings);
        Ok(())
    }

    pub fn config(&self) -> &SectionizerConfig {
        &self.config
    }

    pub fn rules(&self) -> &[SectionRule] {
        self.matcher.rules()
    }

    pub fn rule(&self, id: RuleId) -> Option<&SectionRule> {
        self.matcher.rule(id)
    }

    pub fn section_categories(&self) -> BTreeSet<String> {
        self.matcher.categories()
    }

    /// Merged candidate parents of a category.
    pub fn parents_of(&self, category: &str) -> Option<&BTreeSet<String>> {
        self.parent_sections.get(category)
    }

    pub fn parent_required(&self, category: &str) -> bool {
        self.parent_required.get(category).copied().unwrap_or(false)
    }

    pub fn warnings(&self) -> &[SectionWarning] {
        &self.warnings
    }

    pub fn attribute_mapping(&self) -> &AttributeMapping {
        &self.mapping
    }

    /// Find the sections of a document.
    pub fn process(&self, doc: &Document) -> DocumentSections {
        let mut matches = self.matcher.find(doc);
        if self.config.require_start_line {
            matches.retain(|m| self.is_start_line(doc, m.range.start));
        }
        if self.config.require_end_line {
            matches.retain(|m| m.range.last().map_or(false, |idx| self.is_end_line(doc, idx)));
        }
        matches.sort_by_key(|m| (m.range, m.rule));

        let headers = self.set_parent_sections(&matches);
        let sections = self.build_sections(doc, &headers);
        tracing::debug!(
            headers = matches.len(),
            sections = sections.len(),
            "sectioned document"
        );
        DocumentSections::new(sections, doc.len())
    }

    /// Resolve parents for header matches in document order.
    ///
    /// Headers whose rule requires a parent are dropped when none is found,
    /// and so is a leading header that requires one. Among several candidate
    /// parent categories the nearest qualifying ancestor wins.
    pub fn set_parent_sections(&self, matches: &[Match]) -> Vec<ResolvedHeader> {
        let mut resolved: Vec<ResolvedHeader> = Vec::with_capacity(matches.len());
        for m in matches {
            let Some(rule) = self.matcher.rule(m.rule) else {
                continue;
            };
            let category = rule.category();
            let required = self.parent_required(category);

            let parent = if resolved.is_empty() {
                None
            } else {
                self.parent_sections.get(category).and_then(|parents| {
                    parents
                        .iter()
                        .filter_map(|parent| self.find_parent(&resolved, parent))
                        .max()
                })
            };
            if required && parent.is_none() {
                tracing::debug!(category, range = %m.range, "dropping section without its required parent");
                continue;
            }
            resolved.push(ResolvedHeader {
                rule: m.rule,
                range: m.range,
                parent,
            });
        }
        resolved
    }

    /// Walk back from the last resolved header looking for `parent`.
    ///
    /// The walk moves to the previous header while it is the current
    /// candidate's parent or one of its siblings.
    fn find_parent(&self, resolved: &[ResolvedHeader], parent: &str) -> Option<usize> {
        let mut idx = resolved.len().checked_sub(1)?;
        let mut candidate = self.category_of(&resolved[idx]);
        let mut candidate_parent = self.parent_category(resolved, idx);
        loop {
            if candidate == parent {
                return Some(idx);
            }
            if idx == 0 {
                return None;
            }
            let expected = candidate_parent?;
            let previous = self.category_of(&resolved[idx - 1]);
            let previous_parent = self.parent_category(resolved, idx - 1);
            if previous == expected || previous_parent == Some(expected) {
                candidate = previous;
                candidate_parent = previous_parent;
                idx -= 1;
            } else {
                return None;
            }
        }
    }

    fn category_of(&self, header: &ResolvedHeader) -> &str {
        self.matcher.rule(header.rule).map_or("", |rule| rule.category())
    }

    fn parent_category(&self, resolved: &[ResolvedHeader], idx: usize) -> Option<&str> {
        let parent = resolved.get(idx)?.parent?;
        resolved.get(parent).map(|header| self.category_of(header))
    }

    fn build_sections(&self, doc: &Document, headers: &[ResolvedHeader]) -> Vec<Section> {
        let len = doc.len();
        let Some(first) = headers.first() else {
            return vec![null_section(0, len)];
        };

        let offset = usize::from(first.range.start != 0);
        let mut sections = Vec::with_capacity(headers.len() + offset);
        if offset == 1 {
            sections.push(null_section(0, first.range.start));
        }
        for (i, header) in headers.iter().enumerate() {
            let rule = self.matcher.rule(header.rule);
            let natural_end = headers.get(i + 1).map_or(len, |next| next.range.start);
            let limit = rule.and_then(SectionRule::max_scope).or(self.max_section_length);
            let body_end = match limit {
                Some(limit) => natural_end.min(header.range.end + limit),
                None => natural_end,
            };
            sections.push(Section {
                id: SectionId(sections.len()),
                category: rule.map(|rule| rule.category().to_string()),
                title_range: header.range,
                body_range: TokenRange::new(header.range.end, body_end.max(header.range.end)),
                parent: header.parent.map(|p| SectionId(p + offset)),
                rule: Some(header.rule),
            });
        }
        sections
    }

    fn ends_line(&self, doc: &Document, idx: usize) -> bool {
        doc.token(idx)
            .map_or(false, |token| self.newline.is_match(&token.text_with_ws()))
    }

    /// Does token `idx` begin a line?
    pub fn is_start_line(&self, doc: &Document, idx: usize) -> bool {
        idx == 0 || self.ends_line(doc, idx - 1)
    }

    /// Is token `idx` the last one on its line?
    ///
    /// Also true when the next token is itself a line break.
    pub fn is_end_line(&self, doc: &Document, idx: usize) -> bool {
        idx + 1 >= doc.len() || self.ends_line(doc, idx) || self.ends_line(doc, idx + 1)
    }

    /// Attributes each target inherits from the section of its first token.
    pub fn attributes(&self, sections: &DocumentSections, targets: &[Target]) -> Vec<SpanAttributes> {
        let mut attributes: Vec<SpanAttributes> =
            targets.iter().map(|_| self.mapping.empty_attributes()).collect();
        self.apply_attributes(sections, targets, &mut attributes);
        attributes
    }

    /// Add section attributes on top of existing ones, such as those from
    /// modifier resolution.
    pub fn apply_attributes(
        &self,
        sections: &DocumentSections,
        targets: &[Target],
        attributes: &mut [SpanAttributes],
    ) {
        for (target, attrs) in targets.iter().zip(attributes.iter_mut()) {
            let category = sections
                .section_of_span(target.range)
                .and_then(|section| section.category.as_deref());
            if let Some(category) = category {
                self.mapping.apply(category, attrs);
            }
        }
    }
}

fn null_section(start: usize, end: usize) -> Section {
    Section {
        id: SectionId(0),
        category: None,
        title_range: TokenRange::empty(start),
        body_range: TokenRange::new(start, end),
        parent: None,
        rule: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sectionizer(rules: Vec<SectionRule>) -> Sectionizer {
        let mut sectionizer = Sectionizer::new(SectionizerConfig::default()).unwrap();
        sectionizer.add(rules).unwrap();
        sectionizer
    }

    #[test]
    fn test_sectionizer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Sectionizer>();
    }

    #[test]
    fn test_default_rules_load() {
        let sectionizer = Sectionizer::with_default_rules(SectionizerConfig::default()).unwrap();
        assert!(sectionizer.rules().len() > 40);
        assert!(sectionizer.section_categories().contains("past_medical_history"));
        assert!(sectionizer.parent_required("comments"));
        assert!(sectionizer.warnings().is_empty());
    }

    #[test]
    fn test_non_positive_max_section_length() {
        let config = SectionizerConfig {
            max_section_length: Some(0),
            ..SectionizerConfig::default()
        };
        assert!(matches!(
            Sectionizer::new(config),
            Err(ConfigError::NonPositive { field: "max_section_length", .. })
        ));
    }

    #[test]
    fn test_bad_newline_pattern() {
        let config = SectionizerConfig {
            newline_pattern: "[\\n".to_string(),
            ..SectionizerConfig::default()
        };
        assert!(matches!(
            Sectionizer::new(config),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_rejected_rules_leave_parents_alone() {
        let mut sectionizer = sectionizer(vec![SectionRule::new("section 1:", "s1")]);
        let bad = SectionRule::new("section 2:", "s2")
            .with_parents(["s1"])
            .with_pattern(layered_context::RulePattern::Regex("(".to_string()));
        assert!(sectionizer.add(vec![bad]).is_err());
        assert!(sectionizer.parents_of("s2").is_none());
        assert_eq!(sectionizer.rules().len(), 1);
    }

    #[test]
    fn test_required_parent_without_parents_is_rejected() {
        let mut sectionizer = sectionizer(vec![SectionRule::new("section 1:", "s1")]);
        let rule = SectionRule::new("section 2:", "s2")
            .with_parents(["s1"])
            .with_parent_required()
            .unwrap()
            .with_parents(Vec::<String>::new());
        assert!(matches!(
            sectionizer.add(vec![rule]),
            Err(ConfigError::ParentRequiredWithoutParents { ref category }) if category == "s2"
        ));
        assert_eq!(sectionizer.rules().len(), 1);
        assert!(sectionizer.parents_of("s2").is_none());
    }

    #[test]
    fn test_line_checks() {
        let sectionizer = sectionizer(Vec::new());
        let doc = Document::from_text("Intro\n\nPlan: rest\nDone");
        // Intro | Plan | : | rest | Done
        assert!(sectionizer.is_start_line(&doc, 0));
        assert!(sectionizer.is_start_line(&doc, 1));
        assert!(!sectionizer.is_start_line(&doc, 2));
        assert!(sectionizer.is_end_line(&doc, 3));
        assert!(!sectionizer.is_end_line(&doc, 1));
        assert!(sectionizer.is_end_line(&doc, 4));
    }

    #[test]
    fn test_find_parent_accepts_first_header() {
        let sectionizer = sectionizer(vec![
            SectionRule::new("section 1:", "s1"),
            SectionRule::new("section 2:", "s2").with_parents(["s1"]),
        ]);
        let headers = sectionizer.set_parent_sections(&[
            Match::new(RuleId(0), 0, 3),
            Match::new(RuleId(1), 4, 7),
        ]);
        assert_eq!(headers[1].parent, Some(0));
    }

    #[test]
    fn test_config_from_toml() {
        let config = SectionizerConfig::from_toml_str(
            r#"
            max_section_length = 50
            require_end_line = true

            [add_attrs.custom.past_medical_history]
            is_historical = true
            "#,
        )
        .unwrap();
        assert_eq!(config.max_section_length, Some(50));
        assert!(config.require_end_line);
        assert_eq!(config.newline_pattern, DEFAULT_NEWLINE_PATTERN);
        let mapping = config.add_attrs.mapping();
        assert_eq!(
            mapping.get("past_medical_history").and_then(|m| m.get("is_historical")),
            Some(&true)
        );

        let config = SectionizerConfig::from_toml_str(r#"add_attrs = "default""#).unwrap();
        assert_eq!(config.add_attrs, SectionAttrs::Default);
        assert!(matches!(
            SectionizerConfig::from_toml_str("include_header = true"),
            Err(ConfigError::Toml(_))
        ));
    }
}
