//! The document pipeline: matcher, modifiers, graph, attributes.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use layered_context::{
    read_config_file, upper_set, AttributeMapping, ConfigError, ConfigResult, Document,
    MatchAttr, SpanAttributes, Target, TargetId, TokenRange, UnifiedMatcher,
    DEFAULT_CONTEXT_ATTRIBUTES,
};
use serde::{Deserialize, Serialize};

use crate::modifier_rule::{positive, RuleDefaults};
use crate::{ContextError, ContextResult, Modifier, ModifierGraph, ModifierRule, ScopeMode};

const DEFAULT_RULES: &str = include_str!("../resources/context_rules.json");

/// Name used in errors about component-wide settings.
const COMPONENT: &str = "context component";

/// Which category → attribute table to project edges through.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanAttrs {
    /// [`DEFAULT_CONTEXT_ATTRIBUTES`]
    #[default]
    Default,
    /// No attributes are projected
    #[serde(rename = "none")]
    Disabled,
    Custom(BTreeMap<String, BTreeMap<String, bool>>),
}

impl SpanAttrs {
    /// Build the table. Custom categories are upper-cased like rule categories.
    pub fn mapping(&self) -> AttributeMapping {
        match self {
            SpanAttrs::Default => DEFAULT_CONTEXT_ATTRIBUTES.clone(),
            SpanAttrs::Disabled => AttributeMapping::new(),
            SpanAttrs::Custom(table) => {
                let mut mapping = AttributeMapping::new();
                for (category, assignments) in table {
                    let category = category.to_uppercase();
                    for (attribute, value) in assignments {
                        mapping.insert(&category, attribute, *value);
                    }
                }
                mapping
            }
        }
    }
}

/// Settings of a [`ContextComponent`], usually read from TOML.
///
/// ```toml
/// max_scope = 10
/// allowed_types = ["PROBLEM"]
/// use_context_window = true
///
/// [terminating_types]
/// NEGATED_EXISTENCE = ["POSITIVE_EXISTENCE"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextConfig {
    pub phrase_matcher_attr: MatchAttr,
    pub allowed_types: Option<Vec<String>>,
    pub excluded_types: Option<Vec<String>>,
    /// Category -> extra categories that terminate it
    pub terminating_types: BTreeMap<String, Vec<String>>,
    pub max_scope: Option<i64>,
    pub max_targets: Option<i64>,
    /// Keep only the longest of overlapping modifier matches
    pub prune_on_modifier_overlap: bool,
    /// Drop modifiers whose match overlaps a target
    pub prune_on_target_overlap: bool,
    /// Scope modifiers by a `max_scope` window instead of sentences
    pub use_context_window: bool,
    /// Only look for modifiers in sentences that contain a target
    pub match_target_sents_only: bool,
    pub span_attrs: SpanAttrs,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            phrase_matcher_attr: MatchAttr::Lower,
            allowed_types: None,
            excluded_types: None,
            terminating_types: BTreeMap::new(),
            max_scope: None,
            max_targets: None,
            prune_on_modifier_overlap: true,
            prune_on_target_overlap: false,
            use_context_window: false,
            match_target_sents_only: false,
            span_attrs: SpanAttrs::Default,
        }
    }
}

impl ContextConfig {
    pub fn from_toml_str(toml: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(toml)?)
    }

    pub fn from_toml_file(path: &Path) -> ConfigResult<Self> {
        Self::from_toml_str(&read_config_file(path)?)
    }

    fn rule_defaults(&self) -> ConfigResult<RuleDefaults> {
        if self.allowed_types.is_some() && self.excluded_types.is_some() {
            return Err(ConfigError::ConflictingTypeFilters {
                literal: COMPONENT.to_string(),
            });
        }
        Ok(RuleDefaults {
            allowed_types: self.allowed_types.as_ref().map(upper_set),
            excluded_types: self.excluded_types.as_ref().map(upper_set),
            max_scope: positive(self.max_scope, COMPONENT, "max_scope")?,
            max_targets: positive(self.max_targets, COMPONENT, "max_targets")?,
            terminating_types: self
                .terminating_types
                .iter()
                .map(|(category, by)| (category.to_uppercase(), upper_set(by)))
                .collect(),
        })
    }
}

/// Finds modifiers in a document and resolves them against its targets.
///
/// Rules are merged with the component defaults when added and are shared
/// read-only afterwards, so one component can serve many threads.
#[derive(Debug)]
pub struct ContextComponent {
    config: ContextConfig,
    defaults: RuleDefaults,
    mapping: AttributeMapping,
    matcher: UnifiedMatcher<Arc<ModifierRule>>,
}

impl ContextComponent {
    /// A component with no rules.
    pub fn new(config: ContextConfig) -> ConfigResult<Self> {
        let defaults = config.rule_defaults()?;
        let matcher = UnifiedMatcher::new(config.phrase_matcher_attr)
            .with_prune(config.prune_on_modifier_overlap);
        Ok(Self {
            mapping: config.span_attrs.mapping(),
            config,
            defaults,
            matcher,
        })
    }

    /// A component loaded with the packaged English rules.
    pub fn with_default_rules(config: ContextConfig) -> ConfigResult<Self> {
        let mut component = Self::new(config)?;
        component.add(ModifierRule::from_json_str(DEFAULT_RULES)?)?;
        Ok(component)
    }

    /// Merge component defaults into the rules and register them.
    ///
    /// Nothing is registered if any rule is rejected.
    pub fn add<I: IntoIterator<Item = ModifierRule>>(&mut self, rules: I) -> ConfigResult<()> {
        let mut merged = Vec::new();
        for mut rule in rules {
            rule.inherit(&self.defaults);
            if self.config.use_context_window && rule.max_scope().is_none() {
                return Err(ConfigError::WindowRequiresMaxScope {
                    literal: rule.literal().to_string(),
                });
            }
            merged.push(Arc::new(rule));
        }
        self.matcher.add(merged)
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn rules(&self) -> &[Arc<ModifierRule>] {
        self.matcher.rules()
    }

    pub fn categories(&self) -> BTreeSet<String> {
        self.matcher.categories()
    }

    pub fn attribute_mapping(&self) -> &AttributeMapping {
        &self.mapping
    }

    /// Resolve modifiers for one document.
    ///
    /// Fails without partial output when a modifier lies outside every
    /// sentence (sentence scoping) or an `on_modifies` callback errors.
    pub fn process(&self, doc: &Document, targets: Vec<Target>) -> ContextResult<ContextOutput> {
        let matches = if self.config.match_target_sents_only {
            let mut sentences = BTreeSet::new();
            for target in &targets {
                let sentence = doc.sentence_of(target.range.start).ok_or(
                    ContextError::MissingSentenceBoundary {
                        token: target.range.start,
                    },
                )?;
                sentences.insert(sentence);
            }
            let mut matches: Vec<_> = sentences
                .into_iter()
                .flat_map(|sentence: TokenRange| self.matcher.find_in(doc, sentence))
                .collect();
            matches.sort_by_key(|m| (m.range, m.rule));
            matches.dedup();
            matches
        } else {
            self.matcher.find(doc)
        };

        let mode = if self.config.use_context_window {
            ScopeMode::Window
        } else {
            ScopeMode::Sentence
        };
        let mut modifiers = Vec::with_capacity(matches.len());
        for m in matches {
            if let Some(rule) = self.matcher.rule(m.rule) {
                modifiers.push(Modifier::new(rule.clone(), m.range, doc, mode)?);
            }
        }

        let mut graph = ModifierGraph::new(targets, modifiers)
            .with_target_overlap_pruning(self.config.prune_on_target_overlap);
        graph.resolve(doc)?;
        let attributes = graph.attributes(&self.mapping);
        tracing::debug!(
            modifiers = graph.modifiers().len(),
            edges = graph.edges().len(),
            "processed document"
        );
        Ok(ContextOutput { graph, attributes })
    }
}

/// Result of [`ContextComponent::process`].
#[derive(Debug, Clone)]
pub struct ContextOutput {
    pub graph: ModifierGraph,
    /// One attribute set per target, in target order
    pub attributes: Vec<SpanAttributes>,
}

impl ContextOutput {
    pub fn targets(&self) -> &[Target] {
        self.graph.targets()
    }

    /// Modifiers applying to a target.
    pub fn modifiers_for(&self, target: TargetId) -> Vec<&Modifier> {
        self.graph.modifiers_for(target).collect()
    }

    pub fn attributes_of(&self, target: TargetId) -> Option<&SpanAttributes> {
        self.attributes.get(target.0)
    }
}
