//! Modifier rules: what a modifier phrase is and how far it reaches.
//!
//! Rules are validated once, when built. A rule read from JSON goes through
//! [`ModifierRuleRecord`], the closed on-disk schema, and the same builder
//! checks as a rule written in code.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use layered_context::{
    read_config_file, upper_set, write_config_file, ConfigError, ConfigResult, Document, OnMatch,
    Rule, RulePattern, Target, TokenRange,
};
use serde::{Deserialize, Serialize};

use crate::Direction;

/// Error type an `on_modifies` callback may fail with.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Optional veto over a single `(target, modifier)` edge.
///
/// Called with the document, the target, the modifier's match range and the
/// token range between the two. `Ok(false)` drops the edge; an error aborts
/// processing of the document.
pub type OnModifies =
    Arc<dyn Fn(&Document, &Target, TokenRange, TokenRange) -> Result<bool, CallbackError> + Send + Sync>;

/// An immutable, validated modifier rule.
#[derive(Clone)]
pub struct ModifierRule {
    literal: String,
    category: String,
    direction: Direction,
    pattern: Option<RulePattern>,
    allowed_types: Option<BTreeSet<String>>,
    excluded_types: Option<BTreeSet<String>>,
    max_scope: Option<usize>,
    max_targets: Option<usize>,
    terminated_by: BTreeSet<String>,
    metadata: Option<serde_json::Value>,
    on_match: Option<OnMatch>,
    on_modifies: Option<OnModifies>,
}

impl std::fmt::Debug for ModifierRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModifierRule")
            .field("literal", &self.literal)
            .field("category", &self.category)
            .field("direction", &self.direction)
            .field("pattern", &self.pattern)
            .field("allowed_types", &self.allowed_types)
            .field("excluded_types", &self.excluded_types)
            .field("max_scope", &self.max_scope)
            .field("max_targets", &self.max_targets)
            .field("terminated_by", &self.terminated_by)
            .field("on_modifies", &self.on_modifies.is_some())
            .finish()
    }
}

impl ModifierRule {
    /// A rule with no type filters or limits. Cannot fail.
    pub fn new(literal: impl Into<String>, category: &str, direction: Direction) -> Self {
        ModifierRule {
            literal: literal.into(),
            category: category.to_uppercase(),
            direction,
            pattern: None,
            allowed_types: None,
            excluded_types: None,
            max_scope: None,
            max_targets: None,
            terminated_by: BTreeSet::new(),
            metadata: None,
            on_match: None,
            on_modifies: None,
        }
    }

    pub fn builder(literal: impl Into<String>, category: &str) -> ModifierRuleBuilder {
        ModifierRuleBuilder {
            literal: literal.into(),
            category: category.to_string(),
            direction: None,
            pattern: None,
            allowed_types: None,
            excluded_types: None,
            max_scope: None,
            max_targets: None,
            terminated_by: Vec::new(),
            metadata: None,
            on_match: None,
            on_modifies: None,
        }
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// Upper-cased category.
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn pattern(&self) -> Option<&RulePattern> {
        self.pattern.as_ref()
    }

    pub fn allowed_types(&self) -> Option<&BTreeSet<String>> {
        self.allowed_types.as_ref()
    }

    pub fn excluded_types(&self) -> Option<&BTreeSet<String>> {
        self.excluded_types.as_ref()
    }

    pub fn max_scope(&self) -> Option<usize> {
        self.max_scope
    }

    pub fn max_targets(&self) -> Option<usize> {
        self.max_targets
    }

    pub fn terminated_by(&self) -> &BTreeSet<String> {
        &self.terminated_by
    }

    pub fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }

    pub fn on_modifies(&self) -> Option<&OnModifies> {
        self.on_modifies.as_ref()
    }

    /// Is a target with this (upper-cased) label eligible?
    pub fn allows(&self, label: &str) -> bool {
        if let Some(allowed) = &self.allowed_types {
            return allowed.contains(label);
        }
        if let Some(excluded) = &self.excluded_types {
            return !excluded.contains(label);
        }
        true
    }

    /// Fill unset fields from component-wide defaults.
    ///
    /// A rule that declares either type filter keeps it and inherits neither.
    pub(crate) fn inherit(&mut self, defaults: &RuleDefaults) {
        if self.allowed_types.is_none() && self.excluded_types.is_none() {
            self.allowed_types = defaults.allowed_types.clone();
            if self.allowed_types.is_none() {
                self.excluded_types = defaults.excluded_types.clone();
            }
        }
        if self.max_scope.is_none() {
            self.max_scope = defaults.max_scope;
        }
        if self.max_targets.is_none() {
            self.max_targets = defaults.max_targets;
        }
        if let Some(extra) = defaults.terminating_types.get(&self.category) {
            self.terminated_by.extend(extra.iter().cloned());
        }
    }

    pub fn to_record(&self) -> ModifierRuleRecord {
        ModifierRuleRecord {
            literal: self.literal.clone(),
            category: self.category.clone(),
            direction: self.direction.as_str().to_string(),
            pattern: self.pattern.clone(),
            allowed_types: self.allowed_types.as_ref().map(|s| s.iter().cloned().collect()),
            excluded_types: self.excluded_types.as_ref().map(|s| s.iter().cloned().collect()),
            max_scope: self.max_scope.map(|n| n as i64),
            max_targets: self.max_targets.map(|n| n as i64),
            terminated_by: if self.terminated_by.is_empty() {
                None
            } else {
                Some(self.terminated_by.iter().cloned().collect())
            },
            metadata: self.metadata.clone(),
        }
    }

    pub fn from_record(record: ModifierRuleRecord) -> ConfigResult<Self> {
        let mut builder = ModifierRule::builder(record.literal, &record.category)
            .direction_str(&record.direction)?;
        builder.pattern = record.pattern;
        builder.allowed_types = record.allowed_types;
        builder.excluded_types = record.excluded_types;
        builder.terminated_by = record.terminated_by.unwrap_or_default();
        builder.metadata = record.metadata;
        let builder = builder.max_scope_raw(record.max_scope).max_targets_raw(record.max_targets);
        builder.build()
    }

    /// Parse `{"context_rules": [...]}`.
    pub fn from_json_str(json: &str) -> ConfigResult<Vec<ModifierRule>> {
        let file: ContextRuleFile = serde_json::from_str(json)?;
        file.context_rules
            .into_iter()
            .map(ModifierRule::from_record)
            .collect()
    }

    pub fn from_json_file(path: &Path) -> ConfigResult<Vec<ModifierRule>> {
        Self::from_json_str(&read_config_file(path)?)
    }

    /// Write rules back to the JSON format. Callbacks are not kept.
    pub fn to_json(rules: &[ModifierRule]) -> ConfigResult<String> {
        let file = ContextRuleFile {
            context_rules: rules.iter().map(ModifierRule::to_record).collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn to_json_file(rules: &[ModifierRule], path: &Path) -> ConfigResult<()> {
        write_config_file(path, &Self::to_json(rules)?)
    }
}

impl Rule for ModifierRule {
    fn literal(&self) -> &str {
        &self.literal
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn pattern(&self) -> Option<&RulePattern> {
        self.pattern.as_ref()
    }

    fn on_match(&self) -> Option<&OnMatch> {
        self.on_match.as_ref()
    }
}

/// Builder for [`ModifierRule`]; all validation happens in [`build`](Self::build).
pub struct ModifierRuleBuilder {
    literal: String,
    category: String,
    direction: Option<Direction>,
    pattern: Option<RulePattern>,
    allowed_types: Option<Vec<String>>,
    excluded_types: Option<Vec<String>>,
    max_scope: Option<i64>,
    max_targets: Option<i64>,
    terminated_by: Vec<String>,
    metadata: Option<serde_json::Value>,
    on_match: Option<OnMatch>,
    on_modifies: Option<OnModifies>,
}

impl ModifierRuleBuilder {
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Parse a direction name, e.g. from a config file.
    pub fn direction_str(mut self, direction: &str) -> ConfigResult<Self> {
        self.direction = Some(direction.parse()?);
        Ok(self)
    }

    pub fn pattern(mut self, pattern: RulePattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn allowed_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn excluded_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn max_scope(self, max_scope: usize) -> Self {
        self.max_scope_raw(Some(max_scope as i64))
    }

    pub fn max_targets(self, max_targets: usize) -> Self {
        self.max_targets_raw(Some(max_targets as i64))
    }

    fn max_scope_raw(mut self, max_scope: Option<i64>) -> Self {
        self.max_scope = max_scope;
        self
    }

    fn max_targets_raw(mut self, max_targets: Option<i64>) -> Self {
        self.max_targets = max_targets;
        self
    }

    pub fn terminated_by<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terminated_by = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn on_match(mut self, on_match: OnMatch) -> Self {
        self.on_match = Some(on_match);
        self
    }

    pub fn on_modifies(mut self, on_modifies: OnModifies) -> Self {
        self.on_modifies = Some(on_modifies);
        self
    }

    pub fn build(self) -> ConfigResult<ModifierRule> {
        if self.allowed_types.is_some() && self.excluded_types.is_some() {
            return Err(ConfigError::ConflictingTypeFilters {
                literal: self.literal,
            });
        }
        let max_scope = positive(self.max_scope, &self.literal, "max_scope")?;
        let max_targets = positive(self.max_targets, &self.literal, "max_targets")?;

        Ok(ModifierRule {
            category: self.category.to_uppercase(),
            direction: self.direction.unwrap_or_default(),
            pattern: self.pattern,
            allowed_types: self.allowed_types.map(upper_set),
            excluded_types: self.excluded_types.map(upper_set),
            max_scope,
            max_targets,
            terminated_by: upper_set(self.terminated_by),
            metadata: self.metadata,
            on_match: self.on_match,
            on_modifies: self.on_modifies,
            literal: self.literal,
        })
    }
}

pub(crate) fn positive(value: Option<i64>, literal: &str, field: &'static str) -> ConfigResult<Option<usize>> {
    match value {
        None => Ok(None),
        Some(n) if n > 0 => Ok(Some(n as usize)),
        Some(_) => Err(ConfigError::NonPositive {
            literal: literal.to_string(),
            field,
        }),
    }
}

/// Component-wide values merged into rules as they are registered.
#[derive(Debug, Clone, Default)]
pub(crate) struct RuleDefaults {
    pub allowed_types: Option<BTreeSet<String>>,
    pub excluded_types: Option<BTreeSet<String>>,
    pub max_scope: Option<usize>,
    pub max_targets: Option<usize>,
    /// Upper-cased category -> upper-cased categories that terminate it
    pub terminating_types: std::collections::BTreeMap<String, BTreeSet<String>>,
}

/// One entry of a `context_rules` JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModifierRuleRecord {
    pub literal: String,
    pub category: String,
    #[serde(default = "default_direction")]
    pub direction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<RulePattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_scope: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_targets: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminated_by: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

fn default_direction() -> String {
    Direction::Bidirectional.as_str().to_string()
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContextRuleFile {
    context_rules: Vec<ModifierRuleRecord>,
}
