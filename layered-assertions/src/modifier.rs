//! One matched modifier phrase and the scope it can affect.

use std::collections::BTreeSet;
use std::sync::Arc;

use layered_context::{ConfigError, Document, Target, TargetId, TokenRange};

use crate::{ContextError, ContextResult, Direction, ModifierRule};

/// What bounds a modifier's scope before any limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeMode {
    /// The sentence containing the modifier's first token
    #[default]
    Sentence,
    /// `max_scope` tokens on each side of the match, ignoring sentences
    Window,
}

/// A rule matched at one place in a document.
#[derive(Debug, Clone)]
pub struct Modifier {
    rule: Arc<ModifierRule>,
    range: TokenRange,
    scope: TokenRange,
    /// Sentence of the first token, if the document has sentences
    sentence: Option<TokenRange>,
    targets: Vec<TargetId>,
}

impl Modifier {
    /// Create a modifier and compute its initial scope.
    ///
    /// Fails with [`ContextError::MissingSentenceBoundary`] in sentence mode
    /// when the match start is not covered by a sentence, and with
    /// [`ConfigError::WindowRequiresMaxScope`] in window mode when the rule
    /// has no `max_scope`.
    pub fn new(
        rule: Arc<ModifierRule>,
        range: TokenRange,
        doc: &Document,
        mode: ScopeMode,
    ) -> ContextResult<Self> {
        let sentence = doc.sentence_of(range.start);
        let bounds = match mode {
            ScopeMode::Sentence => sentence.ok_or(ContextError::MissingSentenceBoundary {
                token: range.start,
            })?,
            ScopeMode::Window => {
                let n = rule
                    .max_scope()
                    .ok_or_else(|| ConfigError::WindowRequiresMaxScope {
                        literal: rule.literal().to_string(),
                    })?;
                doc.window(range, n)
            }
        };
        let scope = initial_scope(rule.direction(), rule.max_scope(), range, bounds);
        Ok(Modifier {
            rule,
            range,
            scope,
            sentence,
            targets: Vec::new(),
        })
    }

    pub fn rule(&self) -> &ModifierRule {
        &self.rule
    }

    pub(crate) fn shared_rule(&self) -> &Arc<ModifierRule> {
        &self.rule
    }

    /// The matched tokens.
    pub fn range(&self) -> TokenRange {
        self.range
    }

    pub fn scope(&self) -> TokenRange {
        self.scope
    }

    pub fn sentence(&self) -> Option<TokenRange> {
        self.sentence
    }

    pub fn category(&self) -> &str {
        self.rule.category()
    }

    pub fn direction(&self) -> Direction {
        self.rule.direction()
    }

    pub fn allowed_types(&self) -> Option<&BTreeSet<String>> {
        self.rule.allowed_types()
    }

    pub fn excluded_types(&self) -> Option<&BTreeSet<String>> {
        self.rule.excluded_types()
    }

    pub fn max_targets(&self) -> Option<usize> {
        self.rule.max_targets()
    }

    /// Targets currently modified, in the order they were added.
    pub fn targets(&self) -> &[TargetId] {
        &self.targets
    }

    pub fn num_targets(&self) -> usize {
        self.targets.len()
    }

    /// Replace the scope outright.
    pub fn update_scope(&mut self, scope: TokenRange) {
        self.scope = scope;
    }

    /// Let another modifier in the same sentence cut this one's scope.
    ///
    /// Only TERMINATE modifiers, categories listed in `terminated_by`, and
    /// modifiers of the same category (with identical type filters) can cut.
    /// A later modifier cuts the scope end of a forward-looking modifier; an
    /// earlier one cuts the scope start of a backward-looking one. The scope
    /// only ever shrinks. Returns true when it changed.
    pub fn limit_scope(&mut self, other: &Modifier) -> bool {
        if self.sentence != other.sentence {
            return false;
        }
        if self.direction() == Direction::Terminate {
            return false;
        }
        let same_category = other.category() == self.category();
        if other.direction() != Direction::Terminate
            && !self.rule.terminated_by().contains(other.category())
            && !same_category
        {
            return false;
        }
        if same_category
            && (self.allowed_types() != other.allowed_types()
                || self.excluded_types() != other.excluded_types())
        {
            return false;
        }

        let original = self.scope;
        let order = (other.range.start, other.range.end).cmp(&(self.range.start, self.range.end));
        if self.direction().looks_forward() && order.is_gt() {
            self.scope.end = self.scope.end.min(other.range.start).max(self.scope.start);
        }
        if self.direction().looks_backward() && order.is_lt() {
            self.scope.start = self.scope.start.max(other.range.end).min(self.scope.end);
        }
        self.scope != original
    }

    /// Matched tokens and target share a token.
    pub fn overlaps_target(&self, target: &Target) -> bool {
        self.range.overlaps(&target.range)
    }

    /// Does this modifier apply to the target?
    ///
    /// Overlapping targets and TERMINATE/PSEUDO modifiers never qualify. The
    /// target label must pass the type filters and the target's first or
    /// last token must lie in scope; the rule's `on_modifies` callback gets
    /// the final say.
    pub fn modifies(&self, doc: &Document, target: &Target) -> ContextResult<bool> {
        if self.overlaps_target(target) {
            return Ok(false);
        }
        if !self.direction().modifies_targets() {
            return Ok(false);
        }
        if !self.rule.allows(&target.normalized_label()) {
            return Ok(false);
        }
        let in_scope = [target.range.first(), target.range.last()]
            .into_iter()
            .flatten()
            .any(|idx| self.scope.contains(idx));
        if !in_scope {
            return Ok(false);
        }
        match self.rule.on_modifies() {
            None => Ok(true),
            Some(callback) => {
                let between = target.range.between(&self.range);
                callback(doc, target, self.range, between).map_err(|err| ContextError::OnModifies {
                    literal: self.rule.literal().to_string(),
                    message: err.to_string(),
                })
            }
        }
    }

    /// Record a target as modified.
    pub fn modify(&mut self, target: TargetId) {
        self.targets.push(target);
    }

    pub(crate) fn clear_targets(&mut self) {
        self.targets.clear();
    }

    /// Keep only the `max_targets` closest targets.
    ///
    /// Distance is the gap to whichever target edge is nearer; equally
    /// distant targets keep their insertion order.
    pub fn reduce_targets(&mut self, targets: &[Target]) {
        let Some(max) = self.max_targets() else {
            return;
        };
        if self.targets.len() <= max {
            return;
        }
        let range = self.range;
        self.targets.sort_by_key(|id| {
            targets
                .get(id.0)
                .map_or(usize::MAX, |t| range.edge_distance(&t.range))
        });
        self.targets.truncate(max);
    }
}

fn initial_scope(
    direction: Direction,
    max_scope: Option<usize>,
    range: TokenRange,
    bounds: TokenRange,
) -> TokenRange {
    let start = bounds.start.min(range.start);
    let end = bounds.end.max(range.end);
    match direction {
        Direction::Forward => {
            let mut scope = TokenRange::new(range.end, end);
            if let Some(max) = max_scope {
                if scope.len() > max {
                    scope.end = range.end + max;
                }
            }
            scope
        }
        Direction::Backward => {
            let mut scope = TokenRange::new(start, range.start);
            if let Some(max) = max_scope {
                if scope.len() > max {
                    scope.start = range.start - max;
                }
            }
            scope
        }
        Direction::Bidirectional | Direction::Terminate | Direction::Pseudo => {
            let mut scope = TokenRange::new(start, end);
            if let Some(max) = max_scope {
                if range.start - scope.start > max {
                    scope.start = range.start - max;
                }
                if scope.end - range.end > max {
                    scope.end = range.end + max;
                }
            }
            scope
        }
    }
}
