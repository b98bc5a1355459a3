//! The per-document modifier graph.
//!
//! Resolution runs in two passes over fresh state:
//!
//! 1. [`ModifierGraph::update_scopes`] lets every pair of modifiers cut each
//!    other's scope.
//! 2. [`ModifierGraph::apply_modifiers`] decides which modifier applies to
//!    which target, caps each modifier's target list and emits the edges.
//!
//! Targets and modifiers are addressed by position ([`TargetId`],
//! [`ModifierId`]); the target → modifiers back-reference is a side table.

use layered_context::{AttributeMapping, Document, SpanAttributes, Target, TargetId};
use serde::{Deserialize, Serialize};

use crate::{ContextResult, GraphSnapshot, Modifier};

/// Position of a modifier in [`ModifierGraph::modifiers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModifierId(pub usize);

/// The modifier applies to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub target: TargetId,
    pub modifier: ModifierId,
}

#[derive(Debug, Clone)]
pub struct ModifierGraph {
    targets: Vec<Target>,
    modifiers: Vec<Modifier>,
    edges: Vec<Edge>,
    target_modifiers: Vec<Vec<ModifierId>>,
    prune_on_target_overlap: bool,
}

impl ModifierGraph {
    /// Targets keep the caller's order; modifiers keep matcher order.
    pub fn new(targets: Vec<Target>, modifiers: Vec<Modifier>) -> Self {
        let target_modifiers = vec![Vec::new(); targets.len()];
        Self {
            targets,
            modifiers,
            edges: Vec::new(),
            target_modifiers,
            prune_on_target_overlap: false,
        }
    }

    /// Drop modifiers whose match overlaps a target before edges are built.
    pub fn with_target_overlap_pruning(mut self, prune: bool) -> Self {
        self.prune_on_target_overlap = prune;
        self
    }

    /// Limit every unordered pair of modifiers against each other.
    ///
    /// Scopes only shrink.
    pub fn update_scopes(&mut self) {
        let n = self.modifiers.len();
        for i in 0..n {
            let (head, tail) = self.modifiers.split_at_mut(i + 1);
            let current = &mut head[i];
            for other in tail.iter_mut() {
                current.limit_scope(other);
                other.limit_scope(current);
            }
        }
    }

    /// Build the edge list.
    ///
    /// Every applicability test runs before any state changes, so a failing
    /// `on_modifies` callback leaves the graph as it was. Running this again
    /// reproduces the same edges.
    pub fn apply_modifiers(&mut self, doc: &Document) -> ContextResult<()> {
        if self.prune_on_target_overlap {
            self.prune_target_overlaps();
        }

        let mut accepted: Vec<Vec<TargetId>> = vec![Vec::new(); self.modifiers.len()];
        for (t, target) in self.targets.iter().enumerate() {
            for (m, modifier) in self.modifiers.iter().enumerate() {
                if modifier.modifies(doc, target)? {
                    accepted[m].push(TargetId(t));
                }
            }
        }

        let mut edges = Vec::new();
        let mut target_modifiers = vec![Vec::new(); self.targets.len()];
        for (m, (modifier, ids)) in self.modifiers.iter_mut().zip(accepted).enumerate() {
            modifier.clear_targets();
            for id in ids {
                modifier.modify(id);
            }
            modifier.reduce_targets(&self.targets);
            for &target in modifier.targets() {
                edges.push(Edge {
                    target,
                    modifier: ModifierId(m),
                });
                target_modifiers[target.0].push(ModifierId(m));
            }
        }

        self.edges = edges;
        self.target_modifiers = target_modifiers;
        tracing::debug!(
            targets = self.targets.len(),
            modifiers = self.modifiers.len(),
            edges = self.edges.len(),
            "applied modifiers"
        );
        Ok(())
    }

    /// [`update_scopes`](Self::update_scopes) then
    /// [`apply_modifiers`](Self::apply_modifiers).
    pub fn resolve(&mut self, doc: &Document) -> ContextResult<()> {
        self.update_scopes();
        self.apply_modifiers(doc)
    }

    fn prune_target_overlaps(&mut self) {
        let targets = &self.targets;
        let before = self.modifiers.len();
        self.modifiers
            .retain(|modifier| !targets.iter().any(|t| modifier.overlaps_target(t)));
        if self.modifiers.len() != before {
            tracing::debug!(
                removed = before - self.modifiers.len(),
                "pruned modifiers overlapping targets"
            );
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn target(&self, id: TargetId) -> Option<&Target> {
        self.targets.get(id.0)
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn modifier(&self, id: ModifierId) -> Option<&Modifier> {
        self.modifiers.get(id.0)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Ids of the modifiers applying to a target, ascending.
    pub fn modifier_ids_for(&self, target: TargetId) -> &[ModifierId] {
        self.target_modifiers
            .get(target.0)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Modifiers applying to a target.
    pub fn modifiers_for(&self, target: TargetId) -> impl Iterator<Item = &Modifier> + '_ {
        self.modifier_ids_for(target)
            .iter()
            .filter_map(move |id| self.modifiers.get(id.0))
    }

    /// Targets a modifier applies to, closest first when capped.
    pub fn targets_of(&self, modifier: ModifierId) -> &[TargetId] {
        self.modifiers
            .get(modifier.0)
            .map(Modifier::targets)
            .unwrap_or(&[])
    }

    /// Project the edges onto one attribute set per target.
    ///
    /// Every target starts from `mapping.empty_attributes()`; each applying
    /// modifier's category then turns its attributes on.
    pub fn attributes(&self, mapping: &AttributeMapping) -> Vec<SpanAttributes> {
        self.target_modifiers
            .iter()
            .map(|ids| {
                let mut attrs = mapping.empty_attributes();
                for id in ids {
                    if let Some(modifier) = self.modifiers.get(id.0) {
                        mapping.apply(modifier.category(), &mut attrs);
                    }
                }
                attrs
            })
            .collect()
    }

    pub fn snapshot(&self, doc: &Document) -> GraphSnapshot {
        GraphSnapshot::new(self, doc)
    }
}
