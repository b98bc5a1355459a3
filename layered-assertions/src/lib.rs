#![doc(
    html_logo_url = "https://raw.githubusercontent.com/storyscript/layered-nlp/main/assets/layered-nlp.svg",
    issue_tracker_base_url = "https://github.com/storyscript/layered-nlp/issues/"
)]

//! Contextual assertions for target spans: negation, uncertainty, history,
//! hypothetical status and family association.
//!
//! Modifier phrases ("no evidence of", "history of", "but") are matched in a
//! document, given a scope, cut back by each other and finally applied to the
//! targets inside their scope:
//!
//! - [`ModifierRule`] / [`Direction`] - What a modifier phrase is and where it looks
//! - [`Modifier`] - One matched rule with its scope and targets
//! - [`ModifierGraph`] - Scope limiting, target application and edges
//! - [`ContextComponent`] - Matching through attribute projection for one document
//! - [`GraphSnapshot`] / [`GraphDisplay`] - Serializable and printable views
//!
//! ## Example
//!
//! ```
//! use layered_assertions::{ContextComponent, ContextConfig};
//! use layered_context::{Document, SentenceSplitter, Target, TargetId};
//!
//! let component = ContextComponent::with_default_rules(ContextConfig::default()).unwrap();
//! let doc = Document::from_text("There is no evidence of pneumonia.")
//!     .segment_sentences(&SentenceSplitter::new());
//!
//! let output = component.process(&doc, vec![Target::new(5, 6, "PROBLEM")]).unwrap();
//! assert!(output.attributes[0].is_negated());
//! assert_eq!(output.modifiers_for(TargetId(0))[0].rule().literal(), "no evidence of");
//! ```

mod component;
mod direction;
mod display;
mod errors;
mod graph;
mod modifier;
mod modifier_rule;
mod snapshot;

pub use component::{ContextComponent, ContextConfig, ContextOutput, SpanAttrs};
pub use direction::Direction;
pub use display::GraphDisplay;
pub use errors::{ContextError, ContextResult};
pub use graph::{Edge, ModifierGraph, ModifierId};
pub use modifier::{Modifier, ScopeMode};
pub use modifier_rule::{CallbackError, ModifierRule, ModifierRuleBuilder, ModifierRuleRecord, OnModifies};
pub use snapshot::{GraphSnapshot, ModifierSnapshot, TargetSnapshot};

#[cfg(test)]
mod tests {
    mod pipeline;
    mod properties;
    mod scenarios;
}
