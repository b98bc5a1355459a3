#![doc(
    html_logo_url = "https://raw.githubusercontent.com/storyscript/layered-nlp/main/assets/layered-nlp.svg",
    issue_tracker_base_url = "https://github.com/storyscript/layered-nlp/issues/"
)]

//! Section detection for clinical notes.
//!
//! Header rules such as "Past Medical History:" split a document into
//! sections. Headers may name parent categories, giving nested sections, and
//! targets can inherit attributes from the section they appear in.
//!
//! ## Example
//!
//! ```
//! use layered_context::Document;
//! use layered_sections::{SectionRule, Sectionizer, SectionizerConfig};
//!
//! let mut sectionizer = Sectionizer::new(SectionizerConfig::default()).unwrap();
//! sectionizer
//!     .add(vec![SectionRule::new("Past Medical History:", "past_medical_history")])
//!     .unwrap();
//!
//! let doc = Document::from_text("Past Medical History: CHF");
//! let sections = sectionizer.process(&doc);
//! assert_eq!(sections.categories(), vec![Some("past_medical_history")]);
//! assert_eq!(sections.bodies(&doc), vec!["CHF"]);
//! ```

mod section;
mod section_rule;
mod sectionizer;

pub use section::{DocumentSections, Section, SectionId, SectionSnapshot, SectionsSnapshot};
pub use section_rule::{SectionRule, SectionRuleRecord};
pub use sectionizer::{
    default_section_attributes, ResolvedHeader, SectionAttrs, SectionWarning, Sectionizer,
    SectionizerConfig, DEFAULT_NEWLINE_PATTERN,
};
