use layered_context::{Document, RuleId, TokenRange};
use serde::{Deserialize, Serialize};

/// Position of a section in [`DocumentSections::sections`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionId(pub usize);

/// A titled region of a document.
///
/// The title is the matched header; the body runs from the end of the title
/// to the next header, the end of the document or the scope limit. A section
/// without a category covers text before the first header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub id: SectionId,
    pub category: Option<String>,
    pub title_range: TokenRange,
    pub body_range: TokenRange,
    pub parent: Option<SectionId>,
    /// Header rule that opened the section
    pub rule: Option<RuleId>,
}

impl Section {
    /// Title and body together.
    pub fn section_range(&self) -> TokenRange {
        TokenRange::new(self.title_range.start, self.body_range.end)
    }

    pub fn is_null(&self) -> bool {
        self.category.is_none()
    }
}

/// The sections of one document plus the token → section side table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentSections {
    sections: Vec<Section>,
    token_sections: Vec<Option<SectionId>>,
}

impl DocumentSections {
    pub(crate) fn new(sections: Vec<Section>, token_count: usize) -> Self {
        let mut token_sections = vec![None; token_count];
        for section in &sections {
            let range = section.section_range();
            let end = range.end.min(token_count);
            for slot in token_sections.iter_mut().take(end).skip(range.start) {
                *slot = Some(section.id);
            }
        }
        DocumentSections {
            sections,
            token_sections,
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Section covering token `idx`; tokens past a scope limit have none.
    pub fn section_of_token(&self, idx: usize) -> Option<&Section> {
        let id = (*self.token_sections.get(idx)?)?;
        self.section(id)
    }

    /// Section of the first token of `range`.
    pub fn section_of_span(&self, range: TokenRange) -> Option<&Section> {
        self.section_of_token(range.first()?)
    }

    pub fn parent_of(&self, id: SectionId) -> Option<&Section> {
        self.section(self.section(id)?.parent?)
    }

    pub fn categories(&self) -> Vec<Option<&str>> {
        self.sections.iter().map(|s| s.category.as_deref()).collect()
    }

    pub fn titles<'d>(&self, doc: &'d Document) -> Vec<&'d str> {
        self.sections.iter().map(|s| doc.text_of(s.title_range)).collect()
    }

    pub fn bodies<'d>(&self, doc: &'d Document) -> Vec<&'d str> {
        self.sections.iter().map(|s| doc.text_of(s.body_range)).collect()
    }

    pub fn snapshot(&self, doc: &Document) -> SectionsSnapshot {
        SectionsSnapshot {
            sections: self
                .sections
                .iter()
                .map(|s| SectionSnapshot {
                    category: s.category.clone(),
                    title: s.title_range,
                    body: s.body_range,
                    parent: s.parent.map(|p| p.0),
                    title_text: doc.text_of(s.title_range).to_string(),
                })
                .collect(),
        }
    }
}

/// Serializable view of one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSnapshot {
    pub category: Option<String>,
    pub title: TokenRange,
    pub body: TokenRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
    pub title_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionsSnapshot {
    pub sections: Vec<SectionSnapshot>,
}

impl SectionsSnapshot {
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default().depth_limit(3))
    }

    pub fn from_ron_string(ron: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(ron)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: usize, title: (usize, usize), body: (usize, usize)) -> Section {
        Section {
            id: SectionId(id),
            category: Some(format!("s{}", id)),
            title_range: TokenRange::new(title.0, title.1),
            body_range: TokenRange::new(body.0, body.1),
            parent: None,
            rule: Some(RuleId(id)),
        }
    }

    #[test]
    fn test_tokens_point_at_their_section() {
        let sections = DocumentSections::new(vec![section(0, (0, 2), (2, 4)), section(1, (5, 6), (6, 7))], 8);
        assert_eq!(sections.section_of_token(3).map(|s| s.id), Some(SectionId(0)));
        assert!(sections.section_of_token(4).is_none());
        assert_eq!(sections.section_of_token(5).map(|s| s.id), Some(SectionId(1)));
        assert!(sections.section_of_token(7).is_none());
        assert!(sections.section_of_token(99).is_none());
        assert_eq!(
            sections.section_of_span(TokenRange::new(1, 6)).map(|s| s.id),
            Some(SectionId(0))
        );
        assert!(sections.section_of_span(TokenRange::empty(1)).is_none());
    }

    #[test]
    fn test_snapshot_ron_round_trip() {
        let doc = Document::from_text("Allergies: none");
        let mut child = section(1, (2, 2), (2, 3));
        child.parent = Some(SectionId(0));
        let sections = DocumentSections::new(vec![section(0, (0, 2), (2, 2)), child], doc.len());

        let snapshot = sections.snapshot(&doc);
        assert_eq!(snapshot.sections[0].title_text, "Allergies:");
        let ron = snapshot.to_ron_string().unwrap();
        assert_eq!(SectionsSnapshot::from_ron_string(&ron).unwrap(), snapshot);
    }
}
