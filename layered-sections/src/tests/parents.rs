use layered_context::Document;

use crate::*;

fn sectionizer(rules: Vec<SectionRule>) -> Sectionizer {
    let mut sectionizer = Sectionizer::new(SectionizerConfig::default()).unwrap();
    sectionizer.add(rules).unwrap();
    sectionizer
}

fn numbered(n: usize) -> SectionRule {
    SectionRule::new(format!("section {}:", n), format!("s{}", n))
}

fn parent_categories(sections: &DocumentSections) -> Vec<Option<&str>> {
    sections
        .sections()
        .iter()
        .map(|s| sections.parent_of(s.id).and_then(|p| p.category.as_deref()))
        .collect()
}

fn pmh_explanation_allergies(explanation_parents: &[&str]) -> Sectionizer {
    sectionizer(vec![
        SectionRule::new("Past Medical History:", "past_medical_history"),
        SectionRule::new("Allergies:", "allergies"),
        SectionRule::new("Explanation:", "explanation").with_parents(explanation_parents.iter().copied()),
    ])
}

#[test]
fn explanation_nests_under_history() {
    let sectionizer = pmh_explanation_allergies(&["past_medical_history"]);
    let doc = Document::from_text("Past Medical History: some other text Explanation: The patient has one");
    let sections = sectionizer.process(&doc);
    assert_eq!(sections.len(), 2);
    assert_eq!(parent_categories(&sections), vec![None, Some("past_medical_history")]);
}

#[test]
fn one_of_several_candidates_is_enough() {
    let sectionizer = pmh_explanation_allergies(&["past_medical_history", "allergies"]);
    let doc = Document::from_text("Past Medical History: some other text. Explanation: The patient has one");
    let sections = sectionizer.process(&doc);
    assert_eq!(parent_categories(&sections), vec![None, Some("past_medical_history")]);
}

#[test]
fn later_candidate_is_not_a_parent() {
    let sectionizer = pmh_explanation_allergies(&["past_medical_history", "allergies"]);
    let doc = Document::from_text(
        "Past Medical History: some other text. Explanation: The patient has one. Allergies: peanuts",
    );
    let sections = sectionizer.process(&doc);
    assert_eq!(
        parent_categories(&sections),
        vec![None, Some("past_medical_history"), None]
    );
}

#[test]
fn repeated_section_finds_its_nearest_parent() {
    let sectionizer = pmh_explanation_allergies(&["past_medical_history", "allergies"]);
    let doc = Document::from_text(
        "Past Medical History: some other text. Explanation: The patient has one. \
         Allergies: peanuts Explanation: pt cannot eat peanuts",
    );
    let sections = sectionizer.process(&doc);
    assert_eq!(
        parent_categories(&sections),
        vec![None, Some("past_medical_history"), None, Some("allergies")]
    );
}

#[test]
fn unrelated_section_blocks_the_parent() {
    let sectionizer = pmh_explanation_allergies(&["past_medical_history"]);
    let doc = Document::from_text(
        "Past Medical History: some other text. Allergies: peanuts Explanation: pt cannot eat peanuts",
    );
    let sections = sectionizer.process(&doc);
    assert_eq!(parent_categories(&sections), vec![None, None, None]);
}

#[test]
fn section_without_required_parent_is_dropped() {
    let sectionizer = sectionizer(vec![
        SectionRule::new("Past Medical History:", "past_medical_history"),
        SectionRule::new("Explanation:", "explanation")
            .with_parents(["past_medical_history"])
            .with_parent_required()
            .unwrap(),
    ]);
    let doc = Document::from_text("other text Explanation: The patient has one");
    let sections = sectionizer.process(&doc);

    assert_eq!(sections.len(), 1);
    let only = &sections.sections()[0];
    assert!(only.is_null());
    assert!(only.parent.is_none());
    assert_eq!(only.body_range, doc.full_range());
}

#[test]
fn dropped_section_extends_the_previous_body() {
    let sectionizer = sectionizer(vec![
        numbered(1),
        SectionRule::new("section break:", "break"),
        numbered(2).with_parents(["s1"]).with_parent_required().unwrap(),
    ]);
    let doc = Document::from_text("section 1: a section break: b section 2: c");
    let sections = sectionizer.process(&doc);

    assert_eq!(sections.categories(), vec![Some("s1"), Some("break")]);
    assert_eq!(sections.bodies(&doc), vec!["a", "b section 2: c"]);
}

#[test]
fn chain_of_parents() {
    let sectionizer = sectionizer(vec![
        numbered(1),
        numbered(2).with_parents(["s1"]),
        numbered(3).with_parents(["s2"]),
    ]);
    let doc = Document::from_text("section 1: abc section 2: abc section 3: abc");
    let sections = sectionizer.process(&doc);
    assert_eq!(parent_categories(&sections), vec![None, Some("s1"), Some("s2")]);
}

#[test]
fn search_walks_past_nested_siblings() {
    let sectionizer = sectionizer(vec![
        numbered(1),
        numbered(2).with_parents(["s1"]),
        numbered(3).with_parents(["s2"]),
        numbered(4).with_parents(["s1"]),
    ]);
    let doc = Document::from_text("section 1: abc section 2: abc section 3: abc section 4: abc");
    let sections = sectionizer.process(&doc);
    assert_eq!(
        parent_categories(&sections),
        vec![None, Some("s1"), Some("s2"), Some("s1")]
    );
}

#[test]
fn search_stops_at_a_root_section() {
    let sectionizer = sectionizer(vec![
        numbered(1),
        numbered(2).with_parents(["s1"]),
        numbered(3).with_parents(["s2"]),
        numbered(4).with_parents(["s1"]),
        SectionRule::new("section break:", "break"),
    ]);
    let doc = Document::from_text(
        "section 1: abc section 2: abc section 3: abc section break: abc section 4: abc",
    );
    let sections = sectionizer.process(&doc);
    assert_eq!(sections.len(), 5);
    assert_eq!(
        parent_categories(&sections),
        vec![None, Some("s1"), Some("s2"), None, None]
    );
}

#[test]
fn parent_ids_account_for_leading_text() {
    let sectionizer = sectionizer(vec![numbered(1), numbered(2).with_parents(["s1"])]);
    let doc = Document::from_text("intro text section 1: abc section 2: abc");
    let sections = sectionizer.process(&doc);

    assert_eq!(sections.categories(), vec![None, Some("s1"), Some("s2")]);
    assert_eq!(sections.sections()[2].parent, Some(SectionId(1)));
    assert_eq!(parent_categories(&sections), vec![None, None, Some("s1")]);
}

#[test_log::test]
fn duplicate_categories_merge_parents() {
    let sectionizer = sectionizer(vec![
        numbered(1),
        numbered(2).with_parents(["s1"]),
        numbered(2).with_parents(["s3"]),
        numbered(3),
    ]);
    assert_eq!(
        sectionizer.warnings(),
        &[SectionWarning::MergedParents {
            category: "s2".to_string()
        }]
    );
    assert!(sectionizer.warnings()[0].to_string().contains("duplicate section category"));
    let parents: Vec<&str> = sectionizer
        .parents_of("s2")
        .unwrap()
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(parents, vec!["s1", "s3"]);

    let doc = Document::from_text("section 1: abc section 2: abc section 3: abc section 2: abc");
    let sections = sectionizer.process(&doc);
    assert_eq!(sections.len(), 4);
    assert_eq!(
        parent_categories(&sections),
        vec![None, Some("s1"), None, Some("s3")]
    );
}

#[test_log::test]
fn conflicting_parent_required_becomes_optional() {
    let sectionizer = sectionizer(vec![
        numbered(1),
        numbered(2).with_parents(["s1"]).with_parent_required().unwrap(),
        SectionRule::new("part 2:", "s2"),
    ]);
    assert!(!sectionizer.parent_required("s2"));
    assert!(sectionizer
        .warnings()
        .contains(&SectionWarning::ConflictingParentRequired {
            category: "s2".to_string()
        }));

    let doc = Document::from_text("other text section 2: abc");
    let sections = sectionizer.process(&doc);
    assert_eq!(sections.categories(), vec![None, Some("s2")]);
}
