use std::collections::BTreeMap;

use layered_context::{Document, RulePattern, SpanAttributes, Target, TokenRange, TokenSpec};

use crate::*;

fn pmh_sectionizer(config: SectionizerConfig) -> Sectionizer {
    let mut sectionizer = Sectionizer::new(config).unwrap();
    sectionizer
        .add(vec![SectionRule::new("Past Medical History:", "past_medical_history")])
        .unwrap();
    sectionizer
}

fn render(sections: &DocumentSections, doc: &Document) -> String {
    sections
        .sections()
        .iter()
        .map(|s| {
            format!(
                "{} {} {:?} -> {:?}",
                s.category.as_deref().unwrap_or("-"),
                s.title_range,
                doc.text_of(s.title_range),
                doc.text_of(s.body_range)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn single_header_covers_the_rest() {
    let sectionizer = pmh_sectionizer(SectionizerConfig::default());
    let doc = Document::from_text("Past Medical History: CHF stable");
    let sections = sectionizer.process(&doc);

    assert_eq!(sections.len(), 1);
    let pmh = &sections.sections()[0];
    assert_eq!(pmh.category.as_deref(), Some("past_medical_history"));
    assert_eq!(pmh.title_range, TokenRange::new(0, 4));
    assert_eq!(pmh.body_range, TokenRange::new(4, 6));
    assert_eq!(pmh.section_range(), doc.full_range());
    assert!(pmh.parent.is_none());
    assert_eq!(
        sectionizer.rule(pmh.rule.unwrap()).map(|r| r.literal()),
        Some("Past Medical History:")
    );
    assert_eq!(sections.titles(&doc), vec!["Past Medical History:"]);
    assert_eq!(sections.bodies(&doc), vec!["CHF stable"]);
    assert_eq!(sections.section_of_token(5).map(|s| s.id), Some(SectionId(0)));
}

#[test]
fn reprocessing_starts_fresh() {
    let sectionizer = pmh_sectionizer(SectionizerConfig::default());
    let doc = Document::from_text("Past Medical History: PE");
    assert_eq!(sectionizer.process(&doc).len(), 1);
    assert_eq!(sectionizer.process(&doc).len(), 1);
}

#[test]
fn token_pattern_header() {
    let mut sectionizer = Sectionizer::new(SectionizerConfig::default()).unwrap();
    let pattern = vec![
        TokenSpec::lower("past"),
        TokenSpec::lower("medical"),
        TokenSpec::lower("history"),
        TokenSpec::lower(":"),
    ];
    sectionizer
        .add(vec![SectionRule::new("past medical history:", "past_medical_history")
            .with_pattern(RulePattern::Tokens(pattern))])
        .unwrap();
    let doc = Document::from_text("Past Medical History: PE");
    let sections = sectionizer.process(&doc);
    assert_eq!(sections.titles(&doc), vec!["Past Medical History:"]);
    assert_eq!(doc.text_of(sections.sections()[0].section_range()), "Past Medical History: PE");
}

#[test]
fn text_before_first_header_is_a_null_section() {
    let sectionizer = pmh_sectionizer(SectionizerConfig::default());
    let doc = Document::from_text("This is separate. Past Medical History: PE");
    let sections = sectionizer.process(&doc);

    assert_eq!(sections.categories(), vec![None, Some("past_medical_history")]);
    let lead = &sections.sections()[0];
    assert_eq!(lead.title_range, TokenRange::empty(0));
    assert_eq!(doc.text_of(lead.section_range()), "This is separate.");
    assert!(lead.rule.is_none());
    assert_eq!(doc.text_of(sections.sections()[1].section_range()), "Past Medical History: PE");
}

#[test]
fn no_headers_gives_one_null_section() {
    let sectionizer = pmh_sectionizer(SectionizerConfig::default());
    let doc = Document::from_text("Nothing to see here");
    let sections = sectionizer.process(&doc);

    assert_eq!(sections.len(), 1);
    assert!(sections.sections()[0].is_null());
    assert_eq!(sections.sections()[0].body_range, TokenRange::new(0, 4));
    assert!(sections.section_of_token(3).unwrap().is_null());
}

#[test]
fn header_at_end_has_empty_body() {
    let sectionizer = pmh_sectionizer(SectionizerConfig::default());
    let doc = Document::from_text("Start of doc\nPast Medical History:");
    let sections = sectionizer.process(&doc);
    let last = sections.section_of_token(doc.len() - 1).unwrap();
    assert_eq!(last.category.as_deref(), Some("past_medical_history"));
    assert!(last.body_range.is_empty());
    assert_eq!(last.title_range.start, 3);
}

#[test]
fn max_section_length_clips_the_body() {
    let sectionizer = pmh_sectionizer(SectionizerConfig {
        max_section_length: Some(2),
        ..SectionizerConfig::default()
    });
    let doc = Document::from_text("Past Medical History: This is the sentence.");
    let sections = sectionizer.process(&doc);

    assert_eq!(
        sections.section_of_token(5).and_then(|s| s.category.as_deref()),
        Some("past_medical_history")
    );
    assert!(sections.section_of_token(doc.len() - 1).is_none());
    assert_eq!(sections.bodies(&doc), vec!["This is"]);
}

#[test]
fn unlimited_body_reaches_document_end() {
    let sectionizer = pmh_sectionizer(SectionizerConfig::default());
    let doc = Document::from_text("Past Medical History: This is the sentence.");
    let sections = sectionizer.process(&doc);
    assert_eq!(
        sections.section_of_token(doc.len() - 1).and_then(|s| s.category.as_deref()),
        Some("past_medical_history")
    );
}

#[test]
fn rule_max_scope_beats_section_length() {
    let mut sectionizer = Sectionizer::new(SectionizerConfig {
        max_section_length: Some(2),
        ..SectionizerConfig::default()
    })
    .unwrap();
    sectionizer
        .add(vec![SectionRule::new("Past Medical History:", "past_medical_history")
            .with_max_scope(100)
            .unwrap()])
        .unwrap();
    let doc = Document::from_text("Past Medical History: This is the sentence.");
    let sections = sectionizer.process(&doc);

    let last = sections.section_of_token(doc.len() - 1).unwrap();
    assert_eq!(last.category.as_deref(), Some("past_medical_history"));
    assert!(last.section_range().contains(doc.len() - 1));
}

#[test]
fn rule_max_scope_stops_before_next_header() {
    let mut sectionizer = Sectionizer::new(SectionizerConfig::default()).unwrap();
    sectionizer
        .add(vec![
            SectionRule::new("Allergies:", "allergies").with_max_scope(1).unwrap(),
            SectionRule::new("Plan:", "assessment_and_plan"),
        ])
        .unwrap();
    let doc = Document::from_text("Allergies: peanuts and shellfish Plan: rest");
    let sections = sectionizer.process(&doc);
    assert_eq!(sections.bodies(&doc), vec!["peanuts", "rest"]);
    assert!(sections.section_of_token(3).is_none());
}

#[test]
fn headers_must_start_a_line() {
    let sectionizer = pmh_sectionizer(SectionizerConfig {
        require_start_line: true,
        ..SectionizerConfig::default()
    });
    let doc = Document::from_text("Intro\n\n Past Medical History: The patient has a Past Medical History:");
    let sections = sectionizer.process(&doc);
    assert_eq!(sections.categories(), vec![None, Some("past_medical_history")]);
    assert_eq!(
        sections.bodies(&doc)[1],
        "The patient has a Past Medical History:"
    );
}

#[test]
fn headers_must_end_a_line() {
    let sectionizer = pmh_sectionizer(SectionizerConfig {
        require_end_line: true,
        ..SectionizerConfig::default()
    });
    let doc = Document::from_text(
        "Intro\n\n Past Medical History:\n The patient has a Past Medical History: this",
    );
    let sections = sectionizer.process(&doc);
    assert_eq!(sections.len(), 2);
    assert_eq!(sections.sections()[1].title_range, TokenRange::new(1, 5));
}

#[test]
fn section_categories_are_sorted() {
    let mut sectionizer = Sectionizer::new(SectionizerConfig::default()).unwrap();
    sectionizer
        .add(vec![
            SectionRule::new("Plan:", "assessment_and_plan"),
            SectionRule::new("Past Medical History:", "past_medical_history"),
            SectionRule::new("PMH:", "past_medical_history"),
        ])
        .unwrap();
    let categories: Vec<String> = sectionizer.section_categories().into_iter().collect();
    assert_eq!(categories, vec!["assessment_and_plan", "past_medical_history"]);
}

#[test]
fn custom_attributes_follow_the_section() {
    let mut table = BTreeMap::new();
    table.insert(
        "past_medical_history".to_string(),
        BTreeMap::from([("is_historical".to_string(), true)]),
    );
    let sectionizer = pmh_sectionizer(SectionizerConfig {
        add_attrs: SectionAttrs::Custom(table),
        ..SectionizerConfig::default()
    });
    let doc = Document::from_text("Cough today. Past Medical History: Pneumonia, stroke, and cancer");
    // Cough today . | Past Medical History : | Pneumonia , stroke , and cancer
    let targets = vec![Target::new(0, 1, "CONDITION"), Target::new(7, 8, "CONDITION")];
    let sections = sectionizer.process(&doc);

    let attributes = sectionizer.attributes(&sections, &targets);
    assert!(!attributes[0].is_historical());
    assert!(attributes[1].is_historical());
}

#[test]
fn default_attributes_mark_family_and_instructions() {
    let sectionizer = Sectionizer::with_default_rules(SectionizerConfig {
        add_attrs: SectionAttrs::Default,
        ..SectionizerConfig::default()
    })
    .unwrap();
    let doc = Document::from_text("Family History: diabetes\nPatient Instructions: call if fever");
    let sections = sectionizer.process(&doc);
    let target_tokens = [3, 9];
    let targets: Vec<Target> = target_tokens
        .iter()
        .map(|&i| Target::new(i, i + 1, "PROBLEM"))
        .collect();
    assert_eq!(doc.text_of(targets[0].range), "diabetes");
    assert_eq!(doc.text_of(targets[1].range), "fever");

    let attributes = sectionizer.attributes(&sections, &targets);
    assert!(attributes[0].is_family());
    assert!(!attributes[0].is_hypothetical());
    assert!(attributes[1].is_hypothetical());
}

#[test]
fn disabled_attributes_leave_existing_values() {
    let sectionizer = pmh_sectionizer(SectionizerConfig::default());
    let doc = Document::from_text("Past Medical History: CHF");
    let sections = sectionizer.process(&doc);
    let targets = vec![Target::new(4, 5, "PROBLEM")];

    let mut existing = vec![SpanAttributes::with_defaults()];
    existing[0].assign("is_negated", true);
    sectionizer.apply_attributes(&sections, &targets, &mut existing);
    assert!(existing[0].is_negated());
    assert!(!existing[0].is_historical());
}

#[test]
fn default_rules_split_a_note() {
    let sectionizer = Sectionizer::with_default_rules(SectionizerConfig::default()).unwrap();
    let doc = Document::from_text("Chief Complaint: cough\nHPI: 3 days\nPlan: rest");
    let sections = sectionizer.process(&doc);
    insta::assert_snapshot!(render(&sections, &doc), @r###"
    chief_complaint [0, 3) "Chief Complaint:" -> "cough"
    history_of_present_illness [4, 6) "HPI:" -> "3 days"
    assessment_and_plan [8, 10) "Plan:" -> "rest"
    "###);
}

#[test]
fn config_and_rules_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("sectionizer.toml");
    std::fs::write(&config_path, "max_section_length = 1\nadd_attrs = \"default\"\n").unwrap();
    let rules_path = dir.path().join("section_rules.json");
    std::fs::write(
        &rules_path,
        r#"{"section_rules": [
            {"literal": "Medical History:", "category": "past_medical_history"},
            {"literal": "Note:", "category": "note", "parents": ["past_medical_history"], "max_scope": 3}
        ]}"#,
    )
    .unwrap();

    let config = SectionizerConfig::from_toml_file(&config_path).unwrap();
    let mut sectionizer = Sectionizer::new(config).unwrap();
    sectionizer.add(SectionRule::from_json_file(&rules_path).unwrap()).unwrap();

    let doc = Document::from_text("Medical History: asthma since childhood Note: seen by pulmonology last year");
    let sections = sectionizer.process(&doc);
    assert_eq!(sections.bodies(&doc), vec!["asthma", "seen by pulmonology"]);
    assert_eq!(
        sections.parent_of(SectionId(1)).and_then(|s| s.category.as_deref()),
        Some("past_medical_history")
    );

    let attributes = sectionizer.attributes(&sections, &[Target::new(3, 4, "PROBLEM")]);
    assert!(attributes[0].is_historical());
}

#[test]
fn missing_config_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SectionizerConfig::from_toml_file(&dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, layered_context::ConfigError::Io { .. }));
}

#[test]
fn snapshot_in_ron() {
    let sectionizer = pmh_sectionizer(SectionizerConfig::default());
    let doc = Document::from_text("Intro. Past Medical History: CHF");
    let snapshot = sectionizer.process(&doc).snapshot(&doc);
    assert_eq!(snapshot.sections.len(), 2);
    assert_eq!(snapshot.sections[1].title_text, "Past Medical History:");

    let ron = snapshot.to_ron_string().unwrap();
    assert!(ron.contains("past_medical_history"));
    assert_eq!(SectionsSnapshot::from_ron_string(&ron).unwrap(), snapshot);
}
