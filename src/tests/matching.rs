use std::sync::Arc;

use crate::*;

fn rules() -> Vec<TargetRule> {
    vec![
        TargetRule::new("history of", "HISTORICAL"),
        TargetRule::new("no history of", "NEGATED_EXISTENCE"),
        TargetRule::new("afib", "PROBLEM").with_pattern(RulePattern::Tokens(vec![TokenSpec {
            lower: Some(StrPredicate::In {
                values: vec!["afib".to_string(), "af".to_string()],
            }),
            ..Default::default()
        }])),
        TargetRule::new("r/o", "POSSIBLE_EXISTENCE")
            .with_pattern(RulePattern::Regex(r"r/o\b".to_string())),
    ]
}

#[test]
fn longest_modifier_wins_when_pruning() {
    let mut matcher = UnifiedMatcher::new(MatchAttr::Lower);
    matcher.add(rules()).unwrap();
    let doc = Document::from_text("No history of AF, r/o pna");

    let found: Vec<(&str, &str)> = matcher
        .find(&doc)
        .iter()
        .map(|m| (matcher.rule(m.rule).map(|r| r.literal()).unwrap_or(""), doc.text_of(m.range)))
        .collect();
    assert_eq!(
        found,
        vec![
            ("no history of", "No history of"),
            ("afib", "AF"),
            ("r/o", "r/o"),
        ]
    );
}

#[test]
fn matched_ranges() {
    let mut matcher = UnifiedMatcher::new(MatchAttr::Lower);
    matcher.add(rules()).unwrap();
    let doc = Document::from_text("No history of AF, r/o pna");

    let rendered: Vec<String> = matcher
        .find(&doc)
        .iter()
        .map(|m| format!("{} {}", matcher.rules()[m.rule.0].category, m.range))
        .collect();
    insta::assert_snapshot!(rendered.join("\n"), @r###"
    NEGATED_EXISTENCE [0, 3)
    PROBLEM [3, 4)
    POSSIBLE_EXISTENCE [5, 8)
    "###);
}

#[test]
fn unpruned_keeps_backend_order() {
    let mut matcher = UnifiedMatcher::new(MatchAttr::Lower).with_prune(false);
    matcher.add(rules()).unwrap();
    let doc = Document::from_text("No history of AF, r/o pna");

    let ids: Vec<usize> = matcher.find(&doc).iter().map(|m| m.rule.0).collect();
    // token patterns, then phrases by position, then regexes
    assert_eq!(ids, vec![2, 1, 0, 3]);
}

#[test]
fn failed_registration_adds_nothing() {
    let mut matcher: UnifiedMatcher<TargetRule> = UnifiedMatcher::new(MatchAttr::Lower);
    let result = matcher.add(vec![
        TargetRule::new("fine", "A"),
        TargetRule::new("broken", "B").with_pattern(RulePattern::Regex("(".to_string())),
    ]);
    assert!(matches!(result, Err(ConfigError::InvalidPattern { .. })));
    assert!(matcher.is_empty());
    let doc = Document::from_text("fine");
    assert!(matcher.find(&doc).is_empty());
}

#[test]
fn categories_are_distinct() {
    let mut matcher = UnifiedMatcher::new(MatchAttr::Lower);
    matcher.add(rules()).unwrap();
    matcher.add(vec![TargetRule::new("pmh", "HISTORICAL")]).unwrap();
    let categories: Vec<String> = matcher.categories().into_iter().collect();
    assert_eq!(
        categories,
        vec!["HISTORICAL", "NEGATED_EXISTENCE", "POSSIBLE_EXISTENCE", "PROBLEM"]
    );
    assert_eq!(matcher.rule(RuleId(4)).map(Rule::literal), Some("pmh"));
}

#[test]
fn matching_inside_a_sentence() {
    let mut matcher = UnifiedMatcher::new(MatchAttr::Lower);
    matcher.add(vec![TargetRule::new("no", "NEGATED_EXISTENCE")]).unwrap();
    let doc = Document::from_text("No cough. No fever.").segment_sentences(&SentenceSplitter::new());
    let second = doc.sentences().unwrap()[1];
    let found = matcher.find_in(&doc, second);
    assert_eq!(found, vec![Match::new(RuleId(0), 3, 4)]);
}

#[test]
fn on_match_sees_document() {
    let followed_by_digit: OnMatch = Arc::new(|doc: &Document, range: TokenRange| {
        doc.token(range.end).map_or(false, Token::is_digit)
    });
    let mut matcher = UnifiedMatcher::new(MatchAttr::Lower);
    matcher
        .add(vec![TargetRule::new("grade", "SEVERITY").with_on_match(followed_by_digit)])
        .unwrap();
    let doc = Document::from_text("grade 2 , grade unknown");
    assert_eq!(matcher.find(&doc), vec![Match::new(RuleId(0), 0, 1)]);
}
