use std::collections::HashMap;
use std::fmt::Write;

use layered_context::{Document, TokenRange};
use unicode_width::UnicodeWidthStr;

use crate::ModifierGraph;

/// Convert a zero-based index to a base-26 label: A, B, ..., Z, AA, AB, ...
fn index_to_base26_label(mut n: usize) -> String {
    let mut result = String::new();
    loop {
        let remainder = n % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Text rendering of a resolved graph.
///
/// The first line is the document's tokens; below it every target and then
/// every modifier is underlined. Targets that receive an edge get a label
/// (`[A]`, `[B]`, ...) and each modifier lists the targets it modifies:
///
/// ```text
/// no  cough  but  fever
///     ╰───╯[A] PROBLEM
///                 ╰───╯PROBLEM
/// ╰╯NEGATED_EXISTENCE FORWARD [1, 2)
///   └─modifies─>[A]
///            ╰─╯CONJ TERMINATE [0, 4)
/// ```
pub struct GraphDisplay<'a> {
    doc: &'a Document,
    graph: &'a ModifierGraph,
    show_scopes: bool,
}

impl<'a> GraphDisplay<'a> {
    pub fn new(doc: &'a Document, graph: &'a ModifierGraph) -> Self {
        GraphDisplay {
            doc,
            graph,
            show_scopes: true,
        }
    }

    /// Takes self
    pub fn with_scopes(mut self, show: bool) -> Self {
        self.show_scopes = show;
        self
    }

    /// Labels for the targets some modifier points at, in target order.
    fn target_labels(&self) -> HashMap<usize, String> {
        let mut referenced: Vec<usize> = self.graph.edges().iter().map(|e| e.target.0).collect();
        referenced.sort_unstable();
        referenced.dedup();
        referenced
            .into_iter()
            .enumerate()
            .map(|(i, target)| (target, format!("[{}]", index_to_base26_label(i))))
            .collect()
    }
}

fn underline(
    f: &mut std::fmt::Formatter<'_>,
    starts: &[usize],
    ends: &[usize],
    range: TokenRange,
) -> Result<Option<usize>, std::fmt::Error> {
    let (Some(first), Some(last)) = (range.first(), range.last()) else {
        return Ok(None);
    };
    let (Some(&start_char_idx), Some(&end_char_idx)) = (starts.get(first), ends.get(last)) else {
        return Ok(None);
    };
    f.write_char('\n')?;
    for _ in 0..start_char_idx {
        f.write_char(' ')?;
    }
    f.write_char('╰')?;
    let char_len = end_char_idx - start_char_idx;
    for _ in (start_char_idx + 1)..end_char_idx.saturating_sub(1) {
        f.write_char('─')?;
    }
    if char_len > 1 {
        f.write_char('╯')?;
    }
    Ok(Some(start_char_idx))
}

impl<'a> std::fmt::Display for GraphDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const SPACE_PADDING: usize = 2;
        let mut token_idx_to_start_display_char_idx = Vec::new();
        let mut token_idx_to_end_display_char_idx = Vec::new();
        let mut opening_line = String::new();
        for (i, token) in self.doc.tokens().iter().enumerate() {
            if i > 0 {
                opening_line.extend(std::iter::repeat(' ').take(SPACE_PADDING));
            }
            token_idx_to_start_display_char_idx.push(UnicodeWidthStr::width(&*opening_line));
            opening_line.push_str(token.text());
            token_idx_to_end_display_char_idx.push(UnicodeWidthStr::width(&*opening_line));
        }
        f.write_str(&opening_line)?;

        let starts = &token_idx_to_start_display_char_idx;
        let ends = &token_idx_to_end_display_char_idx;
        let labels = self.target_labels();

        for (i, target) in self.graph.targets().iter().enumerate() {
            if underline(f, starts, ends, target.range)?.is_none() {
                continue;
            }
            if let Some(label) = labels.get(&i) {
                write!(f, "{} ", label)?;
            }
            f.write_str(&target.label)?;
        }

        for modifier in self.graph.modifiers() {
            let Some(start_char_idx) = underline(f, starts, ends, modifier.range())? else {
                continue;
            };
            write!(f, "{} {}", modifier.category(), modifier.direction())?;
            if self.show_scopes {
                write!(f, " {}", modifier.scope())?;
            }
            for target in modifier.targets() {
                f.write_char('\n')?;
                for _ in 0..start_char_idx + 2 {
                    f.write_char(' ')?;
                }
                let target_str = match labels.get(&target.0) {
                    Some(label) => label.clone(),
                    None => format!("[#{}]", target.0),
                };
                write!(f, "└─modifies─>{}", target_str)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use layered_context::Target;

    use super::*;
    use crate::{Direction, Modifier, ModifierRule, ScopeMode};

    #[test]
    fn test_index_to_base26_label() {
        assert_eq!(index_to_base26_label(0), "A");
        assert_eq!(index_to_base26_label(25), "Z");
        assert_eq!(index_to_base26_label(26), "AA");
        assert_eq!(index_to_base26_label(701), "ZZ");
        assert_eq!(index_to_base26_label(702), "AAA");
    }

    #[test]
    fn test_terminated_negation() {
        let doc = Document::from_tokens(&["no", "cough", "but", "fever"]).with_single_sentence();
        let neg = Arc::new(ModifierRule::new("no", "NEGATED_EXISTENCE", Direction::Forward));
        let but = Arc::new(ModifierRule::new("but", "CONJ", Direction::Terminate));
        let modifiers = vec![
            Modifier::new(neg, TokenRange::new(0, 1), &doc, ScopeMode::Sentence).unwrap(),
            Modifier::new(but, TokenRange::new(2, 3), &doc, ScopeMode::Sentence).unwrap(),
        ];
        let mut graph = ModifierGraph::new(
            vec![Target::new(1, 2, "PROBLEM"), Target::new(3, 4, "PROBLEM")],
            modifiers,
        );
        graph.resolve(&doc).unwrap();

        insta::assert_snapshot!(GraphDisplay::new(&doc, &graph), @r###"
        no  cough  but  fever
            ╰───╯[A] PROBLEM
                        ╰───╯PROBLEM
        ╰╯NEGATED_EXISTENCE FORWARD [1, 2)
          └─modifies─>[A]
                   ╰─╯CONJ TERMINATE [0, 4)
        "###);
    }
}
