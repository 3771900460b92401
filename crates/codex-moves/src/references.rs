//! Detection and rewriting of path references inside strand content.
//!
//! A reference is either bracketed (`[[weaves/a/intro.md]]`) or bare
//! (`weaves/a/intro.md`). Paths are matched literally: every regex
//! metacharacter in a source path is escaped before the pattern is built.
//!
//! Bare references must stand on their own. The character before a bare
//! match may not be part of a path (`xweaves/a.md` is not a reference), and
//! the character after it may not continue the last segment
//! (`weaves/a.mdx` is not a reference). Rooted and relative forms
//! (`/weaves/a.md`, `./weaves/a.md`, `../weaves/a.md`) count as long as the
//! leading slashes and dots are not themselves glued to a segment. A `/`
//! after a directory path is allowed so references to files inside a moved
//! directory are rewritten.

use std::cmp::Reverse;

use regex::Regex;
use tracing::warn;

use codex_core::{MoveKind, MoveOperation, PathReferenceMatch};

/// Escape every regex metacharacter so `path` matches only itself.
pub fn escape_path_pattern(path: &str) -> String {
    regex::escape(path)
}

/// Count and aggregate references to each moved path in `content`.
///
/// Returns one record per distinct source path with at least one
/// occurrence, in operation order. Pure; never modifies `content`.
pub fn detect_references(content: &str, operations: &[MoveOperation]) -> Vec<PathReferenceMatch> {
    ReferenceRewriter::new(operations).detect(content)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    Bracketed,
    Bare,
}

#[derive(Debug, Clone, Copy)]
struct Occurrence {
    start: usize,
    end: usize,
    form: Form,
}

/// Compiled literal matcher for one move operation.
#[derive(Debug, Clone)]
pub struct ReferencePattern {
    old_path: String,
    new_path: String,
    allow_children: bool,
    regex: Regex,
}

impl ReferencePattern {
    pub fn new(operation: &MoveOperation) -> Result<Self, regex::Error> {
        let op = operation.normalized();
        let escaped = escape_path_pattern(&op.source_path);
        let regex = Regex::new(&format!(r"\[\[{escaped}\]\]|{escaped}"))?;
        Ok(Self {
            allow_children: op.kind == MoveKind::Directory,
            old_path: op.source_path,
            new_path: op.dest_path,
            regex,
        })
    }

    pub fn old_path(&self) -> &str {
        &self.old_path
    }

    pub fn new_path(&self) -> &str {
        &self.new_path
    }

    /// Number of references in `content`, both forms combined.
    pub fn count(&self, content: &str) -> usize {
        self.occurrences(content).len()
    }

    fn push_replacement(&self, out: &mut String, form: Form) {
        match form {
            Form::Bracketed => {
                out.push_str("[[");
                out.push_str(&self.new_path);
                out.push_str("]]");
            }
            Form::Bare => out.push_str(&self.new_path),
        }
    }

    fn occurrences(&self, content: &str) -> Vec<Occurrence> {
        let mut found = Vec::new();
        if self.old_path.is_empty() {
            return found;
        }

        let mut start = 0;
        while start <= content.len() {
            let Some(m) = self.regex.find_at(content, start) else {
                break;
            };

            let form = if m.len() > self.old_path.len() {
                Some(Form::Bracketed)
            } else if self.stands_alone(content, m.start(), m.end()) {
                Some(Form::Bare)
            } else {
                None
            };

            match form {
                Some(form) => {
                    found.push(Occurrence {
                        start: m.start(),
                        end: m.end(),
                        form,
                    });
                    start = m.end();
                }
                // rejected candidate: retry one character later
                None => {
                    start = m.start()
                        + content[m.start()..]
                            .chars()
                            .next()
                            .map_or(1, char::len_utf8);
                }
            }
        }
        found
    }

    fn stands_alone(&self, content: &str, start: usize, end: usize) -> bool {
        // `/`, `./` and `../` may lead a reference unless glued to a segment
        let lead = content[..start].trim_end_matches(['/', '.']);
        if lead.chars().next_back().is_some_and(is_segment_char) {
            return false;
        }

        let mut after = content[end..].chars();
        match after.next() {
            None => true,
            Some('/') => self.allow_children,
            // sentence punctuation, not an extension
            Some('.') => !after.next().is_some_and(is_segment_char),
            Some(c) => !is_segment_char(c),
        }
    }
}

fn is_segment_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Content after every pattern with references was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenContent {
    pub content: String,
    pub matches: Vec<PathReferenceMatch>,
}

impl RewrittenContent {
    /// Total occurrences replaced across all matches.
    pub fn occurrence_count(&self) -> usize {
        self.matches.iter().map(|m| m.occurrence_count).sum()
    }
}

/// Patterns for a whole batch, compiled once and reused per strand.
#[derive(Debug, Clone, Default)]
pub struct ReferenceRewriter {
    patterns: Vec<ReferencePattern>,
}

impl ReferenceRewriter {
    /// Compile one pattern per distinct source path, first operation wins.
    pub fn new(operations: &[MoveOperation]) -> Self {
        let mut patterns: Vec<ReferencePattern> = Vec::with_capacity(operations.len());
        for op in operations {
            let source = op.normalized().source_path;
            if source.is_empty() || patterns.iter().any(|p| p.old_path == source) {
                continue;
            }
            match ReferencePattern::new(op) {
                Ok(pattern) => patterns.push(pattern),
                Err(e) => warn!(
                    subsystem = "moves",
                    component = "references",
                    source_path = %op.source_path,
                    error = %e,
                    "Skipping move with uncompilable reference pattern"
                ),
            }
        }
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn detect(&self, content: &str) -> Vec<PathReferenceMatch> {
        self.patterns
            .iter()
            .filter_map(|pattern| {
                let occurrence_count = pattern.count(content);
                (occurrence_count > 0).then(|| PathReferenceMatch {
                    old_path: pattern.old_path.clone(),
                    new_path: pattern.new_path.clone(),
                    occurrence_count,
                })
            })
            .collect()
    }

    /// Rewrite all references in `content` in a single pass. `None` when
    /// nothing matched.
    ///
    /// Occurrences of every pattern are found on the original content.
    /// Where they overlap the leftmost wins, and the longest among those
    /// starting at the same position. The returned matches count only the
    /// occurrences actually replaced.
    pub fn rewrite(&self, content: &str) -> Option<RewrittenContent> {
        let mut candidates: Vec<(usize, Occurrence)> = self
            .patterns
            .iter()
            .enumerate()
            .flat_map(|(i, pattern)| {
                pattern
                    .occurrences(content)
                    .into_iter()
                    .map(move |occ| (i, occ))
            })
            .collect();
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_by_key(|(_, occ)| (occ.start, Reverse(occ.end)));

        let mut counts = vec![0usize; self.patterns.len()];
        let mut out = String::with_capacity(content.len());
        let mut last = 0;
        for (i, occ) in candidates {
            if occ.start < last {
                continue;
            }
            out.push_str(&content[last..occ.start]);
            self.patterns[i].push_replacement(&mut out, occ.form);
            last = occ.end;
            counts[i] += 1;
        }
        out.push_str(&content[last..]);

        let matches = self
            .patterns
            .iter()
            .zip(counts)
            .filter(|(_, occurrence_count)| *occurrence_count > 0)
            .map(|(pattern, occurrence_count)| PathReferenceMatch {
                old_path: pattern.old_path.clone(),
                new_path: pattern.new_path.clone(),
                occurrence_count,
            })
            .collect();

        Some(RewrittenContent {
            content: out,
            matches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(src: &str, dst: &str) -> MoveOperation {
        MoveOperation::file(src, dst)
    }

    #[test]
    fn test_escape_path_pattern_brackets_and_dots() {
        assert_eq!(
            escape_path_pattern("weaves/test/file[1].md"),
            r"weaves/test/file\[1\]\.md"
        );
    }

    #[test]
    fn test_bracketed_and_bare_aggregate_into_one_match() {
        let content = "See [[old/path.md]] and [[old/path.md]], also old/path.md.";
        let matches = detect_references(content, &[file("old/path.md", "new/path.md")]);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].old_path, "old/path.md");
        assert_eq!(matches[0].new_path, "new/path.md");
        assert_eq!(matches[0].occurrence_count, 3);
    }

    #[test]
    fn test_zero_occurrences_are_omitted() {
        let matches = detect_references("nothing here", &[file("old/path.md", "new/path.md")]);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_multiple_operations_evaluated_independently() {
        let content = "[[a/one.md]] links [[b/two.md]] and b/two.md";
        let ops = [
            file("a/one.md", "x/one.md"),
            file("b/two.md", "y/two.md"),
            file("c/three.md", "z/three.md"),
        ];
        let matches = detect_references(content, &ops);

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].occurrence_count, 1);
        assert_eq!(matches[1].old_path, "b/two.md");
        assert_eq!(matches[1].occurrence_count, 2);
    }

    #[test]
    fn test_duplicate_source_paths_report_once() {
        let ops = [file("a.md", "b.md"), file("a.md", "c.md")];
        let matches = detect_references("[[a.md]]", &ops);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].new_path, "b.md");
    }

    #[test]
    fn test_metacharacters_match_literally() {
        // Each decoy would match the path if it were used as a raw regex.
        let cases = [
            ("weaves/test/file[1].md", "weaves/test/file1.md"),
            ("notes/a.md", "notes/aXmd"),
            ("notes/a+b.md", "notes/aab.md"),
            ("notes/file?.md", "notes/fil.md"),
            ("notes/a*.md", "notes/.md"),
            ("notes/(draft).md", "notes/draft.md"),
            ("notes/a|b.md", "b.md"),
            ("notes/^top$.md", "notes/top.md"),
            ("notes/{x}.md", "notes/x.md"),
            (r"notes/back\slash.md", "notes/backslash.md"),
        ];

        for (path, decoy) in cases {
            let ops = [file(path, "moved.md")];

            let decoy_only = detect_references(&format!("see {decoy} here"), &ops);
            assert!(decoy_only.is_empty(), "decoy {decoy:?} matched {path:?}");

            let content = format!("see [[{path}]] and {decoy}");
            let matches = detect_references(&content, &ops);
            assert_eq!(matches.len(), 1, "path {path:?}");
            assert_eq!(matches[0].occurrence_count, 1, "path {path:?}");
        }
    }

    #[test]
    fn test_single_bracketed_reference_with_brackets_in_path() {
        let ops = [file("weaves/test/file[1].md", "weaves/test/file[2].md")];
        let matches = detect_references("Link: [[weaves/test/file[1].md]]", &ops);
        assert_eq!(matches[0].occurrence_count, 1);
    }

    #[test]
    fn test_bare_match_requires_boundaries() {
        let ops = [file("notes/a.md", "notes/b.md")];
        assert!(detect_references("xnotes/a.md", &ops).is_empty());
        assert!(detect_references("old/notes/a.md", &ops).is_empty());
        assert!(detect_references("notes/a.mdx", &ops).is_empty());
        assert!(detect_references("notes/a.md.bak", &ops).is_empty());
        assert_eq!(detect_references("(notes/a.md)", &ops).len(), 1);
        assert_eq!(detect_references("end notes/a.md.", &ops).len(), 1);
    }

    #[test]
    fn test_rooted_and_relative_references_are_detected() {
        let ops = [file("old/path.md", "new/path.md")];
        for content in [
            "see /old/path.md",
            "see ./old/path.md",
            "see ../old/path.md",
            "[x](/old/path.md)",
            "[x](../../old/path.md)",
        ] {
            let matches = detect_references(content, &ops);
            assert_eq!(matches.len(), 1, "{content:?}");
            assert_eq!(matches[0].occurrence_count, 1, "{content:?}");
        }
    }

    #[test]
    fn test_slash_or_dot_glued_to_a_segment_is_not_a_lead() {
        let ops = [file("old/path.md", "new/path.md")];
        assert!(detect_references("x/old/path.md", &ops).is_empty());
        assert!(detect_references("file.old/path.md", &ops).is_empty());
        assert!(detect_references("a/../old/path.md", &ops).is_empty());
    }

    #[test]
    fn test_rewrite_keeps_rooted_and_relative_prefixes() {
        let ops = [file("old/path.md", "new/path.md")];
        let rewritten = ReferenceRewriter::new(&ops)
            .rewrite("[[old/path.md]] and [link](/old/path.md) or ../old/path.md")
            .unwrap();
        assert_eq!(
            rewritten.content,
            "[[new/path.md]] and [link](/new/path.md) or ../new/path.md"
        );
        assert_eq!(rewritten.occurrence_count(), 3);
    }

    #[test]
    fn test_swap_batch_rewrites_each_reference_once() {
        let ops = [file("a.md", "b.md"), file("b.md", "a.md")];
        let rewritten = ReferenceRewriter::new(&ops)
            .rewrite("[[a.md]] [[b.md]] a.md")
            .unwrap();

        assert_eq!(rewritten.content, "[[b.md]] [[a.md]] b.md");
        assert_eq!(rewritten.matches.len(), 2);
        assert_eq!(rewritten.matches[0].occurrence_count, 2);
        assert_eq!(rewritten.matches[1].occurrence_count, 1);
    }

    #[test]
    fn test_chained_moves_do_not_cascade() {
        let ops = [file("a.md", "b.md"), file("b.md", "c.md")];
        let rewritten = ReferenceRewriter::new(&ops).rewrite("[[a.md]]").unwrap();
        assert_eq!(rewritten.content, "[[b.md]]");
    }

    #[test]
    fn test_overlapping_operations_prefer_longest_match() {
        let ops = [
            MoveOperation::directory("w/a", "w/b"),
            file("w/a/x.md", "elsewhere/x.md"),
        ];
        let rewritten = ReferenceRewriter::new(&ops)
            .rewrite("[[w/a/x.md]] w/a/y.md")
            .unwrap();

        assert_eq!(rewritten.content, "[[elsewhere/x.md]] w/b/y.md");
        assert_eq!(rewritten.occurrence_count(), 2);
    }

    #[test]
    fn test_file_path_followed_by_slash_is_not_a_reference() {
        let ops = [file("notes/a", "notes/b")];
        assert!(detect_references("notes/a/child.md", &ops).is_empty());
    }

    #[test]
    fn test_directory_matches_children_but_not_siblings() {
        let ops = [MoveOperation::directory("weaves/a", "weaves/b")];
        let content = "[[weaves/a/intro.md]] weaves/a/deep/x.md weaves/abc/y.md [[weaves/a]]";
        let matches = detect_references(content, &ops);
        assert_eq!(matches[0].occurrence_count, 3);

        let rewritten = ReferenceRewriter::new(&ops).rewrite(content).unwrap();
        assert_eq!(
            rewritten.content,
            "[[weaves/b/intro.md]] weaves/b/deep/x.md weaves/abc/y.md [[weaves/b]]"
        );
    }

    #[test]
    fn test_directory_trailing_slash_is_normalized() {
        let ops = [MoveOperation::directory("weaves/a/", "weaves/b/")];
        let rewritten = ReferenceRewriter::new(&ops)
            .rewrite("[[weaves/a/x.md]]")
            .unwrap();
        assert_eq!(rewritten.content, "[[weaves/b/x.md]]");
    }

    #[test]
    fn test_rewrite_replaces_both_forms() {
        let ops = [file("old/path.md", "new/path.md")];
        let content = "[[old/path.md]] [[old/path.md]] old/path.md";
        let rewritten = ReferenceRewriter::new(&ops).rewrite(content).unwrap();

        assert_eq!(rewritten.content, "[[new/path.md]] [[new/path.md]] new/path.md");
        assert_eq!(rewritten.occurrence_count(), 3);
        assert_eq!(rewritten.content.matches("old/path.md").count(), 0);
        assert_eq!(rewritten.content.matches("new/path.md").count(), 3);
    }

    #[test]
    fn test_rewrite_returns_none_without_references() {
        let ops = [file("old/path.md", "new/path.md")];
        assert!(ReferenceRewriter::new(&ops).rewrite("unrelated").is_none());
    }

    #[test]
    fn test_rewrite_handles_multibyte_content() {
        let ops = [file("notes/café.md", "notes/thé.md")];
        let content = "→ [[notes/café.md]] — é notes/café.md";
        let rewritten = ReferenceRewriter::new(&ops).rewrite(content).unwrap();
        assert_eq!(rewritten.content, "→ [[notes/thé.md]] — é notes/thé.md");
    }

    #[test]
    fn test_empty_source_paths_are_ignored() {
        let ops = [file("", "x.md"), MoveOperation::directory("/", "y")];
        let rewriter = ReferenceRewriter::new(&ops);
        assert!(rewriter.is_empty());
        assert!(rewriter.detect("anything [[]]").is_empty());
    }

    #[test]
    fn test_detect_does_not_mutate_input() {
        let content = String::from("[[a.md]]");
        let _ = detect_references(&content, &[file("a.md", "b.md")]);
        assert_eq!(content, "[[a.md]]");
    }
}
