//! Line-oriented output comparison -- positional diff against a baseline.
//!
//! Deliberately dumb: lines are compared by position after normalization,
//! with no alignment. A single inserted line cascades into mismatches for
//! everything after it. Keeping it positional keeps the output stable and
//! trivially explainable, which matters more here than diff quality.

use std::fmt;
use std::path::Path;

/// One detected divergence between actual and expected output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discrepancy {
    /// The line at this 1-based position differs.
    LineMismatch {
        line: usize,
        expected: String,
        actual: String,
    },
    /// The two outputs have a different number of (non-blank) lines.
    LineCountMismatch { expected: usize, actual: usize },
    /// One of the files could not be read at all.
    ReadError(String),
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::LineMismatch {
                line,
                expected,
                actual,
            } => {
                write!(f, "Line {}: Expected '{}', Got '{}'", line, expected, actual)
            }
            Discrepancy::LineCountMismatch { expected, actual } => {
                write!(
                    f,
                    "Different number of lines: Expected {}, Got {}",
                    expected, actual
                )
            }
            Discrepancy::ReadError(err) => write!(f, "Error comparing files: {}", err),
        }
    }
}

/// Split text into comparison lines: trim each line, drop blanks.
pub fn normalize(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Positional diff of two normalized line sequences.
///
/// Mismatches are reported in line order; if the sequences have different
/// lengths, a single count mismatch is appended after all positional ones.
pub fn compare_lines(actual: &[String], expected: &[String]) -> Vec<Discrepancy> {
    let mut discrepancies = Vec::new();

    let common = actual.len().min(expected.len());
    for i in 0..common {
        if actual[i] != expected[i] {
            discrepancies.push(Discrepancy::LineMismatch {
                line: i + 1,
                expected: expected[i].clone(),
                actual: actual[i].clone(),
            });
        }
    }

    if actual.len() != expected.len() {
        discrepancies.push(Discrepancy::LineCountMismatch {
            expected: expected.len(),
            actual: actual.len(),
        });
    }

    discrepancies
}

/// Compare a result file against its expected baseline.
///
/// Read failures never propagate: they surface as a single `ReadError`
/// discrepancy so one unreadable file fails its own task and nothing else.
/// Undecodable bytes are tolerated via lossy UTF-8 conversion.
pub fn compare_files(actual: &Path, expected: &Path) -> Vec<Discrepancy> {
    let actual_text = match std::fs::read(actual) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => return vec![Discrepancy::ReadError(format!("{}: {}", actual.display(), e))],
    };
    let expected_text = match std::fs::read(expected) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            return vec![Discrepancy::ReadError(format!(
                "{}: {}",
                expected.display(),
                e
            ))]
        }
    };

    compare_lines(&normalize(&actual_text), &normalize(&expected_text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_equal_sequences_have_no_discrepancies() {
        let a = lines(&["a", "b", "c"]);
        assert!(compare_lines(&a, &a).is_empty());
        assert!(compare_lines(&[], &[]).is_empty());
    }

    #[test]
    fn test_mismatch_reports_one_based_line_and_both_values() {
        let actual = lines(&["a", "b", "c"]);
        let expected = lines(&["a", "x", "c"]);
        let diffs = compare_lines(&actual, &expected);
        assert_eq!(
            diffs,
            vec![Discrepancy::LineMismatch {
                line: 2,
                expected: "x".into(),
                actual: "b".into(),
            }]
        );
        assert_eq!(diffs[0].to_string(), "Line 2: Expected 'x', Got 'b'");
    }

    #[test]
    fn test_equal_length_differing_at_multiple_positions() {
        let actual = lines(&["1", "b", "3", "d"]);
        let expected = lines(&["a", "b", "c", "d"]);
        let diffs = compare_lines(&actual, &expected);
        assert_eq!(diffs.len(), 2);
        assert!(matches!(diffs[0], Discrepancy::LineMismatch { line: 1, .. }));
        assert!(matches!(diffs[1], Discrepancy::LineMismatch { line: 3, .. }));
        // No count mismatch when lengths match.
        assert!(!diffs
            .iter()
            .any(|d| matches!(d, Discrepancy::LineCountMismatch { .. })));
    }

    #[test]
    fn test_length_mismatch_appends_single_count_discrepancy() {
        let actual = lines(&["a", "b", "c"]);
        let expected = lines(&["a"]);
        let diffs = compare_lines(&actual, &expected);
        assert_eq!(
            diffs,
            vec![Discrepancy::LineCountMismatch {
                expected: 1,
                actual: 3,
            }]
        );
        assert_eq!(
            diffs[0].to_string(),
            "Different number of lines: Expected 1, Got 3"
        );
    }

    #[test]
    fn test_count_discrepancy_comes_after_positional_ones() {
        let actual = lines(&["x", "b"]);
        let expected = lines(&["a", "b", "c"]);
        let diffs = compare_lines(&actual, &expected);
        assert_eq!(diffs.len(), 2);
        assert!(matches!(diffs[0], Discrepancy::LineMismatch { line: 1, .. }));
        assert_eq!(
            diffs[1],
            Discrepancy::LineCountMismatch {
                expected: 3,
                actual: 2,
            }
        );
    }

    #[test]
    fn test_normalize_trims_and_drops_blank_lines() {
        let text = "  a  \n\n   \nb\r\n  c\n";
        assert_eq!(normalize(text), lines(&["a", "b", "c"]));
    }

    #[test]
    fn test_missing_file_yields_read_error_discrepancy() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.txt");
        std::fs::write(&present, "a\n").unwrap();
        let missing = dir.path().join("missing.txt");

        let diffs = compare_files(&present, &missing);
        assert_eq!(diffs.len(), 1);
        assert!(matches!(diffs[0], Discrepancy::ReadError(_)));
        assert!(diffs[0].to_string().starts_with("Error comparing files:"));
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let actual = dir.path().join("actual.txt");
        let expected = dir.path().join("expected.txt");
        std::fs::write(&actual, b"hello\n\xff\xfe\n").unwrap();
        std::fs::write(&expected, "hello\n").unwrap();

        // The garbage line still participates in the diff; nothing panics.
        let diffs = compare_files(&actual, &expected);
        assert_eq!(diffs.len(), 1);
        assert!(matches!(
            diffs[0],
            Discrepancy::LineCountMismatch {
                expected: 1,
                actual: 2,
            }
        ));
    }
}
