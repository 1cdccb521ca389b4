//! Natural (numeric-aware) ordering of frame filenames
//!
//! A name is split into alternating non-digit and digit runs. Digit runs
//! compare by numeric value and text runs compare case-insensitively, so
//! `frame_2.png` sorts before `frame_10.png`.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// One run of a split filename.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Chunk<'a> {
    Text(String),
    Digits(&'a str),
}

/// Split a name into runs, always starting with a (possibly empty) text run.
fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut text_start = 0;
    let mut iter = s.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        if !c.is_ascii_digit() {
            continue;
        }
        out.push(Chunk::Text(s[text_start..i].to_lowercase()));
        let mut end = i + 1;
        while let Some(&(j, d)) = iter.peek() {
            if !d.is_ascii_digit() {
                break;
            }
            end = j + 1;
            iter.next();
        }
        out.push(Chunk::Digits(&s[i..end]));
        text_start = end;
    }
    out.push(Chunk::Text(s[text_start..].to_lowercase()));
    out
}

/// Compare two digit runs by value without parsing into a fixed-width integer.
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_chunk(a: &Chunk<'_>, b: &Chunk<'_>) -> Ordering {
    match (a, b) {
        (Chunk::Text(a), Chunk::Text(b)) => a.cmp(b),
        (Chunk::Digits(a), Chunk::Digits(b)) => cmp_digits(a, b),
        // Runs alternate from the same starting kind, so positions always agree
        (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Less,
        (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Greater,
    }
}

/// Compare two names in natural order.
///
/// Names that are equal under the natural key (`f01` and `f1`) fall back to
/// a plain byte comparison, so the order is total and stable across runs.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use delta_atlas::natural::natural_cmp;
///
/// assert_eq!(natural_cmp("frame_2.png", "frame_10.png"), Ordering::Less);
/// assert_eq!(natural_cmp("B1", "a2"), Ordering::Greater);
/// ```
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let ka = chunks(a);
    let kb = chunks(b);
    for (x, y) in ka.iter().zip(kb.iter()) {
        let ord = cmp_chunk(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ka.len().cmp(&kb.len()).then_with(|| a.cmp(b))
}

/// Sort names in place in natural order.
pub fn sort_natural(names: &mut [String]) {
    names.sort_by(|a, b| natural_cmp(a, b));
}

/// Sort paths in place by their file name in natural order.
pub fn sort_paths_natural(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(names: &[&str]) -> Vec<String> {
        let mut v: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        sort_natural(&mut v);
        v
    }

    #[test]
    fn test_numeric_runs() {
        assert_eq!(sorted(&["f2.png", "f10.png", "f1.png"]), vec!["f1.png", "f2.png", "f10.png"]);
    }

    #[test]
    fn test_case_insensitive_text() {
        assert_eq!(sorted(&["b.png", "B1.png", "a.png"]), vec!["a.png", "B1.png", "b.png"]);
        assert_eq!(natural_cmp("Frame_3", "frame_20"), Ordering::Less);
    }

    #[test]
    fn test_multiple_digit_runs() {
        assert_eq!(
            sorted(&["s2_f10", "s10_f1", "s2_f9"]),
            vec!["s2_f9", "s2_f10", "s10_f1"]
        );
    }

    #[test]
    fn test_leading_zeros_and_ties() {
        assert_eq!(sorted(&["f010", "f9", "f01", "f1"]), vec!["f01", "f1", "f9", "f010"]);
    }

    #[test]
    fn test_huge_numbers_do_not_overflow() {
        let big = "f123456789012345678901234567890";
        let bigger = "f923456789012345678901234567890";
        assert_eq!(natural_cmp(big, bigger), Ordering::Less);
        assert_eq!(natural_cmp("f1", big), Ordering::Less);
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(natural_cmp("frame", "frame_1"), Ordering::Less);
        assert_eq!(natural_cmp("", "a"), Ordering::Less);
    }

    #[test]
    fn test_sort_paths_uses_file_name() {
        let mut paths = vec![
            PathBuf::from("z/frame_10.png"),
            PathBuf::from("a/frame_2.png"),
        ];
        sort_paths_natural(&mut paths);
        assert_eq!(paths[0], PathBuf::from("a/frame_2.png"));
    }
}
