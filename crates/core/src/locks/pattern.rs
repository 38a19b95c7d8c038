use globset::Glob;

/// True when `resource` is a glob pattern rather than a literal name.
pub fn is_pattern(resource: &str) -> bool {
  resource.contains(['*', '?', '['])
}

/// Bidirectional overlap between two held-or-requested resources.
///
/// A pattern overlaps any literal it matches, in either direction. Two
/// literals overlap only when equal, and so do two patterns (pattern-vs-
/// pattern intersection is not computed).
pub fn overlaps(a: &str, b: &str) -> bool {
  if a == b {
    return true;
  }
  match (is_pattern(a), is_pattern(b)) {
    (true, false) => glob_matches(a, b),
    (false, true) => glob_matches(b, a),
    _ => false,
  }
}

fn glob_matches(pattern: &str, path: &str) -> bool {
  match Glob::new(pattern) {
    Ok(glob) => glob.compile_matcher().is_match(path),
    // An unparseable pattern cannot conflict with anything
    Err(_) => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  #[test]
  fn literals_overlap_only_when_equal() {
    assert!(overlaps("shared.txt", "shared.txt"));
    assert!(!overlaps("shared.txt", "other.txt"));
  }

  #[test]
  fn pattern_covers_matching_literal_both_directions() {
    assert!(overlaps("*.txt", "shared.txt"));
    assert!(overlaps("shared.txt", "*.txt"));
    assert!(!overlaps("*.rs", "shared.txt"));
    assert!(!overlaps("shared.txt", "*.rs"));
  }

  #[test]
  fn directory_globs() {
    assert!(overlaps("src/*.rs", "src/main.rs"));
    assert!(!overlaps("src/*.rs", "tests/main.rs"));
    assert!(overlaps("src/**", "src/deep/file.rs"));
  }

  #[test]
  fn identical_patterns_overlap() {
    assert!(overlaps("*.txt", "*.txt"));
    // Distinct patterns never do, even when their match sets intersect
    assert!(!overlaps("*.txt", "shared.*"));
  }

  #[test]
  fn invalid_pattern_never_conflicts() {
    assert!(!overlaps("[", "shared.txt"));
    assert!(!overlaps("shared.txt", "["));
  }

  proptest! {
    #[test]
    fn overlap_is_symmetric(a in "[a-z*?.]{1,12}", b in "[a-z*?.]{1,12}") {
      prop_assert_eq!(overlaps(&a, &b), overlaps(&b, &a));
    }

    #[test]
    fn every_resource_overlaps_itself(a in "[a-z*?./_-]{1,16}") {
      prop_assert!(overlaps(&a, &a));
    }
  }
}
