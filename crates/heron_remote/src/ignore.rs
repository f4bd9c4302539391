use heron_core::constants::DEFAULT_IGNORE;

use std::path::{Component, Path};

/// Names (or `/`-separated name sequences) left out of directory transfers.
///
/// A single-name pattern matches that name at any depth. A pattern such as
/// `data/cache` matches wherever those components appear consecutively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreSet {
    patterns: Vec<Vec<String>>,
}

impl IgnoreSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|p| {
                let segments: Vec<String> = p
                    .as_ref()
                    .replace('\\', "/")
                    .split('/')
                    .filter(|s| !s.is_empty() && *s != ".")
                    .map(str::to_string)
                    .collect();
                (!segments.is_empty()).then_some(segments)
            })
            .collect();
        Self { patterns }
    }

    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether `relative` (a path inside the transferred root) is excluded.
    pub fn is_ignored(&self, relative: &Path) -> bool {
        let components: Vec<&str> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => name.to_str(),
                _ => None,
            })
            .collect();

        self.patterns.iter().any(|pattern| {
            components
                .windows(pattern.len())
                .any(|window| window.iter().zip(pattern).all(|(a, b)| a == b))
        })
    }

    /// `--exclude` arguments for a remote `tar` invocation, already shell-quoted.
    pub fn tar_excludes(&self) -> Vec<String> {
        self.patterns
            .iter()
            .map(|p| format!("--exclude={}", crate::path::sh_quote(&p.join("/"))))
            .collect()
    }
}

impl Default for IgnoreSet {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::top_level(".git", true)]
    #[case::nested("pkg/__pycache__/mod.pyc", true)]
    #[case::runs_dir("heron_runs/abc/execution.log", true)]
    #[case::source_file("pkg/mod.py", false)]
    #[case::prefix_only(".github/workflows/ci.yml", false)]
    fn default_patterns(#[case] path: &str, #[case] ignored: bool) {
        assert_eq!(IgnoreSet::default().is_ignored(Path::new(path)), ignored);
    }

    #[test]
    fn multi_segment_patterns_match_consecutive_components() {
        let set = IgnoreSet::new(["data/cache"]);
        assert!(set.is_ignored(Path::new("data/cache")));
        assert!(set.is_ignored(Path::new("sub/data/cache/blob")));
        assert!(!set.is_ignored(Path::new("data/other/cache")));
        assert!(!set.is_ignored(Path::new("cache")));
    }

    #[test]
    fn blank_patterns_are_dropped() {
        let set = IgnoreSet::new(["", "/", "./"]);
        assert!(set.is_empty());
        assert!(!set.is_ignored(Path::new("anything")));
    }

    #[test]
    fn excludes_are_quoted() {
        let set = IgnoreSet::new([".git", "my dir"]);
        assert_eq!(
            set.tar_excludes(),
            vec!["--exclude='.git'".to_string(), "--exclude='my dir'".to_string()]
        );
    }
}
