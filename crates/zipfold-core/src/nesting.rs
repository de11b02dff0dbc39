//! Declarative description of the nested archive layout.
//!
//! A [`NestingSpec`] lists, level by level, where the inner archives live
//! relative to the extraction root of their parent, and which directories of
//! the innermost archives receive the transform.
//!
//! Patterns are `/`-separated [`glob`] patterns. Within a segment `*` matches
//! any run of characters, `?` one character and `[...]` a character class;
//! none of them cross a `/`. A whole segment `**` matches any number of
//! directories, including none. `{stem}` is replaced by the stem of the
//! archive being searched (`コネクト_v1.0.0` for `コネクト_v1.0.0.zip`).

use crate::PipelineError;
use crate::Result;
use crate::creation::walker::normalize_archive_name;
use glob::MatchOptions;
use glob::Pattern;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Maximum number of paths listed in a structure mismatch.
pub const FOUND_LISTING_LIMIT: usize = 20;

/// Placeholder replaced with the current archive's stem.
const STEM_PLACEHOLDER: &str = "{stem}";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One nesting level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSpec {
    /// Pattern locating the archives of this level, relative to the parent's
    /// extraction root.
    pub locate: String,

    /// File-name patterns of matches to skip.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl LevelSpec {
    /// Creates a level with no exclusions.
    #[must_use]
    pub fn new(locate: impl Into<String>) -> Self {
        Self {
            locate: locate.into(),
            exclude: Vec::new(),
        }
    }

    /// Adds an exclusion pattern.
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    /// Returns the locate pattern with `{stem}` substituted.
    #[must_use]
    pub fn pattern_for(&self, stem: &str) -> String {
        self.locate.replace(STEM_PLACEHOLDER, stem)
    }

    /// Finds the archives of this level under `root`, sorted by relative
    /// path.
    ///
    /// Only regular files match. Symlinks are not followed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a malformed pattern, or `Io` if `root`
    /// cannot be traversed.
    pub fn find_matches(&self, root: &Path, stem: &str) -> Result<Vec<String>> {
        // The stem is literal text, even if it happens to contain `[` or `*`.
        let pattern = compile(&self.locate.replace(STEM_PLACEHOLDER, &Pattern::escape(stem)))?;
        let excludes = self
            .exclude
            .iter()
            .map(|rule| compile(rule).map(|compiled| (rule, compiled)))
            .collect::<Result<Vec<_>>>()?;

        let mut matches = Vec::new();
        for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = relative_name(root, entry.path())?;
            if !pattern.matches_with(&relative, MATCH_OPTIONS) {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy();
            if let Some((rule, _)) = excludes
                .iter()
                .find(|(_, compiled)| compiled.matches_with(&file_name, MATCH_OPTIONS))
            {
                log::info!("skipping {relative} (excluded by {rule})");
                continue;
            }
            matches.push(relative);
        }

        matches.sort();
        Ok(matches)
    }
}

/// The complete nesting layout of an input archive.
///
/// # Examples
///
/// ```
/// use zipfold_core::NestingSpec;
///
/// let spec = NestingSpec::default();
/// assert_eq!(spec.depth(), 2);
/// assert_eq!(spec.levels[0].locate, "connect/バイナリ/コネクト_*.zip");
/// assert_eq!(spec.leaf_targets, vec!["."]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestingSpec {
    /// Levels from outermost to innermost.
    pub levels: Vec<LevelSpec>,

    /// Directories handed to the transform, relative to each innermost
    /// extraction root. `.` is the root itself.
    #[serde(default = "default_leaf_targets")]
    pub leaf_targets: Vec<String>,
}

fn default_leaf_targets() -> Vec<String> {
    vec![".".to_string()]
}

impl Default for NestingSpec {
    fn default() -> Self {
        Self {
            levels: vec![
                LevelSpec::new("connect/バイナリ/コネクト_*.zip").exclude("*3rd*"),
                LevelSpec::new("{stem}/**/*.xcframework.zip"),
            ],
            leaf_targets: default_leaf_targets(),
        }
    }
}

impl NestingSpec {
    /// Creates a layout from explicit levels with the default leaf target.
    #[must_use]
    pub fn new(levels: Vec<LevelSpec>) -> Self {
        Self {
            levels,
            leaf_targets: default_leaf_targets(),
        }
    }

    /// Replaces the leaf target patterns.
    #[must_use]
    pub fn with_leaf_targets(mut self, targets: Vec<String>) -> Self {
        self.leaf_targets = targets;
        self
    }

    /// Number of nested levels below the outer archive.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Checks that every pattern is relative and free of `..`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` describing the first bad pattern.
    pub fn validate(&self) -> Result<()> {
        for (n, level) in self.levels.iter().enumerate() {
            check_pattern(&format!("level {} locate", n + 1), &level.locate, false)?;
            for pattern in &level.exclude {
                if pattern.is_empty() || pattern.contains('/') {
                    return Err(PipelineError::InvalidConfig(format!(
                        "level {} exclude pattern must be a file name: {pattern:?}",
                        n + 1
                    )));
                }
                compile(pattern)?;
            }
        }
        if self.leaf_targets.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "at least one leaf target is required".into(),
            ));
        }
        for target in &self.leaf_targets {
            check_pattern("leaf target", target, true)?;
        }
        Ok(())
    }

    /// Resolves the leaf target patterns to directories under `root`.
    ///
    /// Each pattern must match at least one directory. The result is sorted
    /// and free of duplicates.
    ///
    /// # Errors
    ///
    /// Returns `StructureMismatch` naming `archive` when a pattern matches
    /// nothing, or `Io` if `root` cannot be traversed.
    pub fn resolve_leaf_targets(&self, archive: &Path, root: &Path) -> Result<Vec<PathBuf>> {
        let mut targets = Vec::new();
        for pattern in &self.leaf_targets {
            let found = find_directories(root, pattern)?;
            if found.is_empty() {
                return Err(structure_mismatch(archive, pattern, root));
            }
            targets.extend(found);
        }
        targets.sort();
        targets.dedup();
        Ok(targets)
    }
}

/// Builds a `StructureMismatch` with a bounded listing of what `root` holds.
pub(crate) fn structure_mismatch(archive: &Path, expected: &str, root: &Path) -> PipelineError {
    PipelineError::StructureMismatch {
        archive: archive.to_path_buf(),
        expected: expected.to_string(),
        found: list_tree(root, FOUND_LISTING_LIMIT),
    }
}

/// Lists up to `limit` relative paths under `root` in sorted order.
///
/// Directories carry a trailing `/`. Unreadable entries are skipped.
#[must_use]
pub fn list_tree(root: &Path, limit: usize) -> Vec<String> {
    let mut listing: Vec<String> = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| {
            let name = relative_name(root, entry.path()).ok()?;
            Some(if entry.file_type().is_dir() {
                format!("{name}/")
            } else {
                name
            })
        })
        .take(limit)
        .collect();
    listing.sort();
    listing
}

fn find_directories(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if split(pattern).is_empty() {
        return Ok(vec![root.to_path_buf()]);
    }
    let pattern = compile(pattern)?;

    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let relative = relative_name(root, entry.path())?;
        if pattern.matches_with(&relative, MATCH_OPTIONS) {
            found.push(entry.path().to_path_buf());
        }
    }
    Ok(found)
}

fn check_pattern(what: &str, pattern: &str, allow_root: bool) -> Result<()> {
    let segments = split(pattern);
    let bad = pattern.starts_with('/')
        || pattern.contains('\\')
        || segments.contains(&"..")
        || (segments.is_empty() && !allow_root);
    if bad {
        return Err(PipelineError::InvalidConfig(format!(
            "{what} pattern must be a relative path without '..': {pattern:?}"
        )));
    }
    compile(pattern).map(drop)
}

/// Compiles a pattern after dropping empty and `.` segments.
fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(&split(pattern).join("/")).map_err(|e| {
        PipelineError::InvalidConfig(format!("invalid pattern {pattern:?}: {e}"))
    })
}

fn relative_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(std::io::Error::other)?;
    Ok(normalize_archive_name(relative)?)
}

/// Splits a pattern or path into segments, dropping empty and `.` segments.
fn split(s: &str) -> Vec<&str> {
    s.split('/').filter(|seg| !seg.is_empty() && *seg != ".").collect()
}

/// Matches a file name against a single-segment pattern.
///
/// Malformed patterns match nothing.
///
/// # Examples
///
/// ```
/// use zipfold_core::nesting::wildcard_match;
///
/// assert!(wildcard_match("コネクト_*.zip", "コネクト_v1.0.0.zip"));
/// assert!(wildcard_match("*3rd*", "コネクト_3rd_v1.zip"));
/// assert!(!wildcard_match("*.xcframework.zip", "aaa.zip"));
/// ```
#[must_use]
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    Pattern::new(pattern).is_ok_and(|p| p.matches_with(text, MATCH_OPTIONS))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*", ""));
        assert!(wildcard_match("a?c", "abc"));
        assert!(wildcard_match("*.zip", "バイナリ.zip"));
        assert!(wildcard_match("a*b*c", "aXXbYYc"));
        assert!(!wildcard_match("a*b", "aXXc"));
        assert!(!wildcard_match("?", ""));
    }

    #[test]
    fn test_wildcard_does_not_cross_separator() {
        assert!(!wildcard_match("*.zip", "dir/a.zip"));
        assert!(wildcard_match("[ab].zip", "b.zip"));
        assert!(!wildcard_match("[", "["));
    }

    #[test]
    fn test_double_star_matches_any_depth() {
        let level = LevelSpec::new("{stem}/**/*.xcframework.zip");
        let pattern = compile(&level.pattern_for("x")).unwrap();

        assert!(pattern.matches_with("x/a.xcframework.zip", MATCH_OPTIONS));
        assert!(pattern.matches_with("x/y/z/a.xcframework.zip", MATCH_OPTIONS));
        assert!(!pattern.matches_with("y/a.xcframework.zip", MATCH_OPTIONS));
    }

    #[test]
    fn test_dot_segments_are_ignored() {
        let pattern = compile("./pkg//*.zip").unwrap();
        assert!(pattern.matches_with("pkg/a.zip", MATCH_OPTIONS));
    }

    #[test]
    fn test_stem_with_glob_characters_is_literal() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "v[1]/a.zip");
        touch(temp.path(), "v1/b.zip");

        let matches = LevelSpec::new("{stem}/*.zip")
            .find_matches(temp.path(), "v[1]")
            .unwrap();
        assert_eq!(matches, vec!["v[1]/a.zip"]);
    }

    #[test]
    fn test_default_spec_matches_fixture_layout() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "connect/バイナリ/コネクト_v1.0.0.zip");
        touch(temp.path(), "connect/バイナリ/コネクト_3rd_v1.0.0.zip");
        touch(temp.path(), "connect/readme.txt");

        let spec = NestingSpec::default();
        let matches = spec.levels[0].find_matches(temp.path(), "20260105_test").unwrap();
        assert_eq!(matches, vec!["connect/バイナリ/コネクト_v1.0.0.zip"]);
    }

    #[test]
    fn test_stem_substitution() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "コネクト_v1.0.0/コネクト_v1.0.0/bbb.xcframework.zip");
        touch(temp.path(), "コネクト_v1.0.0/コネクト_v1.0.0/aaa.xcframework.zip");
        touch(temp.path(), "other/ccc.xcframework.zip");

        let level = &NestingSpec::default().levels[1];
        let matches = level.find_matches(temp.path(), "コネクト_v1.0.0").unwrap();
        assert_eq!(
            matches,
            vec![
                "コネクト_v1.0.0/コネクト_v1.0.0/aaa.xcframework.zip",
                "コネクト_v1.0.0/コネクト_v1.0.0/bbb.xcframework.zip",
            ]
        );
    }

    #[test]
    fn test_resolve_leaf_targets_root() {
        let temp = TempDir::new().unwrap();
        let targets = NestingSpec::default()
            .resolve_leaf_targets(Path::new("aaa.xcframework.zip"), temp.path())
            .unwrap();
        assert_eq!(targets, vec![temp.path().to_path_buf()]);
    }

    #[test]
    fn test_resolve_leaf_targets_missing_is_mismatch() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "aaa.xcframework/Info.plist");

        let spec = NestingSpec::default().with_leaf_targets(vec!["*.framework".into()]);
        let err = spec
            .resolve_leaf_targets(Path::new("aaa.xcframework.zip"), temp.path())
            .unwrap_err();

        match err {
            PipelineError::StructureMismatch {
                expected, found, ..
            } => {
                assert_eq!(expected, "*.framework");
                assert!(found.contains(&"aaa.xcframework/".to_string()));
                assert!(found.contains(&"aaa.xcframework/Info.plist".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_leaf_targets_nested_dirs() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "aaa.xcframework/ios-arm64/aaa.framework/aaa");
        touch(temp.path(), "aaa.xcframework/ios-arm64_x86_64-simulator/aaa.framework/aaa");

        let spec = NestingSpec::default().with_leaf_targets(vec!["**/*.framework".into()]);
        let targets = spec
            .resolve_leaf_targets(Path::new("aaa.xcframework.zip"), temp.path())
            .unwrap();
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn test_list_tree_bounded() {
        let temp = TempDir::new().unwrap();
        for i in 0..30 {
            touch(temp.path(), &format!("f{i:02}.txt"));
        }
        let listing = list_tree(temp.path(), FOUND_LISTING_LIMIT);
        assert_eq!(listing.len(), FOUND_LISTING_LIMIT);
        assert_eq!(listing[0], "f00.txt");
    }

    #[test]
    fn test_validate() {
        assert!(NestingSpec::default().validate().is_ok());
        assert!(NestingSpec::new(vec![]).validate().is_ok());

        let bad = NestingSpec::new(vec![LevelSpec::new("../escape/*.zip")]);
        assert!(matches!(bad.validate(), Err(PipelineError::InvalidConfig(_))));

        let bad = NestingSpec::new(vec![LevelSpec::new("/abs/*.zip")]);
        assert!(bad.validate().is_err());

        let bad = NestingSpec::default().with_leaf_targets(vec![]);
        assert!(bad.validate().is_err());

        let bad = NestingSpec::new(vec![LevelSpec::new("pkg/[*.zip")]);
        assert!(matches!(bad.validate(), Err(PipelineError::InvalidConfig(_))));

        let bad = NestingSpec::new(vec![LevelSpec::new("pkg/a**/*.zip")]);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_serde_defaults() {
        let json = r#"{"levels":[{"locate":"inner/*.zip"}]}"#;
        let spec: NestingSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.levels[0].exclude, Vec::<String>::new());
        assert_eq!(spec.leaf_targets, vec!["."]);
    }
}
