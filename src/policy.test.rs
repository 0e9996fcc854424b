use super::*;
use tempfile::tempdir;

fn filter_with(config: Config) -> (tempfile::TempDir, PolicyFilter) {
    let dir = tempdir().unwrap();
    let filter = PolicyFilter::new(dir.path(), &config).unwrap();
    (dir, filter)
}

#[test]
fn symlinks_are_always_rejected() {
    let (_dir, filter) = filter_with(Config::default());
    let decision = filter.evaluate("link.rs", true, 10, Some("fn main() {}"));
    assert_eq!(decision, Decision::Skip);
}

#[test]
fn hard_deny_list_cannot_be_overridden_by_include() {
    let mut config = Config::default();
    config.include = vec!["**/*".to_string()];
    let (_dir, filter) = filter_with(config);
    let decision = filter.evaluate("node_modules/pkg/index.js", false, 10, Some("module.exports = {}"));
    assert_eq!(decision, Decision::Skip);
}

#[test]
fn secret_file_patterns_are_hard_denied() {
    let (_dir, filter) = filter_with(Config::default());
    assert!(filter.is_hard_denied(".env"));
    assert!(filter.is_hard_denied(".env.production"));
    assert!(filter.is_hard_denied("server.pem"));
}

#[test]
fn user_exclude_glob_skips_before_gitignore_and_size() {
    let mut config = Config::default();
    config.exclude = vec!["**/*.generated.rs".to_string()];
    let (_dir, filter) = filter_with(config);
    let decision = filter.evaluate("src/schema.generated.rs", false, 10, Some("struct S;"));
    assert_eq!(decision, Decision::Skip);
}

#[test]
fn binary_like_content_is_skipped_at_binary_sniff_step() {
    let (_dir, filter) = filter_with(Config::default());
    let binary_like = "\u{0}\u{1}\u{2}".repeat(50);
    let decision = filter.evaluate("data.bin", false, 10, Some(&binary_like));
    assert_eq!(decision, Decision::Skip);
}

#[test]
fn file_at_exact_size_threshold_is_indexed_one_byte_over_is_skipped() {
    let mut config = Config::default();
    config.max_file_size = crate::config::ByteSize(100);
    let (_dir, filter) = filter_with(config.clone());
    let at_threshold = filter.evaluate("a.rs", false, 100, Some("fn main() {}"));
    assert_eq!(at_threshold, Decision::Index);

    let (_dir2, filter2) = filter_with(config);
    let over_threshold = filter2.evaluate("a.rs", false, 101, Some("fn main() {}"));
    assert_eq!(over_threshold, Decision::Skip);
}

#[test]
fn default_with_no_include_configured_indexes_by_default() {
    let (_dir, filter) = filter_with(Config::default());
    let decision = filter.evaluate("src/main.rs", false, 10, Some("fn main() {}"));
    assert_eq!(decision, Decision::Index);
}

#[test]
fn include_glob_acts_as_whitelist_when_configured() {
    let mut config = Config::default();
    config.include = vec!["src/**/*.rs".to_string()];
    let (_dir, filter) = filter_with(config);
    assert_eq!(
        filter.evaluate("src/main.rs", false, 10, Some("fn main() {}")),
        Decision::Index
    );
    assert_eq!(
        filter.evaluate("docs/readme.md", false, 10, Some("# readme")),
        Decision::Skip
    );
}
