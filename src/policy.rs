//! Policy filter: decides per-path whether to index. Priority order per file:
//! hard deny -> user exclude -> gitignore -> binary sniff -> size gate -> user
//! include -> default index.
//!
//! Generalizes the grounding corpus's directory/extension allow-and-deny-list
//! filter into full glob matching via `globset`, and its `.gitignore`-aware
//! walker into `ignore`'s `Gitignore` matcher. One behavior is deliberately
//! inverted from that corpus: symlinks are always rejected here, never followed.

use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use ignore::WalkBuilder;
use ignore::gitignore::Gitignore;

use crate::config::Config;
use crate::error::Result;
use crate::metrics;

/// Directory/file-name fragments that are always denied, regardless of user
/// config, even on single-file reindex requests.
const HARD_DENY_DIRS: &[&str] = &[
    "node_modules",
    "vendor",
    ".venv",
    "venv",
    ".git",
    ".hg",
    ".svn",
    "dist",
    "build",
    "out",
    "target",
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
    ".next",
    ".nuxt",
    "coverage",
    ".idea",
    ".vscode",
];

const HARD_DENY_GLOBS: &[&str] = &[
    ".env",
    ".env.*",
    "*.pem",
    "*.key",
    "*.p12",
    "*.pfx",
    "*.lock",
    "*.log",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Index,
    Skip,
}

pub struct PolicyFilter {
    project_dir: PathBuf,
    hard_deny_globs: GlobSet,
    include: GlobSet,
    exclude: GlobSet,
    gitignore: Option<Gitignore>,
    max_file_size: u64,
}

impl PolicyFilter {
    pub fn new(project_dir: &Path, config: &Config) -> Result<Self> {
        let hard_deny_globs = build_globset(HARD_DENY_GLOBS)?;
        let include = build_globset(&config.include)?;
        let exclude = build_globset(&config.exclude)?;
        let gitignore = if config.respect_gitignore {
            let (gi, _) = Gitignore::new(project_dir.join(".gitignore"));
            Some(gi)
        } else {
            None
        };
        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            hard_deny_globs,
            include,
            exclude,
            gitignore,
            max_file_size: config.max_file_size.bytes(),
        })
    }

    /// Evaluate the priority order for `rel_path` (project-relative,
    /// forward-slash normalized). `size` and `is_symlink` come from a prior
    /// `lstat` so this function performs no I/O beyond the (optional) binary
    /// sniff the caller supplies `content` for.
    pub fn evaluate(
        &self,
        rel_path: &str,
        is_symlink: bool,
        size: u64,
        content: Option<&str>,
    ) -> Decision {
        // Symlinks are always rejected (deliberate inversion of the grounding
        // corpus's follow-and-resolve walker; see SPEC_FULL.md §9.1).
        if is_symlink {
            return Decision::Skip;
        }

        if self.is_hard_denied(rel_path) {
            return Decision::Skip;
        }

        if self.exclude.is_match(rel_path) {
            return Decision::Skip;
        }

        if let Some(gitignore) = &self.gitignore {
            let full_path = self.project_dir.join(rel_path);
            if gitignore.matched(&full_path, false).is_ignore() {
                return Decision::Skip;
            }
        }

        if let Some(content) = content
            && !metrics::is_valid_file(content)
        {
            return Decision::Skip;
        }

        if size > self.max_file_size {
            return Decision::Skip;
        }

        if self.include.len() > 0 {
            return if self.include.is_match(rel_path) {
                Decision::Index
            } else {
                Decision::Skip
            };
        }

        Decision::Index
    }

    /// Whether `rel_path` matches the hard deny list: a path component equal to
    /// one of [`HARD_DENY_DIRS`], or a filename matching [`HARD_DENY_GLOBS`].
    pub fn is_hard_denied(&self, rel_path: &str) -> bool {
        let path = Path::new(rel_path);
        if path
            .components()
            .any(|c| matches!(c, std::path::Component::Normal(name) if HARD_DENY_DIRS.contains(&name.to_string_lossy().as_ref())))
        {
            return true;
        }
        self.hard_deny_globs.is_match(rel_path)
    }

    /// Walk `self.project_dir`, applying the hard deny list and gitignore at the
    /// directory level (so whole trees like `node_modules/` are pruned rather
    /// than descended into), returning project-relative candidate paths. Full
    /// per-file policy (size/binary/include/exclude) is still applied by
    /// [`PolicyFilter::evaluate`] once content is available.
    pub fn walk(&self, max_files: usize) -> Result<Vec<String>> {
        let mut builder = WalkBuilder::new(&self.project_dir);
        builder.follow_links(false).hidden(false).git_ignore(self.gitignore.is_some());
        builder.filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !HARD_DENY_DIRS.contains(&name.as_ref())
        });

        let mut paths = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let is_symlink = entry.path_is_symlink();
            if is_symlink {
                continue;
            }
            if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                continue;
            }
            let rel = match entry.path().strip_prefix(&self.project_dir) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            if self.is_hard_denied(&rel_str) {
                continue;
            }
            paths.push(rel_str);
            if paths.len() > max_files {
                break;
            }
        }
        Ok(paths)
    }
}

fn build_globset(patterns: &[impl AsRef<str>]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern.as_ref()).map_err(|err| crate::error::Error::InvalidPattern {
            pattern: pattern.as_ref().to_string(),
            reason: err.to_string(),
        })?);
    }
    Ok(builder.build().map_err(|err| crate::error::Error::InvalidPattern {
        pattern: "<globset>".to_string(),
        reason: err.to_string(),
    })?)
}

#[cfg(test)]
#[path = "policy.test.rs"]
mod tests;
