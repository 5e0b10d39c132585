//! Listing filters supplied by the embedding

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::SyncResult;

/// Decides whether a relative path appears in the final listing.
///
/// Paths are relative to the synchronized tree root, `/`-separated, with
/// no leading slash.
pub trait PathFilter: Send + Sync {
    fn include(&self, relative_path: &str) -> bool;
}

/// Admits every path.
pub struct AcceptAll;

impl PathFilter for AcceptAll {
    fn include(&self, _relative_path: &str) -> bool {
        true
    }
}

/// Glob-based include/exclude rule sets.
///
/// Exclusion wins over inclusion; an empty include set admits everything
/// not excluded.
pub struct GlobPatternFilter {
    include: GlobSet,
    include_is_empty: bool,
    exclude: GlobSet,
}

impl GlobPatternFilter {
    pub fn new<'a, I, E>(include: I, exclude: E) -> SyncResult<Self>
    where
        I: IntoIterator<Item = &'a str>,
        E: IntoIterator<Item = &'a str>,
    {
        let mut include_builder = GlobSetBuilder::new();
        let mut include_is_empty = true;
        for pattern in include {
            include_builder.add(Glob::new(pattern)?);
            include_is_empty = false;
        }
        let mut exclude_builder = GlobSetBuilder::new();
        for pattern in exclude {
            exclude_builder.add(Glob::new(pattern)?);
        }
        Ok(Self {
            include: include_builder.build()?,
            include_is_empty,
            exclude: exclude_builder.build()?,
        })
    }
}

impl PathFilter for GlobPatternFilter {
    fn include(&self, relative_path: &str) -> bool {
        if self.exclude.is_match(relative_path) {
            return false;
        }
        self.include_is_empty || self.include.is_match(relative_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_all_admits_everything() {
        assert!(AcceptAll.include("any/path.txt"));
    }

    #[test]
    fn exclude_wins_over_include() {
        let filter =
            GlobPatternFilter::new(["**/*.md"], ["drafts/**"]).unwrap();
        assert!(filter.include("notes/today.md"));
        assert!(!filter.include("drafts/today.md"));
        assert!(!filter.include("notes/today.txt"));
    }

    #[test]
    fn empty_include_set_admits_non_excluded() {
        let filter = GlobPatternFilter::new([], ["**/.trash/**"]).unwrap();
        assert!(filter.include("a/b.txt"));
        assert!(!filter.include("a/.trash/b.txt"));
    }
}
