use lincoln_common::{DirectoryError, DirectoryResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::records::Searchable;

pub const MAX_LIMIT: u32 = 100;
pub const MAX_SEARCH_LENGTH: usize = 200;
/// Upper bound on `offset` for civil war orphan queries.
pub const MAX_OFFSET: u32 = 10_000;

static ORPHAN_SEARCH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9\s\-'.]+$").expect("search pattern must compile"));

/// The two tables the directory exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Students,
    CivilWarOrphans,
}

impl Dataset {
    pub fn name(self) -> &'static str {
        match self {
            Dataset::Students => "students",
            Dataset::CivilWarOrphans => "civil war orphans",
        }
    }
}

/// Optional search and paging input accepted by the list procedures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl RecordQuery {
    /// Check the query against the bounds of `dataset`.
    pub fn validate(&self, dataset: Dataset) -> DirectoryResult<()> {
        if let Some(limit) = self.limit {
            if !(1..=MAX_LIMIT).contains(&limit) {
                return Err(DirectoryError::InvalidInput(format!(
                    "limit must be between 1 and {MAX_LIMIT}"
                )));
            }
        }

        if dataset == Dataset::CivilWarOrphans {
            if let Some(offset) = self.offset {
                if offset > MAX_OFFSET {
                    return Err(DirectoryError::InvalidInput(format!(
                        "offset must not exceed {MAX_OFFSET}"
                    )));
                }
            }
        }

        if let Some(search) = &self.search {
            if search.chars().count() > MAX_SEARCH_LENGTH {
                return Err(DirectoryError::InvalidInput(format!(
                    "search must be at most {MAX_SEARCH_LENGTH} characters"
                )));
            }

            if dataset == Dataset::CivilWarOrphans && !ORPHAN_SEARCH_RE.is_match(search) {
                return Err(DirectoryError::InvalidInput(
                    "search can only contain letters, numbers, spaces, hyphens, apostrophes, and periods"
                        .to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Filter `records` by the search term, then page them.
    ///
    /// Matching is a case-insensitive substring test over each record's name
    /// fields. A blank search matches everything.
    pub(crate) fn apply<T: Searchable + Clone>(&self, records: &[T]) -> Vec<T> {
        let needle = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let offset = self.offset.unwrap_or(0) as usize;
        let limit = self.limit.map(|l| l as usize).unwrap_or(usize::MAX);

        records
            .iter()
            .filter(|record| match &needle {
                Some(needle) => record
                    .search_fields()
                    .iter()
                    .any(|field| field.to_lowercase().contains(needle.as_str())),
                None => true,
            })
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }
}
