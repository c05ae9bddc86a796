use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use lincoln_common::{DirectoryConfig, DirectoryResult};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::query::RecordQuery;
use crate::records::{CivilWarOrphan, Student};

/// Read access to the record tables.
///
/// Implementations receive queries that have already been validated.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn students(&self, query: &RecordQuery) -> DirectoryResult<Vec<Student>>;

    async fn civil_war_orphans(&self, query: &RecordQuery) -> DirectoryResult<Vec<CivilWarOrphan>>;
}

/// Directory held entirely in memory, ordered as loaded.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    students: Vec<Student>,
    civil_war_orphans: Vec<CivilWarOrphan>,
}

impl InMemoryDirectory {
    pub fn from_records(students: Vec<Student>, civil_war_orphans: Vec<CivilWarOrphan>) -> Self {
        Self {
            students,
            civil_war_orphans,
        }
    }

    /// Load both tables from the JSON exports named in `config`. A table without
    /// a configured path starts empty.
    pub fn load(config: &DirectoryConfig) -> anyhow::Result<Self> {
        let students = load_table(config.students_path.as_deref(), "students")?;
        let civil_war_orphans =
            load_table(config.civil_war_orphans_path.as_deref(), "civil war orphans")?;

        Ok(Self::from_records(students, civil_war_orphans))
    }

    pub fn student_count(&self) -> usize {
        self.students.len()
    }

    pub fn civil_war_orphan_count(&self) -> usize {
        self.civil_war_orphans.len()
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn students(&self, query: &RecordQuery) -> DirectoryResult<Vec<Student>> {
        Ok(query.apply(&self.students))
    }

    async fn civil_war_orphans(&self, query: &RecordQuery) -> DirectoryResult<Vec<CivilWarOrphan>> {
        Ok(query.apply(&self.civil_war_orphans))
    }
}

fn load_table<T: DeserializeOwned>(path: Option<&Path>, table: &str) -> anyhow::Result<Vec<T>> {
    let Some(path) = path else {
        warn!(table, "no data file configured, table will be empty");
        return Ok(Vec::new());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {} from {}", table, path.display()))?;
    let records: Vec<T> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {} from {}", table, path.display()))?;

    info!(table, count = records.len(), path = %path.display(), "loaded records");
    Ok(records)
}
