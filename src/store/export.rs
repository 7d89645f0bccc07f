//! Local JSON export of the domain

use std::path::{Path, PathBuf};

use aspire_types::DomainSnapshot;
use chrono::{Local, NaiveDate};

use super::{GraphStore, StoreChange};
use crate::error::Result;

/// `domain_model_<YYYY-MM-DD>.json`
pub fn snapshot_file_name(date: NaiveDate) -> String {
    format!("domain_model_{}.json", date.format("%Y-%m-%d"))
}

impl GraphStore {
    /// Copy of the current nodes, edges and collections
    pub fn snapshot(&self) -> Result<DomainSnapshot> {
        self.ensure_initialized()?;
        Ok(DomainSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            collections: self.collections.clone(),
        })
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(self.snapshot()?.to_json()?)
    }

    /// Write the snapshot into `dir` under today's file name.
    /// `is_saving()` is true while the file is being written.
    pub fn save_domain_to_json(&mut self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        self.save_domain_to_json_dated(dir, Local::now().date_naive())
    }

    pub fn save_domain_to_json_dated(
        &mut self,
        dir: impl AsRef<Path>,
        date: NaiveDate,
    ) -> Result<PathBuf> {
        let json = self.export_json()?;
        let path = dir.as_ref().join(snapshot_file_name(date));

        self.saving = true;
        self.notify(StoreChange::SavingChanged(true));
        let written = std::fs::write(&path, json);
        self.saving = false;
        self.notify(StoreChange::SavingChanged(false));

        written?;
        tracing::info!(path = %path.display(), "domain exported");
        Ok(path)
    }
}
