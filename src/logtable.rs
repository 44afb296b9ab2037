//! Append-only processing log.
//!
//! The table is an explicit accumulator: [`LogTable::append`] consumes
//! the old table and returns the new one, and persistence is a separate
//! call the orchestrator makes after each batch. The table is write-only
//! from the core's point of view; it is never read back from disk.
//! Invariant: `filename_out` is unique across the table.

use std::path::Path;

use crate::errors::Result;

/// One processed-layer record.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LogEntry {
    pub layername: String,
    pub agfunction: String,
    pub dataset: String,
    pub layertitle: String,
    pub filename_out: String,
    pub loginfo: String,
}

impl LogEntry {
    /// Entry with the default title (`{layername}_{agfunction}`) and
    /// status (`processed`).
    pub fn new(layername: &str, agfunction: &str, dataset: &str, filename_out: &str) -> Self {
        LogEntry {
            layername: layername.to_string(),
            agfunction: agfunction.to_string(),
            dataset: dataset.to_string(),
            layertitle: format!("{layername}_{agfunction}"),
            filename_out: filename_out.to_string(),
            loginfo: "processed".to_string(),
        }
    }

    pub fn with_loginfo(mut self, loginfo: &str) -> Self {
        self.loginfo = loginfo.to_string();
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogTable {
    entries: Vec<LogEntry>,
}

impl LogTable {
    pub fn new() -> Self {
        LogTable::default()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, filename_out: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.filename_out == filename_out)
    }

    /// Append a batch of entries, returning the new table.
    ///
    /// If any entry's `filename_out` already exists in the table, or
    /// repeats within the batch, the whole batch is dropped and the
    /// table comes back unchanged. The data source does not matter;
    /// uniqueness is on the output filename alone.
    #[must_use]
    pub fn append(self, batch: Vec<LogEntry>) -> Self {
        for (index, entry) in batch.iter().enumerate() {
            let duplicated_in_batch = batch[..index]
                .iter()
                .any(|earlier| earlier.filename_out == entry.filename_out);
            if self.contains(&entry.filename_out) || duplicated_in_batch {
                log::warn!(
                    "{} already exists in the log table, batch not added",
                    entry.filename_out
                );
                return self;
            }
        }
        let mut entries = self.entries;
        entries.extend(batch);
        LogTable { entries }
    }

    /// Rewrite the whole table to a CSV file.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for entry in &self.entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        Ok(())
    }
}
