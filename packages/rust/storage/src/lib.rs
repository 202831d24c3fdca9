//! File-backed source lists and result output.
//!
//! Layout on disk:
//! - `<source_dir>/<category>.txt` — one source URL per line
//! - `<output_dir>/<category>_proxies.txt` — one record per line, sorted
//!
//! The pipeline only sees the [`SourceStore`] and [`RecordSink`] traits;
//! [`FileStore`] implements both.

mod defaults;

use std::io::Write;
use std::path::{Path, PathBuf};

use proxyharvest_shared::{Category, HarvestError, PathsConfig, Record, Result, SourceSet};
use tracing::{debug, info};

pub use defaults::default_sources;

/// Read side: where a category's source URLs come from.
pub trait SourceStore: Send + Sync {
    /// Load the source set for `category`.
    ///
    /// Returns [`HarvestError::MissingSources`] when no list exists and
    /// [`HarvestError::UnreadableSources`] when it exists but cannot be read.
    fn load_sources(&self, category: Category) -> Result<SourceSet>;
}

/// Write side: where a category's records go. Each write replaces the
/// previous content for that category.
pub trait RecordSink: Send + Sync {
    /// Persist `records` in the given order and return the destination path.
    fn write_records(&self, category: Category, records: &[Record]) -> Result<PathBuf>;
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// Plain-text store rooted at a source directory and an output directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    source_dir: PathBuf,
    output_dir: PathBuf,
}

impl FileStore {
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Build a store from the `[paths]` config section.
    pub fn from_config(paths: &PathsConfig) -> Self {
        Self::new(paths.source_path(), paths.output_path())
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the source list for `category`.
    pub fn source_path(&self, category: Category) -> PathBuf {
        self.source_dir.join(category.source_file_name())
    }

    /// Path of the output file for `category`.
    pub fn output_path(&self, category: Category) -> PathBuf {
        self.output_dir.join(category.output_file_name())
    }

    /// Write the built-in source list for every category that has none.
    ///
    /// With `force`, existing lists are overwritten too. Returns the paths
    /// that were written.
    pub fn init_sources(&self, force: bool) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.source_dir)
            .map_err(|e| HarvestError::io(&self.source_dir, e))?;

        let mut written = Vec::new();
        for category in Category::ALL {
            let path = self.source_path(category);
            if path.exists() && !force {
                debug!(?path, %category, "source list exists, leaving it alone");
                continue;
            }

            let mut content = String::new();
            for url in default_sources(category) {
                content.push_str(url);
                content.push('\n');
            }
            std::fs::write(&path, content).map_err(|e| HarvestError::io(&path, e))?;
            info!(?path, %category, "wrote default source list");
            written.push(path);
        }

        Ok(written)
    }
}

impl SourceStore for FileStore {
    fn load_sources(&self, category: Category) -> Result<SourceSet> {
        let path = self.source_path(category);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HarvestError::MissingSources { category, path });
            }
            Err(source) => {
                return Err(HarvestError::UnreadableSources {
                    category,
                    path,
                    source,
                });
            }
        };

        let sources = SourceSet::parse(&content);
        debug!(?path, %category, sources = sources.len(), "loaded source list");
        Ok(sources)
    }
}

impl RecordSink for FileStore {
    /// Writes to a sibling temp file and renames it over the destination, so
    /// an interrupted write never leaves a truncated list behind.
    fn write_records(&self, category: Category, records: &[Record]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| HarvestError::io(&self.output_dir, e))?;

        let path = self.output_path(category);
        let tmp_path = path.with_extension("txt.tmp");

        if let Err(e) = write_then_rename(&tmp_path, &path, records) {
            // No partial temp file is left beside the output.
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }
        info!(?path, %category, records = records.len(), "records written");

        Ok(path)
    }
}

fn write_then_rename(tmp_path: &Path, path: &Path, records: &[Record]) -> Result<()> {
    let file = std::fs::File::create(tmp_path).map_err(|e| HarvestError::io(tmp_path, e))?;
    let mut writer = std::io::BufWriter::new(file);
    for record in records {
        writeln!(writer, "{record}").map_err(|e| HarvestError::io(tmp_path, e))?;
    }
    writer.flush().map_err(|e| HarvestError::io(tmp_path, e))?;
    drop(writer);

    std::fs::rename(tmp_path, path).map_err(|e| HarvestError::io(path, e))
}
