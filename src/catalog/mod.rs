//! Source clip catalog
//!
//! Maps audio identifiers (file names) to descriptive metadata. The catalog
//! is read-only while rendering: refreshing it produces a new snapshot,
//! which callers share as `Arc<Catalog>`.

mod entry;
mod loudness;
mod scan;

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub use entry::{format_duration, CatalogDocument, CatalogEntry, Category};
pub use loudness::{LoudnessLevel, LOUD_ABOVE_DB, MEDIUM_ABOVE_DB, SOFT_ABOVE_DB};
pub use scan::{analyze_clip, ClipAnalysis, ScanError, ScanReport, AUDIO_EXTENSIONS};

use crate::error::{Result, WhitenoiseError};

/// Shared, immutable catalog handed to renders and validators
pub type CatalogSnapshot = Arc<Catalog>;

/// Outcome of looking up a source id
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution<'a> {
    pub exists: bool,
    pub entry: Option<&'a CatalogEntry>,
}

/// Indexed, read-only view over a [`CatalogDocument`]
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    document: CatalogDocument,
    /// filename -> (category id, position in its file list)
    index: HashMap<String, (String, usize)>,
}

impl Catalog {
    /// Build a catalog from a parsed document
    pub fn from_document(document: CatalogDocument) -> Self {
        let mut index = HashMap::new();
        for (category_id, category) in &document.categories {
            for (pos, entry) in category.files.iter().enumerate() {
                index
                    .entry(entry.filename.clone())
                    .or_insert_with(|| (category_id.clone(), pos));
            }
        }
        Self { document, index }
    }

    /// Parse a catalog from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let document: CatalogDocument = serde_yaml::from_str(yaml)?;
        Ok(Self::from_document(document))
    }

    /// Load a catalog file from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(WhitenoiseError::CatalogNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Write the catalog back as YAML
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_yaml_string()?)?;
        Ok(())
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.document)?)
    }

    /// The underlying document
    pub fn document(&self) -> &CatalogDocument {
        &self.document
    }

    /// Take the document back out, e.g. to edit and re-index it
    pub fn into_document(self) -> CatalogDocument {
        self.document
    }

    /// Look up a source id
    pub fn resolve(&self, id: &str) -> Resolution<'_> {
        let entry = self.get(id);
        Resolution {
            exists: entry.is_some(),
            entry,
        }
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        let (category, pos) = self.index.get(id)?;
        self.document
            .categories
            .get(category)
            .and_then(|c| c.files.get(*pos))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Every catalogued file name
    pub fn available_files(&self) -> BTreeSet<String> {
        self.index.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterate `(category id, category, entry)` in catalog order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Category, &CatalogEntry)> {
        self.document.categories.iter().flat_map(|(id, category)| {
            category
                .files
                .iter()
                .map(move |entry| (id.as_str(), category, entry))
        })
    }

    /// Compact listing of the library used to brief the LLM composer
    pub fn prompt_summary(&self) -> String {
        let mut out = String::from("Available sound library:\n");

        for (category_id, category) in &self.document.categories {
            let title = if category.name_en.is_empty() {
                category_id.as_str()
            } else {
                category.name_en.as_str()
            };
            let _ = writeln!(out, "\n## {}", title);

            for entry in &category.files {
                let description = if entry.description_en.is_empty() {
                    &entry.description_zh
                } else {
                    &entry.description_en
                };
                let duration = entry.duration_formatted.as_deref().unwrap_or("?");
                let level = match entry.volume_level {
                    LoudnessLevel::Unknown => LoudnessLevel::Medium,
                    level => level,
                };
                let _ = writeln!(
                    out,
                    "- {}: {} | scene: {} | duration: {} | volume: {}",
                    entry.filename, description, entry.scene, duration, level
                );
            }
        }

        out
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_CATALOG: &str = r#"
categories:
  rain_sounds:
    name_zh: 雨声
    name_en: Rain
    files:
      - filename: light-rain.mp3
        description_zh: 小雨淅沥声
        description_en: Light drizzling rain
        scene: relax, sleep
        duration_seconds: 125.5
        duration_formatted: "2:05"
        volume_level: soft
        volume_db: -28.1
      - filename: heavy-rain.mp3
        description_en: Heavy rain
        volume_level: strong
  birds:
    name_en: Birds
    files:
      - filename: forest-birds.mp3
        description_en: Birdsong in a forest
"#;

    pub(crate) fn sample_catalog() -> Catalog {
        Catalog::from_yaml_str(SAMPLE_CATALOG).unwrap()
    }

    #[test]
    fn test_resolve_known_and_unknown() {
        let catalog = sample_catalog();

        let hit = catalog.resolve("light-rain.mp3");
        assert!(hit.exists);
        assert_eq!(hit.entry.unwrap().volume_db, Some(-28.1));

        let miss = catalog.resolve("ocean.mp3");
        assert!(!miss.exists);
        assert!(miss.entry.is_none());
    }

    #[test]
    fn test_available_files() {
        let catalog = sample_catalog();
        let files: Vec<String> = catalog.available_files().into_iter().collect();
        assert_eq!(
            files,
            vec!["forest-birds.mp3", "heavy-rain.mp3", "light-rain.mp3"]
        );
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_prompt_summary_lists_every_file() {
        let summary = sample_catalog().prompt_summary();
        assert!(summary.contains("## Rain"));
        assert!(summary.contains("- light-rain.mp3: Light drizzling rain"));
        assert!(summary.contains("volume: loud"));
        // Unanalysed clips are briefed as medium
        assert!(summary.contains("forest-birds.mp3: Birdsong in a forest | scene:  | duration: ? | volume: medium"));
    }

    #[test]
    fn test_load_missing_catalog() {
        let err = Catalog::load(Path::new("/nonexistent/audio_descriptions.yaml")).unwrap_err();
        assert_eq!(err.error_code(), "CATALOG_NOT_FOUND");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio_descriptions.yaml");
        let catalog = sample_catalog();
        catalog.save(&path).unwrap();

        let reloaded = Catalog::load(&path).unwrap();
        assert_eq!(reloaded.document(), catalog.document());
    }
}
