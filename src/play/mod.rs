//! play
//!
//! App-store detail records: one JSON document per package, keyed by the
//! store document id (which equals the package name). A details file
//! containing JSON `null` marks a package that was looked up but is not
//! published on the store.
//!
//! A separate `categories/` subdirectory holds late-scraped category data
//! as `{packageName, appCategory}` documents; [`augment_categories`] merges
//! those into already-loaded records by document id.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::types::PackageName;

/// Name of the category-augmentation subdirectory inside a details dir.
pub const CATEGORY_DIR: &str = "categories";

/// Errors from detail-record loading.
#[derive(Debug, Error)]
pub enum PlayError {
    #[error("details directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One app-store detail record.
///
/// Every property is optional; scrapes of delisted or partially rendered
/// store pages legitimately lack most of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayRecord {
    pub doc_id: Option<String>,
    pub uri: Option<String>,
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub app_category: Vec<String>,
    pub promotional_description: Option<String>,
    pub description_html: Option<String>,
    pub translated_description_html: Option<String>,
    pub version_code: Option<i64>,
    pub version_string: Option<String>,
    pub upload_date: Option<i64>,
    pub formatted_amount: Option<String>,
    pub currency_code: Option<String>,
    #[serde(rename = "in-app purchases")]
    pub in_app_purchases: Option<String>,
    pub install_notes: Option<String>,
    pub star_rating: Option<f64>,
    pub num_downloads: Option<String>,
    pub developer_name: Option<String>,
    pub developer_email: Option<String>,
    pub developer_website: Option<String>,
    pub target_sdk_version: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
}

/// Late-scraped category document, merged by document id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryRecord {
    package_name: String,
    app_category: String,
}

/// Accounting for one details-directory load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaySummary {
    /// Records with usable detail data.
    pub loaded: usize,
    /// Files holding JSON `null`: package confirmed absent from the store.
    pub absent: usize,
    /// Files that failed to parse; logged and skipped.
    pub malformed: usize,
    /// Category documents merged by [`augment_categories`].
    pub categories_applied: usize,
}

impl std::fmt::Display for PlaySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "app-store records: {} loaded, {} absent, {} malformed, {} categories applied",
            self.loaded, self.absent, self.malformed, self.categories_applied
        )
    }
}

fn io_err(path: &Path, source: std::io::Error) -> PlayError {
    PlayError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Load every `*.json` detail record in `dir`, keyed by filename stem.
///
/// The filename stem is the authoritative document id; an embedded `docId`
/// field, when present, is backfilled from it if missing. Subdirectories
/// (including `categories/`) are not descended into.
pub fn load_details(
    dir: &Path,
) -> Result<(BTreeMap<PackageName, PlayRecord>, PlaySummary), PlayError> {
    let mut records = BTreeMap::new();
    let mut summary = PlaySummary::default();

    let mut entries: Vec<_> = fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .collect::<Result<_, _>>()
        .map_err(|e| io_err(dir, e))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            warn!(path = %path.display(), "non-UTF-8 filename skipped");
            summary.malformed += 1;
            continue;
        };
        let package = match PackageName::new(stem) {
            Ok(package) => package,
            Err(err) => {
                warn!(%err, path = %path.display(), "invalid package filename skipped");
                summary.malformed += 1;
                continue;
            }
        };

        let raw = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        match serde_json::from_str::<Option<PlayRecord>>(&raw) {
            Ok(Some(mut record)) => {
                if record.doc_id.is_none() {
                    record.doc_id = Some(package.to_string());
                }
                records.insert(package, record);
                summary.loaded += 1;
            }
            Ok(None) => {
                debug!(%package, "package not published on store");
                summary.absent += 1;
            }
            Err(err) => {
                warn!(%err, path = %path.display(), "malformed detail record skipped");
                summary.malformed += 1;
            }
        }
    }

    Ok((records, summary))
}

/// Merge `categories/*.json` documents into loaded records.
///
/// Each document names one package and one category string; the category
/// is appended to the record's list unless already present. Documents for
/// unknown packages are skipped.
pub fn augment_categories(
    dir: &Path,
    records: &mut BTreeMap<PackageName, PlayRecord>,
    summary: &mut PlaySummary,
) -> Result<(), PlayError> {
    let category_dir = dir.join(CATEGORY_DIR);
    if !category_dir.is_dir() {
        return Ok(());
    }

    let mut entries: Vec<_> = fs::read_dir(&category_dir)
        .map_err(|e| io_err(&category_dir, e))?
        .collect::<Result<_, _>>()
        .map_err(|e| io_err(&category_dir, e))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        let raw = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        let category: CategoryRecord = match serde_json::from_str(&raw) {
            Ok(category) => category,
            Err(err) => {
                warn!(%err, path = %path.display(), "malformed category record skipped");
                summary.malformed += 1;
                continue;
            }
        };
        let Ok(package) = PackageName::new(category.package_name.clone()) else {
            warn!(package = %category.package_name, "category for invalid package skipped");
            summary.malformed += 1;
            continue;
        };
        let Some(record) = records.get_mut(&package) else {
            debug!(%package, "category for unknown package skipped");
            continue;
        };
        if !record.app_category.contains(&category.app_category) {
            record.app_category.push(category.app_category);
            summary.categories_applied += 1;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn loads_records_keyed_by_filename_stem() {
        let dir = tempfile::TempDir::new().unwrap();
        write(
            dir.path(),
            "com.example.app.json",
            r#"{"title": "Example", "starRating": 4.5, "permissions": ["CAMERA"]}"#,
        );

        let (records, summary) = load_details(dir.path()).unwrap();
        assert_eq!(summary.loaded, 1);
        let record = &records[&PackageName::new("com.example.app").unwrap()];
        assert_eq!(record.doc_id.as_deref(), Some("com.example.app"));
        assert_eq!(record.title.as_deref(), Some("Example"));
        assert_eq!(record.star_rating, Some(4.5));
        assert_eq!(record.permissions, vec!["CAMERA"]);
    }

    #[test]
    fn null_document_marks_package_absent() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "com.example.gone.json", "null");

        let (records, summary) = load_details(dir.path()).unwrap();
        assert!(records.is_empty());
        assert_eq!(summary.absent, 1);
    }

    #[test]
    fn malformed_document_is_skipped_and_counted() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "com.example.bad.json", "{not json");
        write(dir.path(), "com.example.ok.json", "{}");

        let (records, summary) = load_details(dir.path()).unwrap();
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.loaded, 1);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn non_json_files_are_ignored() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "README.txt", "notes");
        write(dir.path(), "com.example.app.json", "{}");

        let (records, summary) = load_details(dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(summary.malformed, 0);
    }

    #[test]
    fn categories_merge_by_package() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "com.example.app.json", r#"{"appCategory": ["Tools"]}"#);
        let categories = dir.path().join(CATEGORY_DIR);
        fs::create_dir(&categories).unwrap();
        write(
            &categories,
            "com.example.app.json",
            r#"{"packageName": "com.example.app", "appCategory": "Productivity"}"#,
        );
        write(
            &categories,
            "com.example.unknown.json",
            r#"{"packageName": "com.example.unknown", "appCategory": "Games"}"#,
        );

        let (mut records, mut summary) = load_details(dir.path()).unwrap();
        augment_categories(dir.path(), &mut records, &mut summary).unwrap();

        let record = &records[&PackageName::new("com.example.app").unwrap()];
        assert_eq!(record.app_category, vec!["Tools", "Productivity"]);
        assert_eq!(summary.categories_applied, 1);
    }

    #[test]
    fn duplicate_category_is_not_appended_twice() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "com.example.app.json", r#"{"appCategory": ["Tools"]}"#);
        let categories = dir.path().join(CATEGORY_DIR);
        fs::create_dir(&categories).unwrap();
        write(
            &categories,
            "com.example.app.json",
            r#"{"packageName": "com.example.app", "appCategory": "Tools"}"#,
        );

        let (mut records, mut summary) = load_details(dir.path()).unwrap();
        augment_categories(dir.path(), &mut records, &mut summary).unwrap();

        let record = &records[&PackageName::new("com.example.app").unwrap()];
        assert_eq!(record.app_category, vec!["Tools"]);
        assert_eq!(summary.categories_applied, 0);
    }

    #[test]
    fn missing_category_dir_is_fine() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "com.example.app.json", "{}");

        let (mut records, mut summary) = load_details(dir.path()).unwrap();
        augment_categories(dir.path(), &mut records, &mut summary).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(summary.categories_applied, 0);
    }
}
