use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use dpc_core::{AttributeMode, Catalog, PersistedProductState};
use dpc_lint::LintConfig;
use serde::Deserialize;
use tracing::debug;

pub const CONFIG_FILE: &str = "dpc.config.yaml";
const DEFAULT_CATALOG_PATTERN: &str = "**/*.catalog.json";

/// A catalog file with its path.
pub struct CatalogFile {
    pub path: String,
    pub catalog: Catalog,
}

/// Project configuration from dpc.config.yaml.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DpcConfig {
    pub name: Option<String>,
    pub version: Option<String>,
    /// Glob patterns for catalog files, relative to the config directory.
    pub catalogs: Option<Vec<String>>,
    #[serde(default)]
    pub lint: LintConfig,
    /// Applied to products that do not record a global mode.
    pub global_attribute_mode: Option<AttributeMode>,
}

/// Read project config from the directory, or from beside the file.
pub fn read_project_config(input_path: &Path) -> Result<Option<DpcConfig>, String> {
    let dir = if input_path.is_dir() {
        input_path
    } else {
        match input_path.parent() {
            Some(parent) => parent,
            None => return Ok(None),
        }
    };
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&config_path)
        .map_err(|e| format!("Failed to read {}: {e}", config_path.display()))?;
    let config: DpcConfig = serde_yaml::from_str(&content)
        .map_err(|e| format!("Invalid YAML config {}: {e}", config_path.display()))?;
    debug!(path = %config_path.display(), name = ?config.name, "project config loaded");
    Ok(Some(config))
}

/// Read catalog files from a path (file or directory).
pub fn read_catalog_files(input_path: &Path) -> Result<Vec<CatalogFile>, String> {
    if !input_path.exists() {
        return Err(format!("Path does not exist: {}", input_path.display()));
    }

    let paths = if input_path.is_file() {
        vec![input_path.to_path_buf()]
    } else if input_path.is_dir() {
        let patterns = read_project_config(input_path)?
            .and_then(|c| c.catalogs)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_CATALOG_PATTERN.to_string()]);
        scan_directory(input_path, &patterns)?
    } else {
        return Err(format!(
            "Path is neither a file nor a directory: {}",
            input_path.display()
        ));
    };

    if paths.is_empty() {
        return Err(format!(
            "No catalog files (*.catalog.json) found at: {}",
            input_path.display()
        ));
    }

    paths
        .into_iter()
        .map(|path| {
            let content = fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
            let catalog =
                Catalog::from_json(&content).map_err(|e| format!("{}: {e}", path.display()))?;
            Ok(CatalogFile {
                path: path.to_string_lossy().to_string(),
                catalog,
            })
        })
        .collect()
}

/// Read and merge every catalog at `input_path`. An entity defined in two
/// files is an error.
pub fn read_catalog(input_path: &Path) -> Result<Catalog, String> {
    let files = read_catalog_files(input_path)?;
    let mut origin: BTreeMap<String, String> = BTreeMap::new();
    let mut entities = BTreeMap::new();

    for file in files {
        for (key, entity) in file.catalog.entities {
            if let Some(first) = origin.get(&key) {
                return Err(format!(
                    "Entity \"{key}\" is defined in both {first} and {}",
                    file.path
                ));
            }
            origin.insert(key.clone(), file.path.clone());
            entities.insert(key, entity);
        }
    }

    Ok(Catalog::new(entities))
}

/// Read a persisted product, applying the project's global attribute mode
/// when the file has none.
pub fn read_product(product_path: &Path) -> Result<PersistedProductState, String> {
    let content = fs::read_to_string(product_path)
        .map_err(|e| format!("Failed to read {}: {e}", product_path.display()))?;
    let mut value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| format!("{}: invalid product JSON: {e}", product_path.display()))?;

    let default_mode = read_project_config(product_path)?.and_then(|c| c.global_attribute_mode);
    if let (Some(mode), Some(obj)) = (default_mode, value.as_object_mut()) {
        if !obj.contains_key("globalAttributeMode") {
            let mode = serde_json::to_value(mode)
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            obj.insert("globalAttributeMode".into(), mode);
        }
    }

    PersistedProductState::from_json(&value.to_string())
        .map_err(|e| format!("{}: {e}", product_path.display()))
}

fn scan_directory(dir_path: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, String> {
    let mut paths: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let full_pattern = dir_path.join(pattern);
        let pattern_str = full_pattern.to_string_lossy().replace('\\', "/");
        let entries = glob::glob(&pattern_str)
            .map_err(|e| format!("Invalid glob pattern '{pattern}': {e}"))?;

        for entry in entries {
            let path = entry.map_err(|e| format!("Glob error: {e}"))?;
            if path.is_file() && !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    paths.sort();
    Ok(paths)
}
