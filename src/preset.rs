//! Named presets
//!
//! One `<name>.json` file per preset in a flat directory. Each file carries
//! a SHA-256 checksum of its parameter map so a hand-edited or truncated file
//! is reported instead of silently half-applied.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{KeroError, Result};
use crate::params::{ParamValues, ParameterStore};

/// File extension of preset files
pub const PRESET_EXTENSION: &str = "json";

/// One saved preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub saved_at: DateTime<Utc>,
    /// Parameter id → value
    pub params: BTreeMap<String, f32>,
    /// Hex SHA-256 of the serialized `params`
    pub checksum: String,
}

impl Preset {
    pub fn new(name: &str, values: &ParamValues) -> Result<Self> {
        let params: BTreeMap<String, f32> = serde_json::from_value(serde_json::to_value(values)?)?;
        let checksum = checksum(&params)?;
        Ok(Self {
            name: name.to_string(),
            saved_at: Utc::now(),
            params,
            checksum,
        })
    }

    /// Whether the stored checksum matches the parameter map
    pub fn verify(&self) -> bool {
        checksum(&self.params)
            .map(|c| c == self.checksum)
            .unwrap_or(false)
    }

    /// Write every value into `store`, clamped. Locks do not apply.
    pub fn apply_to(&self, store: &ParameterStore) -> usize {
        store.apply_map(&self.params)
    }
}

fn checksum(params: &BTreeMap<String, f32>) -> Result<String> {
    let bytes = serde_json::to_vec(params)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Reject names that are empty or could escape the preset directory
pub fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed.starts_with('.')
        || trimmed
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':' | '\0') || c.is_control());
    if invalid {
        return Err(KeroError::InvalidPresetName {
            name: name.to_string(),
        });
    }
    Ok(trimmed)
}

/// Directory of preset files
#[derive(Debug, Clone)]
pub struct PresetLibrary {
    dir: PathBuf,
}

impl PresetLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, PRESET_EXTENSION))
    }

    /// Preset names, sorted. A missing directory lists as empty.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry.path().extension().and_then(|e| e.to_str()) == Some(PRESET_EXTENSION)
            })
            .filter_map(|entry| {
                entry
                    .path()
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
            })
            .collect();

        names.sort();
        Ok(names)
    }

    pub fn exists(&self, name: &str) -> bool {
        validate_name(name)
            .map(|n| self.path_for(n).is_file())
            .unwrap_or(false)
    }

    /// Save `values` under `name`, overwriting any existing preset
    pub fn save(&self, name: &str, values: &ParamValues) -> Result<PathBuf> {
        let name = validate_name(name)?;
        fs::create_dir_all(&self.dir)?;

        let preset = Preset::new(name, values)?;
        let path = self.path_for(name);
        fs::write(&path, serde_json::to_string_pretty(&preset)?)?;

        tracing::info!(preset = name, path = %path.display(), "Saved preset");
        Ok(path)
    }

    /// Read and verify a preset
    pub fn load(&self, name: &str) -> Result<Preset> {
        let name = validate_name(name)?;
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(KeroError::PresetNotFound {
                name: name.to_string(),
            });
        }

        let content = fs::read_to_string(&path)?;
        let preset: Preset =
            serde_json::from_str(&content).map_err(|_| KeroError::PresetCorrupted {
                name: name.to_string(),
            })?;

        if !preset.verify() {
            tracing::warn!(preset = name, "Preset checksum mismatch");
            return Err(KeroError::PresetCorrupted {
                name: name.to_string(),
            });
        }

        tracing::debug!(preset = name, "Loaded preset");
        Ok(preset)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let name = validate_name(name)?;
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(KeroError::PresetNotFound {
                name: name.to_string(),
            });
        }
        fs::remove_file(&path)?;
        tracing::info!(preset = name, "Deleted preset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamId;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use test_case::test_case;

    fn library() -> (TempDir, PresetLibrary) {
        let dir = TempDir::new().unwrap();
        let lib = PresetLibrary::new(dir.path().join("Patches"));
        (dir, lib)
    }

    #[test_case("" ; "empty")]
    #[test_case("   " ; "blank")]
    #[test_case("../escape" ; "parent dir")]
    #[test_case("a/b" ; "separator")]
    #[test_case(".hidden" ; "dotfile")]
    fn test_invalid_names(name: &str) {
        assert!(matches!(
            validate_name(name),
            Err(KeroError::InvalidPresetName { .. })
        ));
    }

    #[test]
    fn test_valid_name_trimmed() {
        assert_eq!(validate_name("  Vocal Warm ").unwrap(), "Vocal Warm");
    }

    #[test]
    fn test_missing_dir_lists_empty() {
        let (_dir, lib) = library();
        assert!(lib.list().unwrap().is_empty());
    }

    #[test]
    fn test_save_list_load_delete() {
        let (_dir, lib) = library();
        let store = ParameterStore::new();
        store.set(ParamId::ReverbMix, 0.35);

        lib.save("zeta", &store.snapshot()).unwrap();
        lib.save("Alpha", &ParamValues::defaults()).unwrap();
        assert_eq!(lib.list().unwrap(), vec!["Alpha".to_string(), "zeta".to_string()]);

        let preset = lib.load("zeta").unwrap();
        assert_eq!(preset.name, "zeta");
        assert_eq!(preset.params["revMix"], 0.35);

        let fresh = ParameterStore::new();
        assert_eq!(preset.apply_to(&fresh), 20);
        assert_eq!(fresh.snapshot(), store.snapshot());

        lib.delete("zeta").unwrap();
        assert_eq!(lib.list().unwrap(), vec!["Alpha".to_string()]);
        assert!(!lib.exists("zeta"));
    }

    #[test]
    fn test_load_missing() {
        let (_dir, lib) = library();
        assert!(matches!(
            lib.load("ghost"),
            Err(KeroError::PresetNotFound { .. })
        ));
        assert!(matches!(
            lib.delete("ghost"),
            Err(KeroError::PresetNotFound { .. })
        ));
    }

    #[test]
    fn test_tampered_preset_rejected() {
        let (_dir, lib) = library();
        let path = lib.save("edit", &ParamValues::defaults()).unwrap();

        let mut preset: Preset =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        preset.params.insert("lowG".to_string(), 12.0);
        fs::write(&path, serde_json::to_string(&preset).unwrap()).unwrap();

        assert!(matches!(
            lib.load("edit"),
            Err(KeroError::PresetCorrupted { .. })
        ));
    }

    #[test]
    fn test_garbage_file_is_corrupted() {
        let (_dir, lib) = library();
        fs::create_dir_all(lib.dir()).unwrap();
        fs::write(lib.dir().join("junk.json"), "{{{").unwrap();
        assert!(matches!(
            lib.load("junk"),
            Err(KeroError::PresetCorrupted { .. })
        ));
    }

    #[test]
    fn test_other_files_not_listed() {
        let (_dir, lib) = library();
        fs::create_dir_all(lib.dir().join("sub")).unwrap();
        fs::write(lib.dir().join("notes.txt"), "x").unwrap();
        fs::write(lib.dir().join("sub").join("deep.json"), "{}").unwrap();
        lib.save("one", &ParamValues::defaults()).unwrap();
        assert_eq!(lib.list().unwrap(), vec!["one".to_string()]);
    }
}
