use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ImportError;

/// File extensions the importer accepts, lowercase.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["fbx", "dxf", "3ds", "dae"];

pub const KEY_TAKE: &str = "Take";
pub const KEY_IMPORT_ANIMATION: &str = "ImportAnimation";
pub const KEY_SELECTION_SETS: &str = "SelectionSets";
pub const KEY_RUN_SILENT: &str = "RunSilent";

/// How source selection sets are represented on the target mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionSetMode {
    Ignore,
    /// Each set becomes a face group; polygons keep only their last group.
    #[default]
    FaceGroups,
    /// Each set becomes a named polygon selection; sets may overlap.
    PolygonSelections,
}

/// Import options bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Animation stack to import, by name or by a leading positional index
    /// such as `"1"` or `"1: Walk"`. `None` picks the first stack.
    pub take: Option<String>,
    pub import_animation: bool,
    pub selection_sets: SelectionSetMode,
    /// Skip the options prompt entirely.
    pub run_silent: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            take: None,
            import_animation: true,
            selection_sets: SelectionSetMode::default(),
            run_silent: false,
        }
    }
}

impl ImportSettings {
    /// Applies one flat key/value pair. Unknown keys are rejected.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ImportError> {
        match key {
            KEY_TAKE => {
                let value = value.trim();
                self.take = (!value.is_empty()).then(|| value.to_string());
            }
            KEY_IMPORT_ANIMATION => self.import_animation = parse_flag(key, value)?,
            KEY_RUN_SILENT => self.run_silent = parse_flag(key, value)?,
            KEY_SELECTION_SETS => {
                self.selection_sets = match value.trim().to_ascii_lowercase().as_str() {
                    "ignore" | "none" | "0" => SelectionSetMode::Ignore,
                    "face_groups" | "facegroups" | "1" => SelectionSetMode::FaceGroups,
                    "polygon_selections" | "polygonselections" | "2" => {
                        SelectionSetMode::PolygonSelections
                    }
                    other => {
                        return Err(ImportError::Settings(format!(
                            "unknown selection set mode '{other}'"
                        )));
                    }
                };
            }
            other => {
                return Err(ImportError::Settings(format!("unknown option '{other}'")));
            }
        }
        Ok(())
    }

    /// Parses `key=value` pairs as given on the command line.
    pub fn apply_pairs<'a>(
        &mut self,
        pairs: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ImportError> {
        for pair in pairs {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(ImportError::Settings(format!(
                    "expected key=value, got '{pair}'"
                )));
            };
            self.set(key.trim(), value)?;
        }
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ImportError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ImportError::Settings(format!(
            "option '{key}' expects a boolean, got '{other}'"
        ))),
    }
}

/// Whether `path` carries one of [`SUPPORTED_EXTENSIONS`].
pub fn recognize(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Save import settings to a JSON file.
pub fn save_import_settings(path: &Path, settings: &ImportSettings) -> Result<()> {
    let content = serde_json::to_string_pretty(settings)
        .context("failed to serialize import settings as JSON")?;
    fs::write(path, content)
        .with_context(|| format!("failed to save import settings: {}", path.display()))?;
    Ok(())
}

/// Load import settings from a JSON file.
pub fn load_import_settings(path: &Path) -> Result<ImportSettings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to load import settings: {}", path.display()))?;
    let settings: ImportSettings =
        serde_json::from_str(&content).context("failed to parse import settings JSON")?;
    Ok(settings)
}
