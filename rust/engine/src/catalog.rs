// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Asset catalog: materials, fixtures and room styles read from disk.
//!
//! Layout under the catalog root:
//!
//! ```text
//! materials/<slug>/material.json
//! fixtures/<slug>/metadata.json
//! styles/<slug>/manifest.json
//! ```
//!
//! A [`Catalog`] is an immutable snapshot. Share it behind an `Arc` and call
//! [`Catalog::refresh`] to obtain a new one after assets change on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, Result};

/// Resolves material slugs to render-ready descriptions
pub trait MaterialResolver: Send + Sync {
    fn resolve(&self, slug: &str) -> Option<MaterialInfo>;
}

/// A material with texture paths made absolute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialInfo {
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Texture role (albedo, normal, ...) to file.
    #[serde(default)]
    pub textures: BTreeMap<String, PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roughness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metalness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_color: Option<[u8; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uv_scale: Option<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureInfo {
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<PathBuf>,
    #[serde(default)]
    pub metadata: Value,
}

/// Material assignment inside a room style, e.g. `kitchen:floor`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleMaterial {
    pub target: String,
    pub material: String,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleFixture {
    pub asset: String,
    #[serde(default)]
    pub placement: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomStyle {
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub materials: Vec<StyleMaterial>,
    #[serde(default)]
    pub fixtures: Vec<StyleFixture>,
    #[serde(default)]
    pub metadata: Value,
}

impl RoomStyle {
    /// Highest-priority material for `target`.
    pub fn material_for(&self, target: &str) -> Option<&str> {
        self.materials
            .iter()
            .filter(|m| m.target.eq_ignore_ascii_case(target))
            .max_by_key(|m| m.priority)
            .map(|m| m.material.as_str())
    }
}

// On-disk manifest shapes

#[derive(Deserialize)]
struct MaterialManifest {
    slug: Option<String>,
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    textures: BTreeMap<String, String>,
    #[serde(default)]
    properties: MaterialProperties,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct MaterialProperties {
    roughness: Option<f64>,
    metalness: Option<f64>,
    uv_scale: Option<[f64; 2]>,
    base_color: Option<[u8; 3]>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureManifest {
    slug: Option<String>,
    name: Option<String>,
    description: Option<String>,
    model_path: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    metadata: Value,
}

#[derive(Deserialize)]
struct StyleManifest {
    slug: Option<String>,
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    materials: Vec<StyleMaterial>,
    #[serde(default)]
    fixtures: Vec<StyleFixture>,
    #[serde(default)]
    metadata: Value,
}

/// Immutable snapshot of an asset directory
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    root: PathBuf,
    materials: BTreeMap<String, MaterialInfo>,
    fixtures: BTreeMap<String, FixtureInfo>,
    room_styles: BTreeMap<String, RoomStyle>,
}

impl Catalog {
    /// Read every manifest under `root`.
    ///
    /// Missing sections are empty. A manifest that cannot be parsed is
    /// logged and skipped; only an unreadable directory is an error.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if root.exists() && !root.is_dir() {
            return Err(EngineError::catalog(&root, "catalog root is not a directory"));
        }

        let materials = load_section(&root, "materials", "material.json", material_from)?;
        let fixtures = load_section(&root, "fixtures", "metadata.json", fixture_from)?;
        let room_styles = load_section(&root, "styles", "manifest.json", style_from)?;

        tracing::info!(
            root = %root.display(),
            materials = materials.len(),
            fixtures = fixtures.len(),
            room_styles = room_styles.len(),
            "Asset catalog loaded"
        );

        Ok(Self {
            root,
            materials,
            fixtures,
            room_styles,
        })
    }

    /// Re-read the same root into a new snapshot.
    pub fn refresh(&self) -> Result<Self> {
        Self::load(&self.root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn material(&self, slug: &str) -> Option<&MaterialInfo> {
        self.materials.get(slug)
    }

    pub fn fixture(&self, slug: &str) -> Option<&FixtureInfo> {
        self.fixtures.get(slug)
    }

    pub fn room_style(&self, slug: &str) -> Option<&RoomStyle> {
        self.room_styles.get(slug)
    }

    pub fn materials(&self) -> impl Iterator<Item = &MaterialInfo> {
        self.materials.values()
    }

    pub fn fixtures(&self) -> impl Iterator<Item = &FixtureInfo> {
        self.fixtures.values()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty() && self.fixtures.is_empty() && self.room_styles.is_empty()
    }
}

impl MaterialResolver for Catalog {
    fn resolve(&self, slug: &str) -> Option<MaterialInfo> {
        self.materials.get(slug).cloned()
    }
}

fn load_section<M, T, F>(
    root: &Path,
    section: &str,
    manifest_name: &str,
    build: F,
) -> Result<BTreeMap<String, T>>
where
    M: DeserializeOwned,
    F: Fn(&Path, String, M) -> (String, T),
{
    let mut records = BTreeMap::new();
    let dir = root.join(section);
    if !dir.is_dir() {
        tracing::debug!(path = %dir.display(), "Catalog section not found");
        return Ok(records);
    }

    let entries = fs::read_dir(&dir).map_err(|e| EngineError::catalog(&dir, e))?;
    let mut entries: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    entries.sort();

    for entry in entries {
        let manifest = entry.join(manifest_name);
        if !manifest.is_file() {
            tracing::debug!(path = %entry.display(), "Skipping asset without manifest");
            continue;
        }
        let parsed = fs::read_to_string(&manifest)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str::<M>(&text).map_err(|e| e.to_string()));
        match parsed {
            Ok(data) => {
                let dir_slug = entry
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let (slug, record) = build(&entry, dir_slug, data);
                records.insert(slug, record);
            }
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    path = %manifest.display(),
                    "Failed to load asset manifest"
                );
            }
        }
    }
    Ok(records)
}

/// `floor_oak_modern` -> `Floor Oak Modern`
fn title_case(slug: &str) -> String {
    slug.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Manifest paths are relative to the asset's own directory.
fn asset_path(dir: &Path, relative: &str) -> PathBuf {
    let trimmed = relative.strip_prefix("./").unwrap_or(relative);
    dir.join(trimmed)
}

fn material_from(dir: &Path, dir_slug: String, m: MaterialManifest) -> (String, MaterialInfo) {
    let slug = m.slug.unwrap_or(dir_slug);
    let info = MaterialInfo {
        name: m.name.unwrap_or_else(|| title_case(&slug)),
        description: m.description,
        textures: m
            .textures
            .iter()
            .map(|(role, path)| (role.clone(), asset_path(dir, path)))
            .collect(),
        roughness: m.properties.roughness,
        metalness: m.properties.metalness,
        base_color: m.properties.base_color,
        uv_scale: m.properties.uv_scale,
        slug: slug.clone(),
    };
    (slug, info)
}

fn fixture_from(dir: &Path, dir_slug: String, m: FixtureManifest) -> (String, FixtureInfo) {
    let slug = m.slug.unwrap_or(dir_slug);
    let info = FixtureInfo {
        name: m.name.unwrap_or_else(|| title_case(&slug)),
        description: m.description,
        model_path: m.model_path.as_deref().map(|p| asset_path(dir, p)),
        thumbnail: m.thumbnail.as_deref().map(|p| asset_path(dir, p)),
        metadata: m.metadata,
        slug: slug.clone(),
    };
    (slug, info)
}

fn style_from(_dir: &Path, dir_slug: String, m: StyleManifest) -> (String, RoomStyle) {
    let slug = m.slug.unwrap_or(dir_slug);
    let style = RoomStyle {
        name: m.name.unwrap_or_else(|| title_case(&slug)),
        description: m.description,
        materials: m.materials,
        fixtures: m.fixtures,
        metadata: m.metadata,
        slug: slug.clone(),
    };
    (slug, style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn seeded() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "materials/floor_oak_modern/material.json",
            r#"{
                "slug": "floor_oak_modern",
                "name": "Modern Oak",
                "textures": {"albedo": "./albedo.png", "normal": "./normal.png"},
                "properties": {"roughness": 0.55, "uvScale": [1.2, 1.2], "baseColor": [166, 126, 88]}
            }"#,
        );
        write(
            dir.path(),
            "materials/wall_paint_matte/material.json",
            r#"{"properties": {"roughness": 0.92}}"#,
        );
        write(dir.path(), "materials/broken/material.json", "{ not json");
        write(
            dir.path(),
            "fixtures/sofa_modern_block/metadata.json",
            r#"{"name": "Sofa", "modelPath": "./model.glb", "metadata": {"defaultRoom": "living"}}"#,
        );
        write(
            dir.path(),
            "styles/modern/manifest.json",
            r#"{
                "name": "Modern",
                "materials": [
                    {"target": "kitchen:floor", "material": "tile_ceramic_grey", "priority": 0},
                    {"target": "kitchen:floor", "material": "floor_oak_modern", "priority": 2}
                ],
                "fixtures": [{"asset": "sofa_modern_block"}]
            }"#,
        );
        dir
    }

    #[test]
    fn test_load_materials() {
        let dir = seeded();
        let catalog = Catalog::load(dir.path()).unwrap();

        let oak = catalog.resolve("floor_oak_modern").unwrap();
        assert_eq!(oak.name, "Modern Oak");
        assert_eq!(oak.roughness, Some(0.55));
        assert_eq!(oak.base_color, Some([166, 126, 88]));
        assert_eq!(oak.uv_scale, Some([1.2, 1.2]));
        assert_eq!(
            oak.textures.get("albedo"),
            Some(&dir.path().join("materials/floor_oak_modern/albedo.png"))
        );

        // slug and name fall back to the directory
        let paint = catalog.resolve("wall_paint_matte").unwrap();
        assert_eq!(paint.name, "Wall Paint Matte");
        assert!(paint.textures.is_empty());

        assert!(catalog.resolve("broken").is_none());
        assert_eq!(catalog.materials().count(), 2);
    }

    #[test]
    fn test_fixtures_and_styles() {
        let dir = seeded();
        let catalog = Catalog::load(dir.path()).unwrap();

        let sofa = catalog.fixture("sofa_modern_block").unwrap();
        assert_eq!(sofa.name, "Sofa");
        assert_eq!(
            sofa.model_path.as_deref(),
            Some(dir.path().join("fixtures/sofa_modern_block/model.glb").as_path())
        );
        assert_eq!(sofa.metadata["defaultRoom"], "living");

        let style = catalog.room_style("modern").unwrap();
        assert_eq!(style.material_for("KITCHEN:FLOOR"), Some("floor_oak_modern"));
        assert_eq!(style.material_for("garage:floor"), None);
        assert_eq!(style.fixtures[0].asset, "sofa_modern_block");
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::load(dir.path().join("nowhere")).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_root_must_be_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("assets");
        fs::write(&file, "x").unwrap();
        assert!(matches!(Catalog::load(&file), Err(EngineError::Catalog { .. })));
    }

    #[test]
    fn test_refresh_is_a_new_snapshot() {
        let dir = seeded();
        let shared = Arc::new(Catalog::load(dir.path()).unwrap());
        write(
            dir.path(),
            "materials/tile_ceramic_grey/material.json",
            r#"{"name": "Grey Tile"}"#,
        );

        assert!(shared.resolve("tile_ceramic_grey").is_none());
        let refreshed = shared.refresh().unwrap();
        assert_eq!(refreshed.resolve("tile_ceramic_grey").unwrap().name, "Grey Tile");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("kitchen_quartz_white"), "Kitchen Quartz White");
        assert_eq!(title_case("a__b"), "A B");
    }
}
