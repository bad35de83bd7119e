//! Input document parser.
//!
//! Provides [`InputParser`] to load JSON input documents and build block
//! trees from them. Documents are factory-dispatched on
//! `metadata.class_name` (`Block`, `Matrix`, `Layer`); `arguments` mirrors
//! the corresponding construction parameters. Sub-modules split the parser
//! into focused areas:
//!
//! - [`source`] – Input I/O abstraction (filesystem vs. in-memory)
//! - [`helpers`] – Point / row / transform / structure value parsing
//! - [`includes`] – Named include resolution on disk

pub mod helpers;
pub mod includes;
pub mod source;

pub use helpers::{parse_row_item_str, parse_transforms, resolve_include_reference};
pub use includes::*;
pub use source::*;

use crate::block::{Block, BlockParams, StructureType};
use crate::layer::LayerParams;
use crate::matrix::{MapSpec, MatrixParams};
use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use helpers::{CurveArg, TransformSpec};
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

// ────────────────────────────────────────────────────────────────────────────
// Document types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub class_name: String,
}

/// A parsed input document: class dispatch plus raw construction arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct InputDoc {
    pub metadata: Metadata,
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
}

fn empty_arguments() -> Value {
    Value::Object(serde_json::Map::new())
}

/// A child entry of a block: an inline document or a named include with
/// optional placement transforms.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChildSpec {
    Include {
        include: String,
        #[serde(default)]
        transforms: Vec<TransformSpec>,
    },
    Inline(InputDoc),
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
struct BlockArgs {
    #[serde(default)]
    points: Option<Value>,
    #[serde(default)]
    curves: Option<Vec<CurveArg>>,
    #[serde(default)]
    transforms: Vec<TransformSpec>,
    #[serde(default)]
    structure: Option<Value>,
    #[serde(default)]
    quadrate: bool,
    #[serde(default)]
    zone: Option<ZoneArg>,
    #[serde(default = "default_true")]
    do_register: bool,
    #[serde(default)]
    do_unregister: bool,
    #[serde(default)]
    boolean_level: Option<i32>,
    #[serde(default)]
    structure_type: Option<String>,
    #[serde(default)]
    children: Vec<ChildSpec>,
}

/// Zone argument: a volume zone name, or a detailed form that also names
/// the six boundary surfaces.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ZoneArg {
    Volume(String),
    Detailed {
        volume: String,
        #[serde(default)]
        surfaces: Option<Vec<String>>,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct MatrixArgs {
    points: Vec<Value>,
    #[serde(default)]
    transforms: Vec<TransformSpec>,
    #[serde(default)]
    do_register_map: Option<MapSpec<bool>>,
    #[serde(default)]
    structure_map: Value,
    #[serde(default)]
    quadrate_map: MapSpec<bool>,
    #[serde(default)]
    boolean_level_map: MapSpec<Option<i32>>,
    #[serde(default)]
    zone_map: MapSpec<Option<String>>,
}

#[derive(Debug, Clone, Deserialize)]
struct LayerArgs {
    lx: f64,
    ly: f64,
    heights: Value,
    #[serde(default)]
    transforms: Vec<TransformSpec>,
    #[serde(default)]
    do_register_map: Option<MapSpec<bool>>,
    #[serde(default)]
    structure_map: Value,
    #[serde(default)]
    quadrate_map: MapSpec<bool>,
    #[serde(default)]
    zone_map: MapSpec<Option<String>>,
}

// ────────────────────────────────────────────────────────────────────────────
// Parser
// ────────────────────────────────────────────────────────────────────────────

/// Core input parser. Generic over [`ContentSource`] so it can read from the
/// filesystem ([`FsSource`]) or from memory in tests.
pub struct InputParser<S: ContentSource> {
    root_dir: Utf8PathBuf,
    source: S,
    resolver: IncludeResolver,
    documents: BTreeMap<String, InputDoc>,
}

impl<S: ContentSource> InputParser<S> {
    pub fn new(root_dir: impl AsRef<Utf8Path>, source: S) -> Self {
        let root_dir = root_dir.as_ref().to_path_buf();
        let resolver = IncludeResolver::new([&root_dir]);
        Self {
            root_dir,
            source,
            resolver,
            documents: BTreeMap::new(),
        }
    }

    pub fn with_resolver(
        root_dir: impl AsRef<Utf8Path>,
        source: S,
        resolver: IncludeResolver,
    ) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
            source,
            resolver,
            documents: BTreeMap::new(),
        }
    }

    /// Parse an input file into a [`Block`] tree, resolving includes.
    pub fn parse_input_file(&mut self, path: impl AsRef<Utf8Path>) -> Result<Block> {
        let path = path.as_ref();
        let doc = self.load_document(path)?;
        let base_dir: Utf8PathBuf = path
            .parent()
            .map(|p| p.to_owned())
            .unwrap_or_else(|| self.root_dir.clone());
        self.preload_includes(&doc, &base_dir)?;
        let mut stack = vec![path.as_str().to_string()];
        self.build_document(&doc, &base_dir, &mut stack)
    }

    fn load_document(&mut self, path: &Utf8Path) -> Result<InputDoc> {
        if let Some(doc) = self.documents.get(path.as_str()) {
            return Ok(doc.clone());
        }
        let text = self.source.read_to_string(path)?;
        let doc: InputDoc = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON {}", path))?;
        self.documents.insert(path.as_str().to_string(), doc.clone());
        Ok(doc)
    }

    /// Resolve an include name to a readable path: relative to `base_dir`
    /// first, then through the resolver's search paths.
    fn resolve_include(&mut self, name: &str, base_dir: &Utf8Path) -> Result<Utf8PathBuf> {
        let candidate = resolve_include_reference(name, base_dir);
        if self.source.exists(&candidate) || self.documents.contains_key(candidate.as_str()) {
            return Ok(candidate);
        }
        let lookup = self.resolver.locate(std::iter::once(name));
        if let Some((_, path)) = lookup.found.into_iter().next() {
            return Ok(path);
        }
        bail!("Include {} not found (searched {})", name, candidate);
    }

    /// Read and parse the transitive include closure of a document up
    /// front, so nested documents are parsed in parallel.
    fn preload_includes(&mut self, doc: &InputDoc, base_dir: &Utf8Path) -> Result<()> {
        let mut pending = Vec::new();
        collect_include_names(&doc.arguments, &mut pending);
        while !pending.is_empty() {
            let mut texts: Vec<(Utf8PathBuf, String)> = Vec::new();
            for name in std::mem::take(&mut pending) {
                let path = self.resolve_include(&name, base_dir)?;
                if self.documents.contains_key(path.as_str()) {
                    continue;
                }
                let text = self.source.read_to_string(&path)?;
                texts.push((path, text));
            }
            let parsed: Vec<(Utf8PathBuf, Result<InputDoc>)> = texts
                .par_iter()
                .map(|(path, text)| {
                    let doc = serde_json::from_str::<InputDoc>(text)
                        .with_context(|| format!("Failed to parse JSON {}", path));
                    (path.clone(), doc)
                })
                .collect();
            for (path, result) in parsed {
                let doc = result?;
                collect_include_names(&doc.arguments, &mut pending);
                self.documents.insert(path.as_str().to_string(), doc);
            }
        }
        log::debug!("{} input documents loaded", self.documents.len());
        Ok(())
    }

    /// Build a block tree from a parsed document, dispatching on class name.
    fn build_document(
        &mut self,
        doc: &InputDoc,
        base_dir: &Utf8Path,
        stack: &mut Vec<String>,
    ) -> Result<Block> {
        match doc.metadata.class_name.as_str() {
            "Block" => self.build_block(&doc.arguments, base_dir, stack),
            "Matrix" => build_matrix(&doc.arguments),
            "Layer" => build_layer(&doc.arguments),
            other => bail!("Unknown class name: {}", other),
        }
    }

    fn build_block(
        &mut self,
        arguments: &Value,
        base_dir: &Utf8Path,
        stack: &mut Vec<String>,
    ) -> Result<Block> {
        let args: BlockArgs = serde_json::from_value(arguments.clone())
            .context("Failed to deserialize Block arguments")?;
        let mut params = BlockParams::default();
        if let Some(points) = &args.points {
            params.points = helpers::parse_points_spec(points)?;
        }
        if let Some(curves) = &args.curves {
            params.curves = helpers::parse_curves(curves)?;
        }
        params.transforms = parse_transforms(&args.transforms)?;
        if let Some(structure) = &args.structure {
            params.structure = Some(helpers::parse_structure_arg(structure)?);
        }
        params.quadrate = args.quadrate;
        match args.zone {
            Some(ZoneArg::Volume(volume)) => params.volume_zone = volume,
            Some(ZoneArg::Detailed { volume, surfaces }) => {
                params.volume_zone = volume;
                if let Some(surfaces) = surfaces {
                    anyhow::ensure!(
                        surfaces.len() == 6,
                        "Zone surfaces need 6 names, got {}",
                        surfaces.len()
                    );
                    params.surface_zones = surfaces;
                }
            }
            None => {}
        }
        params.do_register = args.do_register;
        params.do_unregister = args.do_unregister;
        params.boolean_level = args.boolean_level;
        if let Some(st) = &args.structure_type {
            params.structure_type = StructureType::parse(st)?;
        }
        for child in &args.children {
            match child {
                ChildSpec::Inline(doc) => {
                    params.children.push(self.build_document(doc, base_dir, stack)?);
                    params.children_transforms.push(Vec::new());
                }
                ChildSpec::Include {
                    include,
                    transforms,
                } => {
                    let path = self.resolve_include(include, base_dir)?;
                    if stack.contains(&path.as_str().to_string()) {
                        bail!("Include cycle through {}", path);
                    }
                    let doc = self.load_document(&path)?;
                    let child_base: Utf8PathBuf = path
                        .parent()
                        .map(|p| p.to_owned())
                        .unwrap_or_else(|| base_dir.to_owned());
                    stack.push(path.as_str().to_string());
                    let block = self.build_document(&doc, &child_base, stack)?;
                    stack.pop();
                    params.children.push(block);
                    params
                        .children_transforms
                        .push(parse_transforms(transforms)?);
                }
            }
        }
        Block::new(params)
    }
}

fn build_matrix(arguments: &Value) -> Result<Block> {
    let args: MatrixArgs = serde_json::from_value(arguments.clone())
        .context("Failed to deserialize Matrix arguments")?;
    let (rows, coordinate_system) = helpers::parse_grid_rows(&args.points)?;
    MatrixParams {
        rows,
        coordinate_system,
        transforms: parse_transforms(&args.transforms)?,
        do_register_map: args.do_register_map.unwrap_or(MapSpec::Uniform(true)),
        structure_map: helpers::parse_structure_map(&args.structure_map)?,
        quadrate_map: args.quadrate_map,
        boolean_level_map: args.boolean_level_map,
        zone_map: args.zone_map,
    }
    .build()
}

fn build_layer(arguments: &Value) -> Result<Block> {
    let args: LayerArgs = serde_json::from_value(arguments.clone())
        .context("Failed to deserialize Layer arguments")?;
    LayerParams {
        lx: args.lx,
        ly: args.ly,
        heights: helpers::parse_row(&args.heights)?,
        transforms: parse_transforms(&args.transforms)?,
        do_register_map: args.do_register_map.unwrap_or(MapSpec::Uniform(true)),
        structure_map: helpers::parse_structure_map(&args.structure_map)?,
        quadrate_map: args.quadrate_map,
        zone_map: args.zone_map,
    }
    .build()
}

/// Collect `{"include": "name"}` references anywhere in a document value.
fn collect_include_names(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(name) = map.get("include").and_then(|v| v.as_str()) {
                out.push(name.to_string());
            }
            for v in map.values() {
                collect_include_names(v, out);
            }
        }
        Value::Array(values) => {
            for v in values {
                collect_include_names(v, out);
            }
        }
        _ => {}
    }
}
