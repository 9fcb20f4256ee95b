use crate::block::BlockGraph;
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipArchive;

const DEFAULT_STAGE_SVG: &str = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" "#,
    r#"width="480" height="360" viewBox="0 0 480 360"></svg>"#
);
const DEFAULT_SPRITE_SVG: &str = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" "#,
    r#"width="64" height="64" viewBox="0 0 64 64"></svg>"#
);

/// Where a compiled graph lands inside the project.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Sprite that receives the blocks. Defaults to the first sprite.
    pub sprite: Option<String>,
}

/// A Scratch 3 project: `project.json` plus its asset files.
#[derive(Debug, Clone)]
pub struct ProjectBundle {
    project: Value,
    assets: BTreeMap<String, Vec<u8>>,
}

impl ProjectBundle {
    /// Empty stage plus one empty sprite.
    pub fn template() -> Self {
        let mut assets = BTreeMap::new();
        let backdrop = costume_json("backdrop1", DEFAULT_STAGE_SVG, 240.0, 180.0, &mut assets);
        let costume = costume_json("costume1", DEFAULT_SPRITE_SVG, 32.0, 32.0, &mut assets);
        let stage = target_json("Stage", true, 0, backdrop);
        let sprite = target_json("Sprite1", false, 1, costume);
        let project = json!({
            "targets": [stage, sprite],
            "monitors": [],
            "extensions": [],
            "meta": {
                "semver": "3.0.0",
                "vm": "0.2.0",
                "agent": "blocktext"
            }
        });
        Self { project, assets }
    }

    pub fn from_project_json(project: Value) -> Result<Self> {
        let targets = project
            .get("targets")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("Invalid project.json: missing 'targets' array."))?;
        if !targets
            .iter()
            .any(|t| t.get("isStage").and_then(Value::as_bool).unwrap_or(false))
        {
            bail!("Invalid project.json: no stage target.");
        }
        Ok(Self {
            project,
            assets: BTreeMap::new(),
        })
    }

    pub fn read_sb3(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to open '{}'.", path.display()))?;
        Self::read_sb3_bytes(&bytes)
            .with_context(|| format!("'{}' is not a usable .sb3 project.", path.display()))
    }

    pub fn read_sb3_bytes(bytes: &[u8]) -> Result<Self> {
        let mut zip = ZipArchive::new(Cursor::new(bytes)).context("Not a valid zip archive.")?;

        let mut project_json_str = String::new();
        zip.by_name("project.json")
            .map_err(|_| anyhow!("project.json not found."))?
            .read_to_string(&mut project_json_str)?;
        let project: Value =
            serde_json::from_str(&project_json_str).context("Invalid project.json.")?;
        let mut bundle = Self::from_project_json(project)?;

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            let name = entry.name().to_string();
            if name == "project.json" || name.ends_with('/') {
                continue;
            }
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            bundle.assets.insert(name, data);
        }
        debug!("loaded project with {} assets", bundle.assets.len());
        Ok(bundle)
    }

    pub fn project_json(&self) -> &Value {
        &self.project
    }

    pub fn assets(&self) -> impl Iterator<Item = (&String, &Vec<u8>)> {
        self.assets.iter()
    }

    /// Blocks region of the script target.
    pub fn blocks(&self, options: &CompileOptions) -> Result<&Map<String, Value>> {
        let index = self.script_target_index(options)?;
        self.targets()?[index]
            .get("blocks")
            .and_then(Value::as_object)
            .ok_or_else(|| anyhow!("Target has no 'blocks' object."))
    }

    /// Variables region of the stage.
    pub fn variables(&self) -> Result<&Map<String, Value>> {
        let index = self.stage_index()?;
        self.targets()?[index]
            .get("variables")
            .and_then(Value::as_object)
            .ok_or_else(|| anyhow!("Stage has no 'variables' object."))
    }

    /// Merge a compiled graph: blocks into the script target, variables into the stage.
    pub fn commit(&mut self, graph: &BlockGraph, options: &CompileOptions) -> Result<()> {
        let script_index = self.script_target_index(options)?;
        let stage_index = self.stage_index()?;

        let blocks = object_entry(self.target_mut(script_index)?, "blocks")?;
        for (id, _) in graph.blocks() {
            if blocks.contains_key(id) {
                bail!("Block id '{}' already exists in the target project.", id);
            }
        }
        blocks.extend(graph.blocks_json()?);

        let variables = object_entry(self.target_mut(stage_index)?, "variables")?;
        variables.extend(graph.variables_json());
        info!(
            "committed {} blocks and {} variables",
            graph.len(),
            graph.variable_count()
        );
        Ok(())
    }

    /// `project.json` first, then assets in name order.
    pub fn build_sb3_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::<u8>::new());
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let opts =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        zip.start_file("project.json", opts)?;
        zip.write_all(&serde_json::to_vec(&self.project)?)?;
        for (name, bytes) in &self.assets {
            zip.start_file(name.as_str(), opts)?;
            zip.write_all(bytes)?;
        }
        zip.finish()?;
        Ok(buffer.into_inner())
    }

    pub fn write_sb3(&self, output_path: &Path) -> Result<()> {
        let bytes = self.build_sb3_bytes()?;
        write_file(output_path, &bytes)
    }

    pub fn write_project_json(&self, output_path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.project)?;
        write_file(output_path, text.as_bytes())
    }

    fn targets(&self) -> Result<&Vec<Value>> {
        self.project
            .get("targets")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("Invalid project.json: missing 'targets' array."))
    }

    fn target_mut(&mut self, index: usize) -> Result<&mut Value> {
        self.project
            .get_mut("targets")
            .and_then(Value::as_array_mut)
            .and_then(|targets| targets.get_mut(index))
            .ok_or_else(|| anyhow!("Missing target #{}.", index))
    }

    fn stage_index(&self) -> Result<usize> {
        self.targets()?
            .iter()
            .position(is_stage)
            .ok_or_else(|| anyhow!("Project has no stage."))
    }

    fn script_target_index(&self, options: &CompileOptions) -> Result<usize> {
        let targets = self.targets()?;
        match &options.sprite {
            Some(name) => targets
                .iter()
                .position(|t| {
                    !is_stage(t) && t.get("name").and_then(Value::as_str) == Some(name.as_str())
                })
                .ok_or_else(|| anyhow!("Sprite '{}' not found in project.", name)),
            None => targets
                .iter()
                .position(|t| !is_stage(t))
                .ok_or_else(|| anyhow!("Project has no sprite to hold the compiled scripts.")),
        }
    }
}

fn is_stage(target: &Value) -> bool {
    target
        .get("isStage")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn object_entry<'v>(target: &'v mut Value, key: &str) -> Result<&'v mut Map<String, Value>> {
    let obj = target
        .as_object_mut()
        .ok_or_else(|| anyhow!("Target is not an object."))?;
    obj.entry(key)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| anyhow!("Target has invalid '{}' shape.", key))
}

fn write_file(output_path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output_path, bytes)
        .with_context(|| format!("Failed to write '{}'.", output_path.display()))
}

fn costume_json(
    name: &str,
    svg: &str,
    center_x: f64,
    center_y: f64,
    assets: &mut BTreeMap<String, Vec<u8>>,
) -> Value {
    let digest = format!("{:x}", md5::compute(svg.as_bytes()));
    let md5ext = format!("{}.svg", digest);
    assets.insert(md5ext.clone(), svg.as_bytes().to_vec());
    json!({
        "name": name,
        "assetId": digest,
        "md5ext": md5ext,
        "dataFormat": "svg",
        "rotationCenterX": center_x,
        "rotationCenterY": center_y
    })
}

fn target_json(name: &str, is_stage: bool, layer_order: i32, costume: Value) -> Value {
    let mut target = json!({
        "isStage": is_stage,
        "name": name,
        "variables": {},
        "lists": {},
        "broadcasts": {},
        "blocks": {},
        "comments": {},
        "currentCostume": 0,
        "costumes": [costume],
        "sounds": [],
        "volume": 100,
        "layerOrder": layer_order
    });
    let extra = if is_stage {
        json!({
            "tempo": 60,
            "videoTransparency": 50,
            "videoState": "on",
            "textToSpeechLanguage": Value::Null
        })
    } else {
        json!({
            "visible": true,
            "x": 0,
            "y": 0,
            "size": 100,
            "direction": 90,
            "draggable": false,
            "rotationStyle": "all around"
        })
    };
    if let (Some(dst), Some(add)) = (target.as_object_mut(), extra.as_object()) {
        for (k, v) in add {
            dst.insert(k.clone(), v.clone());
        }
    }
    target
}
