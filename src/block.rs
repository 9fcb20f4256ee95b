use crate::error::{compile_bail, CompileResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Procedure signature payload carried by `procedures_prototype` and `procedures_call` blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    #[serde(rename = "tagName")]
    pub tag_name: String,
    pub children: Vec<Value>,
    pub proccode: String,
    pub argumentids: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argumentnames: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argumentdefaults: Option<String>,
    pub warp: String,
}

impl Mutation {
    /// Signature token: the procedure identity followed by one ` %s` per parameter.
    pub fn proccode(procedure_id: &str, arity: usize) -> String {
        format!("{}{}", procedure_id, " %s".repeat(arity))
    }

    pub fn for_call(proccode: String, argument_ids: &[String]) -> CompileResult<Self> {
        Ok(Self {
            tag_name: "mutation".to_string(),
            children: Vec::new(),
            proccode,
            argumentids: canonical_json(argument_ids)?,
            argumentnames: None,
            argumentdefaults: None,
            warp: "false".to_string(),
        })
    }

    pub fn for_prototype(
        proccode: String,
        argument_ids: &[String],
        argument_names: &[String],
    ) -> CompileResult<Self> {
        let mut mutation = Self::for_call(proccode, argument_ids)?;
        mutation.argumentnames = Some(canonical_json(argument_names)?);
        mutation.argumentdefaults = Some(canonical_json(&vec![""; argument_ids.len()])?);
        Ok(mutation)
    }
}

/// Compact, ASCII-unescaped JSON. Prototype and call mutations must byte-match.
fn canonical_json<T: Serialize + ?Sized>(value: &T) -> CompileResult<String> {
    match serde_json::to_string(value) {
        Ok(text) => Ok(text),
        Err(err) => compile_bail!(Internal, "Cannot encode mutation payload: {}.", err),
    }
}

/// One opcode node of the emitted graph, in `project.json` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub opcode: String,
    pub next: Option<String>,
    pub parent: Option<String>,
    pub inputs: BTreeMap<String, Value>,
    pub fields: BTreeMap<String, Value>,
    pub shadow: bool,
    #[serde(rename = "topLevel")]
    pub top_level: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<Mutation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
}

impl BlockRecord {
    pub fn new(opcode: &str) -> Self {
        Self {
            opcode: opcode.to_string(),
            next: None,
            parent: None,
            inputs: BTreeMap::new(),
            fields: BTreeMap::new(),
            shadow: false,
            top_level: false,
            mutation: None,
            x: None,
            y: None,
        }
    }

    pub fn top_level(mut self) -> Self {
        self.top_level = true;
        self
    }

    pub fn shadow(mut self) -> Self {
        self.shadow = true;
        self
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn with_next(mut self, next: Option<&str>) -> Self {
        self.next = next.map(str::to_string);
        self
    }

    pub fn with_input(mut self, slot: &str, payload: Value) -> Self {
        self.inputs.insert(slot.to_string(), payload);
        self
    }

    pub fn with_field(mut self, slot: &str, token: Value) -> Self {
        self.fields.insert(slot.to_string(), token);
        self
    }

    pub fn with_mutation(mut self, mutation: Mutation) -> Self {
        self.mutation = Some(mutation);
        self
    }

    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// The compiled artifact: blocks by id plus the variables the program declared.
///
/// Append-only. After insertion a record only has its `parent`/`next` links
/// (and workspace position, for top-level roots) rewritten.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockGraph {
    blocks: BTreeMap<String, BlockRecord>,
    variables: BTreeMap<String, (String, Value)>,
}

impl BlockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: &str, record: BlockRecord) -> CompileResult<()> {
        if self.blocks.contains_key(id) {
            compile_bail!(
                Internal,
                "Block id '{}' ({}) was emitted twice; structural ids must be unique.",
                id,
                record.opcode
            );
        }
        self.blocks.insert(id.to_string(), record);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&BlockRecord> {
        self.blocks.get(id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> impl Iterator<Item = (&String, &BlockRecord)> {
        self.blocks.iter()
    }

    fn block_mut(&mut self, id: &str) -> CompileResult<&mut BlockRecord> {
        match self.blocks.get_mut(id) {
            Some(block) => Ok(block),
            None => compile_bail!(Internal, "Link target '{}' was never emitted.", id),
        }
    }

    pub fn set_parent(&mut self, id: &str, parent: &str) -> CompileResult<()> {
        self.block_mut(id)?.parent = Some(parent.to_string());
        Ok(())
    }

    pub fn set_next(&mut self, id: &str, next: &str) -> CompileResult<()> {
        self.block_mut(id)?.next = Some(next.to_string());
        Ok(())
    }

    pub fn set_position(&mut self, id: &str, x: i32, y: i32) -> CompileResult<()> {
        let block = self.block_mut(id)?;
        block.x = Some(x);
        block.y = Some(y);
        Ok(())
    }

    pub fn declare_variable(&mut self, id: &str, display_name: &str, initial: Value) {
        self.variables
            .insert(id.to_string(), (display_name.to_string(), initial));
    }

    pub fn variables(&self) -> impl Iterator<Item = (&String, &(String, Value))> {
        self.variables.iter()
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Ids along the `next` chain starting at `head`, in order.
    pub fn walk_next(&self, head: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = Some(head.to_string());
        while let Some(id) = cursor {
            if out.contains(&id) {
                break;
            }
            cursor = self.blocks.get(&id).and_then(|block| block.next.clone());
            out.push(id);
        }
        out
    }

    pub fn blocks_json(&self) -> serde_json::Result<serde_json::Map<String, Value>> {
        self.blocks
            .iter()
            .map(|(id, block)| block.to_json().map(|json| (id.clone(), json)))
            .collect()
    }

    pub fn variables_json(&self) -> serde_json::Map<String, Value> {
        self.variables
            .iter()
            .map(|(id, (name, initial))| {
                let entry = Value::Array(vec![Value::String(name.clone()), initial.clone()]);
                (id.clone(), entry)
            })
            .collect()
    }
}
