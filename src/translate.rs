//! AST → block graph.
//!
//! One recursive walk per compilation. Every node kind has its own
//! `translate_*` function; bodies are linked into `next`/`parent` chains by
//! [`Translator::translate_body`], which also owns scope push/pop.

use crate::ast::{FunctionDeclaration, Node, NodePath};
use crate::block::{BlockGraph, BlockRecord, Mutation};
use crate::builtins::{self, Slot, SlotKind};
use crate::error::{compile_bail, CompileResult};
use crate::ident::{generate_id, procedure_ids, IdKey};
use crate::scope::{ScopeStack, VariableBinding};
use crate::value::Value;
use log::{debug, trace};
use serde_json::{json, Value as Json};
use std::collections::HashSet;

const ARGUMENT_REPORTER: &str = "argument_reporter_string_number";
const ENTRY_HAT: &str = "event_whenflagclicked";
const PROCEDURE_X: i32 = 30;
const SCRIPT_X: i32 = 320;
const SCRIPT_SPACING: i32 = 160;

/// Parameter bindings a procedure hands to the scope of its own body.
#[derive(Debug, Clone, Default)]
pub struct PendingArguments {
    bindings: Vec<(String, String)>,
}

impl PendingArguments {
    pub fn new(names: &[String], ids: &[String]) -> Self {
        Self {
            bindings: names.iter().cloned().zip(ids.iter().cloned()).collect(),
        }
    }
}

/// Translate a `Program` AST into a fresh block graph.
pub fn compile(program: &Node) -> CompileResult<BlockGraph> {
    let mut graph = BlockGraph::new();
    Translator::new(&mut graph).translate_root(program)?;
    debug!(
        "compiled {} blocks and {} variables",
        graph.len(),
        graph.variable_count()
    );
    Ok(graph)
}

pub struct Translator<'a, 'g> {
    graph: &'g mut BlockGraph,
    scopes: ScopeStack<'a>,
    layout_y: i32,
}

impl<'a, 'g> Translator<'a, 'g> {
    pub fn new(graph: &'g mut BlockGraph) -> Self {
        Self {
            graph,
            scopes: ScopeStack::new(),
            layout_y: 0,
        }
    }

    /// Returns the id of the program's entry hat.
    pub fn translate_root(&mut self, root: &'a Node) -> CompileResult<String> {
        match root {
            Node::Program { body } => self.translate_program(body, &NodePath::root()),
            other => compile_bail!(
                InvalidStatement,
                "Expected a Program at the root, found {}.",
                other.kind_name()
            ),
        }
    }

    fn translate(&mut self, node: &'a Node, path: &NodePath) -> CompileResult<Option<Value>> {
        match node {
            Node::Program { .. } => compile_bail!(
                InvalidStatement,
                "A Program can only appear at the root (found at {}).",
                path.as_str()
            ),
            Node::Block { body } => self.translate_body(body, path, None),
            Node::Identifier { name } => self.translate_identifier(name, path).map(Some),
            Node::VariableDeclaration {
                name,
                is_const,
                value,
            } => self.translate_variable_declaration(name, *is_const, value.as_deref(), path),
            Node::String { value } => Ok(Some(Value::text(value))),
            Node::Number { value } => Ok(Some(Value::number(*value))),
            Node::FunctionCall { name, args } => self.translate_call(name, args, path).map(Some),
            Node::FunctionDeclaration(decl) => {
                self.translate_function_declaration(decl, path)?;
                Ok(None)
            }
        }
    }

    fn translate_program(&mut self, body: &'a [Node], path: &NodePath) -> CompileResult<String> {
        let hat_id = generate_id(IdKey::EntryHat { program: path });
        let (x, y) = self.next_position(SCRIPT_X);
        self.graph.insert(&hat_id, BlockRecord::new(ENTRY_HAT).top_level())?;
        self.graph.set_position(&hat_id, x, y)?;

        if let Some(chain) = self.translate_body(body, path, None)? {
            if let Some(head) = chain.head() {
                self.graph.set_next(&hat_id, head)?;
                self.graph.set_parent(head, &hat_id)?;
            }
        }
        Ok(hat_id)
    }

    /// Translate a statement sequence in its own scope and link it into one chain.
    ///
    /// `pending` is bound into the new frame before the first statement; it is
    /// only ever passed for the immediate body of a procedure.
    pub fn translate_body(
        &mut self,
        body: &'a [Node],
        path: &NodePath,
        pending: Option<PendingArguments>,
    ) -> CompileResult<Option<Value>> {
        let identity = generate_id(IdKey::Scope { body: path });
        trace!("entering body {} with scope {}", path.as_str(), identity);
        self.scopes.push_child(identity);
        let linked = self.link_statements(body, path, pending);
        self.scopes.pop();
        linked
    }

    fn link_statements(
        &mut self,
        body: &'a [Node],
        path: &NodePath,
        pending: Option<PendingArguments>,
    ) -> CompileResult<Option<Value>> {
        if let Some(pending) = pending {
            for (name, id) in pending.bindings {
                self.scopes
                    .declare_variable(&name, VariableBinding::Argument { id })?;
            }
        }

        let mut start: Option<String> = None;
        let mut tail: Option<String> = None;
        for (index, statement) in body.iter().enumerate() {
            let Some(value) = self.translate(statement, &path.child(index))? else {
                continue;
            };
            let Some((head, last)) = value.chain_ends() else {
                compile_bail!(
                    InvalidStatement,
                    "A {} cannot be used as a statement ({}).",
                    value.describe(),
                    path.child(index).as_str()
                );
            };
            match &tail {
                None => start = Some(head.to_string()),
                Some(prev) => {
                    self.graph.set_next(prev, head)?;
                    self.graph.set_parent(head, prev)?;
                }
            }
            tail = Some(last.to_string());
        }

        Ok(start.zip(tail).map(|(head, tail)| Value::Chain { head, tail }))
    }

    fn translate_identifier(&mut self, name: &str, path: &NodePath) -> CompileResult<Value> {
        let (binding, frame) = self.scopes.resolve_variable(name)?;
        match binding {
            VariableBinding::Plain { id, .. } => Ok(Value::VariableRef {
                name: name.to_string(),
                frame,
                id: id.clone(),
            }),
            VariableBinding::Argument { id } => {
                // Reading an argument is itself a reporter block; the consumer sets its parent.
                let reporter_id = generate_id(IdKey::ArgumentReporter { node: path });
                let reporter = BlockRecord::new(ARGUMENT_REPORTER)
                    .with_field("VALUE", json!([id, Json::Null]));
                self.graph.insert(&reporter_id, reporter)?;
                Ok(Value::SingleBlock(reporter_id))
            }
        }
    }

    fn translate_variable_declaration(
        &mut self,
        name: &str,
        is_const: bool,
        initializer: Option<&'a Node>,
        path: &NodePath,
    ) -> CompileResult<Option<Value>> {
        // The initializer sees the enclosing binding, not the one being declared.
        let initial = match initializer {
            Some(node) => {
                let what = format!("The initial value of '{}'", name);
                Some(self.translate_input(node, &path.child(0), &what)?)
            }
            None => None,
        };

        let scope = self.scopes.current_identity().to_string();
        let variable_id = generate_id(IdKey::Variable {
            scope: &scope,
            name,
        });
        self.scopes
            .declare_variable(name, VariableBinding::plain(variable_id.clone(), is_const))?;
        self.graph.declare_variable(&variable_id, &variable_id, json!(0));
        let kind = if is_const { "constant" } else { "variable" };
        debug!("declared {} '{}' as {}", kind, name, variable_id);

        let Some(initial) = initial else {
            return Ok(None);
        };
        let set_id = generate_id(IdKey::Call { node: path });
        let target = self.write_target(name, "data_setvariableto")?;
        let token = self.record_write(&target, "data_setvariableto")?;
        let mut record = BlockRecord::new("data_setvariableto").with_field("VARIABLE", token);
        let payload = self.embed(initial, "VALUE", SlotKind::Value, &set_id, "data_setvariableto")?;
        record.inputs.insert("VALUE".to_string(), payload);
        self.graph.insert(&set_id, record)?;
        Ok(Some(Value::SingleBlock(set_id)))
    }

    fn translate_call(
        &mut self,
        name: &str,
        args: &'a [Node],
        path: &NodePath,
    ) -> CompileResult<Value> {
        if self.scopes.has_function(name) {
            self.translate_procedure_call(name, args, path)
        } else {
            self.translate_builtin_call(name, args, path)
        }
    }

    fn translate_builtin_call(
        &mut self,
        opcode: &str,
        args: &'a [Node],
        path: &NodePath,
    ) -> CompileResult<Value> {
        let Some(block_type) = builtins::lookup(opcode) else {
            compile_bail!(UndeclaredFunction, "Function '{}' is not declared.", opcode);
        };
        if args.len() < block_type.min_args() {
            compile_bail!(
                TooFewArguments,
                "Too few arguments in function {} (expected at least {}, got {}).",
                opcode,
                block_type.min_args(),
                args.len()
            );
        }
        if args.len() > block_type.max_args() {
            compile_bail!(
                TooManyArguments,
                "Too many arguments in function {} (expected at most {}, got {}).",
                opcode,
                block_type.max_args(),
                args.len()
            );
        }

        let call_id = generate_id(IdKey::Call { node: path });
        trace!("builtin {} -> {}", opcode, call_id);
        let mut record = BlockRecord::new(opcode);
        for (index, arg) in args.iter().enumerate() {
            match block_type.slot(index) {
                Some(Slot::Field(slot)) => {
                    let token = self.translate_write_target(arg, opcode)?;
                    record.fields.insert(slot.to_string(), token);
                }
                Some(Slot::Input(slot)) => {
                    // An empty body leaves a sub-sequence input absent.
                    if slot.kind == SlotKind::Stack
                        && matches!(arg, Node::Block { body } if body.is_empty())
                    {
                        continue;
                    }
                    let what = format!("Input {} of {}", slot.name, opcode);
                    let value = self.translate_input(arg, &path.child(index), &what)?;
                    let payload = self.embed(value, slot.name, slot.kind, &call_id, opcode)?;
                    record.inputs.insert(slot.name.to_string(), payload);
                }
                None => compile_bail!(
                    TooManyArguments,
                    "Too many arguments in function {}.",
                    opcode
                ),
            }
        }
        self.graph.insert(&call_id, record)?;
        Ok(Value::SingleBlock(call_id))
    }

    /// Translate an argument that is embedded somewhere. Declarations are
    /// rejected before they can bind anything in the enclosing scope.
    fn translate_input(
        &mut self,
        node: &'a Node,
        path: &NodePath,
        what: &str,
    ) -> CompileResult<Value> {
        if let Node::VariableDeclaration { .. } | Node::FunctionDeclaration(_) = node {
            compile_bail!(
                InvalidSlot,
                "{} cannot be a {} ({}).",
                what,
                node.kind_name(),
                path.as_str()
            );
        }
        match self.translate(node, path)? {
            Some(value) => Ok(value),
            None => compile_bail!(
                InvalidSlot,
                "{} needs a value, but its argument produces none ({}).",
                what,
                path.as_str()
            ),
        }
    }

    /// Field arguments name the variable being written.
    fn translate_write_target(&mut self, node: &'a Node, opcode: &str) -> CompileResult<Json> {
        let Node::Identifier { name } = node else {
            compile_bail!(
                InvalidSlot,
                "The first argument of {} must be a variable, found {}.",
                opcode,
                node.kind_name()
            );
        };
        let target = self.write_target(name, opcode)?;
        self.record_write(&target, opcode)
    }

    /// Resolve `name` as an assignment target without emitting a reporter for it.
    fn write_target(&self, name: &str, opcode: &str) -> CompileResult<Value> {
        match self.scopes.resolve_variable(name)? {
            (VariableBinding::Argument { .. }, _) => compile_bail!(
                AssignToArgument,
                "Cannot set argument '{}' in {}.",
                name,
                opcode
            ),
            (VariableBinding::Plain { id, .. }, frame) => Ok(Value::VariableRef {
                name: name.to_string(),
                frame,
                id: id.clone(),
            }),
        }
    }

    /// Count a write to `target` and return its field token.
    fn record_write(&mut self, target: &Value, opcode: &str) -> CompileResult<Json> {
        let (Value::VariableRef { name, frame, .. }, Some(token)) =
            (target, target.field_token())
        else {
            compile_bail!(
                InvalidSlot,
                "{} cannot write to a {}.",
                opcode,
                target.describe()
            );
        };
        match self.scopes.binding_in_mut(*frame, name) {
            Some(VariableBinding::Plain {
                constant: true,
                write_count,
                ..
            }) => {
                *write_count += 1;
                if *write_count >= 2 {
                    compile_bail!(
                        AssignToConstantTwice,
                        "Cannot set constant '{}' more than once.",
                        name
                    );
                }
            }
            Some(VariableBinding::Plain { .. }) => {}
            Some(VariableBinding::Argument { .. }) => compile_bail!(
                AssignToArgument,
                "Cannot set argument '{}' in {}.",
                name,
                opcode
            ),
            None => compile_bail!(UndeclaredVariable, "Variable '{}' is not declared.", name),
        }
        Ok(token)
    }

    /// Payload for `value` in an input slot. Adopts the value's head block under `parent`.
    fn embed(
        &mut self,
        value: Value,
        slot: &str,
        kind: SlotKind,
        parent: &str,
        opcode: &str,
    ) -> CompileResult<Json> {
        let payload = match kind {
            SlotKind::Stack => value.stack_payload(),
            SlotKind::Value => value.value_payload(),
        };
        let Some(payload) = payload else {
            compile_bail!(
                InvalidSlot,
                "Input {} of {} cannot take a {}.",
                slot,
                opcode,
                value.describe()
            );
        };
        if let Some(head) = value.head() {
            self.graph.set_parent(head, parent)?;
        }
        Ok(payload)
    }

    fn translate_procedure_call(
        &mut self,
        name: &str,
        args: &'a [Node],
        path: &NodePath,
    ) -> CompileResult<Value> {
        let (decl, owner) = self.scopes.resolve_function(name)?;
        let owner_scope = self.scopes.identity(owner).to_string();
        let (procedure_id, argument_ids) = procedure_ids(&owner_scope, &decl.name, &decl.args);
        if args.len() < decl.args.len() {
            compile_bail!(
                TooFewArguments,
                "Too few arguments in function {} (expected {}, got {}).",
                name,
                decl.args.len(),
                args.len()
            );
        }
        if args.len() > decl.args.len() {
            compile_bail!(
                TooManyArguments,
                "Too many arguments in function {} (expected {}, got {}).",
                name,
                decl.args.len(),
                args.len()
            );
        }

        let call_id = generate_id(IdKey::Call { node: path });
        trace!("call {} ({}) -> {}", name, procedure_id, call_id);
        let proccode = Mutation::proccode(&procedure_id, argument_ids.len());
        let mutation = Mutation::for_call(proccode, &argument_ids)?;
        let mut record = BlockRecord::new("procedures_call").with_mutation(mutation);
        for (index, (arg, argument_id)) in args.iter().zip(&argument_ids).enumerate() {
            let what = format!("Argument {} of {}", index + 1, name);
            let value = self.translate_input(arg, &path.child(index), &what)?;
            let payload = self.embed(value, argument_id, SlotKind::Value, &call_id, name)?;
            record.inputs.insert(argument_id.clone(), payload);
        }
        self.graph.insert(&call_id, record)?;
        Ok(Value::SingleBlock(call_id))
    }

    fn translate_function_declaration(
        &mut self,
        decl: &'a FunctionDeclaration,
        path: &NodePath,
    ) -> CompileResult<()> {
        let mut seen = HashSet::new();
        for param in &decl.args {
            if !seen.insert(param.as_str()) {
                compile_bail!(
                    DuplicateDeclaration,
                    "Procedure '{}' has duplicate parameter '{}'.",
                    decl.name,
                    param
                );
            }
        }

        let definition_id = generate_id(IdKey::ProcedureDefinition { node: path });
        let prototype_id = generate_id(IdKey::ProcedurePrototype { node: path });
        // Registered before the body so the body may call itself.
        self.scopes.declare_function(decl)?;
        let owner_scope = self.scopes.current_identity().to_string();
        let (procedure_id, argument_ids) = procedure_ids(&owner_scope, &decl.name, &decl.args);
        debug!(
            "procedure '{}' ({} params) as {}",
            decl.name,
            decl.args.len(),
            procedure_id
        );

        let proccode = Mutation::proccode(&procedure_id, argument_ids.len());
        let mut prototype = BlockRecord::new("procedures_prototype")
            .shadow()
            .with_parent(&definition_id)
            .with_mutation(Mutation::for_prototype(proccode, &argument_ids, &argument_ids)?);
        for argument_id in &argument_ids {
            let reporter_id = generate_id(IdKey::PrototypeInput {
                argument: argument_id,
            });
            let reporter = BlockRecord::new(ARGUMENT_REPORTER)
                .shadow()
                .with_parent(&prototype_id)
                .with_field("VALUE", json!([argument_id, Json::Null]));
            self.graph.insert(&reporter_id, reporter)?;
            prototype = prototype.with_input(argument_id, json!([1, reporter_id]));
        }

        let pending = PendingArguments::new(&decl.args, &argument_ids);
        let body = self.translate_body(&decl.body, path, Some(pending))?;
        let head = body.as_ref().and_then(Value::head);
        if let Some(head) = head {
            self.graph.set_parent(head, &definition_id)?;
        }

        let (x, y) = self.next_position(PROCEDURE_X);
        let definition = BlockRecord::new("procedures_definition")
            .top_level()
            .with_next(head)
            .with_input("custom_block", json!([1, prototype_id]));
        self.graph.insert(&definition_id, definition)?;
        self.graph.set_position(&definition_id, x, y)?;
        self.graph.insert(&prototype_id, prototype)?;
        Ok(())
    }

    fn next_position(&mut self, x: i32) -> (i32, i32) {
        let y = self.layout_y;
        self.layout_y += SCRIPT_SPACING;
        (x, y)
    }
}
