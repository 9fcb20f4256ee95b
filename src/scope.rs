use crate::ast::FunctionDeclaration;
use crate::error::{compile_bail, CompileResult};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableBinding {
    /// A declared variable. `id` is the variable's entry in the stage's variables map.
    Plain {
        id: String,
        constant: bool,
        write_count: u32,
    },
    /// A procedure parameter, bound to its synthetic argument id.
    Argument { id: String },
}

impl VariableBinding {
    pub fn plain(id: String, constant: bool) -> Self {
        VariableBinding::Plain {
            id,
            constant,
            write_count: 0,
        }
    }
}

#[derive(Debug)]
pub struct ScopeFrame<'a> {
    pub identity: String,
    variables: HashMap<String, VariableBinding>,
    functions: HashMap<String, &'a FunctionDeclaration>,
}

impl<'a> ScopeFrame<'a> {
    fn new(identity: String) -> Self {
        Self {
            identity,
            variables: HashMap::new(),
            functions: HashMap::new(),
        }
    }
}

/// Index of a frame on the [`ScopeStack`]; valid while that frame is pushed.
pub type FrameIndex = usize;

/// Nested lexical scopes, innermost last. Lookups walk outward.
#[derive(Debug, Default)]
pub struct ScopeStack<'a> {
    frames: Vec<ScopeFrame<'a>>,
}

impl<'a> ScopeStack<'a> {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn push_child(&mut self, identity: String) -> FrameIndex {
        self.frames.push(ScopeFrame::new(identity));
        self.frames.len() - 1
    }

    pub fn pop(&mut self) -> Option<ScopeFrame<'a>> {
        self.frames.pop()
    }

    pub fn current_identity(&self) -> &str {
        self.frames
            .last()
            .map(|frame| frame.identity.as_str())
            .unwrap_or_default()
    }

    pub fn identity(&self, frame: FrameIndex) -> &str {
        &self.frames[frame].identity
    }

    pub fn declare_variable(&mut self, name: &str, binding: VariableBinding) -> CompileResult<()> {
        let Some(frame) = self.frames.last_mut() else {
            compile_bail!(InvalidStatement, "Variable '{}' declared outside any scope.", name);
        };
        if frame.variables.contains_key(name) {
            compile_bail!(
                DuplicateDeclaration,
                "Variable '{}' is already declared in this scope.",
                name
            );
        }
        frame.variables.insert(name.to_string(), binding);
        Ok(())
    }

    pub fn declare_function(&mut self, decl: &'a FunctionDeclaration) -> CompileResult<()> {
        let Some(frame) = self.frames.last_mut() else {
            compile_bail!(
                InvalidStatement,
                "Procedure '{}' declared outside any scope.",
                decl.name
            );
        };
        if frame.functions.contains_key(&decl.name) {
            compile_bail!(
                DuplicateDeclaration,
                "Procedure '{}' is already declared in this scope.",
                decl.name
            );
        }
        frame.functions.insert(decl.name.clone(), decl);
        Ok(())
    }

    fn find_variable(&self, name: &str) -> Option<FrameIndex> {
        self.frames
            .iter()
            .rposition(|frame| frame.variables.contains_key(name))
    }

    pub fn resolve_variable(&self, name: &str) -> CompileResult<(&VariableBinding, FrameIndex)> {
        match self.find_variable(name) {
            Some(index) => Ok((&self.frames[index].variables[name], index)),
            None => compile_bail!(UndeclaredVariable, "Variable '{}' is not declared.", name),
        }
    }

    /// Binding of `name` as declared in exactly `frame`, ignoring shadowing by inner frames.
    pub fn binding_in_mut(
        &mut self,
        frame: FrameIndex,
        name: &str,
    ) -> Option<&mut VariableBinding> {
        self.frames.get_mut(frame)?.variables.get_mut(name)
    }

    pub fn resolve_function(
        &self,
        name: &str,
    ) -> CompileResult<(&'a FunctionDeclaration, FrameIndex)> {
        for (index, frame) in self.frames.iter().enumerate().rev() {
            if let Some(decl) = frame.functions.get(name) {
                return Ok((*decl, index));
            }
        }
        compile_bail!(UndeclaredFunction, "Function '{}' is not declared.", name)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.frames
            .iter()
            .any(|frame| frame.functions.contains_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn id_of(binding: &VariableBinding) -> &str {
        match binding {
            VariableBinding::Plain { id, .. } | VariableBinding::Argument { id } => id,
        }
    }

    fn decl(name: &str) -> FunctionDeclaration {
        FunctionDeclaration {
            name: name.to_string(),
            args: vec![],
            body: vec![],
        }
    }

    #[test]
    fn resolution_walks_outward_and_respects_shadowing() {
        let mut scopes = ScopeStack::new();
        let root = scopes.push_child("root".into());
        scopes
            .declare_variable("x", VariableBinding::plain("outer".into(), false))
            .unwrap();
        let inner = scopes.push_child("inner".into());
        let (binding, owner) = scopes.resolve_variable("x").unwrap();
        assert_eq!(id_of(binding), "outer");
        assert_eq!(owner, root);

        scopes
            .declare_variable("x", VariableBinding::Argument { id: "arg".into() })
            .unwrap();
        let (binding, owner) = scopes.resolve_variable("x").unwrap();
        assert_eq!(id_of(binding), "arg");
        assert_eq!(owner, inner);

        scopes.pop();
        let (binding, _) = scopes.resolve_variable("x").unwrap();
        assert_eq!(id_of(binding), "outer");
    }

    #[test]
    fn unresolved_names_are_errors() {
        let mut scopes = ScopeStack::new();
        scopes.push_child("root".into());
        assert_eq!(
            scopes.resolve_variable("nope").unwrap_err().kind,
            ErrorKind::UndeclaredVariable
        );
        assert_eq!(
            scopes.resolve_function("nope").unwrap_err().kind,
            ErrorKind::UndeclaredFunction
        );
        assert!(!scopes.has_function("nope"));
    }

    #[test]
    fn duplicate_names_in_one_frame_are_rejected() {
        let f = decl("f");
        let mut scopes = ScopeStack::new();
        scopes.push_child("root".into());
        scopes
            .declare_variable("x", VariableBinding::plain("a".into(), false))
            .unwrap();
        let err = scopes
            .declare_variable("x", VariableBinding::plain("b".into(), false))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateDeclaration);

        scopes.declare_function(&f).unwrap();
        assert_eq!(
            scopes.declare_function(&f).unwrap_err().kind,
            ErrorKind::DuplicateDeclaration
        );
    }

    #[test]
    fn functions_resolve_to_owning_frame() {
        let f = decl("f");
        let mut scopes = ScopeStack::new();
        let root = scopes.push_child("root".into());
        scopes.declare_function(&f).unwrap();
        scopes.push_child("body".into());
        let (found, owner) = scopes.resolve_function("f").unwrap();
        assert_eq!(found.name, "f");
        assert_eq!(owner, root);
        assert_eq!(scopes.identity(owner), "root");
        assert_eq!(scopes.current_identity(), "body");
        assert!(scopes.has_function("f"));
    }

    #[test]
    fn write_counts_are_tracked_on_the_owning_binding() {
        let mut scopes = ScopeStack::new();
        scopes.push_child("root".into());
        scopes
            .declare_variable("k", VariableBinding::plain("k-id".into(), true))
            .unwrap();
        scopes.push_child("inner".into());
        let (_, owner) = scopes.resolve_variable("k").unwrap();
        let binding = scopes.binding_in_mut(owner, "k");
        if let Some(VariableBinding::Plain { write_count, .. }) = binding {
            *write_count += 1;
        }
        scopes.pop();
        assert_eq!(
            scopes.resolve_variable("k").unwrap().0,
            &VariableBinding::Plain {
                id: "k-id".into(),
                constant: true,
                write_count: 1
            }
        );
    }
}
