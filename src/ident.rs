//! Content-addressed block identities.
//!
//! Every id in the emitted graph is the md5 digest of a structural key. The
//! procedure call/definition link depends on both sites building the *same*
//! key independently, so each key composition lives here and nowhere else.

use crate::ast::NodePath;

/// Every key composition the translator uses. Fields are hashed in declaration order.
#[derive(Debug, Clone, Copy)]
pub enum IdKey<'a> {
    /// Lexical scope created for a body: `("scope", body path)`.
    Scope { body: &'a NodePath },
    /// Entry hat of the program: `("event", program path)`.
    EntryHat { program: &'a NodePath },
    /// Block emitted for a builtin or procedure call: `("call", call path)`.
    Call { node: &'a NodePath },
    /// Reporter emitted when an argument is read: `("argument_reporter", identifier path)`.
    ArgumentReporter { node: &'a NodePath },
    /// `("variable", owning scope identity, name)`.
    Variable { scope: &'a str, name: &'a str },
    /// `("procedure_definition", declaration path)`.
    ProcedureDefinition { node: &'a NodePath },
    /// `("procedure_prototype", declaration path)`.
    ProcedurePrototype { node: &'a NodePath },
    /// `("procedure_name", owning scope identity, name)`. Recomputed at every call site.
    ProcedureName { scope: &'a str, name: &'a str },
    /// `("procedure_argument", procedure identity, parameter name)`.
    ProcedureArgument { procedure: &'a str, name: &'a str },
    /// Shadow reporter filling a prototype input: `("procedure_prototype_input", argument id)`.
    PrototypeInput { argument: &'a str },
}

impl IdKey<'_> {
    pub fn tag(&self) -> &'static str {
        match self {
            IdKey::Scope { .. } => "scope",
            IdKey::EntryHat { .. } => "event",
            IdKey::Call { .. } => "call",
            IdKey::ArgumentReporter { .. } => "argument_reporter",
            IdKey::Variable { .. } => "variable",
            IdKey::ProcedureDefinition { .. } => "procedure_definition",
            IdKey::ProcedurePrototype { .. } => "procedure_prototype",
            IdKey::ProcedureName { .. } => "procedure_name",
            IdKey::ProcedureArgument { .. } => "procedure_argument",
            IdKey::PrototypeInput { .. } => "procedure_prototype_input",
        }
    }

    fn fields(&self) -> Vec<&str> {
        match *self {
            IdKey::Scope { body } => vec![body.as_str()],
            IdKey::EntryHat { program } => vec![program.as_str()],
            IdKey::Call { node }
            | IdKey::ArgumentReporter { node }
            | IdKey::ProcedureDefinition { node }
            | IdKey::ProcedurePrototype { node } => vec![node.as_str()],
            IdKey::Variable { scope, name } | IdKey::ProcedureName { scope, name } => {
                vec![scope, name]
            }
            IdKey::ProcedureArgument { procedure, name } => vec![procedure, name],
            IdKey::PrototypeInput { argument } => vec![argument],
        }
    }

    /// `[tag, field, ...]` as compact JSON. Array encoding keeps `("a|b", "c")`
    /// and `("a", "b|c")` apart without an escaping scheme of our own.
    pub fn canonical(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        parts.push(self.tag());
        parts.extend(self.fields());
        serde_json::Value::from(parts).to_string()
    }
}

/// Pure, deterministic id for a structural key.
pub fn generate_id(key: IdKey<'_>) -> String {
    format!("{:x}", md5::compute(key.canonical().as_bytes()))
}

/// Procedure identity plus one synthetic id per parameter, in parameter order.
///
/// Used verbatim by both the definition and every call site.
pub fn procedure_ids(owning_scope: &str, name: &str, params: &[String]) -> (String, Vec<String>) {
    let procedure = generate_id(IdKey::ProcedureName {
        scope: owning_scope,
        name,
    });
    let arguments = params
        .iter()
        .map(|param| {
            generate_id(IdKey::ProcedureArgument {
                procedure: &procedure,
                name: param,
            })
        })
        .collect();
    (procedure, arguments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_is_tag_then_fields() {
        let path = NodePath::root().child(3);
        assert_eq!(IdKey::Call { node: &path }.canonical(), r#"["call","p.3"]"#);
        assert_eq!(
            IdKey::Variable {
                scope: "s",
                name: "x"
            }
            .canonical(),
            r#"["variable","s","x"]"#
        );
        assert_eq!(
            IdKey::Variable {
                scope: "s",
                name: "größe"
            }
            .canonical(),
            r#"["variable","s","größe"]"#
        );
    }

    #[test]
    fn equal_keys_give_equal_ids() {
        let a = generate_id(IdKey::ProcedureName {
            scope: "root",
            name: "f",
        });
        let b = generate_id(IdKey::ProcedureName {
            scope: "root",
            name: "f",
        });
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn tags_separate_intents_with_same_fields() {
        let path = NodePath::root().child(0);
        let ids = [
            generate_id(IdKey::Scope { body: &path }),
            generate_id(IdKey::EntryHat { program: &path }),
            generate_id(IdKey::Call { node: &path }),
            generate_id(IdKey::ArgumentReporter { node: &path }),
            generate_id(IdKey::ProcedureDefinition { node: &path }),
            generate_id(IdKey::ProcedurePrototype { node: &path }),
            generate_id(IdKey::PrototypeInput { argument: path.as_str() }),
        ];
        for (i, left) in ids.iter().enumerate() {
            for right in &ids[i + 1..] {
                assert_ne!(left, right);
            }
        }
        assert_ne!(
            generate_id(IdKey::Variable {
                scope: "s",
                name: "f"
            }),
            generate_id(IdKey::ProcedureName {
                scope: "s",
                name: "f"
            })
        );
    }

    #[test]
    fn field_boundaries_do_not_collide() {
        assert_ne!(
            generate_id(IdKey::Variable {
                scope: "ab",
                name: "c"
            }),
            generate_id(IdKey::Variable {
                scope: "a",
                name: "bc"
            })
        );
    }

    #[test]
    fn procedure_ids_depend_on_scope_and_name_only() {
        let params = vec!["a".to_string(), "b".to_string()];
        let (proc_a, args_a) = procedure_ids("scope-1", "f", &params);
        let (proc_b, args_b) = procedure_ids("scope-1", "f", &params);
        assert_eq!(proc_a, proc_b);
        assert_eq!(args_a, args_b);
        assert_eq!(args_a.len(), 2);
        assert_ne!(args_a[0], args_a[1]);

        let (other_scope, _) = procedure_ids("scope-2", "f", &params);
        assert_ne!(proc_a, other_scope);

        let expected_first = generate_id(IdKey::ProcedureArgument {
            procedure: &proc_a,
            name: "a",
        });
        assert_eq!(args_a[0], expected_first);
    }
}
