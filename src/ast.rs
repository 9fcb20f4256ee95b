use serde::Deserialize;

/// A literal number as written in the source. Whole values keep integer formatting.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Number(pub f64);

/// The closed set of AST node kinds accepted by the translator.
///
/// Deserialized from JSON objects tagged by `"type"`, e.g.
/// `{"type": "FunctionCall", "name": "looks_say", "args": [...]}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    Program {
        body: Vec<Node>,
    },
    Block {
        body: Vec<Node>,
    },
    Identifier {
        name: String,
    },
    VariableDeclaration {
        name: String,
        #[serde(default)]
        is_const: bool,
        #[serde(default)]
        value: Option<Box<Node>>,
    },
    String {
        value: String,
    },
    Number {
        value: Number,
    },
    FunctionCall {
        name: String,
        #[serde(default)]
        args: Vec<Node>,
    },
    FunctionDeclaration(FunctionDeclaration),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub body: Vec<Node>,
}

impl Node {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Program { .. } => "Program",
            Node::Block { .. } => "Block",
            Node::Identifier { .. } => "Identifier",
            Node::VariableDeclaration { .. } => "VariableDeclaration",
            Node::String { .. } => "String",
            Node::Number { .. } => "Number",
            Node::FunctionCall { .. } => "FunctionCall",
            Node::FunctionDeclaration(_) => "FunctionDeclaration",
        }
    }

    pub fn from_json_str(text: &str) -> serde_json::Result<Node> {
        serde_json::from_str(text)
    }
}

/// Dot-joined child indices from the program root. Unique per node in one AST.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePath(String);

impl NodePath {
    pub fn root() -> Self {
        Self("p".to_string())
    }

    pub fn child(&self, index: usize) -> Self {
        Self(format!("{}.{}", self.0, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Convenience constructors used by tests and embedders that build trees in code.
pub mod build {
    use super::{FunctionDeclaration, Node, Number};

    pub fn program(body: Vec<Node>) -> Node {
        Node::Program { body }
    }

    pub fn block(body: Vec<Node>) -> Node {
        Node::Block { body }
    }

    pub fn ident(name: &str) -> Node {
        Node::Identifier {
            name: name.to_string(),
        }
    }

    pub fn num(value: f64) -> Node {
        Node::Number {
            value: Number(value),
        }
    }

    pub fn text(value: &str) -> Node {
        Node::String {
            value: value.to_string(),
        }
    }

    pub fn call(name: &str, args: Vec<Node>) -> Node {
        Node::FunctionCall {
            name: name.to_string(),
            args,
        }
    }

    pub fn var(name: &str) -> Node {
        Node::VariableDeclaration {
            name: name.to_string(),
            is_const: false,
            value: None,
        }
    }

    pub fn let_var(name: &str, value: Node) -> Node {
        Node::VariableDeclaration {
            name: name.to_string(),
            is_const: false,
            value: Some(Box::new(value)),
        }
    }

    pub fn constant(name: &str, value: Option<Node>) -> Node {
        Node::VariableDeclaration {
            name: name.to_string(),
            is_const: true,
            value: value.map(Box::new),
        }
    }

    pub fn procedure(name: &str, args: &[&str], body: Vec<Node>) -> Node {
        Node::FunctionDeclaration(FunctionDeclaration {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            body,
        })
    }
}
