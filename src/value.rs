use crate::ast::Number;
use crate::scope::FrameIndex;
use serde_json::{json, Value as Json};

// Scratch primitive tags inside input arrays.
const INPUT_SAME_BLOCK_SHADOW: u8 = 1;
const INPUT_NO_SHADOW: u8 = 2;
const INPUT_DIFF_BLOCK_SHADOW: u8 = 3;
const MATH_NUM_PRIMITIVE: u8 = 4;
const TEXT_PRIMITIVE: u8 = 10;
const VAR_PRIMITIVE: u8 = 12;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Text(String),
    Number(Number),
}

/// What translating one AST node produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Literal(Literal),
    /// A plain variable, by name and the frame that owns its binding.
    VariableRef {
        name: String,
        frame: FrameIndex,
        id: String,
    },
    SingleBlock(String),
    Chain { head: String, tail: String },
}

impl Value {
    pub fn text(value: &str) -> Self {
        Value::Literal(Literal::Text(value.to_string()))
    }

    pub fn number(value: Number) -> Self {
        Value::Literal(Literal::Number(value))
    }

    /// `(head, tail)` for values that are made of statement blocks.
    pub fn chain_ends(&self) -> Option<(&str, &str)> {
        match self {
            Value::SingleBlock(id) => Some((id, id)),
            Value::Chain { head, tail } => Some((head, tail)),
            Value::Literal(_) | Value::VariableRef { .. } => None,
        }
    }

    pub fn head(&self) -> Option<&str> {
        self.chain_ends().map(|(head, _)| head)
    }

    /// Payload for a plain value input. `None` for statement sequences.
    pub fn value_payload(&self) -> Option<Json> {
        match self {
            Value::Literal(literal) => {
                Some(json!([INPUT_SAME_BLOCK_SHADOW, literal_primitive(literal)]))
            }
            Value::VariableRef { id, .. } => Some(json!([
                INPUT_DIFF_BLOCK_SHADOW,
                [VAR_PRIMITIVE, id, id],
                [TEXT_PRIMITIVE, ""]
            ])),
            Value::SingleBlock(id) => {
                Some(json!([INPUT_DIFF_BLOCK_SHADOW, id, [TEXT_PRIMITIVE, ""]]))
            }
            Value::Chain { .. } => None,
        }
    }

    /// Payload for a sub-sequence (`SUBSTACK`) input.
    pub fn stack_payload(&self) -> Option<Json> {
        self.head().map(|head| json!([INPUT_NO_SHADOW, head]))
    }

    /// `[display name, id]` token for a field slot. The display name is the id itself.
    pub fn field_token(&self) -> Option<Json> {
        match self {
            Value::VariableRef { id, .. } => Some(json!([id, id])),
            _ => None,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Value::Literal(Literal::Text(_)) => "string literal",
            Value::Literal(Literal::Number(_)) => "number literal",
            Value::VariableRef { .. } => "variable",
            Value::SingleBlock(_) => "block",
            Value::Chain { .. } => "statement sequence",
        }
    }
}

fn literal_primitive(literal: &Literal) -> Json {
    match literal {
        Literal::Text(text) => json!([TEXT_PRIMITIVE, text]),
        Literal::Number(number) => json!([MATH_NUM_PRIMITIVE, format_num(number.0)]),
    }
}

// 2^63. Every whole f64 strictly inside this bound converts to i64 exactly.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Whole values in `i64` range print as integers. Everything else uses the
/// shortest text that parses back to the same `f64`.
pub fn format_num(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < I64_BOUND {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}
