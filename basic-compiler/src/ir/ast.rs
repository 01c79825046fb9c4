use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub statements: Vec<Node>,
}

/// A node of the syntax tree. Statements and expressions share one type;
/// every child is owned by exactly one parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    Number(f64),
    Variable(String),
    /// `left op right`. The parser only builds `+ - * /`.
    Binary {
        left: Box<Node>,
        op: char,
        right: Box<Node>,
    },
    /// Call of a function already known to the module. Not produced by the
    /// parser.
    Call { name: String, args: Vec<Node> },
    /// `DIM name`
    Declare(String),
    /// `PRINT expr`
    Print(Box<Node>),
    /// `IF cond THEN ... [ELSE ...] [END]`
    If {
        condition: Box<Node>,
        then_body: Vec<Node>,
        else_body: Option<Vec<Node>>,
    },
    /// `FOR var = start TO end ... [NEXT]`
    For {
        var: String,
        start: Box<Node>,
        end: Box<Node>,
        body: Vec<Node>,
    },
}

impl Node {
    pub fn number(value: f64) -> Self {
        Node::Number(value)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Node::Variable(name.into())
    }

    pub fn binary(left: Node, op: char, right: Node) -> Self {
        Node::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Node>) -> Self {
        Node::Call {
            name: name.into(),
            args,
        }
    }

    pub fn print(value: Node) -> Self {
        Node::Print(Box::new(value))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Number(_) => "number",
            Node::Variable(_) => "variable",
            Node::Binary { .. } => "binary",
            Node::Call { .. } => "call",
            Node::Declare(_) => "DIM",
            Node::Print(_) => "PRINT",
            Node::If { .. } => "IF",
            Node::For { .. } => "FOR",
        }
    }
}
