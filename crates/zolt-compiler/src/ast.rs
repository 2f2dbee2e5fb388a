//! Tree model for front-end ASTs
//!
//! Nodes mirror the front-end's JSON export: every node carries a `nodeType` discriminant,
//! a unique `id` and a `src` location. The set of node kinds is closed; anything the
//! loader does not know is rejected before typed deserialization (see [`crate::parser`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CompilerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Byte range in a source file, encoded by the front-end as `"start:length:fileIndex"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceLocation {
    pub start: usize,
    pub length: usize,
    pub file_index: i64,
}

impl SourceLocation {
    pub fn new(start: usize, length: usize, file_index: i64) -> Self {
        Self { start, length, file_index }
    }

    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.length, self.file_index)
    }
}

impl FromStr for SourceLocation {
    type Err = CompilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(CompilerError::ParseError(format!(
                "source location '{}' is not of the form start:length:file",
                s
            )));
        }
        let number = |part: &str| {
            part.parse::<i64>().map_err(|_| {
                CompilerError::ParseError(format!("source location '{}' has a bad component", s))
            })
        };
        let (start, length, file_index) = (number(parts[0])?, number(parts[1])?, number(parts[2])?);
        if start < 0 || length < 0 {
            return Err(CompilerError::ParseError(format!("negative source location '{}'", s)));
        }
        Ok(Self::new(start as usize, length as usize, file_index))
    }
}

impl TryFrom<String> for SourceLocation {
    type Error = CompilerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SourceLocation> for String {
    fn from(value: SourceLocation) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub src: SourceLocation,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FunctionKind {
    Function,
    Constructor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "nodeType", rename_all_fields = "camelCase")]
pub enum TypeName {
    ElementaryTypeName { name: String },
    Mapping { key_type: Box<TypeName>, value_type: Box<TypeName> },
}

impl TypeName {
    pub fn is_mapping(&self) -> bool {
        matches!(self, TypeName::Mapping { .. })
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::ElementaryTypeName { name } => f.write_str(name),
            TypeName::Mapping { key_type, value_type } => {
                write!(f, "mapping({} => {})", key_type, value_type)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "nodeType", rename_all_fields = "camelCase")]
pub enum NodeKind {
    SourceUnit {
        nodes: Vec<Node>,
    },
    PragmaDirective {
        #[serde(default)]
        literals: Vec<String>,
    },
    ContractDefinition {
        name: String,
        nodes: Vec<Node>,
    },
    FunctionDefinition {
        name: String,
        kind: FunctionKind,
        parameters: Box<Node>,
        #[serde(default)]
        return_parameters: Option<Box<Node>>,
        #[serde(default)]
        body: Option<Box<Node>>,
    },
    ParameterList {
        parameters: Vec<Node>,
    },
    VariableDeclaration {
        name: String,
        type_name: TypeName,
        #[serde(default)]
        state_variable: bool,
        #[serde(default)]
        is_secret: bool,
        #[serde(default)]
        constant: bool,
    },
    Block {
        statements: Vec<Node>,
    },
    ExpressionStatement {
        expression: Box<Node>,
    },
    VariableDeclarationStatement {
        declarations: Vec<Node>,
        #[serde(default)]
        initial_value: Option<Box<Node>>,
    },
    IfStatement {
        condition: Box<Node>,
        true_body: Box<Node>,
        #[serde(default)]
        false_body: Option<Box<Node>>,
    },
    Return {
        #[serde(default)]
        expression: Option<Box<Node>>,
    },
    Assignment {
        operator: String,
        left_hand_side: Box<Node>,
        right_hand_side: Box<Node>,
    },
    BinaryOperation {
        operator: String,
        left_expression: Box<Node>,
        right_expression: Box<Node>,
    },
    UnaryOperation {
        operator: String,
        prefix: bool,
        sub_expression: Box<Node>,
    },
    Identifier {
        name: String,
        #[serde(default)]
        referenced_declaration: Option<NodeId>,
    },
    IndexAccess {
        base_expression: Box<Node>,
        index_expression: Box<Node>,
    },
    MemberAccess {
        expression: Box<Node>,
        member_name: String,
    },
    FunctionCall {
        expression: Box<Node>,
        arguments: Vec<Node>,
    },
    Literal {
        kind: String,
        value: String,
    },
}

/// Position of a child relative to its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Root,
    Nodes(usize),
    Parameters,
    ReturnParameters,
    Body,
    ParameterItem(usize),
    Statements(usize),
    Expression,
    Declarations(usize),
    InitialValue,
    Condition,
    TrueBody,
    FalseBody,
    LeftHandSide,
    RightHandSide,
    LeftExpression,
    RightExpression,
    SubExpression,
    BaseExpression,
    IndexExpression,
    Arguments(usize),
}

/// Every `nodeType` the loader accepts, including type-name nodes
pub const SUPPORTED_NODE_TYPES: &[&str] = &[
    "SourceUnit",
    "PragmaDirective",
    "ContractDefinition",
    "FunctionDefinition",
    "ParameterList",
    "VariableDeclaration",
    "Block",
    "ExpressionStatement",
    "VariableDeclarationStatement",
    "IfStatement",
    "Return",
    "Assignment",
    "BinaryOperation",
    "UnaryOperation",
    "Identifier",
    "IndexAccess",
    "MemberAccess",
    "FunctionCall",
    "Literal",
    "ElementaryTypeName",
    "Mapping",
];

/// Identifiers the language provides; they never resolve to a declaration
pub const SPECIAL_IDENTIFIERS: &[&str] =
    &["msg", "this", "require", "revert", "assert", "block", "tx"];

impl Node {
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::SourceUnit { .. } => "SourceUnit",
            NodeKind::PragmaDirective { .. } => "PragmaDirective",
            NodeKind::ContractDefinition { .. } => "ContractDefinition",
            NodeKind::FunctionDefinition { .. } => "FunctionDefinition",
            NodeKind::ParameterList { .. } => "ParameterList",
            NodeKind::VariableDeclaration { .. } => "VariableDeclaration",
            NodeKind::Block { .. } => "Block",
            NodeKind::ExpressionStatement { .. } => "ExpressionStatement",
            NodeKind::VariableDeclarationStatement { .. } => "VariableDeclarationStatement",
            NodeKind::IfStatement { .. } => "IfStatement",
            NodeKind::Return { .. } => "Return",
            NodeKind::Assignment { .. } => "Assignment",
            NodeKind::BinaryOperation { .. } => "BinaryOperation",
            NodeKind::UnaryOperation { .. } => "UnaryOperation",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::IndexAccess { .. } => "IndexAccess",
            NodeKind::MemberAccess { .. } => "MemberAccess",
            NodeKind::FunctionCall { .. } => "FunctionCall",
            NodeKind::Literal { .. } => "Literal",
        }
    }

    /// Direct children in document order
    pub fn children(&self) -> Vec<(Edge, &Node)> {
        match &self.kind {
            NodeKind::SourceUnit { nodes } | NodeKind::ContractDefinition { nodes, .. } => {
                nodes.iter().enumerate().map(|(i, n)| (Edge::Nodes(i), n)).collect()
            }
            NodeKind::FunctionDefinition { parameters, return_parameters, body, .. } => {
                let mut children = vec![(Edge::Parameters, parameters.as_ref())];
                if let Some(returns) = return_parameters {
                    children.push((Edge::ReturnParameters, returns.as_ref()));
                }
                if let Some(body) = body {
                    children.push((Edge::Body, body.as_ref()));
                }
                children
            }
            NodeKind::ParameterList { parameters } => {
                parameters.iter().enumerate().map(|(i, n)| (Edge::ParameterItem(i), n)).collect()
            }
            NodeKind::Block { statements } => {
                statements.iter().enumerate().map(|(i, n)| (Edge::Statements(i), n)).collect()
            }
            NodeKind::ExpressionStatement { expression } => {
                vec![(Edge::Expression, expression.as_ref())]
            }
            NodeKind::VariableDeclarationStatement { declarations, initial_value } => {
                let mut children: Vec<(Edge, &Node)> =
                    declarations.iter().enumerate().map(|(i, n)| (Edge::Declarations(i), n)).collect();
                if let Some(value) = initial_value {
                    children.push((Edge::InitialValue, value.as_ref()));
                }
                children
            }
            NodeKind::IfStatement { condition, true_body, false_body } => {
                let mut children =
                    vec![(Edge::Condition, condition.as_ref()), (Edge::TrueBody, true_body.as_ref())];
                if let Some(false_body) = false_body {
                    children.push((Edge::FalseBody, false_body.as_ref()));
                }
                children
            }
            NodeKind::Return { expression } => {
                expression.iter().map(|e| (Edge::Expression, e.as_ref())).collect()
            }
            NodeKind::Assignment { left_hand_side, right_hand_side, .. } => vec![
                (Edge::LeftHandSide, left_hand_side.as_ref()),
                (Edge::RightHandSide, right_hand_side.as_ref()),
            ],
            NodeKind::BinaryOperation { left_expression, right_expression, .. } => vec![
                (Edge::LeftExpression, left_expression.as_ref()),
                (Edge::RightExpression, right_expression.as_ref()),
            ],
            NodeKind::UnaryOperation { sub_expression, .. } => {
                vec![(Edge::SubExpression, sub_expression.as_ref())]
            }
            NodeKind::IndexAccess { base_expression, index_expression } => vec![
                (Edge::BaseExpression, base_expression.as_ref()),
                (Edge::IndexExpression, index_expression.as_ref()),
            ],
            NodeKind::MemberAccess { expression, .. } => vec![(Edge::Expression, expression.as_ref())],
            NodeKind::FunctionCall { expression, arguments } => {
                let mut children = vec![(Edge::Expression, expression.as_ref())];
                children.extend(arguments.iter().enumerate().map(|(i, n)| (Edge::Arguments(i), n)));
                children
            }
            NodeKind::PragmaDirective { .. }
            | NodeKind::VariableDeclaration { .. }
            | NodeKind::Identifier { .. }
            | NodeKind::Literal { .. } => Vec::new(),
        }
    }

    /// Node with the given id in this subtree
    pub fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children().into_iter().find_map(|(_, child)| child.find(id))
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::ExpressionStatement { .. }
                | NodeKind::VariableDeclarationStatement { .. }
                | NodeKind::IfStatement { .. }
                | NodeKind::Return { .. }
        )
    }

    pub fn identifier_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Identifier { name, .. } => Some(name),
            _ => None,
        }
    }

    /// `msg.sender`
    pub fn is_msg_sender(&self) -> bool {
        match &self.kind {
            NodeKind::MemberAccess { expression, member_name } => {
                member_name == "sender" && expression.identifier_name() == Some("msg")
            }
            _ => false,
        }
    }

    /// `require(...)`
    pub fn is_require_call(&self) -> bool {
        match &self.kind {
            NodeKind::FunctionCall { expression, .. } => {
                expression.identifier_name() == Some("require")
            }
            _ => false,
        }
    }

    /// Innermost identifier of an assignable expression (`x`, `m[k]`, `m[a][b]`)
    pub fn target_identifier(&self) -> Option<&Node> {
        match &self.kind {
            NodeKind::Identifier { .. } => Some(self),
            NodeKind::IndexAccess { base_expression, .. } => base_expression.target_identifier(),
            _ => None,
        }
    }

    /// Structural equality ignoring ids and source locations
    pub fn same_expression(&self, other: &Node) -> bool {
        match (&self.kind, &other.kind) {
            (
                NodeKind::Identifier { name: a, referenced_declaration: ra },
                NodeKind::Identifier { name: b, referenced_declaration: rb },
            ) => a == b && (ra.is_none() || rb.is_none() || ra == rb),
            (NodeKind::Literal { value: a, .. }, NodeKind::Literal { value: b, .. }) => a == b,
            (
                NodeKind::MemberAccess { expression: ea, member_name: ma },
                NodeKind::MemberAccess { expression: eb, member_name: mb },
            ) => ma == mb && ea.same_expression(eb),
            (
                NodeKind::IndexAccess { base_expression: ba, index_expression: ia },
                NodeKind::IndexAccess { base_expression: bb, index_expression: ib },
            ) => ba.same_expression(bb) && ia.same_expression(ib),
            _ => false,
        }
    }
}
