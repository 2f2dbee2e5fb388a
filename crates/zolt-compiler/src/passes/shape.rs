//! Syntactic classification of writes
//!
//! `x = x + k`, `x = k + x`, `x += k` and `x++` are increments; `x = x - k`, `x -= k`
//! and `x--` are decrements. `k` must not mention `x`. Every other write overwrites.
//! `x` may be a plain identifier or a mapping access, which matches when base and key
//! coincide.

use crate::ast::{Node, NodeKind};
use crate::binding::WriteShape;
use crate::error::{CompilerError, Result};
use crate::traverse::any_node;

#[derive(Debug, Clone, Copy)]
pub struct WriteSite<'a> {
    /// Identifier being written (the base identifier for mapping targets)
    pub target: &'a Node,
    pub shape: WriteShape,
    /// The `x` read on the right-hand side of its own increment or decrement
    pub self_operand: Option<&'a Node>,
}

fn mentions(expression: &Node, name: &str) -> bool {
    any_node(expression, |n| n.identifier_name() == Some(name))
}

fn target_of(expression: &Node) -> Result<&Node> {
    expression.target_identifier().ok_or_else(|| {
        CompilerError::unsupported(
            format!("assignment to {}", expression.kind_name()),
            Some(expression.src),
        )
    })
}

/// Classifies `node` if it writes to a variable
pub fn analyse_write(node: &Node) -> Result<Option<WriteSite<'_>>> {
    match &node.kind {
        NodeKind::Assignment { operator, left_hand_side, right_hand_side } => {
            let target = target_of(left_hand_side)?;
            let name = target.identifier_name().unwrap_or_default();
            let site = match operator.as_str() {
                "=" => classify_plain(left_hand_side, right_hand_side, target, name),
                "+=" if !mentions(right_hand_side, name) => {
                    WriteSite { target, shape: WriteShape::Increment, self_operand: None }
                }
                "-=" if !mentions(right_hand_side, name) => {
                    WriteSite { target, shape: WriteShape::Decrement, self_operand: None }
                }
                _ => WriteSite { target, shape: WriteShape::Overwrite, self_operand: None },
            };
            Ok(Some(site))
        }
        NodeKind::UnaryOperation { operator, sub_expression, .. } => {
            let shape = match operator.as_str() {
                "++" => WriteShape::Increment,
                "--" => WriteShape::Decrement,
                "delete" => WriteShape::Overwrite,
                _ => return Ok(None),
            };
            let target = target_of(sub_expression)?;
            Ok(Some(WriteSite { target, shape, self_operand: None }))
        }
        _ => Ok(None),
    }
}

fn classify_plain<'a>(lhs: &'a Node, rhs: &'a Node, target: &'a Node, name: &str) -> WriteSite<'a> {
    let overwrite = WriteSite { target, shape: WriteShape::Overwrite, self_operand: None };
    let NodeKind::BinaryOperation { operator, left_expression, right_expression } = &rhs.kind else {
        return overwrite;
    };
    let left_is_self = left_expression.same_expression(lhs);
    let right_is_self = right_expression.same_expression(lhs);
    match operator.as_str() {
        "+" if left_is_self && !mentions(right_expression, name) => WriteSite {
            target,
            shape: WriteShape::Increment,
            self_operand: left_expression.target_identifier(),
        },
        "+" if right_is_self && !mentions(left_expression, name) => WriteSite {
            target,
            shape: WriteShape::Increment,
            self_operand: right_expression.target_identifier(),
        },
        "-" if left_is_self && !mentions(right_expression, name) => WriteSite {
            target,
            shape: WriteShape::Decrement,
            self_operand: left_expression.target_identifier(),
        },
        _ => overwrite,
    }
}
