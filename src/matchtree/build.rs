//! Turning query nodes into match trees.

use crate::error::{Result, SiftError};
use crate::matchtree::{CaseFoldRegex, MatchTree, Operator};
use crate::query::{Node, OperatorKind};

/// Build an executable [`MatchTree`] from a query node.
///
/// Every regex is compiled here, so a tree that builds successfully can only
/// fail at evaluation time because of the commit it is evaluated against.
pub fn to_match_tree(node: &Node) -> Result<MatchTree> {
    let tree = build(node)?;
    log::debug!("built match tree: {tree:?}");
    Ok(tree)
}

fn build(node: &Node) -> Result<MatchTree> {
    let tree = match node {
        Node::AuthorMatches { expr, ignore_case } => {
            MatchTree::AuthorMatches(CaseFoldRegex::new(expr, *ignore_case)?)
        }
        Node::CommitterMatches { expr, ignore_case } => {
            MatchTree::CommitterMatches(CaseFoldRegex::new(expr, *ignore_case)?)
        }
        Node::CommitBefore { time } => MatchTree::CommitBefore(*time),
        Node::CommitAfter { time } => MatchTree::CommitAfter(*time),
        Node::MessageMatches { expr, ignore_case } => {
            MatchTree::MessageMatches(CaseFoldRegex::new(expr, *ignore_case)?)
        }
        Node::DiffMatches { expr, ignore_case } => {
            MatchTree::DiffMatches(CaseFoldRegex::new(expr, *ignore_case)?)
        }
        Node::DiffModifiesFile { expr, ignore_case } => {
            MatchTree::DiffModifiesFile(CaseFoldRegex::new(expr, *ignore_case)?)
        }
        Node::Boolean { value } => MatchTree::Constant(*value),
        Node::Operator { kind, operands } => build_operator(*kind, operands)?,
        Node::Unknown => return Err(SiftError::unknown_node("unrecognized node")),
    };
    Ok(tree)
}

fn build_operator(kind: OperatorKind, operands: &[Node]) -> Result<MatchTree> {
    let op = match kind {
        OperatorKind::And => Operator::And(operands.iter().map(build).collect::<Result<_>>()?),
        OperatorKind::Or => Operator::Or(operands.iter().map(build).collect::<Result<_>>()?),
        OperatorKind::Not => match operands {
            [operand] => Operator::Not(Box::new(build(operand)?)),
            _ => {
                return Err(SiftError::invalid_query(format!(
                    "not operator requires exactly one operand, got {}",
                    operands.len()
                )));
            }
        },
    };
    Ok(MatchTree::Operator(op))
}
