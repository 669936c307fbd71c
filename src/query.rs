//! Commit search query nodes.
//!
//! A [`Node`] is the serializable form of a commit query, as handed over by
//! the query parser. It is turned into an executable
//! [`MatchTree`](crate::matchtree::MatchTree) with
//! [`to_match_tree`](crate::matchtree::to_match_tree).
//!
//! ```json
//! {"type": "operator", "kind": "and", "operands": [
//!     {"type": "authorMatches", "expr": "alice", "ignoreCase": true},
//!     {"type": "diffMatches", "expr": "TODO"}
//! ]}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Boolean operators over query nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorKind {
    And,
    Or,
    Not,
}

/// A commit query node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Node {
    /// Author name or email matches the regex.
    AuthorMatches {
        expr: String,
        #[serde(default)]
        ignore_case: bool,
    },
    /// Committer name or email matches the regex.
    CommitterMatches {
        expr: String,
        #[serde(default)]
        ignore_case: bool,
    },
    /// Committed strictly before `time`.
    CommitBefore { time: DateTime<Utc> },
    /// Committed strictly after `time`.
    CommitAfter { time: DateTime<Utc> },
    /// The commit message matches the regex.
    MessageMatches {
        expr: String,
        #[serde(default)]
        ignore_case: bool,
    },
    /// An added or removed line matches the regex.
    DiffMatches {
        expr: String,
        #[serde(default)]
        ignore_case: bool,
    },
    /// The old or new name of a changed file matches the regex.
    DiffModifiesFile {
        expr: String,
        #[serde(default)]
        ignore_case: bool,
    },
    Boolean { value: bool },
    Operator { kind: OperatorKind, operands: Vec<Node> },
    /// A node type this crate does not evaluate.
    #[serde(other)]
    Unknown,
}

impl Node {
    pub fn from_json(json: &str) -> Result<Node> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn and(operands: Vec<Node>) -> Node {
        Node::Operator {
            kind: OperatorKind::And,
            operands,
        }
    }

    pub fn or(operands: Vec<Node>) -> Node {
        Node::Operator {
            kind: OperatorKind::Or,
            operands,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: Node) -> Node {
        Node::Operator {
            kind: OperatorKind::Not,
            operands: vec![operand],
        }
    }

    /// Simplify the query without changing which commits it matches.
    ///
    /// Nested operators of the same kind are flattened, boolean constants are
    /// folded away and double negations are removed.
    pub fn reduce(self) -> Node {
        match self {
            Node::Operator {
                kind: OperatorKind::Not,
                operands,
            } => {
                let [operand] = match <[Node; 1]>::try_from(operands) {
                    Ok(single) => single,
                    Err(operands) => {
                        return Node::Operator {
                            kind: OperatorKind::Not,
                            operands,
                        };
                    }
                };
                match operand.reduce() {
                    Node::Boolean { value } => Node::Boolean { value: !value },
                    Node::Operator {
                        kind: OperatorKind::Not,
                        operands: mut inner,
                    } if inner.len() == 1 => inner.remove(0),
                    operand => Node::not(operand),
                }
            }
            Node::Operator { kind, operands } => {
                // `absorbing` decides the whole operator, `neutral` is dropped.
                let absorbing = kind == OperatorKind::Or;
                let mut reduced = Vec::with_capacity(operands.len());
                for operand in operands.into_iter().map(Node::reduce) {
                    match operand {
                        Node::Boolean { value } if value == absorbing => {
                            return Node::Boolean { value };
                        }
                        Node::Boolean { .. } => {}
                        Node::Operator {
                            kind: inner,
                            operands,
                        } if inner == kind => reduced.extend(operands),
                        other => reduced.push(other),
                    }
                }
                match reduced.len() {
                    0 => Node::Boolean { value: !absorbing },
                    1 => reduced.remove(0),
                    _ => Node::Operator {
                        kind,
                        operands: reduced,
                    },
                }
            }
            leaf => leaf,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(expr: &str) -> Node {
        Node::DiffMatches {
            expr: expr.into(),
            ignore_case: false,
        }
    }

    #[test]
    fn test_deserialize() {
        let node = Node::from_json(
            r#"{"type": "operator", "kind": "and", "operands": [
                {"type": "authorMatches", "expr": "alice", "ignoreCase": true},
                {"type": "commitAfter", "time": "2020-01-01T00:00:00Z"},
                {"type": "diffMatches", "expr": "TODO"}
            ]}"#,
        )
        .unwrap();

        let Node::Operator { kind, operands } = node else {
            panic!("expected an operator");
        };
        assert_eq!(kind, OperatorKind::And);
        assert_eq!(
            operands[0],
            Node::AuthorMatches {
                expr: "alice".into(),
                ignore_case: true
            }
        );
        assert!(matches!(operands[1], Node::CommitAfter { .. }));
        assert_eq!(operands[2], diff("TODO"));
    }

    #[test]
    fn test_unknown_type() {
        let node = Node::from_json(r#"{"type": "repoHasFile", "path": "x"}"#).unwrap();
        assert_eq!(node, Node::Unknown);
    }

    #[test]
    fn test_serialize_roundtrip_tag() {
        let json = serde_json::to_value(Node::not(diff("x"))).unwrap();
        assert_eq!(json["type"], "operator");
        assert_eq!(json["kind"], "not");
        assert_eq!(json["operands"][0]["type"], "diffMatches");
        assert_eq!(json["operands"][0]["ignoreCase"], false);
    }

    #[test]
    fn test_reduce_flattens() {
        let node = Node::and(vec![
            diff("a"),
            Node::and(vec![diff("b"), Node::and(vec![diff("c")])]),
        ]);
        assert_eq!(node.reduce(), Node::and(vec![diff("a"), diff("b"), diff("c")]));
    }

    #[test]
    fn test_reduce_constants() {
        let t = Node::Boolean { value: true };
        let f = Node::Boolean { value: false };

        assert_eq!(Node::and(vec![t.clone(), diff("a")]).reduce(), diff("a"));
        assert_eq!(Node::and(vec![f.clone(), diff("a")]).reduce(), f);
        assert_eq!(Node::or(vec![t.clone(), diff("a")]).reduce(), t);
        assert_eq!(Node::or(vec![f.clone(), f.clone()]).reduce(), f);
        assert_eq!(Node::and(vec![]).reduce(), t);
        assert_eq!(Node::not(t).reduce(), f);
    }

    #[test]
    fn test_reduce_double_negation() {
        assert_eq!(Node::not(Node::not(diff("a"))).reduce(), diff("a"));
        assert_eq!(
            Node::not(Node::not(Node::not(diff("a")))).reduce(),
            Node::not(diff("a"))
        );
    }

    #[test]
    fn test_reduce_keeps_malformed_not() {
        let node = Node::Operator {
            kind: OperatorKind::Not,
            operands: vec![diff("a"), diff("b")],
        };
        assert_eq!(node.clone().reduce(), node);
    }
}
