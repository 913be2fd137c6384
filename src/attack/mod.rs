//! Attack-path analysis: trace target misbehaviours back to their root causes
//! and the controls that would block them.

mod engine;
mod expression;
mod node;
mod report;
mod tree;

pub use engine::AttackPathEngine;
pub use expression::LogicalExpr;
pub use node::{AttackNode, Distance, Loopback, Traversal};
pub use report::{AttackTreeReport, LinkKind, LinkView, NodeView, TargetTree};
pub use tree::AttackTree;
