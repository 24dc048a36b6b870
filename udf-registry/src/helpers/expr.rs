use std::fmt::{self, Display};

use crate::fndef::FnDef;

use super::literals::Literal;
use super::types::DataType;

/// A handle to an expression node owned by a [NodeManager]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(usize);

impl Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// The different kinds of expression node
#[derive(Clone, Debug)]
pub enum ExprKind {
    /// A named placeholder, e.g. a column or a lambda parameter
    Id { name: String, id: u64 },
    Literal(Literal),
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// A call to a resolved function definition
    Call { fn_def: FnDef, args: Vec<ExprId> },
}

/// An expression node and its inferred output type
///
/// The output type is None until the analyzer (or a registry payload) knows it.
#[derive(Clone, Debug)]
pub struct ExprNode {
    kind: ExprKind,
    output_type: Option<DataType>,
}

impl ExprNode {
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    pub fn output_type(&self) -> Option<&DataType> {
        self.output_type.as_ref()
    }

    /// The function definition if this is a call node
    pub fn fn_def(&self) -> Option<&FnDef> {
        match &self.kind {
            ExprKind::Call { fn_def, .. } => Some(fn_def),
            _ => None,
        }
    }

    /// The arguments if this is a call node
    pub fn call_args(&self) -> Option<&[ExprId]> {
        match &self.kind {
            ExprKind::Call { args, .. } => Some(args),
            _ => None,
        }
    }
}

/// A window definition attached to a call made in windowed context
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowDef {
    pub name: String,
}

/// Owns every expression node created during one compilation
///
/// Nodes are never removed.  Handles stay valid for the lifetime of the manager.
#[derive(Debug, Default)]
pub struct NodeManager {
    nodes: Vec<ExprNode>,
    next_id: u64,
}

impl NodeManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: ExprKind, output_type: Option<DataType>) -> ExprId {
        self.nodes.push(ExprNode { kind, output_type });
        ExprId(self.nodes.len() - 1)
    }

    /// Create a placeholder identifier with a fresh id and no known type
    pub fn make_expr_id(&mut self, name: impl Into<String>) -> ExprId {
        let id = self.next_id;
        self.next_id += 1;
        self.push(
            ExprKind::Id {
                name: name.into(),
                id,
            },
            None,
        )
    }

    /// Create a placeholder identifier that already carries a type
    pub fn make_typed_expr_id(
        &mut self,
        name: impl Into<String>,
        output_type: Option<DataType>,
    ) -> ExprId {
        let expr = self.make_expr_id(name);
        if let Some(output_type) = output_type {
            self.set_output_type(expr, output_type);
        }
        expr
    }

    pub fn make_literal(&mut self, literal: Literal) -> ExprId {
        let output_type = literal.data_type();
        self.push(ExprKind::Literal(literal), Some(output_type))
    }

    /// Create a binary operator node, its output type is left for the caller to set
    pub fn make_binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.push(ExprKind::Binary { op, lhs, rhs }, None)
    }

    /// Create a call node whose output type is the definition's return type
    pub fn make_call(&mut self, fn_def: FnDef, args: Vec<ExprId>) -> ExprId {
        let output_type = fn_def.return_type().cloned();
        self.push(ExprKind::Call { fn_def, args }, output_type)
    }

    pub fn make_window_def(&self, name: impl Into<String>) -> WindowDef {
        WindowDef { name: name.into() }
    }

    pub fn get(&self, expr: ExprId) -> Option<&ExprNode> {
        self.nodes.get(expr.0)
    }

    pub fn output_type(&self, expr: ExprId) -> Option<&DataType> {
        self.get(expr).and_then(|node| node.output_type())
    }

    pub fn set_output_type(&mut self, expr: ExprId, output_type: DataType) {
        if let Some(node) = self.nodes.get_mut(expr.0) {
            node.output_type = Some(output_type);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::{literals::literal, types};

    #[test]
    fn placeholders_get_fresh_ids() {
        let mut nm = NodeManager::new();
        let x = nm.make_expr_id("x");
        let y = nm.make_typed_expr_id("y", Some(types::int32()));
        match (nm.get(x).unwrap().kind(), nm.get(y).unwrap().kind()) {
            (ExprKind::Id { id: a, .. }, ExprKind::Id { id: b, .. }) => assert_ne!(a, b),
            _ => panic!("expected identifiers"),
        }
        assert_eq!(nm.output_type(x), None);
        assert_eq!(nm.output_type(y), Some(&types::int32()));
    }

    #[test]
    fn literals_carry_their_type() {
        let mut nm = NodeManager::new();
        let lit = nm.make_literal(literal(1.5));
        assert_eq!(nm.output_type(lit), Some(&types::double()));
        let sum = nm.make_binary(BinaryOp::Add, lit, lit);
        assert_eq!(nm.output_type(sum), None);
        nm.set_output_type(sum, types::double());
        assert_eq!(nm.output_type(sum), Some(&types::double()));
        assert_eq!(nm.len(), 2);
    }

    #[test]
    fn binary_nodes_keep_their_operator() {
        let mut nm = NodeManager::new();
        let a = nm.make_literal(literal(6));
        let b = nm.make_literal(literal(3));
        for op in [BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div] {
            let node = nm.make_binary(op, a, b);
            match nm.get(node).unwrap().kind() {
                ExprKind::Binary { op: found, lhs, rhs } => {
                    assert_eq!(*found, op);
                    assert_eq!((*lhs, *rhs), (a, b));
                }
                other => panic!("expected a binary node, got {:?}", other),
            }
        }
        assert_eq!(nm.len(), 5);
    }
}
