use crate::expr::{Expr, Node, NodeId, Var, VarId};
use std::collections::HashSet;

/// Distinct variables of `expr` in left-to-right first-appearance order.
pub(crate) fn collect_vars(expr: &Expr) -> Vec<Var> {
    fn walk(e: &Expr, visited: &mut HashSet<NodeId>, seen: &mut HashSet<VarId>, out: &mut Vec<Var>) {
        if !visited.insert(e.id()) {
            return;
        }
        match e.node() {
            Node::Constant(_) => {}
            Node::Variable(v) => {
                if seen.insert(v.id()) {
                    out.push(v.clone());
                }
            }
            Node::Neg(x) => walk(x, visited, seen, out),
            Node::Binary { lhs, rhs, .. } => {
                walk(lhs, visited, seen, out);
                walk(rhs, visited, seen, out);
            }
            Node::Call { args, .. } => {
                for a in args {
                    walk(a, visited, seen, out);
                }
            }
        }
    }
    let mut visited = HashSet::new();
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    walk(expr, &mut visited, &mut seen, &mut out);
    out
}

impl Expr {
    /// Variables referenced by this expression, in first-appearance order.
    pub fn variables(&self) -> Vec<Var> {
        collect_vars(self)
    }
}
