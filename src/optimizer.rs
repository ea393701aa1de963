use crate::expr::{BinaryOp, Expr, Node, NodeId};
use std::collections::HashMap;

// Semantics-preserving constant folding. Calls are treated as opaque (args are
// folded, the call itself never is). `x + 0` is not rewritten: it maps -0.0 to
// +0.0. Unchanged subgraphs keep their identity and a shared node that does
// change is rebuilt once, so sharing survives.
pub(crate) fn optimize(expr: &Expr) -> Expr {
    let mut memo = HashMap::new();
    fold(expr, &mut memo)
}

fn fold(e: &Expr, memo: &mut HashMap<NodeId, Expr>) -> Expr {
    if let Some(done) = memo.get(&e.id()) {
        return done.clone();
    }
    let out = match e.node() {
        Node::Constant(_) | Node::Variable(_) => e.clone(),
        Node::Neg(x) => {
            let fx = fold(x, memo);
            match fx.node() {
                Node::Constant(v) => Expr::constant(-v),
                Node::Neg(inner) => inner.clone(),
                _ if fx.ptr_eq(x) => e.clone(),
                _ => Expr::neg(fx),
            }
        }
        Node::Binary { op, lhs, rhs } => {
            let a = fold(lhs, memo);
            let b = fold(rhs, memo);
            fold_binary(e, *op, lhs, rhs, a, b)
        }
        Node::Call { name, args } => {
            let folded: Vec<Expr> = args.iter().map(|a| fold(a, memo)).collect();
            if folded.iter().zip(args).all(|(f, a)| f.ptr_eq(a)) {
                e.clone()
            } else {
                Expr::call(name.clone(), folded)
            }
        }
    };
    memo.insert(e.id(), out.clone());
    out
}

fn constant(e: &Expr) -> Option<f64> {
    match e.node() {
        Node::Constant(c) => Some(*c),
        _ => None,
    }
}

fn fold_binary(orig: &Expr, op: BinaryOp, lhs: &Expr, rhs: &Expr, a: Expr, b: Expr) -> Expr {
    match (op, constant(&a), constant(&b)) {
        (op, Some(x), Some(y)) => Expr::constant(op.apply(x, y)),
        (BinaryOp::Sub, _, Some(y)) if y == 0.0 => a,
        (BinaryOp::Mul, _, Some(y)) if y == 1.0 => a,
        (BinaryOp::Mul, Some(x), _) if x == 1.0 => b,
        (BinaryOp::Div, _, Some(y)) if y == 1.0 => a,
        _ if a.ptr_eq(lhs) && b.ptr_eq(rhs) => orig.clone(),
        _ => Expr::binary(op, a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::sin;
    use crate::expr::Var;

    #[test]
    fn folds_constant_arithmetic() {
        let e = Expr::constant(2.0) * 3.0 + 1.0;
        let folded = optimize(&e);
        assert!(matches!(folded.node(), Node::Constant(c) if *c == 7.0));
    }

    #[test]
    fn removes_identities() {
        let x = Var::new("x");
        let e = (&x * 1.0) - 0.0;
        assert_eq!(optimize(&e).to_string(), "x");
        let e = -(-Expr::var(&x)) / 1.0;
        assert_eq!(optimize(&e).to_string(), "x");
    }

    #[test]
    fn adding_zero_is_kept() {
        let x = Var::new("x");
        let e = (&x + 0.0) + (0.0 + Expr::var(&x));
        let folded = optimize(&e);
        assert!(folded.ptr_eq(&e));
        let params = [x];
        assert!(folded.eval(&params, &[-0.0]).unwrap().is_sign_positive());
    }

    #[test]
    fn calls_are_not_folded() {
        let e = sin(Expr::constant(1.0) + 1.0);
        assert_eq!(optimize(&e).to_string(), "sin(2)");
    }

    #[test]
    fn untouched_graph_keeps_identity() {
        let x = Var::new("x");
        let e = sin(&x) * &x;
        assert!(optimize(&e).ptr_eq(&e));
    }

    #[test]
    fn shared_nodes_stay_shared() {
        let x = Var::new("x");
        let s = &x + Expr::constant(1.0) * 2.0;
        let e = &s * &s;
        let folded = optimize(&e);
        match folded.node() {
            Node::Binary { lhs, rhs, .. } => assert!(lhs.ptr_eq(rhs)),
            other => panic!("unexpected node: {:?}", other),
        }
    }
}
