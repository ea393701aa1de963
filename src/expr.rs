use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VAR_ID: AtomicU64 = AtomicU64::new(0);

/// Unique identity of a [`Var`]. Parameters are bound by this id, never by name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(u64);

impl VarId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// A named placeholder that is bound to a formal parameter at lowering time.
///
/// Every call to [`Var::new`] or [`Var::anonymous`] produces a distinct variable,
/// even when two variables share a display name. Clones keep the identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Var {
    id: VarId,
    name: Arc<str>,
}

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        let id = VarId(NEXT_VAR_ID.fetch_add(1, Ordering::Relaxed));
        Self { id, name: Arc::from(name.into()) }
    }

    /// A variable named `var{N}` after its own id.
    pub fn anonymous() -> Self {
        let id = VarId(NEXT_VAR_ID.fetch_add(1, Ordering::Relaxed));
        let name = format!("var{}", id.0);
        Self { id, name: Arc::from(name) }
    }

    pub fn id(&self) -> VarId {
        self.id
    }

    /// Display name. Only used for diagnostics and IR dumps.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        }
    }
}

/// One node of the expression DAG. All values are f64.
#[derive(Debug)]
pub enum Node {
    /// Placeholder bound to a formal parameter.
    Variable(Var),
    /// Numeric literal.
    Constant(f64),
    /// Unary negation (-x).
    Neg(Expr),
    /// Arithmetic on two operands.
    Binary { op: BinaryOp, lhs: Expr, rhs: Expr },
    /// Call to an externally resolved pure function. Lowering accepts 1 or 2 arguments.
    Call { name: String, args: Vec<Expr> },
}

/// Identity of a node inside a live graph, used for sharing and cycle checks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Shared, immutable handle to a [`Node`].
///
/// Cloning an `Expr` shares the node; the same sub-expression may appear under
/// several parents and is lowered once.
#[derive(Clone, Debug)]
pub struct Expr(Arc<Node>);

impl Expr {
    pub fn new(node: Node) -> Self {
        Expr(Arc::new(node))
    }

    pub fn var(v: &Var) -> Self {
        Expr::new(Node::Variable(v.clone()))
    }

    pub fn constant(value: f64) -> Self {
        Expr::new(Node::Constant(value))
    }

    pub fn binary(op: BinaryOp, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Expr::new(Node::Binary { op, lhs: lhs.into(), rhs: rhs.into() })
    }

    pub fn neg(operand: impl Into<Expr>) -> Self {
        Expr::new(Node::Neg(operand.into()))
    }

    /// Call node. Arity is not checked here; lowering rejects anything but 1 or 2
    /// arguments and mismatches against known intrinsic signatures.
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::new(Node::Call { name: name.into(), args })
    }

    pub fn node(&self) -> &Node {
        &self.0
    }

    pub fn id(&self) -> NodeId {
        NodeId(Arc::as_ptr(&self.0) as usize)
    }

    /// True when both handles point at the same node.
    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Indented tree dump, one node per line. Shared nodes are printed at every use.
    pub fn dump(&self) -> String {
        fn walk(e: &Expr, level: usize, out: &mut String) {
            for _ in 0..level {
                out.push('-');
            }
            match e.node() {
                Node::Variable(v) => out.push_str(&format!("Variable({})\n", v)),
                Node::Constant(c) => out.push_str(&format!("Constant({})\n", c)),
                Node::Neg(x) => {
                    out.push_str("Neg\n");
                    walk(x, level + 1, out);
                }
                Node::Binary { op, lhs, rhs } => {
                    out.push_str(&format!("Binary({})\n", op.symbol()));
                    walk(lhs, level + 1, out);
                    walk(rhs, level + 1, out);
                }
                Node::Call { name, args } => {
                    out.push_str(&format!("Call({}/{})\n", name, args.len()));
                    for a in args {
                        walk(a, level + 1, out);
                    }
                }
            }
        }
        let mut out = String::new();
        walk(self, 0, &mut out);
        out
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            Node::Variable(v) => write!(f, "{}", v),
            Node::Constant(c) => write!(f, "{}", c),
            Node::Neg(x) => write!(f, "-{}", x),
            Node::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Node::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::constant(value)
    }
}

impl From<&Var> for Expr {
    fn from(v: &Var) -> Self {
        Expr::var(v)
    }
}

impl From<Var> for Expr {
    fn from(v: Var) -> Self {
        Expr::new(Node::Variable(v))
    }
}

impl From<&Expr> for Expr {
    fn from(e: &Expr) -> Self {
        e.clone()
    }
}
