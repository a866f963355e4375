//! The untyped surface AST produced by the parser.
//!
//! Grammar actions build these nodes without consulting the environment;
//! type checking and symbol resolution happen in the lowering pass
//! (`compile`), which turns this tree into the typed expression tree.

use crate::{lexer::Position, number::Number, types::Identifier};

#[derive(Debug, Clone)]
pub struct ExprNode {
    pub position: Position,
    pub expr: SurfaceExpr,
}

#[derive(Debug, Clone)]
pub enum SurfaceExpr {
    Number(Number),
    Str(String),
    Bool(bool),
    /// `a::b::name` (the path may be a single identifier).
    Name(Vec<Identifier>),
    Call {
        callee: Box<ExprNode>,
        args: Vec<ExprNode>,
    },
    /// `expr.name` — method or field access; calling is a `Call` around it.
    Method {
        object: Box<ExprNode>,
        name: Identifier,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<ExprNode>,
        rhs: Box<ExprNode>,
    },
    /// Short-circuiting `&&` (identity = true) / `||` (identity = false).
    Logical {
        identity: bool,
        lhs: Box<ExprNode>,
        rhs: Box<ExprNode>,
    },
    Not(Box<ExprNode>),
    Negate(Box<ExprNode>),
    /// `name = value`, or `name op= value` when `op` is set.
    Assign {
        name: Identifier,
        op: Option<BinaryOp>,
        value: Box<ExprNode>,
    },
    Ternary {
        condition: Box<ExprNode>,
        true_case: Box<ExprNode>,
        false_case: Box<ExprNode>,
    },
    Lambda {
        params: Vec<Param>,
        return_type: Identifier,
        body: Vec<Stmt>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equals,
    NotEquals,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

/// A `TYPE name` parameter pair.
#[derive(Debug, Clone)]
pub struct Param {
    pub type_name: Identifier,
    pub name: Identifier,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(ExprNode),
    /// `TYPE name;` or `TYPE name = expr;` (`TYPE` may be `auto`).
    VarDef {
        position: Position,
        type_name: Identifier,
        name: Identifier,
        init: Option<ExprNode>,
    },
    /// `TYPE name(TYPE a, ...) { ... }`
    FuncDef {
        position: Position,
        return_type: Identifier,
        name: Identifier,
        params: Vec<Param>,
        body: Vec<Stmt>,
    },
    Block(Vec<Stmt>),
    If {
        position: Position,
        condition: ExprNode,
        true_branch: Box<Stmt>,
        false_branch: Option<Box<Stmt>>,
    },
    While {
        position: Position,
        condition: ExprNode,
        body: Box<Stmt>,
    },
    For {
        position: Position,
        init: Box<Stmt>,
        condition: ExprNode,
        step: ExprNode,
        body: Box<Stmt>,
    },
    Return {
        position: Position,
        value: Option<ExprNode>,
    },
    NamespaceDecl {
        position: Position,
        name: Identifier,
        body: Vec<Stmt>,
    },
    ClassDecl {
        position: Position,
        name: Identifier,
        body: Vec<Stmt>,
    },
}

/// Grammar-action helper for the binary operator tiers.
pub fn binary(position: Position, op: BinaryOp, lhs: ExprNode, rhs: ExprNode) -> ExprNode {
    ExprNode::new(
        position,
        SurfaceExpr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
    )
}

impl ExprNode {
    pub fn new(position: Position, expr: SurfaceExpr) -> Self {
        Self { position, expr }
    }

    /// `x op= v` and `++x` desugar to assignments; `x op 1` is built here.
    pub fn compound_assign(position: Position, name: Identifier, op: BinaryOp, value: Self) -> Self {
        Self::new(
            position,
            SurfaceExpr::Assign {
                name,
                op: Some(op),
                value: Box::new(value),
            },
        )
    }

    /// `++x` / `x++` / `--x` / `x--`: an increment by one, evaluating to the
    /// updated value.
    pub fn increment(position: Position, name: Identifier, negative: bool) -> Self {
        let op = if negative {
            BinaryOp::Subtract
        } else {
            BinaryOp::Add
        };
        Self::compound_assign(
            position,
            name,
            op,
            Self::new(position, SurfaceExpr::Number(Number::from_i64(1))),
        )
    }
}
