//! Statement AST nodes

use super::{BasicType, Expr};
use crate::common::SourcePos;

/// Statement node
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: SourcePos,
}

impl Stmt {
    pub fn new(kind: StmtKind, pos: SourcePos) -> Self {
        Self { kind, pos }
    }
}

/// Statement kinds
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Compound statement (block): { ... }
    Block(Block),

    /// Return statement: return expr;
    Return(Expr),

    /// Expression statement: expr;
    Expr(Expr),

    /// Variable declaration: int x = 5;
    VarDecl(VarDeclStmt),
}

/// Block (compound statement)
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub pos: SourcePos,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, pos: SourcePos) -> Self {
        Self { stmts, pos }
    }
}

/// Local variable declaration
#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclStmt {
    pub ty: BasicType,
    pub name: String,
    pub init: Option<Expr>,
}
