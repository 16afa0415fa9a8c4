//! Declaration AST nodes

use super::{BasicType, Block, Parameter};
use crate::common::SourcePos;

/// Top-level declaration node
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub kind: DeclKind,
    pub pos: SourcePos,
}

impl Declaration {
    pub fn new(kind: DeclKind, pos: SourcePos) -> Self {
        Self { kind, pos }
    }
}

/// Declaration kinds
#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    /// Function definition: int main() { ... }
    Function(FunctionDecl),
}

/// Function definition
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub return_type: BasicType,
    pub name: String,
    /// Always empty: parameter lists are not accepted
    pub params: Vec<Parameter>,
    pub body: Block,
    pub pos: SourcePos,
}
