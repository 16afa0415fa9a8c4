//! Type representations in the AST

use crate::common::SourcePos;

/// A named built-in type. Only `int` is accepted by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicType {
    pub name: String,
    pub pos: SourcePos,
}

impl BasicType {
    pub fn new(name: impl Into<String>, pos: SourcePos) -> Self {
        Self {
            name: name.into(),
            pos,
        }
    }
}

/// A type paired with a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAndNameDecl {
    pub ty: BasicType,
    pub name: String,
    pub pos: SourcePos,
}

/// Function parameter
pub type Parameter = TypeAndNameDecl;
