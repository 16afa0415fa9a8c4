//! Indented tree dump of the AST, used by `--dump-ast`
//!
//! Each node is printed as `<line>:<Node>: <detail>` with 0-based lines and
//! two spaces of indentation per nesting level.

use std::fmt::Write;

use super::ast::*;
use crate::common::SourcePos;

/// Render the whole translation unit
pub fn print_unit(unit: &TranslationUnit) -> String {
    let mut printer = AstPrinter::default();
    for decl in &unit.declarations {
        printer.declaration(decl);
    }
    printer.out
}

/// Render a single expression tree
pub fn print_expr(expr: &Expr) -> String {
    let mut printer = AstPrinter::default();
    printer.expr(expr);
    printer.out
}

#[derive(Default)]
struct AstPrinter {
    out: String,
    depth: usize,
}

impl AstPrinter {
    fn line(&mut self, pos: SourcePos, node: &str, detail: &str) {
        let _ = write!(
            self.out,
            "{:indent$}{}:{}:",
            "",
            pos.line,
            node,
            indent = self.depth * 2
        );
        if !detail.is_empty() {
            let _ = write!(self.out, " {}", detail);
        }
        self.out.push('\n');
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self)) {
        self.depth += 1;
        f(self);
        self.depth -= 1;
    }

    fn declaration(&mut self, decl: &Declaration) {
        match &decl.kind {
            DeclKind::Function(func) => self.function(func),
        }
    }

    fn function(&mut self, func: &FunctionDecl) {
        self.line(func.pos, "FunctionDecl", &func.name);
        self.nested(|p| {
            p.basic_type(&func.return_type);
            for param in &func.params {
                p.line(param.pos, "TypeAndNameDecl", &param.name);
            }
            p.block(&func.body);
        });
    }

    fn basic_type(&mut self, ty: &BasicType) {
        self.line(ty.pos, "BasicType", &ty.name);
    }

    fn block(&mut self, block: &Block) {
        self.line(block.pos, "BlockStmt", "");
        self.nested(|p| {
            for stmt in &block.stmts {
                p.stmt(stmt);
            }
        });
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.block(block),
            StmtKind::Return(expr) => {
                self.line(stmt.pos, "ReturnStmt", "");
                self.nested(|p| p.expr(expr));
            }
            StmtKind::Expr(expr) => {
                self.line(stmt.pos, "ExprStmt", "");
                self.nested(|p| p.expr(expr));
            }
            StmtKind::VarDecl(decl) => {
                self.line(stmt.pos, "VarDeclStmt", &decl.name);
                self.nested(|p| {
                    p.basic_type(&decl.ty);
                    if let Some(init) = &decl.init {
                        p.expr(init);
                    }
                });
            }
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::IntegerNumber(digits) => self.line(expr.pos, "IntegerNumberExpr", digits),
            ExprKind::Var(name) => self.line(expr.pos, "VarExpr", name),
            ExprKind::Unary { op, operand } => {
                let detail = if op.is_postfix() {
                    format!("{} (postfix)", op.as_str())
                } else {
                    op.as_str().to_string()
                };
                self.line(expr.pos, "UnaryOpExpr", &detail);
                self.nested(|p| p.expr(operand));
            }
            ExprKind::Binary { op, left, right } => {
                self.line(expr.pos, "BinaryOpExpr", op.as_str());
                self.nested(|p| {
                    p.expr(left);
                    p.expr(right);
                });
            }
            ExprKind::Assign { op, target, value } => {
                self.line(expr.pos, "AssignExpr", op.as_str());
                self.nested(|p| {
                    p.expr(target);
                    p.expr(value);
                });
            }
        }
    }
}
