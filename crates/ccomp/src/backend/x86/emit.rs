//! x86 code emitter
//!
//! Walks the AST and lowers it straight to AT&T assembly using the
//! accumulator convention: every expression leaves its value in `%eax`.
//! Binary operators evaluate the right operand first, park it on the stack,
//! evaluate the left operand, then pop the right one into `%ebx` (`%ecx` for
//! shifts) before applying the operator.

use std::mem;

use log::{debug, info};

use super::frame::{FrameLayout, LabelAllocator};
use super::inst::*;
use crate::common::{CompileError, CompileResult, DiagnosticReporter, SourcePos};
use crate::frontend::ast::*;

const EAX: Operand = Operand::Reg(Reg::Eax);

/// Code generator that converts the AST to x86 assembly
pub struct CodeGenerator<'a> {
    reporter: &'a DiagnosticReporter,
    output: Vec<X86Inst>,
    frame: FrameLayout,
    labels: LabelAllocator,
    had_error: bool,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(reporter: &'a DiagnosticReporter) -> Self {
        Self::with_labels(reporter, LabelAllocator::new())
    }

    pub fn with_labels(reporter: &'a DiagnosticReporter, labels: LabelAllocator) -> Self {
        Self {
            reporter,
            output: Vec::new(),
            frame: FrameLayout::new(),
            labels,
            had_error: false,
        }
    }

    /// Generate x86 assembly for the translation unit as text
    pub fn generate(&mut self, unit: &TranslationUnit) -> String {
        let instructions = self.generate_instructions(unit);

        let mut result = String::new();
        for inst in &instructions {
            result.push_str(&inst.format());
            result.push('\n');
        }
        result
    }

    /// Generate the instruction list for the translation unit
    pub fn generate_instructions(&mut self, unit: &TranslationUnit) -> Vec<X86Inst> {
        self.output.clear();
        self.had_error = false;
        info!("generating x86 assembly");

        self.emit_header();
        for func in unit.functions() {
            self.generate_function(func);
        }
        self.emit(X86Inst::Comment("End of compiling.".to_string()));

        mem::take(&mut self.output)
    }

    /// True if any semantic or code generation error was reported
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    fn emit(&mut self, inst: X86Inst) {
        self.output.push(inst);
    }

    fn report(&mut self, error: &CompileError) {
        self.had_error = true;
        self.reporter.report_error(error);
    }

    /// Process entry point: run `main` and exit with its result
    fn emit_header(&mut self) {
        self.emit(X86Inst::Comment("Compiled by ccomp".to_string()));
        self.emit(X86Inst::Blank);
        self.emit(X86Inst::Directive(".globl _start".to_string()));
        self.emit(X86Inst::Label("_start".to_string()));
        self.emit(X86Inst::Call("main".to_string()));
        self.emit(X86Inst::Movl(EAX, Reg::Ebx.into()));
        self.emit(X86Inst::Movl(Operand::Imm(1), EAX));
        self.emit(X86Inst::Int(0x80));
        self.emit(X86Inst::Blank);
    }

    fn emit_prologue(&mut self) {
        self.emit(X86Inst::Pushl(Reg::Ebp.into()));
        self.emit(X86Inst::Movl(Reg::Esp.into(), Reg::Ebp.into()));
        self.emit(X86Inst::Blank);
    }

    fn emit_return(&mut self) {
        self.emit(X86Inst::Movl(Reg::Ebp.into(), Reg::Esp.into()));
        self.emit(X86Inst::Popl(Reg::Ebp));
        self.emit(X86Inst::Ret);
    }

    /// Generate one function. An error that cannot be degraded discards the
    /// function's code and leaves a comment in its place.
    fn generate_function(&mut self, func: &FunctionDecl) {
        let start = self.output.len();
        self.frame.reset();
        debug!("generating function {}", func.name);

        if let Err(err) = self.function_body(func) {
            self.report(&err);
            self.output.truncate(start);
            self.emit(X86Inst::Comment(format!(
                "{} aborted: {}",
                func.name,
                err.message()
            )));
            self.emit(X86Inst::Blank);
        }
    }

    fn function_body(&mut self, func: &FunctionDecl) -> CompileResult<()> {
        self.emit(X86Inst::Directive(format!(".globl {}", func.name)));
        self.emit(X86Inst::Label(func.name.clone()));
        self.emit_prologue();

        self.block(&func.body)?;

        // Falling off the end returns whatever is in the accumulator
        if !ends_with_return(&func.body) {
            self.emit_return();
        }
        self.emit(X86Inst::Blank);
        Ok(())
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn block(&mut self, block: &Block) -> CompileResult<()> {
        for stmt in &block.stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match &stmt.kind {
            StmtKind::Block(block) => self.block(block),
            StmtKind::Return(expr) => {
                self.expr(expr)?;
                self.emit_return();
                Ok(())
            }
            StmtKind::Expr(expr) => self.expr(expr),
            StmtKind::VarDecl(decl) => self.var_decl(decl, stmt.pos),
        }
    }

    fn var_decl(&mut self, decl: &VarDeclStmt, pos: SourcePos) -> CompileResult<()> {
        if self.frame.lookup(&decl.name).is_some() {
            self.report(&CompileError::semantic(
                format!("redefinition of variable '{}'", decl.name),
                pos,
            ));
            return Ok(());
        }

        if let Some(init) = &decl.init {
            self.expr(init)?;
        }
        self.emit(X86Inst::Pushl(EAX));

        // The name becomes visible only after its initializer
        self.frame.declare(&decl.name);
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn expr(&mut self, expr: &Expr) -> CompileResult<()> {
        match &expr.kind {
            ExprKind::IntegerNumber(digits) => {
                self.emit(X86Inst::Movl(Operand::Literal(digits.clone()), EAX));
                Ok(())
            }
            ExprKind::Var(name) => {
                let offset = self.variable(name, expr.pos)?;
                self.emit(X86Inst::Movl(Operand::frame(offset), EAX));
                Ok(())
            }
            ExprKind::Unary { op, operand } => self.unary(*op, operand),
            ExprKind::Binary { op, left, right } => self.binary(*op, left, right),
            ExprKind::Assign { op, target, value } => self.assign(*op, target, value),
        }
    }

    fn variable(&self, name: &str, pos: SourcePos) -> CompileResult<i32> {
        self.frame.lookup(name).ok_or_else(|| {
            CompileError::semantic(format!("undefined variable '{}'", name), pos)
        })
    }

    /// Frame offset of an assignment or increment target.
    /// A non-variable target is reported and degrades to offset 0.
    fn target_offset(&mut self, target: &Expr) -> CompileResult<i32> {
        match target.as_var() {
            Some(name) => self.variable(name, target.pos),
            None => {
                self.report(&CompileError::semantic("invalid assignment target", target.pos));
                Ok(0)
            }
        }
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr) -> CompileResult<()> {
        if !op.is_increment() {
            self.expr(operand)?;
            match op {
                UnaryOp::Neg => self.emit(X86Inst::Negl(EAX)),
                UnaryOp::BitNot => self.emit(X86Inst::Notl(EAX)),
                _ => {
                    self.emit(X86Inst::Cmpl(Operand::Imm(0), EAX));
                    self.emit(X86Inst::Movl(Operand::Imm(0), EAX));
                    self.emit(X86Inst::Set(Cond::E, Reg::Al));
                }
            }
            return Ok(());
        }

        let slot = Operand::frame(self.target_offset(operand)?);
        self.emit(X86Inst::Movl(slot.clone(), EAX));

        match op {
            // Prefix: the accumulator holds the updated value
            UnaryOp::PreIncrement => {
                self.emit(X86Inst::Incl(EAX));
                self.emit(X86Inst::Movl(EAX, slot));
            }
            UnaryOp::PreDecrement => {
                self.emit(X86Inst::Decl(EAX));
                self.emit(X86Inst::Movl(EAX, slot));
            }
            // Postfix: the accumulator keeps the old value
            UnaryOp::PostIncrement => self.emit(X86Inst::Addl(Operand::Imm(1), slot)),
            _ => self.emit(X86Inst::Subl(Operand::Imm(1), slot)),
        }
        Ok(())
    }

    fn binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> CompileResult<()> {
        match op {
            BinaryOp::Comma => {
                self.expr(left)?;
                self.expr(right)
            }
            BinaryOp::LogAnd | BinaryOp::LogOr => self.short_circuit(op, left, right),
            _ => {
                self.expr(right)?;
                self.emit(X86Inst::Pushl(EAX));
                self.expr(left)?;
                self.emit(X86Inst::Popl(scratch_register(op)));
                self.apply_binary(op)
            }
        }
    }

    /// Apply `op` to the left operand in `%eax` and the right operand in
    /// `%ebx` (`%ecx` for shifts), leaving the result in `%eax`
    fn apply_binary(&mut self, op: BinaryOp) -> CompileResult<()> {
        let rhs = Operand::Reg(Reg::Ebx);
        match op {
            BinaryOp::Add => self.emit(X86Inst::Addl(rhs, EAX)),
            BinaryOp::Sub => self.emit(X86Inst::Subl(rhs, EAX)),
            BinaryOp::Mul => self.emit(X86Inst::Imull(rhs, Reg::Eax)),
            BinaryOp::Div | BinaryOp::Mod => {
                self.emit(X86Inst::Cdq);
                self.emit(X86Inst::Idivl(rhs));
                if op == BinaryOp::Mod {
                    self.emit(X86Inst::Movl(Reg::Edx.into(), EAX));
                }
            }
            BinaryOp::BitAnd => self.emit(X86Inst::Andl(rhs, EAX)),
            BinaryOp::BitOr => self.emit(X86Inst::Orl(rhs, EAX)),
            BinaryOp::BitXor => self.emit(X86Inst::Xorl(rhs, EAX)),
            BinaryOp::Shl => self.emit(X86Inst::Sall(Reg::Cl, EAX)),
            BinaryOp::Shr => self.emit(X86Inst::Sarl(Reg::Cl, EAX)),
            BinaryOp::Eq => self.compare(Cond::E),
            BinaryOp::Ne => self.compare(Cond::Ne),
            BinaryOp::Lt => self.compare(Cond::L),
            BinaryOp::Le => self.compare(Cond::Le),
            BinaryOp::Gt => self.compare(Cond::G),
            BinaryOp::Ge => self.compare(Cond::Ge),
            BinaryOp::Comma | BinaryOp::LogAnd | BinaryOp::LogOr => {
                return Err(CompileError::codegen(format!(
                    "'{}' has no register form",
                    op.as_str()
                )));
            }
        }
        Ok(())
    }

    /// 0/1 result of comparing `%eax` against `%ebx`
    fn compare(&mut self, cond: Cond) {
        self.emit(X86Inst::Cmpl(Reg::Ebx.into(), EAX));
        self.emit(X86Inst::Movl(Operand::Imm(0), EAX));
        self.emit(X86Inst::Set(cond, Reg::Al));
    }

    /// Normalize `%eax` to 0 or 1
    fn to_boolean(&mut self) {
        self.emit(X86Inst::Cmpl(Operand::Imm(0), EAX));
        self.emit(X86Inst::Movl(Operand::Imm(0), EAX));
        self.emit(X86Inst::Set(Cond::Ne, Reg::Al));
    }

    fn short_circuit(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> CompileResult<()> {
        let label_right = self.labels.fresh()?;
        let label_end = self.labels.fresh()?;

        self.expr(left)?;
        self.emit(X86Inst::Cmpl(Operand::Imm(0), EAX));

        if op == BinaryOp::LogAnd {
            // A zero left operand is already the result
            self.emit(X86Inst::Jcc(Cond::Ne, label_right.clone()));
            self.emit(X86Inst::Jmp(label_end.clone()));
        } else {
            self.emit(X86Inst::Jcc(Cond::E, label_right.clone()));
            self.emit(X86Inst::Movl(Operand::Imm(1), EAX));
            self.emit(X86Inst::Jmp(label_end.clone()));
        }

        self.emit(X86Inst::Label(label_right));
        self.expr(right)?;
        self.to_boolean();
        self.emit(X86Inst::Label(label_end));
        Ok(())
    }

    fn assign(&mut self, op: AssignOp, target: &Expr, value: &Expr) -> CompileResult<()> {
        let slot = Operand::frame(self.target_offset(target)?);
        self.expr(value)?;

        if let Some(binary) = op.to_binary_op() {
            // Compound form: right side to the scratch register, reload, apply
            self.emit(X86Inst::Movl(EAX, scratch_register(binary).into()));
            self.emit(X86Inst::Movl(slot.clone(), EAX));
            self.apply_binary(binary)?;
        }

        self.emit(X86Inst::Movl(EAX, slot));
        Ok(())
    }
}

fn ends_with_return(body: &Block) -> bool {
    matches!(body.stmts.last(), Some(Stmt { kind: StmtKind::Return(_), .. }))
}

/// Register receiving the right operand of a binary operator
fn scratch_register(op: BinaryOp) -> Reg {
    match op {
        BinaryOp::Shl | BinaryOp::Shr => Reg::Ecx,
        _ => Reg::Ebx,
    }
}
