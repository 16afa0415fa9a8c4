//! Recursive descent parser with panic-mode error recovery

use std::mem;

use log::debug;

use crate::common::{CompileError, CompileResult, DiagnosticReporter, SourcePos};
use crate::frontend::ast::*;
use crate::frontend::lexer::{Lexer, Token, TokenKind};

/// Operators accepted at one binary precedence level
type OperatorTable = &'static [(TokenKind, BinaryOp)];

const BITWISE_OR_OPS: OperatorTable = &[(TokenKind::Pipe, BinaryOp::BitOr)];
const BITWISE_XOR_OPS: OperatorTable = &[(TokenKind::Caret, BinaryOp::BitXor)];
const BITWISE_AND_OPS: OperatorTable = &[(TokenKind::Amp, BinaryOp::BitAnd)];
const EQUALITY_OPS: OperatorTable = &[
    (TokenKind::EqEq, BinaryOp::Eq),
    (TokenKind::NotEq, BinaryOp::Ne),
];
const RELATIONAL_OPS: OperatorTable = &[
    (TokenKind::Lt, BinaryOp::Lt),
    (TokenKind::LtEq, BinaryOp::Le),
    (TokenKind::Gt, BinaryOp::Gt),
    (TokenKind::GtEq, BinaryOp::Ge),
];
const SHIFT_OPS: OperatorTable = &[
    (TokenKind::LtLt, BinaryOp::Shl),
    (TokenKind::GtGt, BinaryOp::Shr),
];
const ADDITIVE_OPS: OperatorTable = &[
    (TokenKind::Plus, BinaryOp::Add),
    (TokenKind::Minus, BinaryOp::Sub),
];
const MULTIPLICATIVE_OPS: OperatorTable = &[
    (TokenKind::Star, BinaryOp::Mul),
    (TokenKind::Slash, BinaryOp::Div),
    (TokenKind::Percent, BinaryOp::Mod),
];

/// Recursive descent parser for the C subset.
///
/// `previous` is the token just consumed and `current` the lookahead.
/// Syntax errors are reported where they are detected and propagated with
/// `?` to the enclosing statement, which resynchronizes and carries on.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    reporter: &'a DiagnosticReporter,
    previous: Token,
    current: Token,
    had_error: bool,
    lexer_error: bool,
    panic_mode: bool,
    /// Tokens consumed so far, used to guarantee progress during recovery
    consumed: usize,
}

impl<'a> Parser<'a> {
    /// Create a parser pulling tokens from `lexer`
    pub fn new(lexer: Lexer<'a>, reporter: &'a DiagnosticReporter) -> Self {
        let mut parser = Self {
            lexer,
            reporter,
            previous: Token::eof(SourcePos::default()),
            current: Token::eof(SourcePos::default()),
            had_error: false,
            lexer_error: false,
            panic_mode: false,
            consumed: 0,
        };
        parser.current = parser.pull();
        parser
    }

    /// Parser over an in-memory string
    pub fn from_source(source: &str, reporter: &'a DiagnosticReporter) -> Self {
        Self::new(Lexer::from_source(source, reporter), reporter)
    }

    /// Parse a complete translation unit.
    ///
    /// Returns an empty unit if any lexical or syntax error was reported.
    pub fn parse(&mut self) -> TranslationUnit {
        let mut declarations = Vec::new();

        while !self.at_end() {
            let before = self.consumed;
            match self.parse_function_declaration() {
                Ok(decl) => declarations.push(decl),
                Err(err) => self.recover_declaration(err, before),
            }
        }

        if self.had_error() {
            return TranslationUnit::default();
        }
        TranslationUnit::new(declarations)
    }

    /// True once any lexical or syntax error has been seen
    pub fn had_error(&self) -> bool {
        self.had_error || self.lexer_error
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    /// Next token from the lexer; error tokens are reported and skipped.
    /// A lexical error enters panic mode, so the syntax error it causes
    /// stays quiet until the parser resynchronizes.
    fn pull(&mut self) -> Token {
        loop {
            let token = self.lexer.next_token();
            if token.kind != TokenKind::Error {
                return token;
            }
            self.lexer_error = true;
            self.panic_mode = true;
            self.reporter
                .report_error(&CompileError::lexer(token.lexeme, token.pos));
        }
    }

    fn at_end(&self) -> bool {
        self.current.is_eof()
    }

    fn advance(&mut self) -> &Token {
        let next = self.pull();
        self.previous = mem::replace(&mut self.current, next);
        self.consumed += 1;
        &self.previous
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> CompileResult<&Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message))
        }
    }

    /// Record a syntax error at the lookahead token.
    /// Only the first error of a panic is reported.
    fn error_at_current(&mut self, message: &str) -> CompileError {
        let error = CompileError::parser(message, self.current.pos);
        if !self.panic_mode {
            self.reporter.report_error(&error);
        }
        self.panic_mode = true;
        self.had_error = true;
        error
    }

    fn recover(&mut self, err: CompileError, before: usize) {
        debug!("recovering after {}", err);
        self.synchronize();
        if self.consumed == before && !self.at_end() {
            self.advance();
        }
    }

    /// Skip the rest of a broken declaration: stop before the next `int` at
    /// brace depth zero, or at end of file
    fn recover_declaration(&mut self, err: CompileError, before: usize) {
        debug!("skipping declaration after {}", err);
        self.panic_mode = false;
        if self.consumed == before && !self.at_end() {
            self.advance();
        }

        let mut depth = 0usize;
        while !self.at_end() {
            match self.current.kind {
                TokenKind::Int if depth == 0 => return,
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip to a statement boundary: just past a `;`, or before `int`,
    /// `return` or a closing brace
    fn synchronize(&mut self) {
        self.panic_mode = false;

        while !self.at_end() {
            if self.previous.kind == TokenKind::Semi {
                return;
            }
            match self.current.kind {
                TokenKind::Int | TokenKind::Return | TokenKind::RBrace => return,
                _ => {}
            }
            self.advance();
        }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn parse_function_declaration(&mut self) -> CompileResult<Declaration> {
        let pos = self.current.pos;
        let return_type = self.parse_type()?;
        let name = self.expect(TokenKind::Identifier, "expected function name")?.lexeme.clone();

        self.expect(TokenKind::LParen, "expected '(' after function name")?;
        self.expect(TokenKind::RParen, "expected ')' after function parameters")?;

        let body = self.parse_block()?;

        Ok(Declaration::new(
            DeclKind::Function(FunctionDecl {
                return_type,
                name,
                params: Vec::new(),
                body,
                pos,
            }),
            pos,
        ))
    }

    fn parse_type(&mut self) -> CompileResult<BasicType> {
        let token = self.expect(TokenKind::Int, "expected type name")?;
        Ok(BasicType::new(token.lexeme.clone(), token.pos))
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_block(&mut self) -> CompileResult<Block> {
        let pos = self.current.pos;
        self.expect(TokenKind::LBrace, "expected '{' before block")?;

        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_end() {
            let before = self.consumed;
            match self.parse_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => self.recover(err, before),
            }
        }

        self.expect(TokenKind::RBrace, "expected '}' after block")?;
        Ok(Block::new(stmts, pos))
    }

    fn parse_statement(&mut self) -> CompileResult<Stmt> {
        match self.current.kind {
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Int => self.parse_var_decl_statement(),
            TokenKind::LBrace => {
                let pos = self.current.pos;
                let block = self.parse_block()?;
                Ok(Stmt::new(StmtKind::Block(block), pos))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_return_statement(&mut self) -> CompileResult<Stmt> {
        let pos = self.advance().pos;
        let expr = self.parse_expression()?;
        self.expect(TokenKind::Semi, "expected ';' after return value")?;
        Ok(Stmt::new(StmtKind::Return(expr), pos))
    }

    fn parse_var_decl_statement(&mut self) -> CompileResult<Stmt> {
        let pos = self.current.pos;
        let ty = self.parse_type()?;
        let name = self.expect(TokenKind::Identifier, "expected variable name")?.lexeme.clone();

        let init = if self.match_token(TokenKind::Eq) {
            Some(self.parse_assignment_expression()?)
        } else {
            None
        };

        self.expect(TokenKind::Semi, "expected ';' after variable declaration")?;
        Ok(Stmt::new(StmtKind::VarDecl(VarDeclStmt { ty, name, init }), pos))
    }

    fn parse_expression_statement(&mut self) -> CompileResult<Stmt> {
        let pos = self.current.pos;
        let expr = self.parse_expression()?;
        self.expect(TokenKind::Semi, "expected ';' after expression")?;
        Ok(Stmt::new(StmtKind::Expr(expr), pos))
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Comma level, the loosest binding
    fn parse_expression(&mut self) -> CompileResult<Expr> {
        let mut left = self.parse_assignment_expression()?;

        while self.check(TokenKind::Comma) {
            let pos = self.advance().pos;
            let right = self.parse_assignment_expression()?;
            left = Expr::binary(BinaryOp::Comma, left, right, pos);
        }

        Ok(left)
    }

    fn parse_assignment_expression(&mut self) -> CompileResult<Expr> {
        let target = self.parse_logical_or_expression()?;

        let Some(op) = assign_op(self.current.kind) else {
            return Ok(target);
        };
        let pos = self.advance().pos;
        // Right-associative: a = b = c
        let value = self.parse_assignment_expression()?;

        Ok(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            pos,
        ))
    }

    fn parse_logical_or_expression(&mut self) -> CompileResult<Expr> {
        let mut left = self.parse_logical_and_expression()?;

        while self.check(TokenKind::PipePipe) {
            let pos = self.advance().pos;
            let right = self.parse_logical_and_expression()?;
            left = Expr::binary(BinaryOp::LogOr, left, right, pos);
        }

        Ok(left)
    }

    fn parse_logical_and_expression(&mut self) -> CompileResult<Expr> {
        let mut left = self.parse_bitwise_or_expression()?;

        while self.check(TokenKind::AmpAmp) {
            let pos = self.advance().pos;
            let right = self.parse_bitwise_or_expression()?;
            left = Expr::binary(BinaryOp::LogAnd, left, right, pos);
        }

        Ok(left)
    }

    fn parse_bitwise_or_expression(&mut self) -> CompileResult<Expr> {
        self.parse_binary_level(Self::parse_bitwise_xor_expression, BITWISE_OR_OPS)
    }

    fn parse_bitwise_xor_expression(&mut self) -> CompileResult<Expr> {
        self.parse_binary_level(Self::parse_bitwise_and_expression, BITWISE_XOR_OPS)
    }

    fn parse_bitwise_and_expression(&mut self) -> CompileResult<Expr> {
        self.parse_binary_level(Self::parse_equality_expression, BITWISE_AND_OPS)
    }

    fn parse_equality_expression(&mut self) -> CompileResult<Expr> {
        self.parse_binary_level(Self::parse_relational_expression, EQUALITY_OPS)
    }

    fn parse_relational_expression(&mut self) -> CompileResult<Expr> {
        self.parse_binary_level(Self::parse_shift_expression, RELATIONAL_OPS)
    }

    fn parse_shift_expression(&mut self) -> CompileResult<Expr> {
        self.parse_binary_level(Self::parse_additive_expression, SHIFT_OPS)
    }

    fn parse_additive_expression(&mut self) -> CompileResult<Expr> {
        self.parse_binary_level(Self::parse_multiplicative_expression, ADDITIVE_OPS)
    }

    fn parse_multiplicative_expression(&mut self) -> CompileResult<Expr> {
        self.parse_binary_level(Self::parse_unary_expression, MULTIPLICATIVE_OPS)
    }

    /// Left-associative level: operand (op operand)*
    fn parse_binary_level(
        &mut self,
        operand: fn(&mut Self) -> CompileResult<Expr>,
        ops: OperatorTable,
    ) -> CompileResult<Expr> {
        let mut left = operand(self)?;

        while let Some(&(_, op)) = ops.iter().find(|(kind, _)| self.check(*kind)) {
            let pos = self.advance().pos;
            let right = operand(self)?;
            left = Expr::binary(op, left, right, pos);
        }

        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> CompileResult<Expr> {
        let op = match self.current.kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::PlusPlus => UnaryOp::PreIncrement,
            TokenKind::MinusMinus => UnaryOp::PreDecrement,
            TokenKind::Plus => {
                // Unary plus has no effect
                self.advance();
                return self.parse_unary_expression();
            }
            _ => return self.parse_postfix_expression(),
        };

        let pos = self.advance().pos;
        let operand = self.parse_unary_expression()?;
        Ok(Expr::unary(op, operand, pos))
    }

    fn parse_postfix_expression(&mut self) -> CompileResult<Expr> {
        let mut expr = self.parse_primary_expression()?;

        loop {
            let op = match self.current.kind {
                TokenKind::PlusPlus => UnaryOp::PostIncrement,
                TokenKind::MinusMinus => UnaryOp::PostDecrement,
                _ => break,
            };
            let pos = self.advance().pos;
            expr = Expr::unary(op, expr, pos);
        }

        Ok(expr)
    }

    fn parse_primary_expression(&mut self) -> CompileResult<Expr> {
        match self.current.kind {
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "expected ')' after expression")?;
                Ok(expr)
            }
            TokenKind::IntegerNumber => {
                let token = self.advance();
                Ok(Expr::new(ExprKind::IntegerNumber(token.lexeme.clone()), token.pos))
            }
            TokenKind::Identifier => {
                let token = self.advance();
                Ok(Expr::new(ExprKind::Var(token.lexeme.clone()), token.pos))
            }
            _ => Err(self.error_at_current("expected expression")),
        }
    }
}

fn assign_op(kind: TokenKind) -> Option<AssignOp> {
    let op = match kind {
        TokenKind::Eq => AssignOp::Assign,
        TokenKind::PlusEq => AssignOp::AddAssign,
        TokenKind::MinusEq => AssignOp::SubAssign,
        TokenKind::StarEq => AssignOp::MulAssign,
        TokenKind::SlashEq => AssignOp::DivAssign,
        TokenKind::PercentEq => AssignOp::ModAssign,
        TokenKind::AmpEq => AssignOp::AndAssign,
        TokenKind::PipeEq => AssignOp::OrAssign,
        TokenKind::CaretEq => AssignOp::XorAssign,
        TokenKind::LtLtEq => AssignOp::ShlAssign,
        TokenKind::GtGtEq => AssignOp::ShrAssign,
        _ => return None,
    };
    Some(op)
}
