//! Recursive-descent parser
//!
//! Builds the AST from the token stream. Each error is recorded as a
//! diagnostic and the parser synchronizes to the next statement boundary, so
//! a single run reports as many syntax errors as possible.

use crate::ast::*;
use crate::diagnostic::Diagnostic;
use crate::token::{Token, TokenKind};

type ParseResult<T> = Result<T, ()>;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_id: NodeId,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    /// Parse a token stream into a program
    pub fn parse(tokens: Vec<Token>) -> (Program, Vec<Diagnostic>) {
        let mut parser = Parser {
            tokens,
            pos: 0,
            next_id: 0,
            diagnostics: Vec::new(),
        };
        let mut decls = Vec::new();
        while !parser.at_eof() {
            match parser.parse_decl(true) {
                Ok(decl) => decls.push(decl),
                Err(()) => parser.synchronize(),
            }
        }
        (Program { decls }, parser.diagnostics)
    }

    fn parse_decl(&mut self, top_level: bool) -> ParseResult<Decl> {
        match self.peek_kind() {
            TokenKind::Let => {
                let decl = self.var_decl()?;
                self.expect_semicolon()?;
                Ok(Decl::Var(decl))
            }
            TokenKind::Fn => {
                if !top_level {
                    let line = self.peek_line();
                    self.diagnostics.push(
                        Diagnostic::error_with_code(
                            "RL1010",
                            "function declarations are only allowed at the top level",
                            line,
                        )
                        .with_help("move this function out of the enclosing block"),
                    );
                    return Err(());
                }
                Ok(Decl::Function(self.function_decl()?))
            }
            _ => Ok(Decl::Stmt(self.statement()?)),
        }
    }

    /// `let name[: type] = expr` (caller consumes the trailing `;`)
    fn var_decl(&mut self) -> ParseResult<VarDecl> {
        let line = self.peek_line();
        self.advance(); // let
        let name = self.identifier("variable name")?;
        let ty = if self.matches(&TokenKind::Colon) {
            Some(self.type_ref()?)
        } else {
            None
        };
        self.expect(&TokenKind::Equal, "expected '=' after variable name")?;
        let init = self.expression()?;
        Ok(VarDecl {
            name,
            ty,
            init,
            line,
        })
    }

    fn function_decl(&mut self) -> ParseResult<FunctionDecl> {
        let line = self.peek_line();
        self.advance(); // fn
        let name = self.identifier("function name")?;
        self.expect(&TokenKind::LeftParen, "expected '(' after function name")?;
        let mut params = Vec::new();
        if self.peek_kind() != &TokenKind::RightParen {
            loop {
                params.push(self.parameter()?);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightParen, "expected ')' after parameters")?;
        let return_ty = if self.matches(&TokenKind::Arrow) {
            Some(self.type_ref()?)
        } else {
            None
        };
        let body = self.block()?;
        Ok(FunctionDecl {
            name,
            params,
            return_ty,
            body,
            line,
        })
    }

    /// `name: type [= default]`
    fn parameter(&mut self) -> ParseResult<Param> {
        let name = self.identifier("parameter name")?;
        self.expect(&TokenKind::Colon, "expected ':' after parameter name")?;
        let ty = self.type_ref()?;
        let default = if self.matches(&TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(Param { name, ty, default })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        match self.peek_kind() {
            TokenKind::Print => {
                let line = self.peek_line();
                self.advance();
                let expr = self.expression()?;
                self.expect_semicolon()?;
                Ok(Stmt::Print(expr, line))
            }
            TokenKind::If => self.if_statement(),
            TokenKind::While => {
                let line = self.peek_line();
                self.advance();
                self.expect(&TokenKind::LeftParen, "expected '(' after 'while'")?;
                let cond = self.expression()?;
                self.expect(&TokenKind::RightParen, "expected ')' after condition")?;
                let body = self.block()?;
                Ok(Stmt::While(WhileStmt { cond, body, line }))
            }
            TokenKind::For => self.for_statement(),
            TokenKind::Return => {
                let line = self.peek_line();
                self.advance();
                let value = if self.peek_kind() == &TokenKind::Semicolon {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect_semicolon()?;
                Ok(Stmt::Return(value, line))
            }
            TokenKind::Break => {
                let line = self.peek_line();
                self.advance();
                self.expect_semicolon()?;
                Ok(Stmt::Break(line))
            }
            TokenKind::Continue => {
                let line = self.peek_line();
                self.advance();
                self.expect_semicolon()?;
                Ok(Stmt::Continue(line))
            }
            TokenKind::LeftBrace => Ok(Stmt::Block(self.block()?)),
            _ => {
                let line = self.peek_line();
                let expr = self.expression()?;
                self.expect_semicolon()?;
                Ok(Stmt::Expr(expr, line))
            }
        }
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.peek_line();
        self.advance(); // if
        self.expect(&TokenKind::LeftParen, "expected '(' after 'if'")?;
        let cond = self.expression()?;
        self.expect(&TokenKind::RightParen, "expected ')' after condition")?;
        let then_block = self.block()?;
        let else_branch = if self.matches(&TokenKind::Else) {
            if self.peek_kind() == &TokenKind::If {
                Some(Box::new(self.if_statement()?))
            } else {
                Some(Box::new(Stmt::Block(self.block()?)))
            }
        } else {
            None
        };
        Ok(Stmt::If(IfStmt {
            cond,
            then_block,
            else_branch,
            line,
        }))
    }

    /// `for (let v = init; cond; step) { body }`
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.peek_line();
        self.advance(); // for
        self.expect(&TokenKind::LeftParen, "expected '(' after 'for'")?;
        if self.peek_kind() != &TokenKind::Let {
            let line = self.peek_line();
            self.diagnostics.push(Diagnostic::error_with_code(
                "RL1005",
                "for-loop initializer must be a 'let' declaration",
                line,
            ));
            return Err(());
        }
        let init = self.var_decl()?;
        self.expect_semicolon()?;
        let cond = self.expression()?;
        self.expect_semicolon()?;
        let step = self.expression()?;
        self.expect(&TokenKind::RightParen, "expected ')' after for-loop step")?;
        let body = self.block()?;
        Ok(Stmt::For(Box::new(ForStmt {
            init,
            cond,
            step,
            body,
            line,
        })))
    }

    fn block(&mut self) -> ParseResult<Block> {
        let line = self.peek_line();
        self.expect(&TokenKind::LeftBrace, "expected '{'")?;
        let mut decls = Vec::new();
        while self.peek_kind() != &TokenKind::RightBrace && !self.at_eof() {
            match self.parse_decl(false) {
                Ok(decl) => decls.push(decl),
                Err(()) => self.synchronize(),
            }
        }
        self.expect(&TokenKind::RightBrace, "expected '}' to close block")?;
        Ok(Block { decls, line })
    }

    // Expressions, lowest to highest precedence:
    // assignment, ||, &&, equality, comparison, term, factor, unary, call

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.or_expr()?;
        if self.peek_kind() == &TokenKind::Equal {
            let line = self.peek_line();
            self.advance();
            let value = self.assignment()?;
            return match expr {
                Expr::Ident(target) => Ok(Expr::Assign {
                    target,
                    value: Box::new(value),
                    line,
                }),
                _ => {
                    self.diagnostics.push(Diagnostic::error_with_code(
                        "RL1007",
                        "invalid assignment target",
                        line,
                    ));
                    Err(())
                }
            };
        }
        Ok(expr)
    }

    fn or_expr(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and_expr()?;
        while self.peek_kind() == &TokenKind::OrOr {
            let line = self.peek_line();
            self.advance();
            let right = self.and_expr()?;
            expr = binary(BinaryOp::Or, expr, right, line);
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while self.peek_kind() == &TokenKind::AndAnd {
            let line = self.peek_line();
            self.advance();
            let right = self.equality()?;
            expr = binary(BinaryOp::And, expr, right, line);
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqualEqual => BinaryOp::Eq,
                TokenKind::BangEqual => BinaryOp::Ne,
                _ => break,
            };
            let line = self.peek_line();
            self.advance();
            let right = self.comparison()?;
            expr = binary(op, expr, right, line);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Less => BinaryOp::Lt,
                TokenKind::LessEqual => BinaryOp::Le,
                TokenKind::Greater => BinaryOp::Gt,
                TokenKind::GreaterEqual => BinaryOp::Ge,
                _ => break,
            };
            let line = self.peek_line();
            self.advance();
            let right = self.term()?;
            expr = binary(op, expr, right, line);
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let line = self.peek_line();
            self.advance();
            let right = self.factor()?;
            expr = binary(op, expr, right, line);
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            let line = self.peek_line();
            self.advance();
            let right = self.unary()?;
            expr = binary(op, expr, right, line);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOp::Negate),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let line = self.peek_line();
            self.advance();
            let expr = self.unary()?;
            return Ok(Expr::Unary {
                op,
                expr: Box::new(expr),
                line,
            });
        }
        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let expr = self.primary()?;
        if self.peek_kind() == &TokenKind::LeftParen {
            let line = self.peek_line();
            let callee = match expr {
                Expr::Ident(ident) => ident,
                _ => {
                    self.diagnostics.push(Diagnostic::error_with_code(
                        "RL1008",
                        "only named functions can be called",
                        line,
                    ));
                    return Err(());
                }
            };
            self.advance(); // (
            let mut args = Vec::new();
            if self.peek_kind() != &TokenKind::RightParen {
                loop {
                    args.push(self.expression()?);
                    if !self.matches(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(&TokenKind::RightParen, "expected ')' after arguments")?;
            return Ok(Expr::Call(CallExpr { callee, args, line }));
        }
        Ok(expr)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let line = self.peek_line();
        match self.peek_kind().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Number(n), line))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Str(s), line))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true), line))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false), line))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::Ident(self.make_ident(name, line)))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(&TokenKind::RightParen, "expected ')' after expression")?;
                Ok(expr)
            }
            other => {
                self.diagnostics.push(Diagnostic::error_with_code(
                    "RL1006",
                    format!("expected expression, found '{}'", other),
                    line,
                ));
                Err(())
            }
        }
    }

    fn type_ref(&mut self) -> ParseResult<TypeRef> {
        let line = self.peek_line();
        if let TokenKind::Identifier(name) = self.peek_kind().clone() {
            let ty = match name.as_str() {
                "number" => Some(TypeRef::Number),
                "string" => Some(TypeRef::Str),
                "bool" => Some(TypeRef::Bool),
                _ => None,
            };
            if let Some(ty) = ty {
                self.advance();
                return Ok(ty);
            }
        }
        self.diagnostics.push(
            Diagnostic::error_with_code("RL1004", "expected a type", line)
                .with_help("valid types are 'number', 'string', and 'bool'"),
        );
        Err(())
    }

    // Token plumbing

    fn identifier(&mut self, what: &str) -> ParseResult<Ident> {
        let line = self.peek_line();
        if let TokenKind::Identifier(name) = self.peek_kind().clone() {
            self.advance();
            return Ok(self.make_ident(name, line));
        }
        self.diagnostics.push(Diagnostic::error_with_code(
            "RL1006",
            format!("expected {}", what),
            line,
        ));
        Err(())
    }

    fn make_ident(&mut self, name: String, line: u32) -> Ident {
        let id = self.next_id;
        self.next_id += 1;
        Ident { id, name, line }
    }

    fn expect(&mut self, kind: &TokenKind, msg: &str) -> ParseResult<()> {
        if self.matches(kind) {
            Ok(())
        } else {
            let line = self.peek_line();
            self.diagnostics
                .push(Diagnostic::error_with_code("RL1006", msg, line));
            Err(())
        }
    }

    fn expect_semicolon(&mut self) -> ParseResult<()> {
        self.expect(&TokenKind::Semicolon, "expected ';'")
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek_kind(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn peek_line(&self) -> u32 {
        self.tokens.get(self.pos).map(|t| t.line).unwrap_or(1)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn at_eof(&self) -> bool {
        self.peek_kind() == &TokenKind::Eof
    }

    /// Skip to the next statement boundary after a parse error
    fn synchronize(&mut self) {
        while !self.at_eof() {
            if self.matches(&TokenKind::Semicolon) {
                return;
            }
            match self.peek_kind() {
                TokenKind::Let
                | TokenKind::Fn
                | TokenKind::Print
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::RightBrace => return,
                _ => self.advance(),
            }
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr, line: u32) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
        line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use pretty_assertions::assert_eq;

    fn parse_ok(source: &str) -> Program {
        let (tokens, diags) = Lexer::tokenize(source);
        assert!(diags.is_empty(), "lex errors: {:?}", diags);
        let (program, diags) = Parser::parse(tokens);
        assert!(diags.is_empty(), "parse errors: {:?}", diags);
        program
    }

    fn parse_errors(source: &str) -> Vec<Diagnostic> {
        let (tokens, _) = Lexer::tokenize(source);
        let (_, diags) = Parser::parse(tokens);
        diags
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let program = parse_ok("let x = 2 + 3 * 4;");
        let Decl::Var(decl) = &program.decls[0] else {
            panic!("expected var decl");
        };
        let Expr::Binary { op, right, .. } = &decl.init else {
            panic!("expected binary init");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(
            right.as_ref(),
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn assignment_is_right_associative() {
        let program = parse_ok("a = b = 1;");
        let Decl::Stmt(Stmt::Expr(Expr::Assign { value, .. }, _)) = &program.decls[0] else {
            panic!("expected assignment statement");
        };
        assert!(matches!(value.as_ref(), Expr::Assign { .. }));
    }

    #[test]
    fn function_with_default_parameter() {
        let program = parse_ok("fn add(a: number, b: number = 2) -> number { return a + b; }");
        let Decl::Function(func) = &program.decls[0] else {
            panic!("expected function decl");
        };
        assert_eq!(func.params.len(), 2);
        assert!(func.params[0].default.is_none());
        assert!(func.params[1].default.is_some());
        assert_eq!(func.return_ty, Some(TypeRef::Number));
    }

    #[test]
    fn else_if_chain_nests() {
        let program = parse_ok("if (true) { } else if (false) { } else { }");
        let Decl::Stmt(Stmt::If(if_stmt)) = &program.decls[0] else {
            panic!("expected if statement");
        };
        assert!(matches!(
            if_stmt.else_branch.as_deref(),
            Some(Stmt::If(inner)) if inner.else_branch.is_some()
        ));
    }

    #[test]
    fn nested_function_rejected() {
        let diags = parse_errors("fn outer() { fn inner() { } }");
        assert!(diags.iter().any(|d| d.code == "RL1010"));
    }

    #[test]
    fn invalid_assignment_target_rejected() {
        let diags = parse_errors("1 = 2;");
        assert!(diags.iter().any(|d| d.code == "RL1007"));
    }

    #[test]
    fn recovers_after_error_and_keeps_parsing() {
        let diags = parse_errors("let = 1;\nlet = 2;");
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn identifiers_get_distinct_node_ids() {
        let program = parse_ok("let x = 1; let y = x;");
        let Decl::Var(first) = &program.decls[0] else {
            panic!()
        };
        let Decl::Var(second) = &program.decls[1] else {
            panic!()
        };
        let Expr::Ident(use_x) = &second.init else {
            panic!()
        };
        assert!(first.name.id != second.name.id);
        assert!(use_x.id != first.name.id);
    }
}
