//=============================================
// banglacode/parser/mod.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: BanglaCode Pratt parser implementation
// Objective: Transform token streams into AST nodes consumed by the interpreter
//=============================================

//=============================================
//            Section 1: Imports
//=============================================

use crate::ast::{
    BindingTarget, CatchClause, ClassDecl, ClassMember, DeclKind, Expr, ForEachKind,
    FunctionBody, FunctionDecl, ImportDecl, ImportKind, InfixOp, MemberKind, Parameter,
    PrefixOp, Program, Stmt, SwitchCase, TemplatePart,
};
use crate::tokenizer::{LexError, Position, TemplateChunk, Token, TokenKind, Tokenizer};
use std::rc::Rc;
use thiserror::Error;

//=============================================/*
//  Collects AST node types and tokenizer types required for parsing.
//============================================*/
//=============================================
//            Section 2: Parse Errors
//=============================================

/// Parser error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected {expected}, found {found} at {position}")]
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        position: Position,
    },
    #[error("unexpected end of input, expected {expected} at {position}")]
    UnexpectedEndOfInput { expected: String, position: Position },
    #[error("{message} at {position}")]
    InvalidSyntax { message: String, position: Position },
    #[error(transparent)]
    Lex(#[from] LexError),
}

impl ParseError {
    pub fn position(&self) -> Position {
        match self {
            ParseError::UnexpectedToken { position, .. }
            | ParseError::UnexpectedEndOfInput { position, .. }
            | ParseError::InvalidSyntax { position, .. } => *position,
            ParseError::Lex(err) => err.position(),
        }
    }
}

/// Tokenize and parse a complete source file.
pub fn parse_source(source: &str) -> Result<Program, ParseError> {
    let tokens = Tokenizer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}

//=============================================
//            Section 3: Parser State
//=============================================

// Binding powers, low to high.
const PREC_LOWEST: u8 = 0;
const PREC_ASSIGN: u8 = 1;
const PREC_CONDITIONAL: u8 = 2;
const PREC_OR: u8 = 3;
const PREC_AND: u8 = 4;
const PREC_EQUALITY: u8 = 5;
const PREC_RELATIONAL: u8 = 6;
const PREC_ADDITIVE: u8 = 7;
const PREC_MULTIPLICATIVE: u8 = 8;
const PREC_EXPONENT: u8 = 9;
const PREC_UNARY: u8 = 10;
const PREC_CALL: u8 = 11;

const MAX_EXPRESSION_DEPTH: usize = 512;

/// Tracks which jump statements are legal at the cursor.
#[derive(Debug, Clone, Copy, Default)]
struct BodyContext {
    loop_depth: usize,
    switch_depth: usize,
    in_generator: bool,
}

/// Pratt parser for BanglaCode
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    expr_depth: usize,
    context: BodyContext,
}

impl Parser {
    //Function: new
    //Purpose: Initialize parser with token stream and reset cursor
    //Inputs: tokens: Vec<Token>
    //Returns: Self
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            let position = tokens.last().map(|t| t.position).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, position));
        }
        Self {
            tokens,
            current: 0,
            expr_depth: 0,
            context: BodyContext::default(),
        }
    }

    //=============================================
    //            Section 4: Statement Parsing
    //=============================================

    //Function: parse
    //Purpose: Consume tokens and produce a BanglaCode program AST
    //Inputs: &mut self
    //Returns: Result<Program, ParseError>
    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let position = self.current_position();
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if self.match_kind(&TokenKind::Semicolon) {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(Program::new(statements, position))
    }

    /// Parse a single expression and ensure the stream is fully consumed.
    pub fn parse_expression_only(&mut self) -> Result<Expr, ParseError> {
        let expression = self.parse_expression()?;
        if !self.is_at_end() {
            return Err(self.error_here("end of expression"));
        }
        Ok(expression)
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match &self.peek().kind {
            TokenKind::Let => self.parse_variable_declaration(DeclKind::Let),
            TokenKind::Const => self.parse_variable_declaration(DeclKind::Const),
            TokenKind::Global => self.parse_variable_declaration(DeclKind::Global),
            TokenKind::Function
                if matches!(
                    self.peek_next().kind,
                    TokenKind::Identifier(_) | TokenKind::Star
                ) =>
            {
                self.parse_function_declaration()
            }
            TokenKind::Async
                if self.peek_next().kind == TokenKind::Function
                    && matches!(
                        self.peek_at(2).kind,
                        TokenKind::Identifier(_) | TokenKind::Star
                    ) =>
            {
                self.parse_function_declaration()
            }
            TokenKind::Class => self.parse_class_declaration(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Switch => self.parse_switch_statement(),
            TokenKind::Break => self.parse_break_statement(),
            TokenKind::Continue => self.parse_continue_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Throw => self.parse_throw_statement(),
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::Import => self.parse_import_declaration(),
            TokenKind::Export => self.parse_export_statement(),
            TokenKind::LeftBrace => self.parse_block_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    /// Parse variable declaration: `dhoro`/`sthir`/`bishwo` target [= value];
    fn parse_variable_declaration(&mut self, kind: DeclKind) -> Result<Stmt, ParseError> {
        let stmt = self.parse_declaration_head(kind)?;
        self.consume_statement_terminator()?;
        Ok(stmt)
    }

    fn parse_declaration_head(&mut self, kind: DeclKind) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        let target = self.parse_binding_target()?;

        let initializer = if self.match_kind(&TokenKind::Assign) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        if initializer.is_none() {
            if kind == DeclKind::Const {
                return Err(ParseError::InvalidSyntax {
                    message: "'sthir' declaration needs an initial value".into(),
                    position,
                });
            }
            if !matches!(target, BindingTarget::Name(_)) {
                return Err(ParseError::InvalidSyntax {
                    message: "destructuring declaration needs an initial value".into(),
                    position,
                });
            }
        }

        Ok(Stmt::VarDecl {
            kind,
            target,
            initializer,
            position,
        })
    }

    fn parse_binding_target(&mut self) -> Result<BindingTarget, ParseError> {
        if self.match_kind(&TokenKind::LeftBracket) {
            let mut names = Vec::new();
            while !self.check(&TokenKind::RightBracket) {
                if self.check(&TokenKind::Comma) {
                    self.advance();
                    names.push(None);
                    continue;
                }
                names.push(Some(self.consume_identifier("binding name")?));
                if !self.match_kind(&TokenKind::Comma) {
                    break;
                }
            }
            self.consume(&TokenKind::RightBracket, "']'")?;
            return Ok(BindingTarget::Array(names));
        }

        if self.match_kind(&TokenKind::LeftBrace) {
            let mut names = Vec::new();
            while !self.check(&TokenKind::RightBrace) {
                names.push(self.consume_identifier("binding name")?);
                if !self.match_kind(&TokenKind::Comma) {
                    break;
                }
            }
            self.consume(&TokenKind::RightBrace, "'}'")?;
            return Ok(BindingTarget::Map(names));
        }

        Ok(BindingTarget::Name(self.consume_identifier("variable name")?))
    }

    /// Parse function declaration: [proyash] kaj[*] name(params) { body }
    fn parse_function_declaration(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        let is_async = self.match_kind(&TokenKind::Async);
        self.consume(&TokenKind::Function, "'kaj'")?;
        let is_generator = self.match_kind(&TokenKind::Star);
        let name = self.consume_identifier("function name")?;
        let decl = self.parse_function_rest(Some(name), is_async, is_generator, position)?;
        Ok(Stmt::Function {
            decl: Rc::new(decl),
            position,
        })
    }

    fn parse_function_rest(
        &mut self,
        name: Option<String>,
        is_async: bool,
        is_generator: bool,
        position: Position,
    ) -> Result<FunctionDecl, ParseError> {
        let params = self.parse_parameter_list()?;
        let body = self.with_function_context(is_generator, |parser| parser.parse_block_body())?;
        Ok(FunctionDecl {
            name,
            params,
            body: FunctionBody::Block(body),
            is_async,
            is_generator,
            position,
        })
    }

    fn with_function_context<T>(
        &mut self,
        is_generator: bool,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = self.context;
        self.context = BodyContext {
            loop_depth: 0,
            switch_depth: 0,
            in_generator: is_generator,
        };
        let result = parse(self);
        self.context = saved;
        result
    }

    fn parse_parameter_list(&mut self) -> Result<Vec<Parameter>, ParseError> {
        self.consume(&TokenKind::LeftParen, "'('")?;
        let mut params: Vec<Parameter> = Vec::new();
        while !self.check(&TokenKind::RightParen) {
            let position = self.current_position();
            let name = self.consume_identifier("parameter name")?;
            if params.iter().any(|p| p.name == name) {
                return Err(ParseError::InvalidSyntax {
                    message: format!("duplicate parameter '{}'", name),
                    position,
                });
            }
            let default = if self.match_kind(&TokenKind::Assign) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            params.push(Parameter { name, default });
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        self.consume(&TokenKind::RightParen, "')'")?;
        Ok(params)
    }

    /// Parse class declaration: sreni Name { shuru(..) {..} kaj m() {..} pao p() {..} set p(v) {..} }
    fn parse_class_declaration(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        let name = self.consume_identifier("class name")?;
        self.consume(&TokenKind::LeftBrace, "'{'")?;

        let mut constructor = None;
        let mut members = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            if self.match_kind(&TokenKind::Semicolon) {
                continue;
            }
            let member_pos = self.current_position();
            if self.match_kind(&TokenKind::Constructor) {
                if constructor.is_some() {
                    return Err(ParseError::InvalidSyntax {
                        message: format!("class '{}' declares 'shuru' twice", name),
                        position: member_pos,
                    });
                }
                let decl =
                    self.parse_function_rest(Some("shuru".into()), false, false, member_pos)?;
                constructor = Some(Rc::new(decl));
                continue;
            }

            let accessor = match (&self.peek().kind, &self.peek_next().kind) {
                (TokenKind::Get, kind) if *kind != TokenKind::LeftParen => Some(MemberKind::Getter),
                (TokenKind::Set, kind) if *kind != TokenKind::LeftParen => Some(MemberKind::Setter),
                _ => None,
            };
            if let Some(kind) = accessor {
                self.advance();
                let member_name = self.consume_property_name()?;
                let decl = self.parse_function_rest(Some(member_name.clone()), false, false, member_pos)?;
                let arity = decl.params.len();
                let expected = if kind == MemberKind::Getter { 0 } else { 1 };
                if arity != expected {
                    return Err(ParseError::InvalidSyntax {
                        message: format!(
                            "accessor '{}' must take {} parameter(s)",
                            member_name, expected
                        ),
                        position: member_pos,
                    });
                }
                members.push(ClassMember {
                    name: member_name,
                    kind,
                    function: Rc::new(decl),
                });
                continue;
            }

            let is_async = self.match_kind(&TokenKind::Async);
            let has_kaj = self.match_kind(&TokenKind::Function);
            let is_generator = has_kaj && self.match_kind(&TokenKind::Star);
            let member_name = self.consume_property_name()?;
            let decl = self.parse_function_rest(
                Some(member_name.clone()),
                is_async,
                is_generator,
                member_pos,
            )?;
            members.push(ClassMember {
                name: member_name,
                kind: MemberKind::Method,
                function: Rc::new(decl),
            });
        }
        self.consume(&TokenKind::RightBrace, "'}'")?;

        Ok(Stmt::Class {
            decl: Rc::new(ClassDecl {
                name,
                constructor,
                members,
                position,
            }),
            position,
        })
    }

    fn parse_if_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        let condition = self.parse_parenthesized()?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_kind(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            position,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        let condition = self.parse_parenthesized()?;
        let body = Box::new(self.parse_loop_body()?);
        Ok(Stmt::While {
            condition,
            body,
            position,
        })
    }

    fn parse_do_while_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        let body = Box::new(self.parse_loop_body()?);
        self.consume(&TokenKind::While, "'jotokkhon'")?;
        let condition = self.parse_parenthesized()?;
        self.consume_statement_terminator()?;
        Ok(Stmt::DoWhile {
            body,
            condition,
            position,
        })
    }

    fn parse_loop_body(&mut self) -> Result<Stmt, ParseError> {
        self.context.loop_depth += 1;
        let body = self.parse_statement();
        self.context.loop_depth -= 1;
        body
    }

    /// Parse `ghuriye (init; cond; update) body` or `ghuriye (dhoro x of|in items) body`
    fn parse_for_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        self.consume(&TokenKind::LeftParen, "'('")?;

        let binding_offset = match self.peek().kind {
            TokenKind::Let | TokenKind::Const => 1,
            _ => 0,
        };
        if let TokenKind::Identifier(name) = &self.peek_at(binding_offset).kind {
            let kind = match self.peek_at(binding_offset + 1).kind {
                TokenKind::Of => Some(ForEachKind::Of),
                TokenKind::In => Some(ForEachKind::In),
                _ => None,
            };
            if let Some(kind) = kind {
                let binding = name.clone();
                for _ in 0..binding_offset + 2 {
                    self.advance();
                }
                let iterable = self.parse_expression()?;
                self.consume(&TokenKind::RightParen, "')'")?;
                let body = Box::new(self.parse_loop_body()?);
                return Ok(Stmt::ForEach {
                    kind,
                    binding,
                    iterable,
                    body,
                    position,
                });
            }
        }

        let init = if self.match_kind(&TokenKind::Semicolon) {
            None
        } else {
            let stmt = match self.peek().kind {
                TokenKind::Let => self.parse_declaration_head(DeclKind::Let)?,
                TokenKind::Const => self.parse_declaration_head(DeclKind::Const)?,
                _ => {
                    let position = self.current_position();
                    let expr = self.parse_expression()?;
                    Stmt::Expression { expr, position }
                }
            };
            self.consume(&TokenKind::Semicolon, "';'")?;
            Some(Box::new(stmt))
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(&TokenKind::Semicolon, "';'")?;

        let update = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(&TokenKind::RightParen, "')'")?;

        let body = Box::new(self.parse_loop_body()?);
        Ok(Stmt::For {
            init,
            condition,
            update,
            body,
            position,
        })
    }

    /// Parse `bikolpo (subject) { khetre v: ... manchito: ... }`
    fn parse_switch_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        let subject = self.parse_parenthesized()?;
        self.consume(&TokenKind::LeftBrace, "'{'")?;

        self.context.switch_depth += 1;
        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            let case_pos = self.current_position();
            let test = if self.match_kind(&TokenKind::Case) {
                Some(self.parse_expression()?)
            } else if self.match_kind(&TokenKind::Default) {
                if seen_default {
                    self.context.switch_depth -= 1;
                    return Err(ParseError::InvalidSyntax {
                        message: "'bikolpo' has more than one 'manchito'".into(),
                        position: case_pos,
                    });
                }
                seen_default = true;
                None
            } else {
                self.context.switch_depth -= 1;
                return Err(self.error_here("'khetre' or 'manchito'"));
            };
            self.consume(&TokenKind::Colon, "':'")?;

            let mut body = Vec::new();
            while !matches!(
                self.peek().kind,
                TokenKind::Case | TokenKind::Default | TokenKind::RightBrace | TokenKind::Eof
            ) {
                if self.match_kind(&TokenKind::Semicolon) {
                    continue;
                }
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase {
                test,
                body,
                position: case_pos,
            });
        }
        self.context.switch_depth -= 1;
        self.consume(&TokenKind::RightBrace, "'}'")?;

        Ok(Stmt::Switch {
            subject,
            cases,
            position,
        })
    }

    fn parse_break_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        if self.context.loop_depth == 0 && self.context.switch_depth == 0 {
            return Err(ParseError::InvalidSyntax {
                message: "'thamo' outside of a loop or 'bikolpo'".into(),
                position,
            });
        }
        self.consume_statement_terminator()?;
        Ok(Stmt::Break { position })
    }

    fn parse_continue_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        if self.context.loop_depth == 0 {
            return Err(ParseError::InvalidSyntax {
                message: "'chharo' outside of a loop".into(),
                position,
            });
        }
        self.consume_statement_terminator()?;
        Ok(Stmt::Continue { position })
    }

    fn parse_return_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        let value = if self.at_statement_end(position) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_statement_terminator()?;
        Ok(Stmt::Return { value, position })
    }

    fn parse_throw_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        let value = self.parse_expression()?;
        self.consume_statement_terminator()?;
        Ok(Stmt::Throw { value, position })
    }

    /// Parse `chesta {..} dhoro_bhul (e) {..} shesh {..}`
    fn parse_try_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        let body = self.parse_block_body()?;

        let catch = if self.match_kind(&TokenKind::Catch) {
            let param = if self.match_kind(&TokenKind::LeftParen) {
                let name = self.consume_identifier("catch parameter")?;
                self.consume(&TokenKind::RightParen, "')'")?;
                Some(name)
            } else {
                None
            };
            let body = self.parse_block_body()?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finally = if self.match_kind(&TokenKind::Finally) {
            Some(self.parse_block_body()?)
        } else {
            None
        };

        if catch.is_none() && finally.is_none() {
            return Err(self.error_here("'dhoro_bhul' or 'shesh'"));
        }

        Ok(Stmt::Try {
            body,
            catch,
            finally,
            position,
        })
    }

    /// Parse `ano "path";`, `ano "path" hisabe name;` or `ano {a, b} "path";`
    fn parse_import_declaration(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();

        let named = if self.match_kind(&TokenKind::LeftBrace) {
            let mut names = Vec::new();
            while !self.check(&TokenKind::RightBrace) {
                names.push(self.consume_identifier("imported name")?);
                if !self.match_kind(&TokenKind::Comma) {
                    break;
                }
            }
            self.consume(&TokenKind::RightBrace, "'}'")?;
            Some(names)
        } else {
            None
        };

        let path = self.consume_string("module path")?;
        let kind = match named {
            Some(names) => ImportKind::Named(names),
            None if self.match_kind(&TokenKind::As) => {
                ImportKind::Namespace(self.consume_identifier("module alias")?)
            }
            None => ImportKind::All,
        };
        self.consume_statement_terminator()?;
        Ok(Stmt::Import(ImportDecl {
            path,
            kind,
            position,
        }))
    }

    fn parse_export_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        match self.peek().kind {
            TokenKind::Let
            | TokenKind::Const
            | TokenKind::Global
            | TokenKind::Function
            | TokenKind::Async
            | TokenKind::Class => {
                let decl = self.parse_statement()?;
                if !matches!(
                    decl,
                    Stmt::VarDecl { .. } | Stmt::Function { .. } | Stmt::Class { .. }
                ) {
                    return Err(ParseError::InvalidSyntax {
                        message: "'pathao' expects a declaration".into(),
                        position,
                    });
                }
                Ok(Stmt::Export {
                    decl: Box::new(decl),
                    position,
                })
            }
            TokenKind::LeftBrace => {
                self.advance();
                let mut names = Vec::new();
                while !self.check(&TokenKind::RightBrace) {
                    names.push(self.consume_identifier("exported name")?);
                    if !self.match_kind(&TokenKind::Comma) {
                        break;
                    }
                }
                self.consume(&TokenKind::RightBrace, "'}'")?;
                self.consume_statement_terminator()?;
                Ok(Stmt::ExportNames { names, position })
            }
            _ => {
                let name = self.consume_identifier("declaration or name to export")?;
                self.consume_statement_terminator()?;
                Ok(Stmt::ExportNames {
                    names: vec![name],
                    position,
                })
            }
        }
    }

    fn parse_block_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        let statements = self.parse_block_body()?;
        Ok(Stmt::Block {
            statements,
            position,
        })
    }

    fn parse_block_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.consume(&TokenKind::LeftBrace, "'{'")?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            if self.match_kind(&TokenKind::Semicolon) {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        self.consume(&TokenKind::RightBrace, "'}'")?;
        Ok(statements)
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        let expr = self.parse_expression()?;
        self.consume_statement_terminator()?;
        Ok(Stmt::Expression { expr, position })
    }

    fn parse_parenthesized(&mut self) -> Result<Expr, ParseError> {
        self.consume(&TokenKind::LeftParen, "'('")?;
        let expr = self.parse_expression()?;
        self.consume(&TokenKind::RightParen, "')'")?;
        Ok(expr)
    }

    //=============================================/*
    //  Statement grammar: declarations, control flow, classes and modules.
    //============================================*/
    //=============================================
    //            Section 5: Expression Parsing (Pratt)
    //=============================================

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_precedence(PREC_LOWEST)
    }

    fn parse_precedence(&mut self, min: u8) -> Result<Expr, ParseError> {
        self.expr_depth += 1;
        if self.expr_depth > MAX_EXPRESSION_DEPTH {
            self.expr_depth -= 1;
            return Err(ParseError::InvalidSyntax {
                message: "expression nesting too deep".into(),
                position: self.current_position(),
            });
        }
        let result = self.parse_precedence_inner(min);
        self.expr_depth -= 1;
        result
    }

    fn parse_precedence_inner(&mut self, min: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_prefix()?;
        loop {
            let precedence = infix_precedence(&self.peek().kind);
            if precedence == PREC_LOWEST || precedence <= min {
                break;
            }
            left = self.parse_infix(left, precedence)?;
        }
        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().clone();
        let position = token.position;
        match token.kind {
            TokenKind::Int(lexeme) => {
                self.advance();
                match lexeme.parse::<i64>() {
                    Ok(value) => Ok(Expr::Int { value, position }),
                    Err(_) => Ok(Expr::Float {
                        value: self.parse_float_lexeme(&lexeme, position)?,
                        position,
                    }),
                }
            }
            TokenKind::Float(lexeme) => {
                self.advance();
                let value = self.parse_float_lexeme(&lexeme, position)?;
                Ok(Expr::Float { value, position })
            }
            TokenKind::String(value) => {
                self.advance();
                Ok(Expr::String { value, position })
            }
            TokenKind::Template(chunks) => {
                self.advance();
                self.parse_template(chunks, position)
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                Ok(Expr::Bool {
                    value: token.kind == TokenKind::True,
                    position,
                })
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Null { position })
            }
            TokenKind::This => {
                self.advance();
                Ok(Expr::This { position })
            }
            TokenKind::Identifier(name) => {
                if self.peek_next().kind == TokenKind::Arrow {
                    self.advance();
                    return self.parse_arrow_function(
                        vec![Parameter {
                            name,
                            default: None,
                        }],
                        false,
                        position,
                    );
                }
                self.advance();
                Ok(Expr::Identifier { name, position })
            }
            TokenKind::LeftParen => {
                if self.is_arrow_parameter_list() {
                    let params = self.parse_parameter_list()?;
                    return self.parse_arrow_function(params, false, position);
                }
                self.advance();
                let expr = self.parse_expression()?;
                self.consume(&TokenKind::RightParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LeftBracket => self.parse_array_literal(),
            TokenKind::LeftBrace => self.parse_map_literal(),
            TokenKind::Function => {
                self.advance();
                let is_generator = self.match_kind(&TokenKind::Star);
                let name = match &self.peek().kind {
                    TokenKind::Identifier(name) => {
                        let name = name.clone();
                        self.advance();
                        Some(name)
                    }
                    _ => None,
                };
                let decl = self.parse_function_rest(name, false, is_generator, position)?;
                Ok(Expr::Function {
                    decl: Rc::new(decl),
                    position,
                })
            }
            TokenKind::Async => self.parse_async_literal(),
            TokenKind::Minus | TokenKind::Not => {
                self.advance();
                let operand = self.parse_precedence(PREC_UNARY)?;
                let op = if token.kind == TokenKind::Minus {
                    PrefixOp::Negate
                } else {
                    PrefixOp::Not
                };
                Ok(Expr::Prefix {
                    op,
                    operand: Box::new(operand),
                    position,
                })
            }
            TokenKind::Plus => {
                self.advance();
                self.parse_precedence(PREC_UNARY)
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                self.advance();
                let target = self.parse_precedence(PREC_UNARY)?;
                self.ensure_assignable(&target, position)?;
                Ok(Expr::Update {
                    target: Box::new(target),
                    increment: token.kind == TokenKind::PlusPlus,
                    prefix: true,
                    position,
                })
            }
            TokenKind::Await => {
                self.advance();
                let value = self.parse_precedence(PREC_UNARY)?;
                Ok(Expr::Await {
                    value: Box::new(value),
                    position,
                })
            }
            TokenKind::Yield => {
                self.advance();
                if !self.context.in_generator {
                    return Err(ParseError::InvalidSyntax {
                        message: "'utpadan' outside of a generator function".into(),
                        position,
                    });
                }
                let value = if matches!(
                    self.peek().kind,
                    TokenKind::Semicolon
                        | TokenKind::RightParen
                        | TokenKind::RightBrace
                        | TokenKind::RightBracket
                        | TokenKind::Comma
                        | TokenKind::Colon
                        | TokenKind::Eof
                ) {
                    None
                } else {
                    Some(Box::new(self.parse_precedence(PREC_LOWEST)?))
                };
                Ok(Expr::Yield { value, position })
            }
            TokenKind::Delete => {
                self.advance();
                let target = self.parse_precedence(PREC_UNARY)?;
                if !matches!(target, Expr::Member { .. } | Expr::Index { .. }) {
                    return Err(ParseError::InvalidSyntax {
                        message: "'delete' expects a property or index expression".into(),
                        position,
                    });
                }
                Ok(Expr::Delete {
                    target: Box::new(target),
                    position,
                })
            }
            TokenKind::New => self.parse_new_expression(),
            _ => Err(self.error_here("expression")),
        }
    }

    fn parse_infix(&mut self, left: Expr, precedence: u8) -> Result<Expr, ParseError> {
        let token = self.advance().clone();
        let position = token.position;
        match token.kind {
            TokenKind::Assign
            | TokenKind::PlusAssign
            | TokenKind::MinusAssign
            | TokenKind::StarAssign
            | TokenKind::SlashAssign
            | TokenKind::PercentAssign => {
                self.ensure_assignable(&left, position)?;
                let op = match token.kind {
                    TokenKind::PlusAssign => Some(InfixOp::Add),
                    TokenKind::MinusAssign => Some(InfixOp::Subtract),
                    TokenKind::StarAssign => Some(InfixOp::Multiply),
                    TokenKind::SlashAssign => Some(InfixOp::Divide),
                    TokenKind::PercentAssign => Some(InfixOp::Modulo),
                    _ => None,
                };
                // right-associative
                let value = self.parse_precedence(precedence - 1)?;
                Ok(Expr::Assign {
                    target: Box::new(left),
                    op,
                    value: Box::new(value),
                    position,
                })
            }
            TokenKind::Question => {
                let then_expr = self.parse_precedence(PREC_LOWEST)?;
                self.consume(&TokenKind::Colon, "':'")?;
                let else_expr = self.parse_precedence(precedence - 1)?;
                Ok(Expr::Conditional {
                    condition: Box::new(left),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                    position,
                })
            }
            TokenKind::LeftParen => {
                let args = self.parse_arguments()?;
                Ok(Expr::Call {
                    callee: Box::new(left),
                    args,
                    position,
                })
            }
            TokenKind::LeftBracket => {
                let index = self.parse_expression()?;
                self.consume(&TokenKind::RightBracket, "']'")?;
                Ok(Expr::Index {
                    object: Box::new(left),
                    index: Box::new(index),
                    position,
                })
            }
            TokenKind::Dot => {
                let property = self.consume_property_name()?;
                Ok(Expr::Member {
                    object: Box::new(left),
                    property,
                    position,
                })
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                self.ensure_assignable(&left, position)?;
                Ok(Expr::Update {
                    target: Box::new(left),
                    increment: token.kind == TokenKind::PlusPlus,
                    prefix: false,
                    position,
                })
            }
            kind => {
                let op = binary_operator(&kind).ok_or_else(|| ParseError::UnexpectedToken {
                    expected: "operator".into(),
                    found: kind.clone(),
                    position,
                })?;
                let right = if op == InfixOp::Power {
                    self.parse_precedence(precedence - 1)?
                } else {
                    self.parse_precedence(precedence)?
                };
                Ok(Expr::Infix {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                    position,
                })
            }
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        while !self.check(&TokenKind::RightParen) {
            args.push(self.parse_expression()?);
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        self.consume(&TokenKind::RightParen, "')'")?;
        Ok(args)
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ParseError> {
        let position = self.current_position();
        self.advance();
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RightBracket) {
            elements.push(self.parse_expression()?);
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        self.consume(&TokenKind::RightBracket, "']'")?;
        Ok(Expr::Array { elements, position })
    }

    /// Parse `{key: value, shorthand, method() {..}}`
    fn parse_map_literal(&mut self) -> Result<Expr, ParseError> {
        let position = self.current_position();
        self.advance();
        let mut entries = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let key_pos = self.current_position();
            let key = match &self.peek().kind {
                TokenKind::String(s) => {
                    let key = s.clone();
                    self.advance();
                    key
                }
                TokenKind::Int(n) | TokenKind::Float(n) => {
                    let key = n.clone();
                    self.advance();
                    key
                }
                _ => self.consume_property_name()?,
            };

            let value = if self.match_kind(&TokenKind::Colon) {
                self.parse_expression()?
            } else if self.check(&TokenKind::LeftParen) {
                let decl = self.parse_function_rest(Some(key.clone()), false, false, key_pos)?;
                Expr::Function {
                    decl: Rc::new(decl),
                    position: key_pos,
                }
            } else {
                Expr::Identifier {
                    name: key.clone(),
                    position: key_pos,
                }
            };
            entries.push((key, value));
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        self.consume(&TokenKind::RightBrace, "'}'")?;
        Ok(Expr::Map { entries, position })
    }

    fn parse_async_literal(&mut self) -> Result<Expr, ParseError> {
        let position = self.current_position();
        self.advance();
        match self.peek().kind.clone() {
            TokenKind::Function => {
                self.advance();
                let name = match &self.peek().kind {
                    TokenKind::Identifier(name) => {
                        let name = name.clone();
                        self.advance();
                        Some(name)
                    }
                    _ => None,
                };
                let decl = self.parse_function_rest(name, true, false, position)?;
                Ok(Expr::Function {
                    decl: Rc::new(decl),
                    position,
                })
            }
            TokenKind::Identifier(name) if self.peek_next().kind == TokenKind::Arrow => {
                self.advance();
                self.parse_arrow_function(
                    vec![Parameter {
                        name,
                        default: None,
                    }],
                    true,
                    position,
                )
            }
            TokenKind::LeftParen if self.is_arrow_parameter_list() => {
                let params = self.parse_parameter_list()?;
                self.parse_arrow_function(params, true, position)
            }
            _ => Err(self.error_here("'kaj' or arrow function after 'proyash'")),
        }
    }

    fn parse_arrow_function(
        &mut self,
        params: Vec<Parameter>,
        is_async: bool,
        position: Position,
    ) -> Result<Expr, ParseError> {
        self.consume(&TokenKind::Arrow, "'=>'")?;
        let body = self.with_function_context(false, |parser| {
            if parser.check(&TokenKind::LeftBrace) {
                Ok(FunctionBody::Block(parser.parse_block_body()?))
            } else {
                Ok(FunctionBody::Expr(Box::new(
                    parser.parse_precedence(PREC_ASSIGN - 1)?,
                )))
            }
        })?;
        Ok(Expr::Function {
            decl: Rc::new(FunctionDecl {
                name: None,
                params,
                body,
                is_async,
                is_generator: false,
                position,
            }),
            position,
        })
    }

    /// Parse `notun Name(args)`; the class reference may be a member path.
    fn parse_new_expression(&mut self) -> Result<Expr, ParseError> {
        let position = self.current_position();
        self.advance();
        let name_pos = self.current_position();
        let mut class = Expr::Identifier {
            name: self.consume_identifier("class name")?,
            position: name_pos,
        };
        while self.check(&TokenKind::Dot) {
            let dot_pos = self.current_position();
            self.advance();
            class = Expr::Member {
                object: Box::new(class),
                property: self.consume_property_name()?,
                position: dot_pos,
            };
        }
        if !self.check(&TokenKind::LeftParen) {
            return Err(self.error_here("'(' after class name in 'notun'"));
        }
        self.advance();
        let args = self.parse_arguments()?;
        Ok(Expr::New {
            class: Box::new(class),
            args,
            position,
        })
    }

    fn parse_template(
        &mut self,
        chunks: Vec<TemplateChunk>,
        position: Position,
    ) -> Result<Expr, ParseError> {
        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match chunk {
                TemplateChunk::Text(text) => parts.push(TemplatePart::Text(text)),
                TemplateChunk::Code { source, position } => {
                    if source.trim().is_empty() {
                        return Err(ParseError::InvalidSyntax {
                            message: "empty template interpolation".into(),
                            position,
                        });
                    }
                    let tokens = Tokenizer::with_origin(&source, position).tokenize()?;
                    let mut inner = Parser::new(tokens);
                    inner.context = self.context;
                    parts.push(TemplatePart::Expr(inner.parse_expression_only()?));
                }
            }
        }
        Ok(Expr::Template { parts, position })
    }

    fn parse_float_lexeme(&self, lexeme: &str, position: Position) -> Result<f64, ParseError> {
        lexeme.parse::<f64>().map_err(|_| ParseError::InvalidSyntax {
            message: format!("invalid number '{}'", lexeme),
            position,
        })
    }

    /// Looks past a `(` to its matching `)` and reports whether `=>` follows.
    fn is_arrow_parameter_list(&self) -> bool {
        let mut depth = 0usize;
        let mut idx = self.current;
        while let Some(token) = self.tokens.get(idx) {
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(idx + 1).map(|t| &t.kind),
                            Some(TokenKind::Arrow)
                        );
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            idx += 1;
        }
        false
    }

    fn ensure_assignable(&self, target: &Expr, position: Position) -> Result<(), ParseError> {
        if target.is_assignable() {
            Ok(())
        } else {
            Err(ParseError::InvalidSyntax {
                message: "invalid assignment target".into(),
                position,
            })
        }
    }

    //=============================================/*
    //  Pratt core: prefix handlers build operands, infix handlers fold them
    //  while the next operator binds tighter than the current minimum.
    //============================================*/
    //=============================================
    //            Section 6: Token Navigation
    //=============================================

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_next(&self) -> &Token {
        self.peek_at(1)
    }

    fn peek_at(&self, distance: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.current + distance).min(last)]
    }

    fn advance(&mut self) -> &Token {
        let idx = self.current.min(self.tokens.len() - 1);
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[idx]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn match_kind(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: &TokenKind, expected: &str) -> Result<&Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(expected))
        }
    }

    fn consume_identifier(&mut self, expected: &str) -> Result<String, ParseError> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error_here(expected)),
        }
    }

    /// Property names may reuse keyword spellings (`obj.set`, `{in: 1}`).
    fn consume_property_name(&mut self) -> Result<String, ParseError> {
        let kind = &self.peek().kind;
        let name = match kind {
            TokenKind::Identifier(name) => name.clone(),
            other => match other.keyword_text() {
                Some(text) => text.to_string(),
                None => return Err(self.error_here("property name")),
            },
        };
        self.advance();
        Ok(name)
    }

    fn consume_string(&mut self, expected: &str) -> Result<String, ParseError> {
        match &self.peek().kind {
            TokenKind::String(value) => {
                let value = value.clone();
                self.advance();
                Ok(value)
            }
            _ => Err(self.error_here(expected)),
        }
    }

    /// Semicolons are optional: a statement may also end at `}`, end of input,
    /// or a line break.
    fn consume_statement_terminator(&mut self) -> Result<(), ParseError> {
        if self.match_kind(&TokenKind::Semicolon) {
            return Ok(());
        }
        if matches!(self.peek().kind, TokenKind::RightBrace | TokenKind::Eof) {
            return Ok(());
        }
        if self.peek().position.line > self.previous_position().line {
            return Ok(());
        }
        Err(self.error_here("';'"))
    }

    fn at_statement_end(&self, keyword_position: Position) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
        ) || self.peek().position.line > keyword_position.line
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn current_position(&self) -> Position {
        self.peek().position
    }

    fn previous_position(&self) -> Position {
        if self.current == 0 {
            self.current_position()
        } else {
            self.tokens[self.current - 1].position
        }
    }

    fn error_here(&self, expected: &str) -> ParseError {
        let token = self.peek();
        if token.kind == TokenKind::Eof {
            ParseError::UnexpectedEndOfInput {
                expected: expected.to_string(),
                position: token.position,
            }
        } else {
            ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.kind.clone(),
                position: token.position,
            }
        }
    }
}

fn infix_precedence(kind: &TokenKind) -> u8 {
    match kind {
        TokenKind::Assign
        | TokenKind::PlusAssign
        | TokenKind::MinusAssign
        | TokenKind::StarAssign
        | TokenKind::SlashAssign
        | TokenKind::PercentAssign => PREC_ASSIGN,
        TokenKind::Question => PREC_CONDITIONAL,
        TokenKind::Or => PREC_OR,
        TokenKind::And => PREC_AND,
        TokenKind::Equal | TokenKind::NotEqual => PREC_EQUALITY,
        TokenKind::Less
        | TokenKind::LessEqual
        | TokenKind::Greater
        | TokenKind::GreaterEqual
        | TokenKind::InstanceOf
        | TokenKind::In => PREC_RELATIONAL,
        TokenKind::Plus | TokenKind::Minus => PREC_ADDITIVE,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => PREC_MULTIPLICATIVE,
        TokenKind::StarStar => PREC_EXPONENT,
        TokenKind::LeftParen
        | TokenKind::LeftBracket
        | TokenKind::Dot
        | TokenKind::PlusPlus
        | TokenKind::MinusMinus => PREC_CALL,
        _ => PREC_LOWEST,
    }
}

fn binary_operator(kind: &TokenKind) -> Option<InfixOp> {
    Some(match kind {
        TokenKind::Plus => InfixOp::Add,
        TokenKind::Minus => InfixOp::Subtract,
        TokenKind::Star => InfixOp::Multiply,
        TokenKind::Slash => InfixOp::Divide,
        TokenKind::Percent => InfixOp::Modulo,
        TokenKind::StarStar => InfixOp::Power,
        TokenKind::Equal => InfixOp::Equal,
        TokenKind::NotEqual => InfixOp::NotEqual,
        TokenKind::Less => InfixOp::Less,
        TokenKind::LessEqual => InfixOp::LessEqual,
        TokenKind::Greater => InfixOp::Greater,
        TokenKind::GreaterEqual => InfixOp::GreaterEqual,
        TokenKind::And => InfixOp::And,
        TokenKind::Or => InfixOp::Or,
        TokenKind::InstanceOf => InfixOp::InstanceOf,
        TokenKind::In => InfixOp::In,
        _ => return None,
    })
}

//=============================================
//            Section 7: Tests
//=============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        parse_source(source).unwrap_or_else(|err| panic!("parse failed: {err}"))
    }

    fn parse_expr(source: &str) -> Expr {
        let tokens = Tokenizer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse_expression_only().unwrap()
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        match parse_expr("2 + 3 * 4") {
            Expr::Infix { op, right, .. } => {
                assert_eq!(op, InfixOp::Add);
                assert!(matches!(
                    *right,
                    Expr::Infix {
                        op: InfixOp::Multiply,
                        ..
                    }
                ));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exponent_is_right_associative() {
        match parse_expr("2 ** 3 ** 2") {
            Expr::Infix { op, left, right, .. } => {
                assert_eq!(op, InfixOp::Power);
                assert!(matches!(*left, Expr::Int { value: 2, .. }));
                assert!(matches!(
                    *right,
                    Expr::Infix {
                        op: InfixOp::Power,
                        ..
                    }
                ));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        match parse_expr("a = b = 3") {
            Expr::Assign { value, .. } => assert!(matches!(*value, Expr::Assign { .. })),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn logical_keywords_and_symbols_share_precedence() {
        match parse_expr("a ba b ebong c") {
            Expr::Infix { op, right, .. } => {
                assert_eq!(op, InfixOp::Or);
                assert!(matches!(*right, Expr::Infix { op: InfixOp::And, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            parse_expr("a || b && c"),
            Expr::Infix { op: InfixOp::Or, .. }
        ));
    }

    #[test]
    fn member_call_chain_after_new() {
        match parse_expr("notun Counter(0).increment().getValue()") {
            Expr::Call { callee, .. } => match *callee {
                Expr::Member { property, .. } => assert_eq!(property, "getValue"),
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn arrow_functions() {
        match parse_expr("x => x * 2") {
            Expr::Function { decl, .. } => {
                assert_eq!(decl.params.len(), 1);
                assert!(matches!(decl.body, FunctionBody::Expr(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
        match parse_expr("(a, b = 2) => { ferao a + b; }") {
            Expr::Function { decl, .. } => {
                assert_eq!(decl.params.len(), 2);
                assert_eq!(decl.required_params(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn function_and_class_declarations() {
        let program = parse(
            "proyash kaj fetch(url) { ferao opekha anun_async(url); }\n\
             kaj* gen() { utpadan 1; }\n\
             sreni Point { shuru(x) { ei.x = x; } kaj getX() { ferao ei.x; } pao double() { ferao ei.x * 2; } set value(v) { ei.x = v; } }",
        );
        assert_eq!(program.statements.len(), 3);
        match &program.statements[0] {
            Stmt::Function { decl, .. } => assert!(decl.is_async),
            other => panic!("unexpected {other:?}"),
        }
        match &program.statements[1] {
            Stmt::Function { decl, .. } => assert!(decl.is_generator),
            other => panic!("unexpected {other:?}"),
        }
        match &program.statements[2] {
            Stmt::Class { decl, .. } => {
                assert!(decl.constructor.is_some());
                let kinds: Vec<MemberKind> = decl.members.iter().map(|m| m.kind).collect();
                assert_eq!(
                    kinds,
                    vec![MemberKind::Method, MemberKind::Getter, MemberKind::Setter]
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn else_if_chains_nest() {
        let program = parse("jodi (a) { x(); } nahole jodi (b) { y(); } nahole { z(); }");
        match &program.statements[0] {
            Stmt::If { else_branch, .. } => {
                assert!(matches!(
                    else_branch.as_deref(),
                    Some(Stmt::If {
                        else_branch: Some(_),
                        ..
                    })
                ));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn for_loops() {
        let program = parse(
            "ghuriye (dhoro i = 0; i < 3; i++) { dekho(i); }\n\
             ghuriye (dhoro x of items) { dekho(x); }\n\
             ghuriye (dhoro k in map) { dekho(k); }",
        );
        assert!(matches!(program.statements[0], Stmt::For { .. }));
        assert!(matches!(
            program.statements[1],
            Stmt::ForEach {
                kind: ForEachKind::Of,
                ..
            }
        ));
        assert!(matches!(
            program.statements[2],
            Stmt::ForEach {
                kind: ForEachKind::In,
                ..
            }
        ));
    }

    #[test]
    fn switch_cases_collect_statements() {
        let program = parse(
            "bikolpo (x) { khetre 1: dekho(1); khetre 2: dekho(2); thamo; manchito: dekho(0); }",
        );
        match &program.statements[0] {
            Stmt::Switch { cases, .. } => {
                assert_eq!(cases.len(), 3);
                assert_eq!(cases[1].body.len(), 2);
                assert!(cases[2].test.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let err = parse_source("thamo;").unwrap_err();
        assert!(matches!(err, ParseError::InvalidSyntax { .. }), "{err}");
        let err = parse_source("jotokkhon (sotti) { kaj f() { chharo; } }").unwrap_err();
        assert!(err.to_string().contains("chharo"));
    }

    #[test]
    fn destructuring_declarations() {
        let program = parse("dhoro [a, , b] = arr; sthir {x, y} = point;");
        match &program.statements[0] {
            Stmt::VarDecl { target, .. } => assert_eq!(
                target,
                &BindingTarget::Array(vec![Some("a".into()), None, Some("b".into())])
            ),
            other => panic!("unexpected {other:?}"),
        }
        match &program.statements[1] {
            Stmt::VarDecl { target, kind, .. } => {
                assert_eq!(*kind, DeclKind::Const);
                assert_eq!(target, &BindingTarget::Map(vec!["x".into(), "y".into()]));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn imports_and_exports() {
        let program = parse(
            "ano \"./math.bang\" hisabe math;\nano {add} \"./util\";\npathao kaj f() {}\npathao {a, b};",
        );
        match &program.statements[0] {
            Stmt::Import(decl) => {
                assert_eq!(decl.path, "./math.bang");
                assert_eq!(decl.kind, ImportKind::Namespace("math".into()));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(program.statements[2], Stmt::Export { .. }));
        assert!(matches!(program.statements[3], Stmt::ExportNames { .. }));
    }

    #[test]
    fn template_literals_parse_embedded_expressions() {
        match parse_expr("`total: ${a + b}!`") {
            Expr::Template { parts, .. } => {
                assert_eq!(parts.len(), 3);
                assert!(matches!(parts[1], TemplatePart::Expr(Expr::Infix { .. })));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn reports_expected_and_found() {
        let err = parse_source("dhoro = 5;").unwrap_err();
        match err {
            ParseError::UnexpectedToken {
                expected, position, ..
            } => {
                assert_eq!(expected, "variable name");
                assert_eq!(position.column, 7);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            parse_source("dhoro x = (1 + 2").unwrap_err(),
            ParseError::UnexpectedEndOfInput { .. }
        ));
    }

    #[test]
    fn yield_outside_generator_is_rejected() {
        assert!(parse_source("kaj f() { utpadan 1; }").is_err());
    }

    #[test]
    fn new_requires_argument_list() {
        assert!(parse_source("dhoro p = notun Point;").is_err());
    }
}

//=====================================================
// End of file
//=====================================================
