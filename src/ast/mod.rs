//=====================================================
// File: ast/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: BanglaCode Abstract Syntax Tree definitions
// Objective: Define AST node types for programs, statements, expressions,
//            functions, classes and module declarations
//=====================================================

use crate::tokenizer::Position;
use serde::Serialize;
use std::rc::Rc;

//=============================================
//            Section 1: Program
//=============================================

#[derive(Debug, Clone, Serialize)]
pub struct Program {
    pub statements: Vec<Stmt>,
    pub position: Position,
}

impl Program {
    pub fn new(statements: Vec<Stmt>, position: Position) -> Self {
        Self {
            statements,
            position,
        }
    }
}

//=============================================
//            Section 2: Statements
//=============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeclKind {
    /// `dhoro`
    Let,
    /// `sthir`
    Const,
    /// `bishwo`
    Global,
}

/// Left-hand side of a declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BindingTarget {
    Name(String),
    /// `[a, , b]`; holes skip elements.
    Array(Vec<Option<String>>),
    /// `{a, b}`
    Map(Vec<String>),
}

impl BindingTarget {
    pub fn names(&self) -> Vec<&str> {
        match self {
            BindingTarget::Name(name) => vec![name.as_str()],
            BindingTarget::Array(names) => names.iter().flatten().map(String::as_str).collect(),
            BindingTarget::Map(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ForEachKind {
    /// `ghuriye (dhoro x of items)`
    Of,
    /// `ghuriye (dhoro k in items)`
    In,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwitchCase {
    /// `None` for `manchito`.
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatchClause {
    pub param: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ImportKind {
    /// `ano "path";`
    All,
    /// `ano "path" hisabe name;`
    Namespace(String),
    /// `ano {a, b} "path";`
    Named(Vec<String>),
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportDecl {
    pub path: String,
    pub kind: ImportKind,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize)]
pub enum Stmt {
    VarDecl {
        kind: DeclKind,
        target: BindingTarget,
        initializer: Option<Expr>,
        position: Position,
    },
    Function {
        decl: Rc<FunctionDecl>,
        position: Position,
    },
    Class {
        decl: Rc<ClassDecl>,
        position: Position,
    },
    Expression {
        expr: Expr,
        position: Position,
    },
    Block {
        statements: Vec<Stmt>,
        position: Position,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        position: Position,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
        position: Position,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
        position: Position,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
        position: Position,
    },
    ForEach {
        kind: ForEachKind,
        binding: String,
        iterable: Expr,
        body: Box<Stmt>,
        position: Position,
    },
    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
        position: Position,
    },
    Break {
        position: Position,
    },
    Continue {
        position: Position,
    },
    Return {
        value: Option<Expr>,
        position: Position,
    },
    Throw {
        value: Expr,
        position: Position,
    },
    Try {
        body: Vec<Stmt>,
        catch: Option<CatchClause>,
        finally: Option<Vec<Stmt>>,
        position: Position,
    },
    Import(ImportDecl),
    /// `pathao <declaration>`
    Export {
        decl: Box<Stmt>,
        position: Position,
    },
    /// `pathao {a, b};`
    ExportNames {
        names: Vec<String>,
        position: Position,
    },
}

impl Stmt {
    pub fn position(&self) -> Position {
        match self {
            Stmt::VarDecl { position, .. }
            | Stmt::Function { position, .. }
            | Stmt::Class { position, .. }
            | Stmt::Expression { position, .. }
            | Stmt::Block { position, .. }
            | Stmt::If { position, .. }
            | Stmt::While { position, .. }
            | Stmt::DoWhile { position, .. }
            | Stmt::For { position, .. }
            | Stmt::ForEach { position, .. }
            | Stmt::Switch { position, .. }
            | Stmt::Break { position }
            | Stmt::Continue { position }
            | Stmt::Return { position, .. }
            | Stmt::Throw { position, .. }
            | Stmt::Try { position, .. }
            | Stmt::Export { position, .. }
            | Stmt::ExportNames { position, .. } => *position,
            Stmt::Import(decl) => decl.position,
        }
    }
}

//=============================================
//            Section 3: Functions & Classes
//=============================================

#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, Serialize)]
pub enum FunctionBody {
    Block(Vec<Stmt>),
    /// Arrow function with a single expression body.
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDecl {
    pub name: Option<String>,
    pub params: Vec<Parameter>,
    pub body: FunctionBody,
    pub is_async: bool,
    pub is_generator: bool,
    pub position: Position,
}

impl FunctionDecl {
    /// Minimum number of arguments a call must supply.
    pub fn required_params(&self) -> usize {
        self.params
            .iter()
            .rposition(|p| p.default.is_none())
            .map_or(0, |idx| idx + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MemberKind {
    Method,
    Getter,
    Setter,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassMember {
    pub name: String,
    pub kind: MemberKind,
    pub function: Rc<FunctionDecl>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassDecl {
    pub name: String,
    pub constructor: Option<Rc<FunctionDecl>>,
    pub members: Vec<ClassMember>,
    pub position: Position,
}

//=============================================
//            Section 4: Expressions
//=============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InfixOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    InstanceOf,
    In,
}

impl InfixOp {
    pub fn symbol(self) -> &'static str {
        match self {
            InfixOp::Add => "+",
            InfixOp::Subtract => "-",
            InfixOp::Multiply => "*",
            InfixOp::Divide => "/",
            InfixOp::Modulo => "%",
            InfixOp::Power => "**",
            InfixOp::Equal => "==",
            InfixOp::NotEqual => "!=",
            InfixOp::Less => "<",
            InfixOp::LessEqual => "<=",
            InfixOp::Greater => ">",
            InfixOp::GreaterEqual => ">=",
            InfixOp::And => "ebong",
            InfixOp::Or => "ba",
            InfixOp::InstanceOf => "instanceof",
            InfixOp::In => "in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrefixOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Serialize)]
pub enum TemplatePart {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, Serialize)]
pub enum Expr {
    Identifier {
        name: String,
        position: Position,
    },
    Int {
        value: i64,
        position: Position,
    },
    Float {
        value: f64,
        position: Position,
    },
    String {
        value: String,
        position: Position,
    },
    Template {
        parts: Vec<TemplatePart>,
        position: Position,
    },
    Bool {
        value: bool,
        position: Position,
    },
    Null {
        position: Position,
    },
    This {
        position: Position,
    },
    Array {
        elements: Vec<Expr>,
        position: Position,
    },
    Map {
        entries: Vec<(String, Expr)>,
        position: Position,
    },
    Function {
        decl: Rc<FunctionDecl>,
        position: Position,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        position: Position,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        position: Position,
    },
    Member {
        object: Box<Expr>,
        property: String,
        position: Position,
    },
    Infix {
        left: Box<Expr>,
        op: InfixOp,
        right: Box<Expr>,
        position: Position,
    },
    Prefix {
        op: PrefixOp,
        operand: Box<Expr>,
        position: Position,
    },
    /// Plain `=` when `op` is `None`, otherwise a compound assignment.
    Assign {
        target: Box<Expr>,
        op: Option<InfixOp>,
        value: Box<Expr>,
        position: Position,
    },
    Update {
        target: Box<Expr>,
        increment: bool,
        prefix: bool,
        position: Position,
    },
    Conditional {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        position: Position,
    },
    New {
        class: Box<Expr>,
        args: Vec<Expr>,
        position: Position,
    },
    Await {
        value: Box<Expr>,
        position: Position,
    },
    Yield {
        value: Option<Box<Expr>>,
        position: Position,
    },
    Delete {
        target: Box<Expr>,
        position: Position,
    },
}

impl Expr {
    pub fn position(&self) -> Position {
        match self {
            Expr::Identifier { position, .. }
            | Expr::Int { position, .. }
            | Expr::Float { position, .. }
            | Expr::String { position, .. }
            | Expr::Template { position, .. }
            | Expr::Bool { position, .. }
            | Expr::Null { position }
            | Expr::This { position }
            | Expr::Array { position, .. }
            | Expr::Map { position, .. }
            | Expr::Function { position, .. }
            | Expr::Call { position, .. }
            | Expr::Index { position, .. }
            | Expr::Member { position, .. }
            | Expr::Infix { position, .. }
            | Expr::Prefix { position, .. }
            | Expr::Assign { position, .. }
            | Expr::Update { position, .. }
            | Expr::Conditional { position, .. }
            | Expr::New { position, .. }
            | Expr::Await { position, .. }
            | Expr::Yield { position, .. }
            | Expr::Delete { position, .. } => *position,
        }
    }

    /// Whether the expression can appear on the left of `=`.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Expr::Identifier { .. } | Expr::Index { .. } | Expr::Member { .. }
        )
    }
}

//=============================================/*
//  AST nodes own their children. Function and class declarations sit behind
//  Rc so runtime closures can point at the same body as the tree.
//============================================*/

//=====================================================
// End of file
//=====================================================
