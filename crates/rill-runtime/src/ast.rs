//! Abstract syntax tree
//!
//! The AST is immutable after parsing. Later phases never annotate it in
//! place; the resolver publishes its results in a side table keyed by the
//! `NodeId`s the parser assigns to identifiers and function declarations.

/// Identity of an AST node that later phases reference in side tables
pub type NodeId = u32;

/// A complete program: an ordered sequence of top-level declarations
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub decls: Vec<Decl>,
}

/// A declaration or statement position in a program or block
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Var(VarDecl),
    Function(FunctionDecl),
    Stmt(Stmt),
}

/// `let name[: type] = expr;`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: Ident,
    pub ty: Option<TypeRef>,
    pub init: Expr,
    pub line: u32,
}

/// `fn name(params) [-> type] { body }`, allowed at the top level only
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Ident,
    pub params: Vec<Param>,
    pub return_ty: Option<TypeRef>,
    pub body: Block,
    pub line: u32,
}

/// A function parameter, with an optional default-value expression
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeRef,
    pub default: Option<Expr>,
}

/// `{ decls }`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub decls: Vec<Decl>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Print(Expr, u32),
    Expr(Expr, u32),
    Block(Block),
    If(IfStmt),
    While(WhileStmt),
    For(Box<ForStmt>),
    Return(Option<Expr>, u32),
    Break(u32),
    Continue(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_block: Block,
    /// Either a Block or a nested If (for `else if` chains)
    pub else_branch: Option<Box<Stmt>>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Block,
    pub line: u32,
}

/// `for (let v = init; cond; step) { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub init: VarDecl,
    pub cond: Expr,
    pub step: Expr,
    pub body: Block,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal, u32),
    Ident(Ident),
    Assign {
        target: Ident,
        value: Box<Expr>,
        line: u32,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        line: u32,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        line: u32,
    },
    Call(CallExpr),
}

impl Expr {
    /// Source line of the expression's head token
    pub fn line(&self) -> u32 {
        match self {
            Expr::Literal(_, line) => *line,
            Expr::Ident(ident) => ident.line,
            Expr::Assign { line, .. } => *line,
            Expr::Binary { line, .. } => *line,
            Expr::Unary { line, .. } => *line,
            Expr::Call(call) => call.line,
        }
    }
}

/// Call of a named function: `callee(args)`
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Ident,
    pub args: Vec<Expr>,
    pub line: u32,
}

/// A named reference or binding occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub id: NodeId,
    pub name: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

/// Source-level type annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRef {
    Number,
    Str,
    Bool,
}
