// AST (Abstract Syntax Tree) definitions for the C++ subset

use std::fmt;

/// Source span of a node or token.
///
/// `start`/`end` are character offsets into the source text (end exclusive);
/// `line`/`column` locate `start` and are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Span covering `self` through the end of `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            end: other.end.max(self.end),
            ..self
        }
    }
}

/// Syntactic kind of a node, exposed through the stepping cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    TranslationUnit,
    Declaration,
    FunctionDefinition,
    StructDefinition,
    TypedefDeclaration,
    UsingDirective,
    UsingDeclaration,
    NamespaceDefinition,
    NamespaceAliasDefinition,
    CompoundStatement,
    ExpressionStatement,
    SelectionStatementIf,
    SelectionStatementSwitch,
    LabeledStatementCase,
    LabeledStatementDefault,
    LabeledStatement,
    IterationStatementWhile,
    IterationStatementDoWhile,
    IterationStatementFor,
    IterationStatementForeach,
    JumpStatementBreak,
    JumpStatementContinue,
    JumpStatementReturn,
    JumpStatementGoto,
    Literal,
    IdentifierExpression,
    BinaryExpression,
    LogicalExpression,
    AssignmentExpression,
    CommaExpression,
    UnaryExpression,
    PostfixExpression,
    ConditionalExpression,
    CallExpression,
    IndexExpression,
    MemberExpression,
    CastExpression,
    SizeofExpression,
    InitializerList,
}

impl NodeKind {
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            NodeKind::Declaration
                | NodeKind::CompoundStatement
                | NodeKind::ExpressionStatement
                | NodeKind::SelectionStatementIf
                | NodeKind::SelectionStatementSwitch
                | NodeKind::LabeledStatementCase
                | NodeKind::LabeledStatementDefault
                | NodeKind::LabeledStatement
                | NodeKind::IterationStatementWhile
                | NodeKind::IterationStatementDoWhile
                | NodeKind::IterationStatementFor
                | NodeKind::IterationStatementForeach
                | NodeKind::JumpStatementBreak
                | NodeKind::JumpStatementContinue
                | NodeKind::JumpStatementReturn
                | NodeKind::JumpStatementGoto
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Cursor information for a visited node: its kind and where it lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeInfo {
    pub kind: NodeKind,
    pub span: Span,
}

/// Base type as spelled in the source, before resolution.
///
/// `words` holds the type keywords in order (`["unsigned", "long"]`) or a
/// single user-defined name (`["Point"]`).
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub specifiers: Vec<String>,
    pub words: Vec<String>,
    pub span: Span,
}

impl TypeSpec {
    pub fn has_specifier(&self, name: &str) -> bool {
        self.specifiers.iter().any(|s| s == name)
    }

    pub fn is_auto(&self) -> bool {
        self.words.len() == 1 && self.words[0] == "auto"
    }
}

/// One level of pointer indirection, optionally `const`-qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerLevel {
    pub is_const: bool,
}

/// Declarator: pointer prefix, optional reference marker, then the direct part.
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub pointers: Vec<PointerLevel>,
    pub reference: bool,
    pub direct: DirectDeclarator,
    pub span: Span,
}

impl Declarator {
    /// Name introduced by the declarator, if any (abstract declarators have none).
    pub fn name(&self) -> Option<&str> {
        match &self.direct.base {
            DeclaratorBase::Name(name) => Some(name),
            DeclaratorBase::Nested(inner) => inner.name(),
            DeclaratorBase::Abstract => None,
        }
    }

    /// Parameter list when this declarator directly declares a function.
    pub fn function_params(&self) -> Option<&ParamList> {
        if !self.pointers.is_empty() {
            return None;
        }
        match (&self.direct.base, self.direct.suffixes.first()) {
            (DeclaratorBase::Name(_), Some(DeclaratorSuffix::Params(params))) => {
                Some(params)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectDeclarator {
    pub base: DeclaratorBase,
    pub suffixes: Vec<DeclaratorSuffix>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclaratorBase {
    Name(String),
    Nested(Box<Declarator>),
    Abstract,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclaratorSuffix {
    /// `[expr]`, or `[]` for a dimension deduced from the initializer
    Array(Option<Box<Expr>>),
    Params(ParamList),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamList {
    pub params: Vec<ParamDecl>,
    pub variadic: bool,
}

/// Function parameter declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub spec: TypeSpec,
    pub declarator: Declarator,
    pub default: Option<Box<Expr>>,
    pub span: Span,
}

/// A type written in expression position (`sizeof(T)`, casts).
#[derive(Debug, Clone, PartialEq)]
pub struct TypeName {
    pub spec: TypeSpec,
    pub declarator: Declarator,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Initializer {
    Expr(Expr),
    List(Vec<Initializer>, Span),
}

impl Initializer {
    pub fn span(&self) -> Span {
        match self {
            Initializer::Expr(expr) => expr.span,
            Initializer::List(_, span) => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitDeclarator {
    pub declarator: Declarator,
    pub init: Option<Initializer>,
}

/// Variable / prototype declaration: `const int a = 1, *b;`
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub spec: TypeSpec,
    pub declarators: Vec<InitDeclarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub spec: TypeSpec,
    pub declarator: Declarator,
    pub body: Box<Stmt>,
}

impl FunctionDef {
    pub fn name(&self) -> &str {
        self.declarator.name().unwrap_or("")
    }
}

/// Struct member: `int x = 3;`
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDecl {
    pub spec: TypeSpec,
    pub declarator: Declarator,
    pub default: Option<Initializer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub members: Vec<MemberDecl>,
    pub methods: Vec<FunctionDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Declaration(Declaration),
    FunctionDef(FunctionDef),
    StructDef(StructDef),
    Typedef(Declaration),
    UsingDirective(Vec<String>),
    UsingDeclaration(Vec<String>),
    NamespaceDef(String),
    NamespaceAlias { alias: String, target: Vec<String> },
    Compound(Vec<Stmt>),
    Expression(Option<Expr>),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    Switch {
        discriminant: Expr,
        body: Box<Stmt>,
    },
    Case(Expr),
    Default,
    Label(String),
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    RangeFor {
        spec: TypeSpec,
        declarator: Declarator,
        range: Expr,
        body: Box<Stmt>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Goto(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn node_kind(&self) -> NodeKind {
        match &self.kind {
            StmtKind::Declaration(_) => NodeKind::Declaration,
            StmtKind::FunctionDef(_) => NodeKind::FunctionDefinition,
            StmtKind::StructDef(_) => NodeKind::StructDefinition,
            StmtKind::Typedef(_) => NodeKind::TypedefDeclaration,
            StmtKind::UsingDirective(_) => NodeKind::UsingDirective,
            StmtKind::UsingDeclaration(_) => NodeKind::UsingDeclaration,
            StmtKind::NamespaceDef(_) => NodeKind::NamespaceDefinition,
            StmtKind::NamespaceAlias { .. } => NodeKind::NamespaceAliasDefinition,
            StmtKind::Compound(_) => NodeKind::CompoundStatement,
            StmtKind::Expression(_) => NodeKind::ExpressionStatement,
            StmtKind::If { .. } => NodeKind::SelectionStatementIf,
            StmtKind::Switch { .. } => NodeKind::SelectionStatementSwitch,
            StmtKind::Case(_) => NodeKind::LabeledStatementCase,
            StmtKind::Default => NodeKind::LabeledStatementDefault,
            StmtKind::Label(_) => NodeKind::LabeledStatement,
            StmtKind::While { .. } => NodeKind::IterationStatementWhile,
            StmtKind::DoWhile { .. } => NodeKind::IterationStatementDoWhile,
            StmtKind::For { .. } => NodeKind::IterationStatementFor,
            StmtKind::RangeFor { .. } => NodeKind::IterationStatementForeach,
            StmtKind::Break => NodeKind::JumpStatementBreak,
            StmtKind::Continue => NodeKind::JumpStatementContinue,
            StmtKind::Return(_) => NodeKind::JumpStatementReturn,
            StmtKind::Goto(_) => NodeKind::JumpStatementGoto,
        }
    }

    pub fn info(&self) -> NodeInfo {
        NodeInfo {
            kind: self.node_kind(),
            span: self.span,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
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
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,     // -x
    Plus,    // +x
    Not,     // !x
    BitNot,  // ~x
    PreInc,  // ++x
    PreDec,  // --x
    PostInc, // x++
    PostDec, // x--
    Deref,   // *x
    AddrOf,  // &x
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Encoding prefix of a character or string literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharWidth {
    #[default]
    Narrow,
    Wide,
    Utf16,
    Utf32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Integer literal; `radix` is 10, 16, 8 or 2.
    Int {
        value: u128,
        radix: u32,
        unsigned: bool,
        long: bool,
    },
    Float {
        value: f64,
        single: bool,
    },
    Char(u32, CharWidth),
    String(String, CharWidth),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Identifier(String),
    Qualified(Vec<String>),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        op: Option<BinOp>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Comma(Box<Expr>, Box<Expr>),
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        template_args: Vec<TypeName>,
        args: Vec<Expr>,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Member {
        object: Box<Expr>,
        member: String,
        through_pointer: bool,
    },
    Cast {
        target: TypeName,
        expr: Box<Expr>,
    },
    SizeofType(TypeName),
    SizeofExpr(Box<Expr>),
    InitList(Vec<Initializer>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn node_kind(&self) -> NodeKind {
        match &self.kind {
            ExprKind::Literal(_) => NodeKind::Literal,
            ExprKind::Identifier(_) | ExprKind::Qualified(_) => {
                NodeKind::IdentifierExpression
            }
            ExprKind::Binary { .. } => NodeKind::BinaryExpression,
            ExprKind::Logical { .. } => NodeKind::LogicalExpression,
            ExprKind::Assign { .. } => NodeKind::AssignmentExpression,
            ExprKind::Comma(..) => NodeKind::CommaExpression,
            ExprKind::Unary { op, .. } => match op {
                UnOp::PostInc | UnOp::PostDec => NodeKind::PostfixExpression,
                _ => NodeKind::UnaryExpression,
            },
            ExprKind::Conditional { .. } => NodeKind::ConditionalExpression,
            ExprKind::Call { .. } => NodeKind::CallExpression,
            ExprKind::Index { .. } => NodeKind::IndexExpression,
            ExprKind::Member { .. } => NodeKind::MemberExpression,
            ExprKind::Cast { .. } => NodeKind::CastExpression,
            ExprKind::SizeofType(_) | ExprKind::SizeofExpr(_) => {
                NodeKind::SizeofExpression
            }
            ExprKind::InitList(_) => NodeKind::InitializerList,
        }
    }

    pub fn info(&self) -> NodeInfo {
        NodeInfo {
            kind: self.node_kind(),
            span: self.span,
        }
    }
}

/// Top-level program structure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    /// Library names from `#include` directives, in source order.
    pub includes: Vec<String>,
    /// All top-level declarations
    pub items: Vec<Stmt>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }
}
