//! Type descriptors and the arithmetic limits table
//!
//! A [`Type`] is a tagged variant: arithmetic (kind, signedness and width from
//! the [`LimitsTable`]), normal/array pointers, function pointers, functions,
//! structs and `void`. Array pointers carry their element count so `sizeof` and
//! initialization can recover the declared shape.
//!
//! # Promotion
//!
//! [`promote`] picks the higher-ranked operand type: integers ranked by width,
//! unsigned above same-width signed, every floating type above every integer,
//! `double` above `float`.

use crate::parser::ast::Initializer;
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

/// Arithmetic type kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArithKind {
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    WChar,
    Char16,
    Char32,
    Short,
    UnsignedShort,
    Int,
    Unsigned,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
}

impl ArithKind {
    pub const ALL: [ArithKind; 17] = [
        ArithKind::Bool,
        ArithKind::Char,
        ArithKind::SignedChar,
        ArithKind::UnsignedChar,
        ArithKind::WChar,
        ArithKind::Char16,
        ArithKind::Char32,
        ArithKind::Short,
        ArithKind::UnsignedShort,
        ArithKind::Int,
        ArithKind::Unsigned,
        ArithKind::Long,
        ArithKind::UnsignedLong,
        ArithKind::LongLong,
        ArithKind::UnsignedLongLong,
        ArithKind::Float,
        ArithKind::Double,
    ];

    /// Canonical spelling, also used as the signature token.
    pub fn name(self) -> &'static str {
        match self {
            ArithKind::Bool => "bool",
            ArithKind::Char => "char",
            ArithKind::SignedChar => "signed char",
            ArithKind::UnsignedChar => "unsigned char",
            ArithKind::WChar => "wchar_t",
            ArithKind::Char16 => "char16_t",
            ArithKind::Char32 => "char32_t",
            ArithKind::Short => "short",
            ArithKind::UnsignedShort => "unsigned short",
            ArithKind::Int => "int",
            ArithKind::Unsigned => "unsigned int",
            ArithKind::Long => "long",
            ArithKind::UnsignedLong => "unsigned long",
            ArithKind::LongLong => "long long",
            ArithKind::UnsignedLongLong => "unsigned long long",
            ArithKind::Float => "float",
            ArithKind::Double => "double",
        }
    }

    /// Resolve a sequence of type words (`["unsigned", "long", "int"]`).
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Option<ArithKind> {
        let mut unsigned = false;
        let mut signed = false;
        let mut longs = 0;
        let mut base: Option<&str> = None;

        for word in words {
            match word.as_ref() {
                "unsigned" => unsigned = true,
                "signed" => signed = true,
                "long" => longs += 1,
                w @ ("short" | "char" | "bool" | "float" | "double" | "wchar_t" | "char16_t"
                | "char32_t") => {
                    if base.is_some() {
                        return None;
                    }
                    base = Some(w);
                }
                "int" => {}
                _ => return None,
            }
        }
        if unsigned && signed {
            return None;
        }

        let kind = match base {
            Some("bool") => ArithKind::Bool,
            Some("wchar_t") => ArithKind::WChar,
            Some("char16_t") => ArithKind::Char16,
            Some("char32_t") => ArithKind::Char32,
            Some("float") => ArithKind::Float,
            Some("double") => ArithKind::Double,
            Some("char") if unsigned => ArithKind::UnsignedChar,
            Some("char") if signed => ArithKind::SignedChar,
            Some("char") => ArithKind::Char,
            Some("short") if unsigned => ArithKind::UnsignedShort,
            Some("short") => ArithKind::Short,
            _ if longs >= 2 && unsigned => ArithKind::UnsignedLongLong,
            _ if longs >= 2 => ArithKind::LongLong,
            _ if longs == 1 && unsigned => ArithKind::UnsignedLong,
            _ if longs == 1 => ArithKind::Long,
            _ if unsigned => ArithKind::Unsigned,
            _ => ArithKind::Int,
        };
        Some(kind)
    }

    pub fn is_float(self) -> bool {
        matches!(self, ArithKind::Float | ArithKind::Double)
    }

    pub fn is_integral(self) -> bool {
        !self.is_float()
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            ArithKind::Bool
                | ArithKind::UnsignedChar
                | ArithKind::UnsignedShort
                | ArithKind::Unsigned
                | ArithKind::UnsignedLong
                | ArithKind::UnsignedLongLong
        )
    }

    pub fn is_char(self) -> bool {
        matches!(
            self,
            ArithKind::Char
                | ArithKind::SignedChar
                | ArithKind::UnsignedChar
                | ArithKind::WChar
                | ArithKind::Char16
                | ArithKind::Char32
        )
    }

    /// Signed type of the same width (identity for signed and floating kinds).
    pub fn signed_counterpart(self) -> ArithKind {
        match self {
            ArithKind::Bool | ArithKind::UnsignedChar => ArithKind::SignedChar,
            ArithKind::UnsignedShort => ArithKind::Short,
            ArithKind::Unsigned => ArithKind::Int,
            ArithKind::UnsignedLong => ArithKind::Long,
            ArithKind::UnsignedLongLong => ArithKind::LongLong,
            other => other,
        }
    }
}

/// Numeric range of an arithmetic type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Range {
    Integral { min: i128, max: i128 },
    Floating { max: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    pub range: Range,
    pub bytes: usize,
}

impl Limits {
    pub const fn integral(min: i128, max: i128, bytes: usize) -> Self {
        Limits {
            range: Range::Integral { min, max },
            bytes,
        }
    }

    pub const fn floating(max: f64, bytes: usize) -> Self {
        Limits {
            range: Range::Floating { max },
            bytes,
        }
    }
}

/// Per-kind `{min, max, bytes}` plus the pointer width.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitsTable {
    pub arithmetic: FxHashMap<ArithKind, Limits>,
    pub pointer_bytes: usize,
    /// Most scalar cells a single declared object may hold
    pub max_cells: usize,
}

impl LimitsTable {
    pub fn get(&self, kind: ArithKind) -> Limits {
        self.arithmetic
            .get(&kind)
            .copied()
            .unwrap_or_else(|| default_limits(kind))
    }

    /// Override one entry.
    pub fn with(mut self, kind: ArithKind, limits: Limits) -> Self {
        self.arithmetic.insert(kind, limits);
        self
    }

    /// Promotion rank: width first, unsigned above signed, floats above all.
    pub fn rank(&self, kind: ArithKind) -> usize {
        match kind {
            ArithKind::Double => 10_001,
            ArithKind::Float => 10_000,
            _ => self.get(kind).bytes * 2 + usize::from(kind.is_unsigned() && kind != ArithKind::Bool),
        }
    }
}

pub const DEFAULT_MAX_CELLS: usize = 1 << 24;

impl Default for LimitsTable {
    fn default() -> Self {
        let arithmetic = ArithKind::ALL
            .iter()
            .map(|&kind| (kind, default_limits(kind)))
            .collect();
        LimitsTable {
            arithmetic,
            pointer_bytes: 4,
            max_cells: DEFAULT_MAX_CELLS,
        }
    }
}

fn default_limits(kind: ArithKind) -> Limits {
    match kind {
        ArithKind::Bool => Limits::integral(0, 1, 1),
        ArithKind::Char => Limits::integral(0, 0x7f, 1),
        ArithKind::SignedChar => Limits::integral(-0x80, 0x7f, 1),
        ArithKind::UnsignedChar => Limits::integral(0, 0xff, 1),
        ArithKind::WChar | ArithKind::Char32 => {
            Limits::integral(-0x8000_0000, 0x7fff_ffff, 4)
        }
        ArithKind::Char16 => Limits::integral(-0x8000, 0x7fff, 4),
        ArithKind::Short => Limits::integral(-0x8000, 0x7fff, 2),
        ArithKind::UnsignedShort => Limits::integral(0, 0xffff, 2),
        ArithKind::Int | ArithKind::Long => Limits::integral(-0x8000_0000, 0x7fff_ffff, 4),
        ArithKind::Unsigned | ArithKind::UnsignedLong => Limits::integral(0, 0xffff_ffff, 4),
        ArithKind::LongLong => Limits::integral(i64::MIN as i128, i64::MAX as i128, 8),
        ArithKind::UnsignedLongLong => Limits::integral(0, u64::MAX as i128, 8),
        ArithKind::Float => Limits::floating(3.40282346638529e38, 4),
        ArithKind::Double => Limits::floating(f64::MAX, 8),
    }
}

/// How an array-typed or plain pointer addresses its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Normal,
    Array { size: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamType {
    pub ty: Type,
    pub reference: bool,
    pub readonly: bool,
    pub optional: bool,
}

impl ParamType {
    pub fn new(ty: Type) -> Self {
        ParamType {
            ty,
            reference: false,
            readonly: false,
            optional: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub ret: Type,
    pub params: Vec<ParamType>,
    pub variadic: bool,
}

impl FunctionType {
    pub fn new(ret: Type, params: Vec<Type>) -> Self {
        FunctionType {
            ret,
            params: params.into_iter().map(ParamType::new).collect(),
            variadic: false,
        }
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }
}

/// Aggregate member: name, type and optional default initializer
#[derive(Debug, Clone)]
pub struct MemberType {
    pub name: String,
    pub ty: Type,
    pub readonly: bool,
    pub default: Option<Rc<Initializer>>,
}

#[derive(Debug, Clone)]
pub struct StructType {
    pub name: String,
    pub members: Vec<MemberType>,
}

impl StructType {
    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name == name)
    }
}

// Struct names are unique within a run, so identity is by name.
impl PartialEq for StructType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Runtime type descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Void,
    Arithmetic(ArithKind),
    Pointer {
        target: Box<Type>,
        kind: PointerKind,
        const_target: bool,
    },
    FunctionPointer(Rc<FunctionType>),
    Function(Rc<FunctionType>),
    Struct(Rc<StructType>),
    /// Marker argument distinguishing postfix from prefix `++`/`--`
    Dummy,
}

impl Type {
    pub const INT: Type = Type::Arithmetic(ArithKind::Int);
    pub const BOOL: Type = Type::Arithmetic(ArithKind::Bool);
    pub const CHAR: Type = Type::Arithmetic(ArithKind::Char);
    pub const DOUBLE: Type = Type::Arithmetic(ArithKind::Double);

    /// `T*`; a pointer to a function type becomes a function pointer.
    pub fn pointer_to(target: Type) -> Type {
        match target {
            Type::Function(sig) => Type::FunctionPointer(sig),
            target => Type::Pointer {
                target: Box::new(target),
                kind: PointerKind::Normal,
                const_target: false,
            },
        }
    }

    pub fn const_pointer_to(target: Type) -> Type {
        Type::Pointer {
            target: Box::new(target),
            kind: PointerKind::Normal,
            const_target: true,
        }
    }

    /// `T[size]`
    pub fn array_of(element: Type, size: usize) -> Type {
        Type::Pointer {
            target: Box::new(element),
            kind: PointerKind::Array { size },
            const_target: false,
        }
    }

    pub fn arith(&self) -> Option<ArithKind> {
        match self {
            Type::Arithmetic(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Type::Arithmetic(_))
    }

    pub fn is_integral(&self) -> bool {
        self.arith().is_some_and(ArithKind::is_integral)
    }

    pub fn is_float(&self) -> bool {
        self.arith().is_some_and(ArithKind::is_float)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer { .. } | Type::FunctionPointer(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Type::Pointer {
                kind: PointerKind::Array { .. },
                ..
            }
        )
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    /// Target type of a data pointer
    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Element count of an array type
    pub fn array_size(&self) -> Option<usize> {
        match self {
            Type::Pointer {
                kind: PointerKind::Array { size },
                ..
            } => Some(*size),
            _ => None,
        }
    }

    /// Canonical type signature used as the operator-registry key.
    pub fn signature_key(&self) -> String {
        match self {
            Type::Void => "void".to_string(),
            Type::Arithmetic(kind) => format!("({})", kind.name()),
            Type::Pointer {
                kind: PointerKind::Normal,
                ..
            } => "pointer_normal".to_string(),
            Type::Pointer {
                kind: PointerKind::Array { .. },
                ..
            } => "pointer_array".to_string(),
            Type::FunctionPointer(_) => "pointer_function".to_string(),
            Type::Function(_) => "function".to_string(),
            Type::Struct(def) => format!("struct {}", def.name),
            Type::Dummy => "dummy".to_string(),
        }
    }

    /// Registry keys to consult for an operator, most specific first.
    pub fn dispatch_chain(&self) -> Vec<String> {
        let category = match self {
            Type::Arithmetic(_) => Some("arithmetic"),
            Type::Pointer { .. } | Type::FunctionPointer(_) => Some("pointer"),
            Type::Struct(_) => Some("struct"),
            _ => None,
        };
        let mut chain = vec![self.signature_key()];
        chain.extend(category.map(str::to_string));
        chain
    }

    /// Size in bytes per the limits table, `None` past `usize`
    pub fn size_of(&self, limits: &LimitsTable) -> Option<usize> {
        match self {
            Type::Void | Type::Dummy => Some(1),
            Type::Arithmetic(kind) => Some(limits.get(*kind).bytes),
            Type::Pointer {
                target,
                kind: PointerKind::Array { size },
                ..
            } => size.checked_mul(target.size_of(limits)?),
            Type::Pointer { .. } | Type::FunctionPointer(_) | Type::Function(_) => {
                Some(limits.pointer_bytes)
            }
            Type::Struct(def) => def
                .members
                .iter()
                .try_fold(0usize, |total, m| total.checked_add(m.ty.size_of(limits)?)),
        }
    }

    /// Number of scalar cells an object of this type occupies, `None` past `usize`
    pub fn cell_count(&self) -> Option<usize> {
        match self {
            Type::Pointer {
                target,
                kind: PointerKind::Array { size },
                ..
            } => size.checked_mul(target.cell_count()?),
            Type::Struct(def) => def
                .members
                .iter()
                .try_fold(0usize, |total, m| total.checked_add(m.ty.cell_count()?)),
            _ => Some(1),
        }
    }

    /// Same type ignoring array-vs-normal pointer kind and pointee constness.
    pub fn same_shape(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Pointer { target: a, .. }, Type::Pointer { target: b, .. }) => a.same_shape(b),
            _ => self == other,
        }
    }
}

/// Numeric promotion of two arithmetic kinds
pub fn promote(limits: &LimitsTable, a: ArithKind, b: ArithKind) -> ArithKind {
    if limits.rank(b) > limits.rank(a) {
        b
    } else {
        a
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, sig: &FunctionType) -> fmt::Result {
    for (i, param) in sig.params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", param.ty)?;
        if param.reference {
            write!(f, "&")?;
        }
    }
    if sig.variadic {
        if !sig.params.is_empty() {
            write!(f, ", ")?;
        }
        write!(f, "...")?;
    }
    Ok(())
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Arithmetic(kind) => write!(f, "{}", kind.name()),
            Type::Pointer {
                target,
                kind: PointerKind::Normal,
                const_target,
            } => {
                if *const_target {
                    write!(f, "const ")?;
                }
                write!(f, "{}*", target)
            }
            Type::Pointer {
                kind: PointerKind::Array { .. },
                ..
            } => {
                let mut element = self;
                let mut dims = String::new();
                while let Some(size) = element.array_size() {
                    dims.push_str(&format!("[{}]", size));
                    element = element.pointee().unwrap_or(&Type::Void);
                }
                write!(f, "{}{}", element, dims)
            }
            Type::FunctionPointer(sig) => {
                write!(f, "{} (*)(", sig.ret)?;
                write_params(f, sig)?;
                write!(f, ")")
            }
            Type::Function(sig) => {
                write!(f, "{}(", sig.ret)?;
                write_params(f, sig)?;
                write!(f, ")")
            }
            Type::Struct(def) => write!(f, "{}", def.name),
            Type::Dummy => write!(f, "dummy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_words_resolve() {
        assert_eq!(ArithKind::from_words(&["unsigned"]), Some(ArithKind::Unsigned));
        assert_eq!(
            ArithKind::from_words(&["long", "long", "unsigned", "int"]),
            Some(ArithKind::UnsignedLongLong)
        );
        assert_eq!(ArithKind::from_words(&["signed", "char"]), Some(ArithKind::SignedChar));
        assert_eq!(ArithKind::from_words(&["short", "int"]), Some(ArithKind::Short));
        assert_eq!(ArithKind::from_words(&["float", "double"]), None);
    }

    #[test]
    fn test_promotion_ranks() {
        let limits = LimitsTable::default();
        assert_eq!(promote(&limits, ArithKind::Int, ArithKind::Int), ArithKind::Int);
        assert_eq!(promote(&limits, ArithKind::Int, ArithKind::Double), ArithKind::Double);
        assert_eq!(promote(&limits, ArithKind::Float, ArithKind::Double), ArithKind::Double);
        assert_eq!(promote(&limits, ArithKind::Int, ArithKind::Unsigned), ArithKind::Unsigned);
        assert_eq!(promote(&limits, ArithKind::Short, ArithKind::Int), ArithKind::Int);
        assert_eq!(promote(&limits, ArithKind::UnsignedLongLong, ArithKind::Float), ArithKind::Float);
    }

    #[test]
    fn test_type_strings_and_sizes() {
        let limits = LimitsTable::default();
        let grid = Type::array_of(Type::array_of(Type::INT, 3), 2);
        assert_eq!(grid.to_string(), "int[2][3]");
        assert_eq!(grid.size_of(&limits), Some(24));
        assert_eq!(grid.cell_count(), Some(6));
        let huge = Type::array_of(Type::array_of(Type::INT, usize::MAX), 2);
        assert_eq!(huge.size_of(&limits), None);
        assert_eq!(huge.cell_count(), None);

        let fp = Type::pointer_to(Type::Function(Rc::new(FunctionType::new(
            Type::INT,
            vec![Type::INT, Type::DOUBLE],
        ))));
        assert_eq!(fp.to_string(), "int (*)(int, double)");
        assert_eq!(fp.signature_key(), "pointer_function");
    }
}
