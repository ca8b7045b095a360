//! Static type representation

use crate::ast::TypeRef;
use std::fmt;

/// A structural type
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Number,
    String,
    Bool,
    /// Type of statements-as-expressions and functions without `-> type`
    Unit,
    Function(Box<FunctionType>),
    /// Placeholder after a type error; compatible with everything so one
    /// mistake doesn't cascade
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub params: Vec<Type>,
    /// Number of leading parameters without default values
    pub required: usize,
    pub ret: Type,
}

impl Type {
    pub fn from_ref(r: TypeRef) -> Self {
        match r {
            TypeRef::Number => Type::Number,
            TypeRef::Str => Type::String,
            TypeRef::Bool => Type::Bool,
        }
    }

    /// Structural compatibility; `Unknown` matches anything
    pub fn compatible(&self, other: &Type) -> bool {
        matches!(self, Type::Unknown) || matches!(other, Type::Unknown) || self == other
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Number => write!(f, "number"),
            Type::String => write!(f, "string"),
            Type::Bool => write!(f, "bool"),
            Type::Unit => write!(f, "unit"),
            Type::Function(func) => {
                write!(f, "fn(")?;
                for (i, p) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", func.ret)
            }
            Type::Unknown => write!(f, "<unknown>"),
        }
    }
}
