//! Semantic types, as far as the checker tracks them.

use std::fmt;

/// Built-in `kotlin.*` types with dedicated handling.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Prim {
    Int,
    Long,
    Short,
    Byte,
    UInt,
    ULong,
    UShort,
    UByte,
    Double,
    Float,
    Boolean,
    Char,
    String,
    Unit,
    Nothing,
    Any,
}

impl Prim {
    const ALL: [Prim; 16] = [
        Prim::Int,
        Prim::Long,
        Prim::Short,
        Prim::Byte,
        Prim::UInt,
        Prim::ULong,
        Prim::UShort,
        Prim::UByte,
        Prim::Double,
        Prim::Float,
        Prim::Boolean,
        Prim::Char,
        Prim::String,
        Prim::Unit,
        Prim::Nothing,
        Prim::Any,
    ];

    /// Accepts `Int` and `kotlin.Int`.
    pub fn from_name(name: &str) -> Option<Prim> {
        let short = name.strip_prefix("kotlin.").unwrap_or(name);
        Prim::ALL.into_iter().find(|p| p.name() == short)
    }

    pub fn name(self) -> &'static str {
        match self {
            Prim::Int => "Int",
            Prim::Long => "Long",
            Prim::Short => "Short",
            Prim::Byte => "Byte",
            Prim::UInt => "UInt",
            Prim::ULong => "ULong",
            Prim::UShort => "UShort",
            Prim::UByte => "UByte",
            Prim::Double => "Double",
            Prim::Float => "Float",
            Prim::Boolean => "Boolean",
            Prim::Char => "Char",
            Prim::String => "String",
            Prim::Unit => "Unit",
            Prim::Nothing => "Nothing",
            Prim::Any => "Any",
        }
    }

    pub fn is_signed_integer(self) -> bool {
        matches!(self, Prim::Int | Prim::Long | Prim::Short | Prim::Byte)
    }

    pub fn is_unsigned_integer(self) -> bool {
        matches!(self, Prim::UInt | Prim::ULong | Prim::UShort | Prim::UByte)
    }

    pub fn is_numeric(self) -> bool {
        self.is_signed_integer()
            || self.is_unsigned_integer()
            || matches!(self, Prim::Double | Prim::Float)
    }

    /// Result of `self op other` for arithmetic on two numeric types.
    pub fn widen(self, other: Prim) -> Prim {
        const ORDER: [Prim; 6] = [
            Prim::Byte,
            Prim::Short,
            Prim::Int,
            Prim::Long,
            Prim::Float,
            Prim::Double,
        ];
        let rank = |p: Prim| ORDER.iter().position(|&o| o == p);
        match (rank(self), rank(other)) {
            // Byte and Short arithmetic yields Int.
            (Some(a), Some(b)) => ORDER[a.max(b).max(2)],
            _ if self == other => self,
            _ => Prim::Int,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Prim(Prim),
    /// Class, object or interface declared in the project.
    Class(String),
    /// Type provided by a library (`List`, `Pair`, ...).
    Library(String),
    TypeParam(String),
    /// Function type with the given arity.
    Function(usize),
    Nullable(Box<Ty>),
    /// Resolution failed and was reported.
    Error,
    /// Not inferred.
    Unknown,
}

impl Ty {
    pub const UNIT: Ty = Ty::Prim(Prim::Unit);
    pub const NOTHING: Ty = Ty::Prim(Prim::Nothing);
    pub const BOOLEAN: Ty = Ty::Prim(Prim::Boolean);
    pub const STRING: Ty = Ty::Prim(Prim::String);

    /// The type of `null`.
    pub fn null() -> Ty {
        Ty::Nullable(Box::new(Ty::NOTHING))
    }

    #[must_use]
    pub fn nullable(self) -> Ty {
        match self {
            Ty::Nullable(_) | Ty::Error | Ty::Unknown => self,
            other => Ty::Nullable(Box::new(other)),
        }
    }

    /// Strip one level of nullability.
    pub fn non_null(&self) -> &Ty {
        match self {
            Ty::Nullable(inner) => inner,
            other => other,
        }
    }

    pub fn prim(&self) -> Option<Prim> {
        match self {
            Ty::Prim(p) => Some(*p),
            _ => None,
        }
    }

    /// Nothing to say about this type (error or not inferred).
    pub fn is_opaque(&self) -> bool {
        match self {
            Ty::Error | Ty::Unknown | Ty::TypeParam(_) => true,
            Ty::Nullable(inner) => inner.is_opaque(),
            _ => false,
        }
    }

    pub fn contains_error(&self) -> bool {
        match self {
            Ty::Error => true,
            Ty::Nullable(inner) => inner.contains_error(),
            _ => false,
        }
    }

    /// Whether a value of type `value` can be stored where `self` is
    /// expected. Opaque types are accepted either way.
    pub fn accepts(&self, value: &Ty) -> bool {
        if self.is_opaque() || value.is_opaque() {
            return true;
        }
        match (self, value) {
            (_, Ty::Prim(Prim::Nothing)) => true,
            (Ty::Prim(Prim::Any), v) => !matches!(v, Ty::Nullable(_)),
            (Ty::Nullable(expected), Ty::Nullable(v)) => expected.accepts(v),
            (Ty::Nullable(expected), v) => expected.accepts(v),
            (_, Ty::Nullable(_)) => false,
            // Supertypes of project classes are not tracked.
            (Ty::Class(_), Ty::Class(_)) | (Ty::Library(_), Ty::Class(_)) => true,
            (expected, v) => expected == v,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Prim(p) => f.write_str(p.name()),
            Ty::Class(name) | Ty::Library(name) | Ty::TypeParam(name) => f.write_str(name),
            Ty::Function(arity) => write!(f, "Function{arity}"),
            Ty::Nullable(inner) => write!(f, "{inner}?"),
            Ty::Error => f.write_str("[Error type]"),
            Ty::Unknown => f.write_str("???"),
        }
    }
}

#[cfg(test)]
mod tests;
