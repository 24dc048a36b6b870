use super::types::{self, DataType};

/// A typed constant value
///
/// Aggregates use these as the initial value of their accumulator.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// A typed null
    Null(DataType),
}

impl Literal {
    /// Get the udf type of a literal
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Bool(_) => types::bool(),
            Literal::Int16(_) => types::int16(),
            Literal::Int32(_) => types::int32(),
            Literal::Int64(_) => types::int64(),
            Literal::Float(_) => types::float(),
            Literal::Double(_) => types::double(),
            Literal::String(_) => types::string(),
            Literal::Null(data_type) => data_type.clone(),
        }
    }

    /// Converts the literal to `target` if the types are equal or the value's
    /// type widens to it.  Returns None otherwise.
    pub fn widen_to(&self, target: &DataType) -> Option<Literal> {
        if self.data_type() == *target {
            return Some(self.clone());
        }
        if !self.data_type().can_widen_to(target) {
            return None;
        }
        let widened = match (self, target) {
            (Literal::Int16(v), DataType::Int32) => Literal::Int32(i32::from(*v)),
            (Literal::Int16(v), DataType::Int64) => Literal::Int64(i64::from(*v)),
            (Literal::Int32(v), DataType::Int64) => Literal::Int64(i64::from(*v)),
            (Literal::Int16(v), DataType::Float) => Literal::Float(f32::from(*v)),
            (Literal::Int16(v), DataType::Double) => Literal::Double(f64::from(*v)),
            (Literal::Int32(v), DataType::Float) => Literal::Float(*v as f32),
            (Literal::Int32(v), DataType::Double) => Literal::Double(f64::from(*v)),
            (Literal::Int64(v), DataType::Float) => Literal::Float(*v as f32),
            (Literal::Int64(v), DataType::Double) => Literal::Double(*v as f64),
            (Literal::Float(v), DataType::Double) => Literal::Double(f64::from(*v)),
            _ => return None,
        };
        Some(widened)
    }
}

/// A trait that helps convert from rust values to literals
///
/// This trait is implemented for all the standard rust types
pub trait LiteralInference {
    /// Convert self to a literal
    fn to_literal(self) -> Literal;
}

impl LiteralInference for bool {
    fn to_literal(self) -> Literal {
        Literal::Bool(self)
    }
}

impl LiteralInference for i16 {
    fn to_literal(self) -> Literal {
        Literal::Int16(self)
    }
}

impl LiteralInference for i32 {
    fn to_literal(self) -> Literal {
        Literal::Int32(self)
    }
}

impl LiteralInference for i64 {
    fn to_literal(self) -> Literal {
        Literal::Int64(self)
    }
}

impl LiteralInference for f32 {
    fn to_literal(self) -> Literal {
        Literal::Float(self)
    }
}

impl LiteralInference for f64 {
    fn to_literal(self) -> Literal {
        Literal::Double(self)
    }
}

impl LiteralInference for &str {
    fn to_literal(self) -> Literal {
        Literal::String(self.to_string())
    }
}

impl LiteralInference for String {
    fn to_literal(self) -> Literal {
        Literal::String(self)
    }
}

impl LiteralInference for Literal {
    fn to_literal(self) -> Literal {
        self
    }
}

/// Create a literal from a rust value
pub fn literal<T: LiteralInference>(value: T) -> Literal {
    value.to_literal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_types() {
        assert_eq!(literal(0).data_type(), types::int32());
        assert_eq!(literal(0.0).data_type(), types::double());
        assert_eq!(literal("x").data_type(), types::string());
        assert_eq!(Literal::Null(types::date()).data_type(), types::date());
    }

    #[test]
    fn widen_init_values() {
        assert_eq!(literal(3).widen_to(&types::double()), Some(Literal::Double(3.0)));
        assert_eq!(literal(3_i16).widen_to(&types::int64()), Some(Literal::Int64(3)));
        assert_eq!(literal(1.5_f32).widen_to(&types::double()), Some(Literal::Double(1.5)));
        assert_eq!(literal(2.5).widen_to(&types::int32()), None);
        assert_eq!(literal(true).widen_to(&types::bool()), Some(Literal::Bool(true)));
    }
}
