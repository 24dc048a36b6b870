use std::fmt::{self, Display};
use std::marker::PhantomData;

/// A type descriptor for a SQL value
///
/// This is the type layer the registry consumes.  The analyzer writes these
/// onto expression nodes as inferred output types and the registry compares
/// them against the formal parameters of each overload.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    Bool,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    String,
    Timestamp,
    Date,
    /// A sequence of values, e.g. the rows of a window fed to an aggregate
    List(Box<DataType>),
}

impl DataType {
    /// The SQL name of the type
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// The element type if this is a list
    pub fn element_type(&self) -> Option<&DataType> {
        match self {
            DataType::List(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Int16 | DataType::Int32 | DataType::Int64)
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, DataType::Float | DataType::Double)
    }

    /// Returns true if a value of this type may be implicitly converted to `target`
    /// without losing information
    ///
    /// Only widening is ever allowed.  Integers widen to larger integers and to
    /// any floating point type, float widens to double.  Lists never widen.
    pub fn can_widen_to(&self, target: &DataType) -> bool {
        match (self, target) {
            (DataType::Int16, DataType::Int32 | DataType::Int64) => true,
            (DataType::Int32, DataType::Int64) => true,
            (from, to) if from.is_integer() && to.is_floating() => true,
            (DataType::Float, DataType::Double) => true,
            _ => false,
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "bool"),
            DataType::Int16 => write!(f, "int16"),
            DataType::Int32 => write!(f, "int32"),
            DataType::Int64 => write!(f, "int64"),
            DataType::Float => write!(f, "float"),
            DataType::Double => write!(f, "double"),
            DataType::String => write!(f, "string"),
            DataType::Timestamp => write!(f, "timestamp"),
            DataType::Date => write!(f, "date"),
            DataType::List(element) => write!(f, "list<{}>", element),
        }
    }
}

/// Type-level stand-in for the codec's string value
pub struct StringRef;
/// Type-level stand-in for the codec's timestamp value
pub struct Timestamp;
/// Type-level stand-in for the codec's date value
pub struct Date;
/// Type-level stand-in for a codec list whose elements are `T`
pub struct ListRef<T>(PhantomData<T>);

/// This trait helps convert from rust types to udf types
///
/// It's implemented for the primitive types and the codec stand-ins above.
///
/// Implement this to use methods like
/// [`from_rust`](crate::helpers::types::from_rust) or to mention your own
/// types in a registration signature.
pub trait TypeInfer {
    /// Return the udf type for this type
    fn as_udf_type() -> DataType;
}

impl TypeInfer for bool {
    fn as_udf_type() -> DataType {
        DataType::Bool
    }
}

impl TypeInfer for i16 {
    fn as_udf_type() -> DataType {
        DataType::Int16
    }
}

impl TypeInfer for i32 {
    fn as_udf_type() -> DataType {
        DataType::Int32
    }
}

impl TypeInfer for i64 {
    fn as_udf_type() -> DataType {
        DataType::Int64
    }
}

impl TypeInfer for f32 {
    fn as_udf_type() -> DataType {
        DataType::Float
    }
}

impl TypeInfer for f64 {
    fn as_udf_type() -> DataType {
        DataType::Double
    }
}

impl TypeInfer for StringRef {
    fn as_udf_type() -> DataType {
        DataType::String
    }
}

impl TypeInfer for String {
    fn as_udf_type() -> DataType {
        DataType::String
    }
}

impl TypeInfer for &str {
    fn as_udf_type() -> DataType {
        DataType::String
    }
}

impl TypeInfer for Timestamp {
    fn as_udf_type() -> DataType {
        DataType::Timestamp
    }
}

impl TypeInfer for Date {
    fn as_udf_type() -> DataType {
        DataType::Date
    }
}

impl<T: TypeInfer> TypeInfer for ListRef<T> {
    fn as_udf_type() -> DataType {
        DataType::List(Box::new(T::as_udf_type()))
    }
}

// Native functions receive non-primitive values by pointer
impl<T: TypeInfer> TypeInfer for *const T {
    fn as_udf_type() -> DataType {
        T::as_udf_type()
    }
}

impl<T: TypeInfer> TypeInfer for *mut T {
    fn as_udf_type() -> DataType {
        T::as_udf_type()
    }
}

/// Create a udf type from a rust type
pub fn from_rust<T: TypeInfer>() -> DataType {
    <T as TypeInfer>::as_udf_type()
}
/// Create an instance of the bool type
pub fn bool() -> DataType {
    from_rust::<bool>()
}
/// Create an instance of the int16 type
pub fn int16() -> DataType {
    from_rust::<i16>()
}
/// Create an instance of the int32 type
pub fn int32() -> DataType {
    from_rust::<i32>()
}
/// Create an instance of the int64 type
pub fn int64() -> DataType {
    from_rust::<i64>()
}
/// Create an instance of the float type
pub fn float() -> DataType {
    from_rust::<f32>()
}
/// Create an instance of the double type
pub fn double() -> DataType {
    from_rust::<f64>()
}
/// Create an instance of the string type
pub fn string() -> DataType {
    from_rust::<StringRef>()
}
/// Create an instance of the timestamp type
pub fn timestamp() -> DataType {
    from_rust::<Timestamp>()
}
/// Create an instance of the date type
pub fn date() -> DataType {
    from_rust::<Date>()
}
/// Create an instance of the list type
pub fn list(element: DataType) -> DataType {
    DataType::List(Box::new(element))
}
