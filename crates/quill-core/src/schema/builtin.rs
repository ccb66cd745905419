/// Scalar types understood natively by every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    String,
    Boolean,
    Int,
    BigInt,
    Float,
    Decimal,
    DateTime,
    Json,
    Bytes,
}

impl BuiltinType {
    pub fn from_name(name: &str) -> Option<BuiltinType> {
        Some(match name {
            "String" => BuiltinType::String,
            "Boolean" => BuiltinType::Boolean,
            "Int" => BuiltinType::Int,
            "BigInt" => BuiltinType::BigInt,
            "Float" => BuiltinType::Float,
            "Decimal" => BuiltinType::Decimal,
            "DateTime" => BuiltinType::DateTime,
            "Json" => BuiltinType::Json,
            "Bytes" => BuiltinType::Bytes,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::String => "String",
            BuiltinType::Boolean => "Boolean",
            BuiltinType::Int => "Int",
            BuiltinType::BigInt => "BigInt",
            BuiltinType::Float => "Float",
            BuiltinType::Decimal => "Decimal",
            BuiltinType::DateTime => "DateTime",
            BuiltinType::Json => "Json",
            BuiltinType::Bytes => "Bytes",
        }
    }

    /// Types that support arithmetic updates and numeric aggregates.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            BuiltinType::Int | BuiltinType::BigInt | BuiltinType::Float | BuiltinType::Decimal
        )
    }

    /// Types that can be ordered and therefore support `lt`/`gt`/`_min`/`_max`.
    pub fn is_comparable(self) -> bool {
        self.is_numeric() || matches!(self, BuiltinType::String | BuiltinType::DateTime)
    }
}

impl core::fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
