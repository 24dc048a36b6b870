use crate::error::{Result, UdfError};

/// Helper trait for extracting a property that bootstrap validation should
/// have guaranteed, returning an error if it is somehow missing
pub(crate) trait HasRequiredPropertiesRef<T> {
    fn required(&self, prop_name: &str) -> Result<&T>;
}

impl<T> HasRequiredPropertiesRef<T> for Option<T> {
    fn required(&self, prop_name: &str) -> Result<&T> {
        self.as_ref().ok_or_else(|| {
            UdfError::InvalidRegistration(format!(
                "The required property {} is missing",
                prop_name
            ))
        })
    }
}

/// Renders argument types the way diagnostics show them, `?` for unknown
pub(crate) fn format_arg_types<'a>(
    types: impl IntoIterator<Item = Option<&'a crate::helpers::types::DataType>>,
) -> String {
    types
        .into_iter()
        .map(|typ| match typ {
            Some(typ) => typ.to_string(),
            None => "?".to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::types;

    #[test]
    fn missing_property_is_an_error() {
        let value: Option<u32> = None;
        assert!(value.required("returns").is_err());
        assert_eq!(*Some(3).required("returns").unwrap(), 3);
    }

    #[test]
    fn unknown_types_render_as_question_mark() {
        let int32 = types::int32();
        let rendered = format_arg_types([Some(&int32), None]);
        assert_eq!(rendered, "int32, ?");
    }
}
