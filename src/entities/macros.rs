//! Macros for reducing boilerplate when defining entities

/// Implement [`Entity`](crate::core::entity::Entity) for a struct
///
/// The bracketed list names the fields reachable through
/// `field_value` / `set_field_value`. Each listed field's type must implement
/// [`ToFieldValue`](crate::core::field::ToFieldValue) and
/// [`FromFieldValue`](crate::core::field::FromFieldValue). Fields left out
/// are still serialized and schema-walked, they just cannot be touched by
/// the save pipeline.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct User {
///     pub id: Option<i64>,
///     pub login: String,
///     pub password: Option<String>,
///     pub address: Address,
/// }
///
/// impl Describe for User { /* ... */ }
///
/// impl_entity!(User, "user", "users", [id, login, password]);
/// ```
#[macro_export]
macro_rules! impl_entity {
    (
        $type:ty,
        $singular:expr,
        $plural:expr,
        [ $( $field:ident ),* $(,)? ]
    ) => {
        impl $crate::core::entity::Entity for $type {
            fn resource_name() -> &'static str {
                $plural
            }

            fn resource_name_singular() -> &'static str {
                $singular
            }

            fn field_value(
                &self,
                field: &str,
            ) -> Result<$crate::core::field::FieldValue, $crate::core::field::FieldAccessError> {
                match field {
                    $(
                        stringify!($field) => $crate::core::field::read_field(field, &self.$field),
                    )*
                    _ => Err($crate::core::field::FieldAccessError::UnknownField {
                        entity: <Self as $crate::core::entity::Entity>::entity_name().to_string(),
                        field: field.to_string(),
                    }),
                }
            }

            #[allow(unused_variables)]
            fn set_field_value(
                &mut self,
                field: &str,
                value: $crate::core::field::FieldValue,
            ) -> Result<(), $crate::core::field::FieldAccessError> {
                match field {
                    $(
                        stringify!($field) => {
                            self.$field = $crate::core::field::convert_field(field, value)?;
                            Ok(())
                        }
                    )*
                    _ => Err($crate::core::field::FieldAccessError::UnknownField {
                        entity: <Self as $crate::core::entity::Entity>::entity_name().to_string(),
                        field: field.to_string(),
                    }),
                }
            }
        }
    };
}
