//! Macros for ergonomic machine construction.

/// Generate a state enum and its `State` implementation.
///
/// Variants are named after themselves unless a label is given with
/// `Variant = "label"`. The label is also used as the serde name, so enums
/// generated here deserialize straight from machine definitions.
///
/// The generated enum derives `serde::Serialize` and `serde::Deserialize`;
/// the calling crate needs `serde` as a dependency.
///
/// # Example
///
/// ```
/// use turnstile::core::State;
/// use turnstile::state_enum;
///
/// state_enum! {
///     pub enum UserState {
///         Inactive = "inactive",
///         Active = "active",
///         Banned = "banned",
///     }
/// }
///
/// assert_eq!(UserState::Banned.name(), "banned");
/// assert_eq!(UserState::Active.to_string(), "active");
/// ```
#[macro_export]
macro_rules! state_enum {
    (@label $variant:ident) => {
        stringify!($variant)
    };
    (@label $variant:ident $label:literal) => {
        $label
    };
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(= $label:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $(#[serde(rename = $label)])?
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => $crate::state_enum!(@label $variant $($label)?)),*
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::core::State::name(self))
            }
        }
    };
}
