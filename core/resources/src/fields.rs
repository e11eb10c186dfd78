//! Closed editable-field sets, one enum per resource.

/// Declare a resource's editable fields as an enum.
///
/// Generates `ALL`, `NAMES` (usable as a descriptor whitelist),
/// [`EditableField`](deskbridge_sync::EditableField), `FromStr` and `Display`.
macro_rules! editable_fields {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident for $resource:literal {
            $($variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            /// Every editable field.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
            /// Read-side names of every editable field.
            pub const NAMES: &'static [&'static str] = &[$($wire),+];

            pub fn as_str(self) -> &'static str {
                deskbridge_sync::EditableField::name(self)
            }
        }

        impl deskbridge_sync::EditableField for $name {
            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = deskbridge_common::Error;

            fn from_str(s: &str) -> deskbridge_common::Result<Self> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(deskbridge_common::Error::InvalidField {
                        resource: $resource,
                        field: s.to_string(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(deskbridge_sync::EditableField::name(*self))
            }
        }
    };
}

pub(crate) use editable_fields;
