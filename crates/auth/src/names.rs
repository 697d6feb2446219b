//! Opaque names the auth backend hands out.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

macro_rules! backend_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Cow<'static, str>);

        impl $name {
            pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
                Self(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

backend_name! {
    /// Role used for route-level checks ("admin", "operator", ...).
    ///
    /// Compared exactly; the backend decides which roles exist.
    Role
}

backend_name! {
    /// Fine-grained grant such as "pricing.write". Carried for UI code only;
    /// route decisions are role-based.
    Permission
}
