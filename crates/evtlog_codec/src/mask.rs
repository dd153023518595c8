//! Accumulating error-condition bitmasks.

/// Defines a bitmask type for independently accumulating error conditions.
///
/// Several conditions may combine in a single mask; callers test individual
/// bits with `contains` and format the whole set with `Display`.
macro_rules! error_mask {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$flag_meta:meta])* $flag:ident = $bit:expr => $label:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name(u32);

        impl $name {
            $(
                $(#[$flag_meta])*
                pub const $flag: Self = Self($bit);
            )+

            /// The empty mask.
            #[must_use]
            pub const fn empty() -> Self {
                Self(0)
            }

            /// Returns true when no condition has been flagged.
            #[must_use]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// Returns true when every bit of `other` is set in `self`.
            #[must_use]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// Flags every bit of `other`.
            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            /// Returns the raw bit value.
            #[must_use]
            pub const fn bits(self) -> u32 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                if self.is_empty() {
                    return f.write_str("none");
                }
                let mut labels: Vec<&str> = Vec::new();
                $(
                    if self.contains(Self::$flag) {
                        labels.push($label);
                    }
                )+
                f.write_str(&labels.join(", "))
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }
    };
}

pub(crate) use error_mask;
