/// Define a transparent set of bit flags with named members.
///
/// The generated type supports `|` to combine sets, `&` to test if two sets
/// intersect, and a `Debug` output listing the names of the members set.
macro_rules! raw_set {
    (
        $(#[doc = $doc:literal])*
        #[repr($repr:ty)]
        $vis:vis enum $name:ident {
            $(
                $(#[$($variant_meta:meta)*])*
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        $vis struct $name($repr);

        impl $name {
            /// The empty set.
            $vis const NONE: Self = Self(0);

            $(
                $(#[$($variant_meta)*])*
                $vis const $variant: Self = Self($value);
            )*

            /// Construct a set from its raw representation.
            #[inline]
            $vis const fn from_bits(bits: $repr) -> Self {
                Self(bits)
            }

            /// Access the raw representation of the set.
            #[inline]
            $vis const fn bits(self) -> $repr {
                self.0
            }

            /// Test if every member of `other` is set in `self`.
            #[inline]
            $vis const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                let mut set = f.debug_set();
                let mut unknown = self.0;

                $(
                    if self.contains(Self::$variant) {
                        set.entry(&::core::format_args!("{}", stringify!($variant)));
                        unknown &= !Self::$variant.0;
                    }
                )*

                if unknown != 0 {
                    set.entry(&::core::format_args!("{unknown:#x}"));
                }

                set.finish()
            }
        }

        impl ::core::ops::BitOr for $name {
            type Output = Self;

            #[inline]
            fn bitor(self, rhs: Self) -> Self::Output {
                Self(self.0 | rhs.0)
            }
        }

        impl ::core::ops::BitAnd for $name {
            type Output = bool;

            #[inline]
            fn bitand(self, rhs: Self) -> Self::Output {
                self.0 & rhs.0 != 0
            }
        }
    };
}
