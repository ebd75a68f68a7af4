macro_rules! impl_from_into_u64 {
    ($main: ident) => {
        impl From<u64> for $main {
            fn from(n: u64) -> $main {
                $main(n)
            }
        }

        impl From<$main> for u64 {
            fn from(from: $main) -> u64 {
                from.0
            }
        }

        impl $main {
            pub const fn as_u64(&self) -> u64 {
                self.0
            }

            pub const fn as_usize(&self) -> usize {
                self.0 as usize
            }
        }
    };
}

// Same-type math. Saturating, never wrapping.
macro_rules! impl_math {
    ($main: ident) => {
        impl std::ops::Add<$main> for $main {
            type Output = $main;

            fn add(self, other: $main) -> $main {
                $main(self.0.saturating_add(other.0))
            }
        }

        impl std::ops::AddAssign<$main> for $main {
            fn add_assign(&mut self, other: $main) {
                self.0 = self.0.saturating_add(other.0);
            }
        }

        impl std::ops::Sub<$main> for $main {
            type Output = $main;

            fn sub(self, other: $main) -> $main {
                $main(self.0.saturating_sub(other.0))
            }
        }

        impl std::ops::SubAssign<$main> for $main {
            fn sub_assign(&mut self, other: $main) {
                self.0 = self.0.saturating_sub(other.0);
            }
        }
    };
}

// Math and comparison against the raw integer type.
macro_rules! impl_math_between {
    ($main: ident, $other: ident) => {
        impl PartialEq<$other> for $main {
            fn eq(&self, other: &$other) -> bool {
                self.0 == *other
            }
        }

        impl PartialOrd<$other> for $main {
            fn partial_cmp(&self, other: &$other) -> Option<std::cmp::Ordering> {
                self.0.partial_cmp(other)
            }
        }

        impl std::ops::Add<$other> for $main {
            type Output = $main;

            fn add(self, other: $other) -> $main {
                $main(self.0.saturating_add(other))
            }
        }

        impl std::ops::AddAssign<$other> for $main {
            fn add_assign(&mut self, other: $other) {
                self.0 = self.0.saturating_add(other);
            }
        }

        impl std::ops::Sub<$other> for $main {
            type Output = $main;

            fn sub(self, other: $other) -> $main {
                $main(self.0.saturating_sub(other))
            }
        }

        impl std::ops::SubAssign<$other> for $main {
            fn sub_assign(&mut self, other: $other) {
                self.0 = self.0.saturating_sub(other);
            }
        }

        impl std::ops::Rem<$other> for $main {
            type Output = $main;

            fn rem(self, modulus: $other) -> $main {
                $main(self.0 % modulus)
            }
        }
    };
}

macro_rules! impl_display {
    ($main: ident) => {
        impl std::fmt::Display for $main {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::fmt::Debug for $main {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($main), self.0)
            }
        }
    };
}

macro_rules! impl_common {
    ($main: ident) => {
        impl_from_into_u64!($main);
        impl_math!($main);
        impl_math_between!($main, u64);
        impl_display!($main);
    };
}
