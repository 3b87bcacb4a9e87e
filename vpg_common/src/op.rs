/// Arithmetic impls for single-field decimal newtypes such as [`crate::Amount`].
///
/// * `binary` implements `T op T`.
/// * `scalar` implements `T op <integer>`, converting the integer to a `Decimal` first.
///
/// Like the `Decimal` operators underneath, these panic on overflow. Anything sized by user input should go through
/// the checked methods on the newtype instead.
#[macro_export]
macro_rules! op {
    (binary $newtype:ident, $op_trait:ident, $op_fn:ident) => {
        impl ::std::ops::$op_trait for $newtype {
            type Output = Self;

            fn $op_fn(self, rhs: Self) -> Self {
                $newtype(::std::ops::$op_trait::$op_fn(self.0, rhs.0))
            }
        }
    };

    (scalar $newtype:ident, $op_trait:ident, $op_fn:ident, $int:ty) => {
        impl ::std::ops::$op_trait<$int> for $newtype {
            type Output = Self;

            fn $op_fn(self, rhs: $int) -> Self {
                $newtype(::std::ops::$op_trait::$op_fn(self.0, ::rust_decimal::Decimal::from(rhs)))
            }
        }
    };
}
