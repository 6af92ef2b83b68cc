/// Generate the single-value getters on `SqlBuilder`.
///
/// Each getter executes the statement as a query, reads `column` of the first
/// row through the [`CursorExt`](crate::row::CursorExt) method of the same name,
/// and returns `default` when there is no row.
///
/// Usage:
/// ```ignore
/// impl_typed_getters! {
///     /// Docs for the getter.
///     get_int -> i32;
/// }
/// ```
macro_rules! impl_typed_getters {
    ($($(#[$meta:meta])* $name:ident -> $ty:ty;)*) => {$(
        $(#[$meta])*
        pub fn $name<'c, C: $crate::client::Connection>(
            &mut self,
            conn: &C,
            column: impl Into<$crate::client::Column<'c>>,
            default: $ty,
        ) -> $crate::error::SqlResult<$ty> {
            let column = column.into();
            self.query_first(conn, default, |rs| $crate::row::CursorExt::$name(rs, column))
        }
    )*};
}
