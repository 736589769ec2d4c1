//! Macros for building [`crate::error::SieveError`] values.

/// Creates a [`crate::error::SieveError`] from an error kind, a static description and an
/// optional detail.
///
/// The detail can be given as `detail = owned_string` to move a [`String`] in, or as any
/// [`ToString`] value which is rendered on the spot.
#[macro_export]
macro_rules! sieve_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::SieveError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, detail = $detail:expr) => {
        $crate::error::SieveError::from(($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::SieveError::from(($kind, $desc, $detail.to_string()))
    };
}

/// Returns early from the current function with a [`crate::error::SieveError`].
///
/// Accepts the same arguments as [`sieve_error!`].
#[macro_export]
macro_rules! bail {
    ($($arg:tt)+) => {
        return ::core::result::Result::Err($crate::sieve_error!($($arg)+))
    };
}
