//! Leveled logging macros over the process-wide facade
//!
//! Each argument only needs `Display`; arguments are joined with a single
//! space. The recorded location is the macro's call site.

/// Emit a record at an explicit level with a prefix.
///
/// ```no_run
/// stagelog_engine::log!(stagelog_engine::Severity::Warn, "[db]", "slow query", 120);
/// ```
#[macro_export]
macro_rules! log {
    ($level:expr, $prefix:expr $(, $arg:expr)* $(,)?) => {
        $crate::log($level, $prefix, &[$(&$arg as &dyn ::std::fmt::Display),*])
    };
}

/// Emit at ALL.
#[macro_export]
macro_rules! all {
    ($($arg:expr),* $(,)?) => {
        $crate::all(&[$(&$arg as &dyn ::std::fmt::Display),*])
    };
}

/// Emit at DEBUG.
#[macro_export]
macro_rules! debug {
    ($($arg:expr),* $(,)?) => {
        $crate::debug(&[$(&$arg as &dyn ::std::fmt::Display),*])
    };
}

/// Emit at INFO.
#[macro_export]
macro_rules! info {
    ($($arg:expr),* $(,)?) => {
        $crate::info(&[$(&$arg as &dyn ::std::fmt::Display),*])
    };
}

/// Emit at WARN.
#[macro_export]
macro_rules! warn {
    ($($arg:expr),* $(,)?) => {
        $crate::warn(&[$(&$arg as &dyn ::std::fmt::Display),*])
    };
}

/// Emit at ERROR.
#[macro_export]
macro_rules! error {
    ($($arg:expr),* $(,)?) => {
        $crate::error(&[$(&$arg as &dyn ::std::fmt::Display),*])
    };
}

/// Emit at FATAL.
#[macro_export]
macro_rules! fatal {
    ($($arg:expr),* $(,)?) => {
        $crate::fatal(&[$(&$arg as &dyn ::std::fmt::Display),*])
    };
}
