/// Logging macro with explicit level selection.
///
/// Outside of tests it forwards to the [`tracing`] macros, so structured
/// fields and spans work as usual. During tests it prints to `stdout`,
/// preserving the level for context, which keeps coordinator traces visible
/// in `cargo test -- --nocapture` without installing a subscriber.
///
/// # Examples
/// ```
/// use auth_session::session_log;
/// # fn main() {
/// session_log!(info, "processing sign-up request #{}", 3);
/// session_log!(warn, "cooldown of {} ms started", 3000);
/// # }
/// ```
#[macro_export]
macro_rules! session_log {
    ($level:ident, $($arg:tt)*) => {
        #[cfg(not(test))]
        ::tracing::$level!($($arg)*);
        #[cfg(test)]
        println!("[{}] {}", stringify!($level), format_args!($($arg)*));
    };
}
