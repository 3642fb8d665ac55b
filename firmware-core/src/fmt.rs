#![macro_use]

// One dispatch point for both logging backends: firmware images enable the
// `defmt` feature, host builds enable `log`. With neither enabled the
// statement compiles out, and the argument tuple keeps the call sites
// warning free.
macro_rules! log_dispatch {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::$level!($s $(, $x)*);

        #[cfg(all(feature = "log", not(feature = "defmt")))]
        ::log::$level!($s $(, $x)*);

        #[cfg(not(any(feature = "defmt", feature = "log")))]
        let _ = ($(&$x,)*);
    }};
}

macro_rules! log_debug {
    ($($arg:tt)*) => {
        log_dispatch!(debug, $($arg)*)
    };
}

macro_rules! log_info {
    ($($arg:tt)*) => {
        log_dispatch!(info, $($arg)*)
    };
}

macro_rules! log_warn {
    ($($arg:tt)*) => {
        log_dispatch!(warn, $($arg)*)
    };
}

macro_rules! log_error {
    ($($arg:tt)*) => {
        log_dispatch!(error, $($arg)*)
    };
}

macro_rules! log_unreachable {
    () => {{
        log_dispatch!(error, "entered unreachable code");
        ::core::unreachable!()
    }};
}
