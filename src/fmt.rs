//! Logging front-end: `defmt`, `log`, or nothing

cfg_if::cfg_if! {
    if #[cfg(feature = "defmt")] {
        pub(crate) use defmt::{debug, trace, warn};
    } else if #[cfg(feature = "log")] {
        pub(crate) use log::{debug, trace, warn};
    } else {
        pub(crate) use noop::{debug, trace, warn};
    }
}

#[cfg(not(any(feature = "defmt", feature = "log")))]
mod noop {
    macro_rules! noop_trace {
        ($($arg:tt)*) => {};
    }
    macro_rules! noop_debug {
        ($($arg:tt)*) => {};
    }
    macro_rules! noop_warn {
        ($($arg:tt)*) => {};
    }
    pub(crate) use {noop_debug as debug, noop_trace as trace, noop_warn as warn};
}
