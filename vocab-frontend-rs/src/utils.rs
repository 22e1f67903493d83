use chrono::{DateTime, SubsecRound as _, Utc};
use rand::Rng;

pub fn set_panic_hook() {
    // When the `console_error_panic_hook` feature is enabled, we can call the
    // `set_panic_hook` function at least once during initialization, and then
    // we will get better error messages if our code ever panics.
    //
    // For more details see
    // https://github.com/rustwasm/console_error_panic_hook#readme
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// A random (v4) UUID drawn from the app's generator.
pub(crate) fn new_id(rng: &mut impl Rng) -> String {
    uuid::Builder::from_random_bytes(rng.random())
        .into_uuid()
        .to_string()
}

/// Current time at the millisecond precision records are stored with.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Base URL of the app's own backend, which hosts the phonetics aggregator.
pub(crate) fn backend_url() -> &'static str {
    if cfg!(feature = "local-backend") {
        "http://localhost:3000"
    } else {
        ""
    }
}
