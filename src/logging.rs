/// ==============================================================================================
/// ======================================= Ambient Logging =======================================
/// ==============================================================================================
//
// The engine itself only emits `log` facade calls (`debug!`/`info!`/`warn!`); callers choose the
// backend. `init()` wires up the backend we ship with for the demo binaries and test runs.

use std::sync::Once;

static LOGGER_INIT: Once = Once::new();

/// Install the default logger exactly once. Safe to call from multiple demo binaries or test
/// modules; later calls are no-ops.
pub fn init() {
    LOGGER_INIT.call_once(|| {
        logger_bro::init();
    });
}
