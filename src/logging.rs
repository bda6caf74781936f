// In: src/logging.rs

//! Opt-in diagnostic logging for embedders that have no logger of their own.
//! Library code only ever talks to the `log` facade; this initializer is a
//! convenience for hosts and tests.

use std::sync::Once;

use log::LevelFilter;

static INIT_LOGGER: Once = Once::new();

/// Installs an `env_logger` backend at `Info` level, once per process.
/// Subsequent calls are no-ops, as is calling it when the host already
/// installed a logger.
pub fn enable_verbose_logging() {
    INIT_LOGGER.call_once(|| {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(LevelFilter::Info);

        // Custom formatter: just print the level and message.
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            Ok(())
        });

        let _ = builder.try_init();
    });
}
