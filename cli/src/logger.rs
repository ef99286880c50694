use std::io::Write;
use std::sync::OnceLock;

/// Set up log levels, formatting, and other configurations for the logger
pub struct Logger;

static LOGGER: OnceLock<Logger> = OnceLock::new();

impl<'a> Logger {
    pub fn init() -> &'a Self {
        LOGGER.get_or_init(|| {
            let logger = env_logger::Builder::from_env(
                // Step logs are the primary output, override with e.g. "export RUST_LOG=debug"
                env_logger::Env::default().default_filter_or("info"),
            )
            // Workflow commands go to stdout, logs must interleave with them
            .target(env_logger::Target::Stdout)
            .format(|buf, record| match record.level() {
                log::Level::Info => writeln!(buf, "{}", record.args()),
                level => writeln!(buf, "{level}: {}", record.args()),
            })
            .build();

            let level = logger.filter();

            if let Err(e) = log::set_boxed_logger(Box::new(logger)) {
                eprintln!("Logger is already set: {e}");
            }

            log::set_max_level(level);
            Self
        })
    }
}
