use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::{
    fmt::format::{Format, Writer},
    EnvFilter,
};

/// Environment variable holding extra filter directives, e.g. `bulkid=debug`.
pub const LOG_ENV_VAR: &str = "BULKID_LOG";

struct StatementTimer;

impl tracing_subscriber::fmt::time::FormatTime for StatementTimer {
    fn format_time(&self, writer: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Local::now();
        write!(writer, "{}", now.format("%d %B - %H:%M:%S%.3f"))
    }
}

pub fn setup_logger(log_level: LevelFilter) {
    let filter = EnvFilter::from_env(LOG_ENV_VAR).add_directive(log_level.into());

    // statement logs are only useful with the module they came from
    let show_target = log_level >= LevelFilter::DEBUG;
    let format =
        Format::default().with_timer(StatementTimer).with_level(true).with_target(show_target);

    let subscriber =
        tracing_subscriber::fmt().with_env_filter(filter).event_format(format).finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        debug!("Logger has already been set up, continuing...");
    }
}

pub fn setup_info_logger() {
    setup_logger(LevelFilter::INFO);
}
