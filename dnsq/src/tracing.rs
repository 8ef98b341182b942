use std::io::{self, Stderr};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::FmtSubscriber;

#[allow(clippy::type_complexity)]
pub fn console_subscriber(
    level: tracing::Level,
) -> Result<FmtSubscriber<DefaultFields, Format, LevelFilter, fn() -> Stderr>, io::Error> {
    Ok(FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr as fn() -> Stderr)
        .finish())
}
