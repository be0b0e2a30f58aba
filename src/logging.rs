use log::LevelFilter;
use std::path::Path;
use std::str::FromStr;

/// Install the global logger: `[timestamp LEVEL target] message` to stdout and,
/// optionally, appended to `file`.
///
/// `tracing` events from the gateway layer are forwarded through the `log` facade
/// and end up in the same sinks.
pub fn init_logging(
    level: &str,
    file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = LevelFilter::from_str(level)
        .map_err(|_| format!("Unknown log level: {}", level))?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {:<5} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        // connection-level chatter from the HTTP stack
        .level_for("hyper", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
        .chain(std::io::stdout());

    if let Some(path) = file {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply().map_err(|e| e.to_string())?;
    Ok(())
}
