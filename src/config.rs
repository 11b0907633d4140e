//! Logging setup

use tracing::log::LevelFilter;

/// Dependencies that log every connection or session write at info level.
const CHATTY_MODULES: &[&str] = &[
    "h2",
    "hyper_util",
    "moka",
    "reqwest",
    "rustls",
    "tower_sessions",
    "tower_sessions_core",
];

/// Per-module levels on top of the info default. ImageVerse and its request
/// traces log at info, or debug with `debug`.
fn module_levels(debug: bool) -> Vec<(&'static str, LevelFilter)> {
    let (own_level, dependency_level) = if debug {
        (LevelFilter::Debug, LevelFilter::Info)
    } else {
        (LevelFilter::Info, LevelFilter::Warn)
    };
    let mut levels = vec![
        (env!("CARGO_CRATE_NAME"), own_level),
        ("tower_http", own_level),
    ];
    levels.extend(
        CHATTY_MODULES
            .iter()
            .map(|module| (*module, dependency_level)),
    );
    levels
}

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let mut logger = simple_logger::SimpleLogger::new().with_level(LevelFilter::Info);
    for (module, level) in module_levels(debug) {
        logger = logger.with_module_level(module, level);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level_of(levels: &[(&str, LevelFilter)], module: &str) -> Option<LevelFilter> {
        levels
            .iter()
            .find(|(name, _)| *name == module)
            .map(|(_, level)| *level)
    }

    #[test]
    fn debug_raises_own_logs_only() {
        let quiet = module_levels(false);
        assert_eq!(level_of(&quiet, "imageverse"), Some(LevelFilter::Info));
        assert_eq!(level_of(&quiet, "tower_http"), Some(LevelFilter::Info));
        assert_eq!(level_of(&quiet, "reqwest"), Some(LevelFilter::Warn));
        assert_eq!(level_of(&quiet, "moka"), Some(LevelFilter::Warn));

        let loud = module_levels(true);
        assert_eq!(level_of(&loud, "imageverse"), Some(LevelFilter::Debug));
        assert_eq!(level_of(&loud, "tower_http"), Some(LevelFilter::Debug));
        assert_eq!(level_of(&loud, "tower_sessions"), Some(LevelFilter::Info));
    }
}
