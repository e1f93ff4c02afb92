//! Command-line parsing into a [`Config`].
//!
//! Grounded on the teacher's own `Configuration::from_args` (`communication/src/initialize.rs`),
//! kept on `getopts`, but returning `Result<Config, ConfigError>` instead of panicking on a bad
//! argument, since this crate already has `ConfigError` for exactly this seam.

use stencil_comm::ConfigError;

/// Fully parsed run parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Inner grid side length `N`.
    pub n: usize,
    /// Number of iterations to run.
    pub time_steps: usize,
    /// Whether to write result dumps.
    pub output_enabled: bool,
    /// Number of worker threads to spawn (`P`).
    pub workers: usize,
    /// Temporal-blocking window `T` (`1` selects the non-time-skewed design).
    pub window: usize,
}

impl Default for Config {
    fn default() -> Self {
        // "for nice plot: N = 40, timeSteps = 400" (original source's documented default).
        Config { n: 40, time_steps: 400, output_enabled: false, workers: 1, window: 1 }
    }
}

/// Parses `args` (typically `std::env::args().skip(1)`) into a [`Config`].
pub fn parse(args: impl Iterator<Item = String>) -> Result<Config, ConfigError> {
    let args: Vec<String> = args.collect();

    let mut opts = getopts::Options::new();
    opts.optopt("n", "", "inner grid side length", "N");
    opts.optopt("t", "", "number of iterations", "STEPS");
    opts.optflag("o", "", "enable result dumps");
    opts.optopt("w", "", "number of worker threads", "WORKERS");
    opts.optopt("s", "", "temporal-blocking window", "WINDOW");

    let matches = opts.parse(&args).map_err(|e| ConfigError::InvalidArguments(e.to_string()))?;

    let mut config = Config::default();
    if let Some(raw) = matches.opt_str("n") {
        config.n = raw.parse().map_err(|_| ConfigError::InvalidArguments(format!("-n: {raw:?} is not a valid integer")))?;
    }
    if let Some(raw) = matches.opt_str("t") {
        config.time_steps = raw
            .parse()
            .map_err(|_| ConfigError::InvalidArguments(format!("-t: {raw:?} is not a valid integer")))?;
    }
    if let Some(raw) = matches.opt_str("w") {
        config.workers = raw
            .parse()
            .map_err(|_| ConfigError::InvalidArguments(format!("-w: {raw:?} is not a valid integer")))?;
    }
    if let Some(raw) = matches.opt_str("s") {
        config.window = raw
            .parse()
            .map_err(|_| ConfigError::InvalidArguments(format!("-s: {raw:?} is not a valid integer")))?;
    }
    config.output_enabled = matches.opt_present("o");

    if config.workers == 0 {
        return Err(ConfigError::InvalidArguments("-w must be at least 1".to_owned()));
    }
    if config.window == 0 {
        return Err(ConfigError::InvalidArguments("-s must be at least 1".to_owned()));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> impl Iterator<Item = String> {
        raw.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn defaults_match_the_documented_nice_plot_settings() {
        let config = parse(args(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.n, 40);
        assert_eq!(config.time_steps, 400);
        assert!(!config.output_enabled);
        assert_eq!(config.workers, 1);
        assert_eq!(config.window, 1);
    }

    #[test]
    fn overrides_every_flag() {
        let config = parse(args(&["-n", "8", "-t", "10", "-o", "-w", "4", "-s", "2"])).unwrap();
        assert_eq!(
            config,
            Config { n: 8, time_steps: 10, output_enabled: true, workers: 4, window: 2 }
        );
    }

    #[test]
    fn rejects_a_non_numeric_value() {
        assert!(parse(args(&["-n", "not-a-number"])).is_err());
    }

    #[test]
    fn rejects_zero_workers() {
        assert!(parse(args(&["-w", "0"])).is_err());
    }
}
