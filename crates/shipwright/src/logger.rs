//! Logging setup for hosts that do not install their own subscriber.
//!
//! Everything shipwright reports (composition, engine creation, build
//! outcomes, attach/detach, shutdown) goes through `tracing`. Hosts that
//! already run a subscriber get these events for free; the helpers here are
//! for hosts that don't.
//!
//! ```rust,no_run
//! use shipwright::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("host booting");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "shipwright=debug,shipwright_config=debug";
const QUIET_FILTER: &str = "shipwright=error,shipwright_config=error";
const DEFAULT_FILTER: &str = "shipwright=info,shipwright_config=info";

/// Install a compact `fmt` subscriber.
///
/// Colors are used unless `no_color` is set or [`should_use_colors`] says
/// the terminal can't show them.
///
/// Level selection, first match wins:
/// 1. `verbose`: DEBUG for shipwright crates
/// 2. `quiet`: ERROR only
/// 3. `RUST_LOG`
/// 4. INFO for shipwright crates
///
/// Returns `false` when a global subscriber was already installed, in which
/// case the existing one keeps receiving events.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) -> bool {
    init_logger_with_filter(filter_for(verbose, quiet), no_color)
}

/// Install a subscriber with a caller-provided filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) -> bool {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
}

fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Whether log output should be colored.
///
/// Honors `NO_COLOR` and `FORCE_COLOR`, then asks the terminal.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stdout().features().colors_supported()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn filters_parse() {
        let _ = EnvFilter::new(VERBOSE_FILTER);
        let _ = EnvFilter::new(QUIET_FILTER);
        let _ = EnvFilter::new(DEFAULT_FILTER);
    }

    #[test]
    fn verbose_wins_over_quiet() {
        let filter = filter_for(true, true);
        assert!(filter.to_string().contains("shipwright=debug"));
    }

    #[test]
    #[serial]
    fn no_color_beats_force_color() {
        // SAFETY: serialized with every other env-mutating test.
        unsafe {
            std::env::set_var("NO_COLOR", "1");
            std::env::set_var("FORCE_COLOR", "1");
        }
        assert!(!should_use_colors());

        unsafe {
            std::env::remove_var("NO_COLOR");
        }
        assert!(should_use_colors());

        unsafe {
            std::env::remove_var("FORCE_COLOR");
        }
    }

    #[test]
    #[serial]
    fn no_color_env_disables_ansi_for_default_install() {
        // SAFETY: serialized with every other env-mutating test.
        unsafe {
            std::env::set_var("NO_COLOR", "1");
        }
        assert!(!should_use_colors());
        let _ = init_logger(false, true, false);
        unsafe {
            std::env::remove_var("NO_COLOR");
        }
    }

    #[test]
    #[serial]
    fn second_install_reports_existing_subscriber() {
        let first = init_logger(false, true, true);
        let second = init_logger(false, true, true);
        assert!(!(first && second));
        assert!(!second);
    }
}
