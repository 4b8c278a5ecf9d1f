use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;

static GLOBAL: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Currently published configuration snapshot.
///
/// Panics if [`init_config`] has not run yet; startup always calls it
/// before anything else touches configuration.
pub fn get_config() -> Arc<StaticConfig> {
    match GLOBAL.get() {
        Some(slot) => slot.load_full(),
        None => panic!("configuration accessed before init_config()"),
    }
}

/// Non-panicking variant of [`get_config`].
pub fn try_get_config() -> Option<Arc<StaticConfig>> {
    GLOBAL.get().map(|slot| slot.load_full())
}

/// Load `path` (default `config.toml`) once and publish it.
///
/// A missing file yields built-in defaults. Repeated calls return the
/// snapshot published by the first one.
///
/// ```no_run
/// let cfg = cdnproxy::config::init_config(Some("proxy.toml"));
/// println!("{}:{}", cfg.server.host, cfg.server.port);
/// ```
pub fn init_config(path: Option<&str>) -> Arc<StaticConfig> {
    GLOBAL
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::load(path)))
        .load_full()
}
