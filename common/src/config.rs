use serde::de::DeserializeOwned;

pub use ::config::ConfigError;

/// Parses the config from an optional file and `RARE_`-prefixed environment
/// variables. Nested keys use `__` as the separator, e.g.
/// `RARE_MEDIA_SERVER__API_KEY`.
pub fn parse<C: DeserializeOwned>(config_file: &str) -> Result<C, ConfigError> {
    let mut builder = ::config::Config::builder();

    if !config_file.is_empty() {
        builder = builder.add_source(::config::File::with_name(config_file).required(false));
    }

    builder
        .add_source(::config::Environment::with_prefix("RARE").separator("__"))
        .build()?
        .try_deserialize()
}
