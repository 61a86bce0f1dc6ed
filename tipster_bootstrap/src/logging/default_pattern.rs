//! Defines a `"default"` [`PatternEncoder`] so the config doesn't have to
//! repeat the pattern.

use log4rs::config::{Deserialize, Deserializers};
use log4rs::encode::Encode;
use log4rs::encode::pattern::PatternEncoder;

const fn default_true() -> bool {
    true
}

#[derive(Debug, serde::Deserialize)]
pub struct DefaultPatternConfig {
    #[serde(default = "default_true")]
    time: bool,
    #[serde(default = "default_true")]
    target: bool,
}

pub struct DefaultPatternDeserializer;

impl DefaultPatternConfig {
    fn pattern(&self) -> &'static str {
        match (self.time, self.target) {
            (true, true) => "[{d(%Y-%m-%d %H:%M:%S)(utc)} {h({l:<5})} {t}] {m}{n}",
            (true, false) => "[{d(%Y-%m-%d %H:%M:%S)(utc)} {h({l:<5})}] {m}{n}",
            (false, true) => "[{h({l:<5})} {t}] {m}{n}",
            (false, false) => "[{h({l:<5})}] {m}{n}",
        }
    }
}

impl Deserialize for DefaultPatternDeserializer {
    type Trait = dyn Encode;
    type Config = DefaultPatternConfig;

    fn deserialize(
        &self,
        config: Self::Config,
        _deserializers: &Deserializers,
    ) -> anyhow::Result<Box<Self::Trait>> {
        Ok(Box::new(PatternEncoder::new(config.pattern())))
    }
}
