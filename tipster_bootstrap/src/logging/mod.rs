use log4rs::config::Deserializers;

mod default_appender;
mod default_pattern;

// stack buffer size used by the console appender.
// 1 KiB fits nearly every log line this tool writes.
const WRITE_BUF_SIZE: usize = 0x400;

/// The log4rs deserializers, including this crate's `"default"` kinds.
pub fn deserializers() -> Deserializers {
    let mut d = Deserializers::new();
    d.insert("default", default_appender::DefaultAppenderDeserializer);
    d.insert("default", default_pattern::DefaultPatternDeserializer);
    d
}
