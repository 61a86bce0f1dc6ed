//! A console appender that buffers each record and can target stdout or
//! stderr.
//!
//! Available as `"default"` in the configuration:
//!
//! ```toml
//! [log.log4rs.appenders.console]
//! kind = "default"
//! target = "stdout" # or "stderr"
//! color = true      # default: whether the target is a terminal
//! encoder = { kind = "default" }
//! ```

use std::io::{self, IsTerminal as _, Write as _};

use arrayvec::ArrayVec;
use log::Record;
use log4rs::append::Append;
use log4rs::config::{Deserialize, Deserializers};
use log4rs::encode::{self, Color, Encode, EncoderConfig, Style};

use super::WRITE_BUF_SIZE;

#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
enum Target {
    #[default]
    Stdout,
    Stderr,
}

impl Target {
    fn is_terminal(self) -> bool {
        match self {
            Self::Stdout => io::stdout().is_terminal(),
            Self::Stderr => io::stderr().is_terminal(),
        }
    }

    fn write_all(self, buf: &[u8]) -> io::Result<()> {
        match self {
            Self::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(buf)?;
                out.flush()
            },
            Self::Stderr => {
                let mut out = io::stderr().lock();
                out.write_all(buf)?;
                out.flush()
            },
        }
    }
}

#[derive(Debug)]
pub struct DefaultAppender {
    encoder: Box<dyn Encode>,
    target: Target,
    color: bool,
}

impl Append for DefaultAppender {
    fn append(&self, record: &Record<'_>) -> anyhow::Result<()> {
        let mut writer = ConsoleWriter {
            target: self.target,
            color: self.color,
            buf: ArrayVec::new_const(),
        };
        self.encoder.encode(&mut writer, record)?;
        Ok(writer.flush()?)
    }

    fn flush(&self) {
        _ = self.target.write_all(&[]);
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct DefaultAppenderConfig {
    #[serde(default)]
    target: Target,
    color: Option<bool>,
    encoder: EncoderConfig,
}

pub struct DefaultAppenderDeserializer;

impl Deserialize for DefaultAppenderDeserializer {
    type Trait = dyn Append;
    type Config = DefaultAppenderConfig;

    fn deserialize(
        &self,
        config: Self::Config,
        deserializers: &Deserializers,
    ) -> anyhow::Result<Box<Self::Trait>> {
        let encoder = deserializers.deserialize(&config.encoder.kind, config.encoder.config)?;
        let color = config.color.unwrap_or_else(|| config.target.is_terminal());

        Ok(Box::new(DefaultAppender {
            encoder,
            target: config.target,
            color,
        }))
    }
}

/// Stack-buffered writer. Writes that don't fit flush the buffer first.
#[derive(Debug)]
struct ConsoleWriter {
    target: Target,
    color: bool,
    buf: ArrayVec<u8, WRITE_BUF_SIZE>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_all(buf)?;
        Ok(buf.len())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.buf.remaining_capacity() < buf.len() {
            self.flush()?;
        }

        if buf.len() > self.buf.capacity() {
            self.target.write_all(buf)
        } else {
            self.buf.write_all(buf)
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.target.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }
}

const fn ansi_color(color: Color) -> u8 {
    match color {
        Color::Black => 0,
        Color::Red => 1,
        Color::Green => 2,
        Color::Yellow => 3,
        Color::Blue => 4,
        Color::Magenta => 5,
        Color::Cyan => 6,
        Color::White => 7,
    }
}

impl encode::Write for ConsoleWriter {
    fn set_style(&mut self, style: &Style) -> io::Result<()> {
        if !self.color {
            return Ok(());
        }

        self.write_all(b"\x1b[0m")?;

        if let Some(text) = style.text {
            write!(self, "\x1b[3{}m", ansi_color(text))?;
        }

        if let Some(background) = style.background {
            write!(self, "\x1b[4{}m", ansi_color(background))?;
        }

        if style.intense == Some(true) {
            self.write_all(b"\x1b[1m")?;
        }

        Ok(())
    }
}
