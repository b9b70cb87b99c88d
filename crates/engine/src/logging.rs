use crate::config::LoggingConfig;
use regex::Regex;
use std::io;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

#[derive(Clone, Default)]
struct Redactor {
    patterns: Vec<(Regex, String)>,
}

impl Redactor {
    fn from_config(config: &LoggingConfig) -> Self {
        let mut patterns = Vec::new();
        if config.redaction.enabled {
            for p in &config.redaction.patterns {
                match Regex::new(&p.regex) {
                    Ok(re) => patterns.push((re, p.placeholder.clone())),
                    Err(e) => eprintln!("warning: skipping redaction pattern {}: {}", p.name, e),
                }
            }
        }
        Self { patterns }
    }

    fn redact(&self, text: &str) -> String {
        let mut redacted = text.to_string();
        for (re, replacement) in &self.patterns {
            redacted = re.replace_all(&redacted, replacement.as_str()).into_owned();
        }
        redacted
    }
}

struct RedactingWriter<W> {
    inner: W,
    redactor: Redactor,
}

impl<W: io::Write> io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let redacted = self.redactor.redact(&String::from_utf8_lossy(buf));
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter {
    redactor: Redactor,
}

impl<'a> fmt::MakeWriter<'a> for RedactingMakeWriter {
    type Writer = RedactingWriter<io::Stderr>;

    fn make_writer(&self) -> Self::Writer {
        RedactingWriter {
            inner: io::stderr(),
            redactor: self.redactor.clone(),
        }
    }
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable; `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.levels.filter_directive()));

    let show_file = config.format.location.show_file;
    let show_line = config.format.location.show_line;
    let make_writer = RedactingMakeWriter {
        redactor: Redactor::from_config(config),
    };

    // Layer::boxed() unifies the two branch types
    let fmt_layer = if !config.format.show_time {
        fmt::layer()
            .with_writer(make_writer)
            .with_target(show_file)
            .with_file(show_file)
            .with_line_number(show_line)
            .without_time()
            .boxed()
    } else {
        fmt::layer()
            .with_writer(make_writer)
            .with_target(show_file)
            .with_file(show_file)
            .with_line_number(show_line)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
}
