// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Debug diagnostics for the delivery pipeline.
//!
//! Every diagnostic the pipeline emits is advisory: it is a `tracing` DEBUG
//! event, prefixed with `R7INSIGHT | `, and it is only emitted when the
//! instance was configured with `debug = true`. Whether anything is printed is
//! then up to the subscriber the host application installed.
//!
//! Applications without a subscriber of their own can install one with
//! [`init`], which uses [`Formatter`]:
//!
//! ```text
//! R7INSIGHT | DEBUG | R7INSIGHT | Write complete
//! R7INSIGHT | WARN | worker{attempt=3}: reconnecting endpoint=eu.data.logs.insight.rapid7.com:443
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! r7insight_core::diagnostics::init("debug")?;
//! ```

use std::fmt;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Emits a pipeline diagnostic when `$enabled` is true.
macro_rules! diag {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            tracing::debug!("R7INSIGHT | {}", format_args!($($arg)+));
        }
    };
}
pub(crate) use diag;

/// Log formatter prefixing every line with `R7INSIGHT`.
///
/// Output structure: prefix, level, the active spans from root to leaf with
/// their fields, then the message and event fields.
#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(&mut writer, "R7INSIGHT | {} | ", metadata.level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Installs a global `fmt` subscriber using [`Formatter`].
///
/// `level` is an `EnvFilter` directive such as `debug` or `r7insight_core=trace`.
/// TLS library noise is always filtered out. Fails if the directive is invalid
/// or a global subscriber is already installed.
pub fn init(level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = env_filter(level)?;

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .event_format(Formatter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn env_filter(level: &str) -> Result<EnvFilter, ParseError> {
    EnvFilter::try_new(format!("rustls=off,{level}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture<F: FnOnce()>(f: F) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt::Subscriber::builder()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .event_format(Formatter)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        captured.contents()
    }

    #[test]
    fn test_formatter_prefixes_level() {
        let output = capture(|| tracing::info!(port = 80, "connected"));
        assert_eq!(output, "R7INSIGHT | INFO | connected port=80\n");
    }

    #[test]
    fn test_formatter_includes_span_fields() {
        let output = capture(|| {
            let span = tracing::info_span!("worker", attempt = 3);
            span.in_scope(|| tracing::warn!("reconnecting"));
        });
        assert_eq!(output, "R7INSIGHT | WARN | worker{attempt=3}: reconnecting\n");
    }

    #[test]
    fn test_env_filter_silences_rustls() {
        let filter = env_filter("debug").unwrap().to_string();
        assert!(filter.contains("rustls=off"), "{filter}");
        assert!(filter.contains("debug"), "{filter}");

        assert!(env_filter("r7insight_core=trace").is_ok());
    }

    #[test]
    fn test_init_rejects_invalid_directive() {
        // fails while parsing, before any subscriber is installed
        assert!(init("r7insight_core=loud").is_err());
    }

    #[test]
    fn test_diag_respects_flag() {
        let output = capture(|| {
            diag!(false, "hidden {}", 1);
            diag!(true, "shown {}", 2);
        });
        assert!(!output.contains("hidden"));
        assert!(output.contains("R7INSIGHT | DEBUG | R7INSIGHT | shown 2"));
    }
}
