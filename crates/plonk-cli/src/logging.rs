use nu_ansi_term::Color::{Blue, Magenta, Red, Yellow};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{
        self,
        format::{FmtSpan, Writer},
        FmtContext, FormatEvent, FormatFields,
    },
    registry::LookupSpan,
};

use crate::cli::Args;

fn color_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

pub struct CustomFormatter;

impl<S, N> FormatEvent<S, N> for CustomFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let label = |text: &str, color: nu_ansi_term::Color| {
            if color_enabled() {
                format!("{} ", color.paint(text))
            } else {
                format!("{text} ")
            }
        };

        match *event.metadata().level() {
            Level::TRACE => write!(writer, "{}", label("[TRACE]", Magenta)),
            Level::DEBUG => write!(writer, "{}", label("[DEBUG]", Blue)),
            Level::INFO => write!(writer, ""),
            Level::WARN => write!(writer, "{}", label("[WARN]", Yellow)),
            Level::ERROR => write!(writer, "{}", label("[ERROR]", Red)),
        }?;

        if let Some(message) = visitor.message {
            writeln!(writer, "{message}")
        } else {
            writeln!(writer)
        }
    }
}

/// Translates `PLONK_DEBUG` into an env-filter directive string.
///
/// Accepted forms: `1` or `debug` (debug everywhere), `trace`, and
/// `level:domain1,domain2` which enables `level` for the named plonk
/// domains only (`managers`, `core`, `operations`, `config`, `utils`).
const DOMAINS: &[&str] = &[
    "plonk_cli",
    "plonk_config",
    "plonk_core",
    "plonk_managers",
    "plonk_operations",
    "plonk_utils",
];

fn all_domains(level: &str) -> String {
    DOMAINS
        .iter()
        .map(|domain| format!("{domain}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn plonk_debug_filter(value: &str) -> Option<String> {
    let value = value.trim();
    match value {
        "" | "0" => None,
        "1" | "debug" => Some(all_domains("debug")),
        "trace" => Some(all_domains("trace")),
        other => {
            let (level, domains) = other.split_once(':')?;
            let directives: Vec<String> = domains
                .split(',')
                .map(str::trim)
                .filter(|domain| !domain.is_empty())
                .map(|domain| format!("plonk_{domain}={level}"))
                .collect();
            if directives.is_empty() {
                None
            } else {
                Some(directives.join(","))
            }
        }
    }
}

pub fn setup_logging(args: &Args) {
    let filter = if let Ok(value) = std::env::var("PLONK_DEBUG") {
        plonk_debug_filter(&value)
    } else {
        None
    };
    let filter = filter.unwrap_or_else(|| {
        let level = if args.quiet {
            Level::ERROR
        } else if args.verbose >= 2 {
            Level::TRACE
        } else if args.verbose == 1 {
            Level::DEBUG
        } else {
            Level::INFO
        };
        all_domains(&level.to_string().to_lowercase())
    });

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .with_ansi(color_enabled())
        .compact()
        .without_time()
        .event_format(CustomFormatter)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("failed to set tracing subscriber");
}
