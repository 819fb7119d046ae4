use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
    EnvFilter, Layer,
};

/// Console filter used when `RUST_LOG` is not set.
const DEFAULT_CONSOLE_FILTER: &str =
    "warn,core_logic=info,arena_bot=info,arena_evm=info,arena_flow=info,duel_result=info";

/// Installs the global subscriber: an hourly-rotated file under `logs/`
/// named after `app`, plus a compact coloured console.
///
/// The returned guard flushes the file writer and must stay alive for the
/// whole process.
pub fn setup_logger(app: &str) -> Option<WorkerGuard> {
    std::fs::create_dir_all("logs").ok();

    let file_appender = tracing_appender::rolling::hourly("logs", app);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = tracing_subscriber::filter::Targets::new()
        .with_target("duel_result", Level::INFO)
        .with_target("core_logic", Level::DEBUG)
        .with_target("arena_bot", Level::DEBUG)
        .with_target("arena_evm", Level::DEBUG)
        .with_target("arena_flow", Level::DEBUG)
        .with_default(Level::WARN);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(file_filter);

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_CONSOLE_FILTER));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(console_filter);

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init();

    // A subscriber may already be set (tests, embedding); keep logging there.
    installed.ok().map(|_| guard)
}

// --- Formatters ---

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn event_message(event: &Event<'_>) -> String {
    let mut visitor = MessageVisitor {
        message: String::new(),
    };
    event.record(&mut visitor);
    visitor.message
}

fn highlight(msg: String) -> String {
    let green = Style::new().fg(Color::LightGreen).bold();
    let red = Style::new().fg(Color::LightRed).bold();

    let mut out = msg;
    for word in ["WON", "SUCCESS"] {
        if out.contains(word) {
            out = out.replace(word, &green.paint(word).to_string());
        }
    }
    if out.contains("FAILED") {
        out = out.replace("FAILED", &red.paint("FAILED").to_string());
    }
    out
}

pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let time = Local::now().format("%H:%M:%S");
        let time = Style::new().dimmed().paint(time.to_string());

        match *event.metadata().level() {
            Level::ERROR => write!(writer, "{} {} ", time, Color::Red.bold().paint("ERROR"))?,
            Level::WARN => write!(writer, "{} {} ", time, Color::Yellow.bold().paint("WARN"))?,
            _ => write!(writer, "{} ", time)?,
        }

        writeln!(writer, "{}", highlight(event_message(event)))
    }
}

pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let metadata = event.metadata();

        write!(
            writer,
            "{} [{}] {}: ",
            timestamp,
            metadata.level(),
            metadata.target()
        )?;
        writeln!(writer, "{}", event_message(event))
    }
}
