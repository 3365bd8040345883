use nu_ansi_term::{Color, Style};
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::registry::LookupSpan;

/// One line per event: level, enclosing span, module, then the fields.
pub struct SimpeFormatter;

fn level_style(level: &Level) -> Style {
    match *level {
        Level::ERROR => Color::Red.bold(),
        Level::WARN => Color::Yellow.bold(),
        Level::INFO => Color::Green.normal(),
        Level::DEBUG => Color::Blue.normal(),
        Level::TRACE => Color::Purple.normal(),
    }
}

impl<S, N> FormatEvent<S, N> for SimpeFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        let span_name = ctx
            .current_span()
            .metadata()
            .map(|md| md.name())
            .unwrap_or_default();

        let module = metadata
            .module_path()
            .and_then(|path| path.rsplit("::").next())
            .unwrap_or_default();

        write!(
            &mut writer,
            "[{}]\t{} {}: ",
            level_style(metadata.level()).paint(metadata.level().as_str()),
            Color::Fixed(12).paint(span_name),
            Style::new().dimmed().paint(module),
        )?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}
