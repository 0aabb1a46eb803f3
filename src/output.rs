//! Output formatting for search results

use crate::store::{Matcher, Record};
use serde_json::Value;
use std::io::{self, Write};
use std::sync::Arc;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Print record names, one per line, with the matched span highlighted
pub fn print_records(
    records: &[Arc<Record>],
    matcher: Matcher,
    term: &str,
    color: bool,
    with_fields: bool,
) -> io::Result<()> {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);
    write_records(&mut stdout, records, matcher, term, with_fields)
}

/// Write records to any color-capable writer
pub fn write_records<W: WriteColor>(
    out: &mut W,
    records: &[Arc<Record>],
    matcher: Matcher,
    term: &str,
    with_fields: bool,
) -> io::Result<()> {
    for record in records {
        write_name(out, &record.name, matcher.match_range(&record.name, term))?;

        if with_fields && !record.fields.is_empty() {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            for (key, value) in &record.fields {
                write!(out, "\t{}=", key)?;
                match value {
                    Value::String(s) => write!(out, "{}", s)?,
                    other => write!(out, "{}", other)?,
                }
            }
            out.reset()?;
        }

        writeln!(out)?;
    }

    Ok(())
}

/// Write a name with `span` highlighted
fn write_name<W: WriteColor>(
    out: &mut W,
    name: &str,
    span: Option<std::ops::Range<usize>>,
) -> io::Result<()> {
    let Some(span) = span else {
        return write!(out, "{}", name);
    };

    // Text before match
    write!(out, "{}", &name[..span.start])?;

    // The match itself (highlighted)
    out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
    write!(out, "{}", &name[span.clone()])?;
    out.reset()?;

    // Text after match
    write!(out, "{}", &name[span.end..])
}

/// Print records as JSON lines (name plus payload fields)
pub fn print_json_lines(records: &[Arc<Record>]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_json_lines(&mut out, records)
}

pub fn write_json_lines<W: Write>(out: &mut W, records: &[Arc<Record>]) -> io::Result<()> {
    for record in records {
        serde_json::to_writer(&mut *out, record.as_ref())?;
        writeln!(out)?;
    }
    Ok(())
}
