use std::fmt::Write as _;
use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use smlpipe_decode::obis::describe;
use smlpipe_decode::{MeasurementFilter, MeasurementRecord};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct RecordOutput<'a> {
    frame: usize,
    obis: String,
    code: String,
    description: Option<&'static str>,
    name: Option<&'a str>,
    value: f64,
    unit: &'static str,
    mantissa: i64,
    scale: i8,
}

impl<'a> RecordOutput<'a> {
    fn new(frame: usize, record: &MeasurementRecord, filter: &'a MeasurementFilter) -> Self {
        Self {
            frame,
            obis: record.code.to_string(),
            code: format!("{:#}", record.code),
            description: describe(&record.code),
            name: filter.name_of(&record.code),
            value: record.value(),
            unit: record.unit_symbol(),
            mantissa: record.mantissa,
            scale: record.scale,
        }
    }
}

/// Records of one frame in the requested format. JSON is one object per
/// line; the other formats end with a newline.
pub fn render_records(
    frame: usize,
    records: &[MeasurementRecord],
    filter: &MeasurementFilter,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Json => records
            .iter()
            .map(|record| {
                let out = RecordOutput::new(frame, record, filter);
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string()) + "\n"
            })
            .collect(),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FRAME", "OBIS", "DESCRIPTION", "VALUE", "UNIT", "NAME"]);
            for record in records {
                let out = RecordOutput::new(frame, record, filter);
                table.add_row(vec![
                    frame.to_string(),
                    out.code,
                    out.description.unwrap_or("").to_string(),
                    out.value.to_string(),
                    out.unit.to_string(),
                    out.name.unwrap_or("-").to_string(),
                ]);
            }
            format!("{table}\n")
        }
        OutputFormat::Pretty => {
            let mut text = format!("frame {frame}: {} records\n", records.len());
            for record in records {
                let _ = writeln!(
                    text,
                    "  {:<16} {:>14} {:<4} {}",
                    format!("{:#}", record.code),
                    record.value(),
                    record.unit_symbol(),
                    filter
                        .name_of(&record.code)
                        .or_else(|| describe(&record.code))
                        .unwrap_or("")
                );
            }
            text
        }
    }
}

pub fn print_records(
    frame: usize,
    records: &[MeasurementRecord],
    filter: &MeasurementFilter,
    format: OutputFormat,
) {
    print!("{}", render_records(frame, records, filter, format));
}

/// Classic 16-bytes-per-line hex dump with offsets and an ASCII column.
pub fn hexdump(data: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in data.chunks(16).enumerate() {
        let _ = write!(out, "{:08x} ", line * 16);
        for i in 0..16 {
            if i == 8 {
                out.push(' ');
            }
            match chunk.get(i) {
                Some(byte) => {
                    let _ = write!(out, " {byte:02x}");
                }
                None => out.push_str("   "),
            }
        }
        out.push_str("  |");
        out.extend(chunk.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push_str("|\n");
    }
    out
}
