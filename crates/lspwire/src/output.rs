use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use lspwire_frame::{Frame, Message};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
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
struct MessageOutput<'a> {
    kind: &'static str,
    id: Option<String>,
    method: Option<&'a str>,
    content_length: usize,
    charset: &'static str,
    message: &'a Message,
}

impl<'a> MessageOutput<'a> {
    fn new(frame: &Frame, message: &'a Message) -> Self {
        Self {
            kind: message.kind(),
            id: message.id().map(ToString::to_string),
            method: message.method(),
            content_length: frame.body.len(),
            charset: frame.charset.name(),
            message,
        }
    }
}

/// Print every decoded frame in the requested format.
pub fn print_messages(decoded: &[(Frame, Message)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for (frame, message) in decoded {
                let out = MessageOutput::new(frame, message);
                println!(
                    "{}",
                    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "ID", "METHOD", "SIZE", "BODY"]);
            for (frame, message) in decoded {
                table.add_row(vec![
                    message.kind().to_string(),
                    message.id().map(ToString::to_string).unwrap_or_default(),
                    message.method().unwrap_or_default().to_string(),
                    frame.body.len().to_string(),
                    body_preview(message),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (frame, message) in decoded {
                println!(
                    "{} id={} method={} size={} charset={} body={}",
                    message.kind(),
                    message.id().map(ToString::to_string).unwrap_or_else(|| "-".into()),
                    message.method().unwrap_or("-"),
                    frame.body.len(),
                    frame.charset,
                    body_preview(message)
                );
            }
        }
        OutputFormat::Raw => {
            for (frame, _) in decoded {
                print_raw(&frame.body);
                print_raw(b"\n");
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn body_preview(message: &Message) -> String {
    serde_json::to_string(message).unwrap_or_else(|_| "<unserializable>".to_string())
}
