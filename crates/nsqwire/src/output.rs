use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use nsqwire_protocol::{Frame, FrameType};
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
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    frame_type: &'static str,
    addr: &'a str,
    payload_size: usize,
    payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<MessageOutput>,
}

#[derive(Serialize)]
struct MessageOutput {
    id: String,
    attempts: u16,
    timestamp: i64,
}

#[derive(Serialize)]
struct NameOutput<'a> {
    name: &'a str,
    topic: bool,
    channel: bool,
}

pub fn print_frame(frame: &Frame, addr: &str, format: OutputFormat) {
    let payload = frame_payload(frame);
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                frame_type: frame_type_name(frame.frame_type()),
                addr,
                payload_size: payload.len(),
                payload: payload_preview(payload),
                message: match frame {
                    Frame::Message(message) => Some(MessageOutput {
                        id: message.id().to_string(),
                        attempts: message.attempts(),
                        timestamp: message.timestamp(),
                    }),
                    _ => None,
                },
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "SIZE", "ADDR", "PAYLOAD"])
                .add_row(vec![
                    frame_type_name(frame.frame_type()).to_string(),
                    payload.len().to_string(),
                    addr.to_string(),
                    payload_preview(payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "type={} size={} addr={} payload={}",
                frame_type_name(frame.frame_type()),
                payload.len(),
                addr,
                payload_preview(payload)
            );
        }
        OutputFormat::Raw => {
            let mut out = std::io::stdout();
            let _ = out.write_all(payload);
            let _ = out.flush();
        }
    }
}

/// Print topic/channel validity for each name.
pub fn print_names(names: &[(String, bool, bool)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for (name, topic, channel) in names {
                let out = NameOutput {
                    name,
                    topic: *topic,
                    channel: *channel,
                };
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
                .set_header(vec!["NAME", "TOPIC", "CHANNEL"]);
            for (name, topic, channel) in names {
                table.add_row(vec![name.clone(), yes_no(*topic), yes_no(*channel)]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for (name, topic, channel) in names {
                println!("{name} topic={} channel={}", yes_no(*topic), yes_no(*channel));
            }
        }
    }
}

pub fn frame_type_name(frame_type: FrameType) -> &'static str {
    match frame_type {
        FrameType::Response => "response",
        FrameType::Error => "error",
        FrameType::Message => "message",
    }
}

fn frame_payload(frame: &Frame) -> &[u8] {
    match frame {
        Frame::Response(data) | Frame::Error(data) => data.as_ref(),
        Frame::Message(message) => message.body().as_ref(),
    }
}

fn yes_no(value: bool) -> String {
    let text = if value { "yes" } else { "no" };
    text.to_string()
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
