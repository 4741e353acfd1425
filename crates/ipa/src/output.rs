use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use ipa_client::{ClientEvent, JobStats};
use ipa_telegram::pretty::{pretty_duration_ms, pretty_size};
use serde::Serialize;

const PREVIEW_CHARS: usize = 120;

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
struct PathListOutput<'a> {
    job_id: u32,
    size: usize,
    paths: usize,
    data: &'a str,
    stats: &'a JobStats,
}

#[derive(Serialize)]
struct HighlightOutput<'a> {
    job_id: u32,
    items: &'a str,
    mode: &'a str,
    applied: bool,
}

#[derive(Serialize, Default)]
struct EventOutput {
    event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    connected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    compressed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    timestamp: String,
}

/// Print the report returned for a path list request.
pub fn print_path_list(job_id: u32, data: &str, stats: &JobStats, format: OutputFormat) {
    let paths = count_paths(data);
    match format {
        OutputFormat::Json => {
            let out = PathListOutput {
                job_id,
                size: data.len(),
                paths,
                data,
                stats,
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["JOB", "PATHS", "SIZE", "MAX DURATION", "REPORT"])
                .add_row(vec![
                    job_id.to_string(),
                    paths.to_string(),
                    pretty_size(data.len() as u64),
                    pretty_duration_ms(stats.max_duration_ms),
                    preview(data),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "job={} paths={} size={}",
                job_id,
                paths,
                pretty_size(data.len() as u64)
            );
            println!("{data}");
        }
        OutputFormat::Raw => print_raw(data.as_bytes()),
    }
}

/// Print the acknowledgement of a highlight request.
pub fn print_highlight(job_id: u32, items: &str, mode: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&HighlightOutput {
            job_id,
            items,
            mode,
            applied: true,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["JOB", "MODE", "ITEMS"])
                .add_row(vec![job_id.to_string(), mode.to_string(), preview(items)]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("job={job_id} mode=\"{mode}\" items={items} applied"),
        OutputFormat::Raw => print_raw(items.as_bytes()),
    }
}

/// Print one client event as it happens.
pub fn print_event(event: &ClientEvent, format: OutputFormat) {
    let out = event_output(event);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["EVENT", "JOB", "DETAIL"])
                .add_row(vec![
                    out.event.to_string(),
                    out.job_id.map(|id| id.to_string()).unwrap_or_default(),
                    event_detail(&out),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => match out.job_id {
            Some(job_id) => println!("{} job={} {}", out.event, job_id, event_detail(&out)),
            None => println!("{} {}", out.event, event_detail(&out)),
        },
        OutputFormat::Raw => match event {
            ClientEvent::FrameReceived { body, .. } => {
                print_raw(body.as_ref());
                print_raw(b"\n");
            }
            ClientEvent::PathListReceived { data, .. } => print_raw(data.as_bytes()),
            _ => {}
        },
    }
}

fn event_output(event: &ClientEvent) -> EventOutput {
    let timestamp = now_unix_seconds();
    match event {
        ClientEvent::ConnectionChanged(connected) => EventOutput {
            event: "connection",
            connected: Some(*connected),
            timestamp,
            ..EventOutput::default()
        },
        ClientEvent::RequestSent { job_id, command } => EventOutput {
            event: "request-sent",
            job_id: Some(*job_id),
            command: Some(command.name()),
            timestamp,
            ..EventOutput::default()
        },
        ClientEvent::FrameReceived {
            body,
            was_compressed,
        } => EventOutput {
            event: "telegram",
            size: Some(body.len()),
            compressed: Some(*was_compressed),
            timestamp,
            ..EventOutput::default()
        },
        ClientEvent::PathListReceived { job_id, data } => EventOutput {
            event: "path-list",
            job_id: Some(*job_id),
            size: Some(data.len()),
            message: Some(format!("{} paths", count_paths(data))),
            timestamp,
            ..EventOutput::default()
        },
        ClientEvent::HighlightApplied { job_id } => EventOutput {
            event: "highlight-applied",
            job_id: Some(*job_id),
            timestamp,
            ..EventOutput::default()
        },
        ClientEvent::CommandFailed {
            job_id,
            cmd,
            message,
        } => EventOutput {
            event: "command-failed",
            job_id: Some(*job_id),
            message: Some(format!("cmd {cmd}: {message}")),
            timestamp,
            ..EventOutput::default()
        },
    }
}

fn event_detail(out: &EventOutput) -> String {
    let mut parts = Vec::new();
    if let Some(connected) = out.connected {
        parts.push(
            if connected {
                "connected"
            } else {
                "disconnected"
            }
            .to_string(),
        );
    }
    if let Some(command) = out.command {
        parts.push(format!("cmd={command}"));
    }
    if let Some(size) = out.size {
        parts.push(format!("size={}", pretty_size(size as u64)));
    }
    if let Some(compressed) = out.compressed {
        parts.push(format!("compressed={compressed}"));
    }
    if let Some(message) = &out.message {
        parts.push(message.clone());
    }
    parts.join(" ")
}

/// Number of `#Path` entries in a timing report.
fn count_paths(data: &str) -> usize {
    data.lines()
        .filter(|line| line.trim_start().starts_with("#Path"))
        .count()
}

fn preview(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() > PREVIEW_CHARS || text.lines().nth(1).is_some() {
        let cut: String = first_line.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        first_line.to_string()
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
