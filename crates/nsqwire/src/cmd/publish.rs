use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use nsqwire_protocol::{identify, multi_publish, nop, publish, Command, Frame, IdentifyOptions};
use nsqwire_transport::{ConnConfig, Connection};
use tracing::{debug, warn};

use crate::cmd::{ConnArgs, MpubArgs, PubArgs};
use crate::exit::{
    io_error, protocol_error, transport_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE,
};
use crate::output::{print_frame, OutputFormat};

const DEFAULT_PORT: u16 = 4150;

pub fn run_pub(args: PubArgs, format: OutputFormat) -> CliResult<i32> {
    let body = match (&args.data, &args.file) {
        (Some(data), _) => data.as_bytes().to_vec(),
        (None, Some(path)) => read_file(path)?,
        (None, None) => return Err(CliError::new(USAGE, "one of --data or --file is required")),
    };
    let command =
        publish(&args.topic, body).map_err(|err| protocol_error("invalid command", err))?;
    publish_one(&args.conn, &command, format)
}

pub fn run_mpub(args: MpubArgs, format: OutputFormat) -> CliResult<i32> {
    let mut bodies: Vec<Vec<u8>> = args.data.iter().map(|d| d.as_bytes().to_vec()).collect();
    if let Some(path) = &args.file {
        bodies.extend(split_lines(&read_file(path)?));
    }
    if bodies.is_empty() {
        return Err(CliError::new(USAGE, "mpub needs at least one message"));
    }
    let command = multi_publish(&args.topic, bodies)
        .map_err(|err| protocol_error("invalid command", err))?;
    publish_one(&args.conn, &command, format)
}

fn publish_one(args: &ConnArgs, command: &Command, format: OutputFormat) -> CliResult<i32> {
    let (host, port) = parse_addr(&args.addr)?;
    let config = ConnConfig {
        timeout: Some(parse_duration(&args.timeout)?),
        ..ConnConfig::default()
    };
    let mut conn = Connection::connect_with_config(&host, port, config)
        .map_err(|err| transport_error("connect failed", err))?;

    if let Some(client_id) = &args.client_id {
        let options = IdentifyOptions {
            client_id: Some(client_id.clone()),
            user_agent: Some(format!("nsqwire/{}", env!("CARGO_PKG_VERSION"))),
            ..IdentifyOptions::default()
        };
        let hello = identify(&options).map_err(|err| protocol_error("identify", err))?;
        let reply = send_and_wait(&mut conn, &hello)?;
        if let Frame::Error(_) = reply {
            print_frame(&reply, &args.addr, format);
            return Ok(DATA_INVALID);
        }
        debug!(client_id = %client_id, "identified");
    }

    debug!(addr = %args.addr, %command, "publishing");
    let reply = send_and_wait(&mut conn, command)?;
    print_frame(&reply, &args.addr, format);

    let code = match &reply {
        Frame::Response(_) => SUCCESS,
        Frame::Error(_) => DATA_INVALID,
        Frame::Message(_) => {
            warn!("unexpected message frame in reply to publish");
            DATA_INVALID
        }
    };

    conn.close()
        .map_err(|err| transport_error("close failed", err))?;
    Ok(code)
}

/// Send `command` and return the first frame that is not a heartbeat.
/// Heartbeats are answered with `NOP` as the daemon expects.
fn send_and_wait<S: Read + Write>(conn: &mut Connection<S>, command: &Command) -> CliResult<Frame> {
    conn.send_command(command)
        .map_err(|err| transport_error("send failed", err))?;
    loop {
        let frame = conn
            .read_frame()
            .map_err(|err| transport_error("receive failed", err))?;
        if !frame.is_heartbeat() {
            return Ok(frame);
        }
        debug!("answering heartbeat");
        conn.send_command(&nop())
            .map_err(|err| transport_error("send failed", err))?;
    }
}

fn read_file(path: &Path) -> CliResult<Vec<u8>> {
    fs::read(path).map_err(|err| io_error(&format!("failed reading {}", path.display()), err))
}

fn split_lines(data: &[u8]) -> impl Iterator<Item = Vec<u8>> + '_ {
    data.split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(<[u8]>::to_vec)
}

fn parse_addr(input: &str) -> CliResult<(String, u16)> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "address must not be empty"));
    }

    let (host, port) = if let Some(rest) = input.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| CliError::new(USAGE, format!("unterminated IPv6 address: {input}")))?;
        match tail {
            "" => (host, None),
            _ => match tail.strip_prefix(':') {
                Some(port) => (host, Some(port)),
                None => return Err(CliError::new(USAGE, format!("invalid address: {input}"))),
            },
        }
    } else {
        match input.split_once(':') {
            Some((_, rest)) if rest.contains(':') => {
                return Err(CliError::new(
                    USAGE,
                    format!("IPv6 addresses must be bracketed: {input}"),
                ));
            }
            Some((host, port)) => (host, Some(port)),
            None => (input, None),
        }
    };

    if host.is_empty() {
        return Err(CliError::new(USAGE, format!("missing host: {input}")));
    }
    let port = match port {
        Some(port) => port
            .parse()
            .map_err(|_| CliError::new(USAGE, format!("invalid port: {port}")))?,
        None => DEFAULT_PORT,
    };
    Ok((host.to_string(), port))
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
