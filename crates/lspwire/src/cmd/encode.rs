use std::io::Read;

use bytes::BytesMut;
use lspwire_frame::{encode_frame, FrameConfig, Message};

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::print_raw;

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let body = resolve_body(&args)?;
    if body.trim().is_empty() {
        return Err(CliError::new(
            USAGE,
            "no message body: pass --json, --file, or pipe one on stdin",
        ));
    }
    let message: Message = serde_json::from_str(&body)
        .map_err(|err| CliError::new(DATA_INVALID, format!("not a JSON-RPC message: {err}")))?;

    let mut config = FrameConfig::default();
    if let Some(charset) = args.charset {
        config = config.with_charset(charset);
    }

    let mut frame = BytesMut::new();
    encode_frame(&message, &config, &mut frame).map_err(|err| frame_error("encode failed", err))?;
    print_raw(&frame);
    Ok(SUCCESS)
}

fn resolve_body(args: &EncodeArgs) -> CliResult<String> {
    if let Some(json) = &args.json {
        return Ok(json.clone());
    }
    if let Some(path) = &args.file {
        return std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    let mut body = String::new();
    std::io::stdin()
        .read_to_string(&mut body)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok(body)
}
