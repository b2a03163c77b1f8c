use lspwire_frame::{Frame, FrameConfig, Message, MessageReader};
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::cmd::{runtime, DecodeArgs};
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_messages, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut config = FrameConfig::default();
    if let Some(max) = args.max_content_length {
        config = config.with_max_content_length(max);
    }

    let rt = runtime()?;
    let decoded = rt.block_on(async {
        match &args.file {
            Some(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|err| {
                    io_error(&format!("failed opening {}", path.display()), err)
                })?;
                read_all(file, config).await
            }
            None => read_all(tokio::io::stdin(), config).await,
        }
    })?;

    print_messages(&decoded, format);
    Ok(SUCCESS)
}

async fn read_all<R: AsyncRead + Unpin>(
    input: R,
    config: FrameConfig,
) -> CliResult<Vec<(Frame, Message)>> {
    let mut reader = MessageReader::with_config(input, config);
    let none = CancellationToken::new();
    let mut decoded = Vec::new();

    while let Some(frame) = reader
        .read_frame(&none)
        .await
        .map_err(|err| frame_error(&format!("frame {}", decoded.len() + 1), err))?
    {
        let message = frame
            .message()
            .map_err(|err| frame_error(&format!("frame {}", decoded.len() + 1), err))?;
        decoded.push((frame, message));
    }
    Ok(decoded)
}
