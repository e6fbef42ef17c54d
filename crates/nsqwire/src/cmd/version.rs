use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("nsqwire {}", env!("CARGO_PKG_VERSION"));
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!(
        "target: {}",
        option_env!("NSQWIRE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "protocol: {}",
        String::from_utf8_lossy(nsqwire_protocol::MAGIC_V2).trim()
    );
    println!(
        "max_frame_size: {}",
        nsqwire_transport::DEFAULT_MAX_FRAME_SIZE
    );

    Ok(SUCCESS)
}
