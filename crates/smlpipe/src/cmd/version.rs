use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("smlpipe {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: smlpipe");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target: {}", env!("SMLPIPE_BUILD_TARGET"));
    println!("profile: {}", env!("SMLPIPE_BUILD_PROFILE"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("sinks: influx, graphite");

    Ok(SUCCESS)
}
