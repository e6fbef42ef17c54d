use nsqwire_protocol::{valid_channel_name, valid_topic_name};

use crate::cmd::CheckNameArgs;
use crate::exit::{CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_names, OutputFormat};

pub fn run(args: CheckNameArgs, format: OutputFormat) -> CliResult<i32> {
    let results = check_names(&args.names);
    print_names(&results, format);

    if results.iter().all(|(_, topic, _)| *topic) {
        Ok(SUCCESS)
    } else {
        Ok(DATA_INVALID)
    }
}

fn check_names(names: &[String]) -> Vec<(String, bool, bool)> {
    names
        .iter()
        .map(|name| {
            (
                name.clone(),
                valid_topic_name(name),
                valid_channel_name(name),
            )
        })
        .collect()
}
