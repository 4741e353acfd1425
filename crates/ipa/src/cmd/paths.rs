use ipa_client::{ClientConfig, ClientEvent, CompanionStatus, GateIo, PathListParams};

use crate::cmd::{check_option_value, connect_any, parse_duration, wait_for_job, PathsArgs};
use crate::exit::{client_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_path_list, OutputFormat};

pub fn run(args: PathsArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    check_option_value("details-level", &args.details_level)?;

    let config = ClientConfig {
        path_list: PathListParams {
            path_num: args.path_num,
            path_type: args.path_type,
            details_level: args.details_level,
            is_flat_routing: args.flat,
        },
        ..ClientConfig::default()
    };
    if config.path_list.effective_path_num() != args.path_num {
        tracing::warn!(
            requested = args.path_num,
            used = config.path_list.effective_path_num(),
            "path count clamped"
        );
    }

    let (mut gate, events) = GateIo::new(config, CompanionStatus::running_on(args.port));
    connect_any(&mut gate).map_err(|err| client_error("connect failed", err))?;
    let job_id = gate
        .request_path_list("cli")
        .map_err(|err| client_error("request failed", err))?;

    match wait_for_job(&mut gate, &events, job_id, timeout) {
        Ok(ClientEvent::PathListReceived { job_id, data }) => {
            print_path_list(job_id, &data, &gate.stats(), format);
            Ok(SUCCESS)
        }
        Ok(other) => Err(CliError::new(
            INTERNAL,
            format!("unexpected event for path list request: {other:?}"),
        )),
        Err(err) => Err(client_error("path list failed", err)),
    }
}
