use ipa_client::{ClientConfig, ClientEvent, CompanionStatus, GateIo, HighlightParams};

use crate::cmd::{check_option_value, connect_any, parse_duration, wait_for_job, HighlightArgs};
use crate::exit::{client_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_highlight, OutputFormat};

pub fn run(args: HighlightArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    check_option_value("items", &args.items)?;
    check_option_value("mode", &args.mode)?;

    let config = ClientConfig {
        highlight: HighlightParams {
            mode: args.mode.clone(),
            draw_path_contour: args.contour,
        },
        ..ClientConfig::default()
    };

    let (mut gate, events) = GateIo::new(config, CompanionStatus::running_on(args.port));
    connect_any(&mut gate).map_err(|err| client_error("connect failed", err))?;
    let job_id = gate
        .request_path_items_highlight(&args.items, "cli")
        .map_err(|err| client_error("request failed", err))?;

    match wait_for_job(&mut gate, &events, job_id, timeout) {
        Ok(ClientEvent::HighlightApplied { job_id }) => {
            print_highlight(job_id, &args.items, &args.mode, format);
            Ok(SUCCESS)
        }
        Ok(other) => Err(CliError::new(
            INTERNAL,
            format!("unexpected event for highlight request: {other:?}"),
        )),
        Err(err) => Err(client_error("highlight failed", err)),
    }
}
