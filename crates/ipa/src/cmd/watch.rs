use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ipa_client::{ClientConfig, CompanionStatus, GateIo};

use crate::cmd::WatchArgs;
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_event, OutputFormat};

const EVENT_WAIT: Duration = Duration::from_millis(100);

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let (mut gate, events) = GateIo::new(
        ClientConfig::default(),
        CompanionStatus::running_on(args.port),
    );
    tracing::info!(port = args.port, "watching companion");

    // The client is moved to its own thread and only touched there.
    let loop_running = running.clone();
    let event_loop = thread::Builder::new()
        .name("ipa-event-loop".into())
        .spawn(move || gate.run(&loop_running))
        .map_err(|err| CliError::new(INTERNAL, format!("failed to start event loop: {err}")))?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        match events.recv_timeout(EVENT_WAIT) {
            Ok(event) => {
                print_event(&event, format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    running.store(false, Ordering::SeqCst);
    event_loop
        .join()
        .map_err(|_| CliError::new(INTERNAL, "event loop thread panicked"))?;
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
