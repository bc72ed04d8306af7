//! BulkCommandProcessor: background execution, ordering, outcome log

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::MockTransport;
use uuid::Uuid;
use ventsrv::batch::BulkCommandProcessor;
use ventsrv::bus::SharedBus;
use ventsrv::command::{Command, CommandDispatcher};
use ventsrv::store::{BatchRun, CommandLog};

fn command(action: &str, value: u16, address: u16) -> Command {
    Command {
        action: action.to_string(),
        value,
        address,
        slave_id: 1,
    }
}

fn processor() -> (BulkCommandProcessor, Arc<CommandLog>, Arc<common::MockState>) {
    let (mock, state) = MockTransport::new();
    let bus = Arc::new(SharedBus::connected(Box::new(mock)));
    let log = Arc::new(CommandLog::new());
    let (processor, _worker) =
        BulkCommandProcessor::spawn(CommandDispatcher::new(bus), Arc::clone(&log));
    (processor, log, state)
}

async fn wait_finished(log: &CommandLog, run_id: Uuid) -> BatchRun {
    for _ in 0..200 {
        if let Some(run) = log.get(run_id) {
            if run.finished {
                return run;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("batch {} did not finish in time", run_id);
}

#[tokio::test]
async fn test_batch_executes_in_submission_order() {
    let (processor, log, state) = processor();

    let accepted = processor
        .submit(vec![
            command("fan_speed", 1, 36),
            command("temp", 220, 1),
            command("fan_speed", 2, 192),
        ])
        .await
        .unwrap();
    assert_eq!(accepted.accepted, 3);

    let run = wait_finished(&log, accepted.run_id).await;

    assert_eq!(run.total, 3);
    assert_eq!(run.outcomes.len(), 3);
    let addresses: Vec<u16> = run.outcomes.iter().map(|o| o.command.address).collect();
    assert_eq!(addresses, vec![36, 1, 192]);
    // The bus saw the writes in the same order
    let written: Vec<u16> = state.register_writes().iter().map(|w| w.1).collect();
    assert_eq!(written, vec![36, 1, 192]);
}

#[tokio::test]
async fn test_one_failure_does_not_stop_the_batch() {
    let (processor, log, state) = processor();
    state.fail_address(1);

    let accepted = processor
        .submit(vec![
            command("fan_speed", 1, 36),
            command("temp", 220, 1),
            command("fan_speed", 2, 192),
        ])
        .await
        .unwrap();

    let run = wait_finished(&log, accepted.run_id).await;

    assert_eq!(run.outcomes.len(), 3);
    assert!(run.outcomes[0].succeeded);
    assert!(!run.outcomes[1].succeeded);
    assert!(run.outcomes[2].succeeded);
}

#[tokio::test]
async fn test_outcome_log_is_queryable_by_run_id() {
    let (processor, log, _state) = processor();

    assert!(log.get(Uuid::new_v4()).is_none());

    let accepted = processor.submit(vec![command("coil", 1, 5)]).await.unwrap();
    let run = wait_finished(&log, accepted.run_id).await;

    assert_eq!(run.run_id, accepted.run_id);
    assert_eq!(run.total, 1);
    assert!(run.finished);
}

#[tokio::test]
async fn test_independent_batches_do_not_interleave() {
    let (processor, log, state) = processor();

    let first = processor
        .submit(vec![command("fan_speed", 1, 10), command("fan_speed", 1, 11)])
        .await
        .unwrap();
    let second = processor
        .submit(vec![command("fan_speed", 1, 20), command("fan_speed", 1, 21)])
        .await
        .unwrap();

    wait_finished(&log, first.run_id).await;
    wait_finished(&log, second.run_id).await;

    let written: Vec<u16> = state.register_writes().iter().map(|w| w.1).collect();
    assert_eq!(written, vec![10, 11, 20, 21]);
}
