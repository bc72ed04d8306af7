//! Bus serialization: concurrent callers must never interleave on the wire
//!
//! The mock transport flags any re-entrant transaction as a violation;
//! under concurrent load through the shared bus the flag must never trip.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::MockTransport;
use ventsrv::bus::SharedBus;
use ventsrv::command::{Command, CommandDispatcher};
use ventsrv::status::StatusReader;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transactions_never_interleave() {
    // A per-transaction delay widens the window a serialization bug would
    // need to hit
    let (mock, state) = MockTransport::with_delay(Duration::from_millis(2));
    let bus = Arc::new(SharedBus::connected(Box::new(mock)));
    let dispatcher = CommandDispatcher::new(Arc::clone(&bus));
    let reader = StatusReader::new(Arc::clone(&bus));

    let mut handles = Vec::new();
    for i in 0..10u16 {
        let dispatcher = dispatcher.clone();
        handles.push(tokio::spawn(async move {
            let cmd = Command {
                action: "fan_speed".to_string(),
                value: 1,
                address: i,
                slave_id: 1,
            };
            dispatcher.execute(&cmd).await;
        }));

        let reader = reader.clone();
        handles.push(tokio::spawn(async move {
            let _ = reader.read(1, 0, 1, 36).await;
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    // 10 writes plus 10 three-field reads
    assert_eq!(state.call_count(), 40);
    assert_eq!(state.violation_count(), 0);
}
