//! CommandDispatcher behavior against a scripted mock transport

mod common;

use std::sync::Arc;

use common::MockTransport;
use ventsrv::bus::SharedBus;
use ventsrv::command::{Command, CommandDispatcher};

fn command(action: &str, value: u16, address: u16) -> Command {
    Command {
        action: action.to_string(),
        value,
        address,
        slave_id: 1,
    }
}

#[tokio::test]
async fn test_coil_write_success_reports_address_and_value() {
    let (mock, state) = MockTransport::new();
    let bus = Arc::new(SharedBus::connected(Box::new(mock)));
    let dispatcher = CommandDispatcher::new(bus);

    let outcome = dispatcher.execute(&command("coil", 1, 5)).await;

    assert!(outcome.succeeded);
    assert!(outcome.message.contains("address 5"));
    assert!(outcome.message.contains("set to 1"));
    assert_eq!(state.coil_writes(), vec![(1, 5, true)]);
}

#[tokio::test]
async fn test_coil_zero_writes_false() {
    let (mock, state) = MockTransport::new();
    let bus = Arc::new(SharedBus::connected(Box::new(mock)));
    let dispatcher = CommandDispatcher::new(bus);

    let outcome = dispatcher.execute(&command("coil", 0, 12)).await;

    assert!(outcome.succeeded);
    assert_eq!(state.coil_writes(), vec![(1, 12, false)]);
}

#[tokio::test]
async fn test_temperature_message_reports_tenths_scaling() {
    let (mock, state) = MockTransport::new();
    let bus = Arc::new(SharedBus::connected(Box::new(mock)));
    let dispatcher = CommandDispatcher::new(bus);

    // Register units are tenths of a degree: 205 -> 20.5
    let outcome = dispatcher.execute(&command("temp", 205, 1)).await;

    assert!(outcome.succeeded);
    assert!(outcome.message.contains("20.5"));
    assert_eq!(state.register_writes(), vec![(1, 1, 205)]);
}

#[tokio::test]
async fn test_fan_speed_writes_register() {
    let (mock, state) = MockTransport::new();
    let bus = Arc::new(SharedBus::connected(Box::new(mock)));
    let dispatcher = CommandDispatcher::new(bus);

    let outcome = dispatcher.execute(&command("fan_speed", 3, 36)).await;

    assert!(outcome.succeeded);
    assert!(outcome.message.contains("address 36"));
    assert!(outcome.message.contains("3"));
    assert_eq!(state.register_writes(), vec![(1, 36, 3)]);
}

#[tokio::test]
async fn test_invalid_action_fails_without_bus_access() {
    let (mock, state) = MockTransport::new();
    let bus = Arc::new(SharedBus::connected(Box::new(mock)));
    let dispatcher = CommandDispatcher::new(bus);

    let outcome = dispatcher.execute(&command("blink", 1, 5)).await;

    assert!(!outcome.succeeded);
    assert_eq!(outcome.message, "Invalid action specified");
    assert_eq!(state.call_count(), 0);
}

#[tokio::test]
async fn test_disconnected_bus_short_circuits() {
    let bus = Arc::new(SharedBus::disconnected());
    let dispatcher = CommandDispatcher::new(bus);

    let outcome = dispatcher.execute(&command("coil", 1, 5)).await;

    assert!(!outcome.succeeded);
    assert_eq!(outcome.message, "Modbus device not connected");
}

#[tokio::test]
async fn test_exactly_one_bus_write_per_command() {
    let (mock, state) = MockTransport::new();
    let bus = Arc::new(SharedBus::connected(Box::new(mock)));
    let dispatcher = CommandDispatcher::new(bus);

    dispatcher.execute(&command("coil", 1, 5)).await;
    assert_eq!(state.call_count(), 1);

    dispatcher.execute(&command("temp", 220, 1)).await;
    assert_eq!(state.call_count(), 2);
    assert_eq!(state.coil_writes().len(), 1);
    assert_eq!(state.register_writes().len(), 1);
}

#[tokio::test]
async fn test_transport_failure_becomes_failed_outcome() {
    let (mock, state) = MockTransport::new();
    state.fail_address(7);
    let bus = Arc::new(SharedBus::connected(Box::new(mock)));
    let dispatcher = CommandDispatcher::new(bus);

    let outcome = dispatcher.execute(&command("coil", 1, 7)).await;

    assert!(!outcome.succeeded);
    assert!(outcome.message.contains("address 7"));
    assert!(state.coil_writes().is_empty());
}
