//! Shared test support: a scriptable mock bus transport
//!
//! The mock records every call, can fail selected addresses or slaves,
//! and asserts exclusive access: entering it while another transaction is
//! in flight counts as a serialization violation.

// Compiled once per test binary; not every binary uses every helper
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use vent_modbus::{BusTransport, ModbusError, ModbusResult};

/// Observable state shared between the boxed transport and the test body
#[derive(Default)]
pub struct MockState {
    busy: AtomicBool,
    violations: AtomicUsize,
    calls: AtomicUsize,
    coil_writes: Mutex<Vec<(u8, u16, bool)>>,
    register_writes: Mutex<Vec<(u8, u16, u16)>>,
    discrete_inputs: Mutex<HashMap<(u8, u16), bool>>,
    input_registers: Mutex<HashMap<(u8, u16), u16>>,
    /// Addresses whose transactions fail with a timeout
    fail_addresses: Mutex<HashSet<u16>>,
    /// Slaves whose transactions fail with a connection error
    dead_slaves: Mutex<HashSet<u8>>,
}

impl MockState {
    pub fn set_discrete_input(&self, slave_id: u8, address: u16, value: bool) {
        self.discrete_inputs
            .lock()
            .unwrap()
            .insert((slave_id, address), value);
    }

    pub fn set_input_register(&self, slave_id: u8, address: u16, value: u16) {
        self.input_registers
            .lock()
            .unwrap()
            .insert((slave_id, address), value);
    }

    pub fn fail_address(&self, address: u16) {
        self.fail_addresses.lock().unwrap().insert(address);
    }

    pub fn kill_slave(&self, slave_id: u8) {
        self.dead_slaves.lock().unwrap().insert(slave_id);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn violation_count(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }

    pub fn coil_writes(&self) -> Vec<(u8, u16, bool)> {
        self.coil_writes.lock().unwrap().clone()
    }

    pub fn register_writes(&self) -> Vec<(u8, u16, u16)> {
        self.register_writes.lock().unwrap().clone()
    }

    fn check_scripted_failure(&self, slave_id: u8, address: u16) -> ModbusResult<()> {
        if self.dead_slaves.lock().unwrap().contains(&slave_id) {
            return Err(ModbusError::Connection(format!(
                "Slave {} unreachable",
                slave_id
            )));
        }
        if self.fail_addresses.lock().unwrap().contains(&address) {
            return Err(ModbusError::Timeout(format!(
                "No response for address {}",
                address
            )));
        }
        Ok(())
    }
}

/// Scriptable `BusTransport` double
pub struct MockTransport {
    state: Arc<MockState>,
    /// Time spent "on the wire" per transaction; widens the race window
    /// for the exclusivity assertion
    delay: Duration,
}

impl MockTransport {
    pub fn new() -> (Self, Arc<MockState>) {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> (Self, Arc<MockState>) {
        let state = Arc::new(MockState::default());
        (
            Self {
                state: Arc::clone(&state),
                delay,
            },
            state,
        )
    }

    /// Bracket one transaction with the exclusivity check
    async fn transact<T>(
        &self,
        f: impl FnOnce(&MockState) -> ModbusResult<T>,
    ) -> ModbusResult<T> {
        if self.state.busy.swap(true, Ordering::SeqCst) {
            self.state.violations.fetch_add(1, Ordering::SeqCst);
        }
        self.state.calls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        let result = f(&self.state);

        self.state.busy.store(false, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl BusTransport for MockTransport {
    async fn write_coil(&mut self, slave_id: u8, address: u16, value: bool) -> ModbusResult<()> {
        self.transact(|state| {
            state.check_scripted_failure(slave_id, address)?;
            state
                .coil_writes
                .lock()
                .unwrap()
                .push((slave_id, address, value));
            Ok(())
        })
        .await
    }

    async fn write_register(&mut self, slave_id: u8, address: u16, value: u16) -> ModbusResult<()> {
        self.transact(|state| {
            state.check_scripted_failure(slave_id, address)?;
            state
                .register_writes
                .lock()
                .unwrap()
                .push((slave_id, address, value));
            Ok(())
        })
        .await
    }

    async fn read_discrete_inputs(
        &mut self,
        slave_id: u8,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<bool>> {
        self.transact(|state| {
            state.check_scripted_failure(slave_id, address)?;
            let value = state
                .discrete_inputs
                .lock()
                .unwrap()
                .get(&(slave_id, address))
                .copied()
                .unwrap_or(false);
            Ok(vec![value; quantity as usize])
        })
        .await
    }

    async fn read_input_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u16>> {
        self.transact(|state| {
            state.check_scripted_failure(slave_id, address)?;
            let value = state
                .input_registers
                .lock()
                .unwrap()
                .get(&(slave_id, address))
                .copied()
                .unwrap_or(0);
            Ok(vec![value; quantity as usize])
        })
        .await
    }
}
