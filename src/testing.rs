//! Stub collaborators shared by the unit tests.

use crate::autopilot::{Autopilot, BridgeError, MessageKind, TelemetrySnapshot};
use crate::cloud::BrokerLink;
use crate::cloud::ChannelError;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::{Notify, mpsc};

/// Holds every telemetry read until the test releases it, reporting the goto count first.
pub struct ArrivalGate {
    pub arrivals: mpsc::UnboundedSender<usize>,
    pub release: Arc<Notify>,
}

/// Autopilot that records commands. With `teleport` set, every goto moves it onto the target.
pub struct StubAutopilot {
    position: Mutex<(f64, f64)>,
    teleport: bool,
    telemetry_fails: AtomicBool,
    gate: Option<ArrivalGate>,
    pub gotos: Mutex<Vec<(f64, f64, f64)>>,
    pub modes: Mutex<Vec<String>>,
    pub rtl_calls: Mutex<usize>,
}

impl StubAutopilot {
    pub fn new() -> Self {
        Self {
            position: Mutex::new((0.0, 0.0)),
            teleport: true,
            telemetry_fails: AtomicBool::new(false),
            gate: None,
            gotos: Mutex::new(Vec::new()),
            modes: Mutex::new(Vec::new()),
            rtl_calls: Mutex::new(0),
        }
    }

    /// Stub that never reaches its goto targets.
    pub fn stationary() -> Self { Self { teleport: false, ..Self::new() } }

    pub fn gated(gate: ArrivalGate) -> Self { Self { gate: Some(gate), ..Self::new() } }

    pub fn set_telemetry_fails(&self, fails: bool) { self.telemetry_fails.store(fails, Ordering::SeqCst); }

    pub fn goto_count(&self) -> usize { self.gotos.lock().unwrap().len() }

    pub fn modes(&self) -> Vec<String> { self.modes.lock().unwrap().clone() }

    pub fn rtl_calls(&self) -> usize { *self.rtl_calls.lock().unwrap() }
}

#[async_trait::async_trait]
impl Autopilot for StubAutopilot {
    async fn get_telemetry(&self) -> Result<TelemetrySnapshot, BridgeError> {
        if self.telemetry_fails.load(Ordering::SeqCst) {
            return Err(BridgeError::Timeout(MessageKind::GlobalPositionInt));
        }
        if let Some(gate) = &self.gate {
            let _ = gate.arrivals.send(self.goto_count());
            gate.release.notified().await;
        }
        let (lat, lon) = *self.position.lock().unwrap();
        Ok(TelemetrySnapshot::at(lat, lon, 30.0))
    }

    async fn goto(&self, latitude: f64, longitude: f64, altitude: f64) -> Result<(), BridgeError> {
        self.gotos.lock().unwrap().push((latitude, longitude, altitude));
        if self.teleport {
            *self.position.lock().unwrap() = (latitude, longitude);
        }
        Ok(())
    }

    async fn set_mode(&self, mode: &str) -> Result<(), BridgeError> {
        self.modes.lock().unwrap().push(mode.to_string());
        Ok(())
    }

    async fn return_to_launch(&self) -> Result<(), BridgeError> {
        *self.rtl_calls.lock().unwrap() += 1;
        Ok(())
    }
}

/// Broker link that records publishes and can be switched into a failing mode.
pub struct RecordingLink {
    pub published: Mutex<Vec<(String, Vec<u8>)>>,
    pub subscriptions: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingLink {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, fail: bool) { self.fail.store(fail, Ordering::SeqCst); }

    pub fn topics(&self) -> Vec<String> {
        self.published.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }
}

#[async_trait::async_trait]
impl BrokerLink for RecordingLink {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ChannelError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ChannelError::LinkDown);
        }
        self.published.lock().unwrap().push((topic.to_string(), payload));
        Ok(())
    }

    async fn subscribe(&self, filter: &str) -> Result<(), ChannelError> {
        self.subscriptions.lock().unwrap().push(filter.to_string());
        Ok(())
    }
}
