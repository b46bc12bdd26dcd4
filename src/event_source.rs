use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// One input event for the viewer, as read from a gesture script.
///
/// Scripts are JSON arrays of objects tagged by `kind`:
/// `{"kind":"start","id":1,"x":10.0,"y":20.0}`. A `frame` entry tells the
/// host to tick once before reading further.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputEvent {
    Start { id: i64, x: f64, y: f64 },
    Move { id: i64, x: f64, y: f64 },
    End { id: i64 },
    Recenter,
    Resize { width: u32, height: u32 },
    Frame,
}

/// Trait for abstracting event sources to enable testing
pub trait EventSource {
    /// Poll for events with a timeout
    fn poll(&mut self, timeout: Duration) -> Result<bool>;

    /// Read the next event
    fn read(&mut self) -> Result<InputEvent>;
}

/// Replays a fixed list of events
pub struct SimulatedEventSource {
    pub(crate) events: Vec<InputEvent>,
    current_index: usize,
}

impl SimulatedEventSource {
    pub fn new(events: Vec<InputEvent>) -> Self {
        Self {
            events,
            current_index: 0,
        }
    }

    /// Parse a JSON gesture script
    pub fn from_json(json: &str) -> Result<Self> {
        let events: Vec<InputEvent> =
            serde_json::from_str(json).context("Invalid gesture script")?;
        Ok(Self::new(events))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read gesture script {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn remaining(&self) -> usize {
        self.events.len() - self.current_index
    }
}

impl EventSource for SimulatedEventSource {
    fn poll(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(self.current_index < self.events.len())
    }

    fn read(&mut self) -> Result<InputEvent> {
        let Some(event) = self.events.get(self.current_index).cloned() else {
            bail!("No more events in the script");
        };
        self.current_index += 1;
        Ok(event)
    }
}
