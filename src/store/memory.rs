//! In-process store (testing and dry runs).
//!
//! [`MemoryStore`] is a cheap, cloneable handle to shared state. It records
//! every command it receives and can be told to fail at each step of the
//! connection lifecycle.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Connector, StoreAddress, StoreConnection};
use crate::error::StoreError;

/// A command received by a [`MemoryConnection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Auth { password: String },
    Set { key: String, value: String },
}

#[derive(Debug, Default)]
struct State {
    data: BTreeMap<String, String>,
    commands: Vec<Command>,
    opens: usize,
    closes: usize,
    sets: usize,
    fail_open: Option<String>,
    fail_auth: Option<String>,
    fail_set: Option<(usize, String)>,
    fail_close: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A connection to this store, counted as one open.
    pub fn connect(&self) -> MemoryConnection {
        self.state().opens += 1;
        MemoryConnection {
            store: self.clone(),
            closed: false,
        }
    }

    /// Makes every [`Connector::open`] fail with `message`.
    pub fn fail_open(&self, message: &str) -> &Self {
        self.state().fail_open = Some(message.to_string());
        self
    }

    /// Makes every `AUTH` fail with `message`.
    pub fn fail_auth(&self, message: &str) -> &Self {
        self.state().fail_auth = Some(message.to_string());
        self
    }

    /// Makes the `nth` `SET` (1-based, counted across connections) fail.
    pub fn fail_set(&self, nth: usize, message: &str) -> &Self {
        self.state().fail_set = Some((nth, message.to_string()));
        self
    }

    /// Makes every close fail with `message`. The connection is still released.
    pub fn fail_close(&self, message: &str) -> &Self {
        self.state().fail_close = Some(message.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.state().data.get(key).cloned()
    }

    /// Snapshot of every stored pair, sorted by key.
    pub fn data(&self) -> BTreeMap<String, String> {
        self.state().data.clone()
    }

    /// Every command received so far, in order.
    pub fn commands(&self) -> Vec<Command> {
        self.state().commands.clone()
    }

    pub fn opens(&self) -> usize {
        self.state().opens
    }

    pub fn closes(&self) -> usize {
        self.state().closes
    }
}

impl Connector for MemoryStore {
    fn open(&self, _address: &StoreAddress) -> Result<Box<dyn StoreConnection>, StoreError> {
        if let Some(message) = self.state().fail_open.clone() {
            return Err(StoreError::Other(message));
        }
        Ok(Box::new(self.connect()))
    }
}

/// A connection handed out by [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryConnection {
    store: MemoryStore,
    closed: bool,
}

impl MemoryConnection {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::Other("connection already closed".to_string()));
        }
        Ok(())
    }
}

impl StoreConnection for MemoryConnection {
    fn auth(&mut self, password: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut state = self.store.state();
        state.commands.push(Command::Auth {
            password: password.to_string(),
        });
        match state.fail_auth.clone() {
            Some(message) => Err(StoreError::Other(message)),
            None => Ok(()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut state = self.store.state();
        state.sets += 1;
        state.commands.push(Command::Set {
            key: key.to_string(),
            value: value.to_string(),
        });
        if let Some((nth, message)) = &state.fail_set {
            if *nth == state.sets {
                return Err(StoreError::Other(message.clone()));
            }
        }
        state.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut state = self.store.state();
        state.closes += 1;
        match state.fail_close.clone() {
            Some(message) => Err(StoreError::Other(message)),
            None => Ok(()),
        }
    }
}
