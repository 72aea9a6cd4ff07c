// tau-core - Pipes for communication between concurrent calls
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Pipes: channels shared between a program and the concurrent calls it
//! spawns with `tau f()`.
//!
//! A pipe with capacity zero is a rendezvous: `send` blocks until a receiver
//! takes the value. Values travel as [`Snapshot`]s, so each side gets its own
//! copy of any containers.

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender};

use parking_lot::Mutex;
use tracing::trace;

use crate::snapshot::Snapshot;
use crate::value::Value;

struct PipeInner {
    /// `None` once the pipe has been closed
    tx: Mutex<Option<SyncSender<Snapshot>>>,
    rx: Mutex<Receiver<Snapshot>>,
}

/// A cloneable handle to a shared channel.
#[derive(Clone)]
pub struct Pipe(Arc<PipeInner>);

impl Pipe {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::sync_channel(capacity);
        Pipe(Arc::new(PipeInner {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(rx),
        }))
    }

    /// True when both handles refer to the same channel.
    pub fn same(&self, other: &Pipe) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Send a value, blocking while the pipe is full.
    pub fn send(&self, value: &Value) -> Result<(), String> {
        let snap = Snapshot::capture(value).map_err(|e| e.to_string())?;
        // Clone the sender so the lock is not held while blocking.
        let tx = self.0.tx.lock().clone();
        match tx {
            Some(tx) => {
                trace!("pipe send");
                tx.send(snap).map_err(|_| "pipe is closed".to_string())
            }
            None => Err("pipe is closed".to_string()),
        }
    }

    /// Receive a value, blocking until one arrives. Returns `None` once the
    /// pipe is closed and drained.
    pub fn recv(&self) -> Option<Value> {
        let snap = self.0.rx.lock().recv().ok()?;
        trace!("pipe recv");
        Some(snap.restore())
    }

    pub fn close(&self) {
        self.0.tx.lock().take();
    }
}

impl fmt::Debug for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<pipe>")
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_buffered_send_and_recv() {
        let p = Pipe::new(2);
        p.send(&Value::Int(1)).unwrap();
        p.send(&Value::string("two")).unwrap();
        assert_eq!(p.recv(), Some(Value::Int(1)));
        assert_eq!(p.recv(), Some(Value::string("two")));
    }

    #[test]
    fn test_recv_after_close_drains_then_ends() {
        let p = Pipe::new(1);
        p.send(&Value::Int(1)).unwrap();
        p.close();
        assert_eq!(p.recv(), Some(Value::Int(1)));
        assert_eq!(p.recv(), None);
        assert!(p.send(&Value::Int(2)).is_err());
    }

    #[test]
    fn test_rendezvous_across_threads() {
        let p = Pipe::new(0);
        let sender = p.clone();
        let handle = thread::spawn(move || {
            for i in 0..3 {
                sender.send(&Value::Int(i)).unwrap();
            }
            sender.close();
        });
        let mut got = Vec::new();
        while let Some(v) = p.recv() {
            got.push(v);
        }
        handle.join().unwrap();
        assert_eq!(got, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
    }
}
