//! Append-only attack log with an optional JSON-lines file writer.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::engine::types::AttackRecord;

/// Background writer that appends records to a file as JSON lines.
#[derive(Clone, Debug)]
pub struct FileWriter {
    // Shared optional sender so close() can take the sender and drop it.
    sender: Arc<Mutex<Option<Sender<AttackRecord>>>>,
    _handle: Arc<Mutex<Option<thread::JoinHandle<()>>>>,
}

impl FileWriter {
    pub fn new(path: PathBuf) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<AttackRecord>();
        let sender = Arc::new(Mutex::new(Some(tx)));
        let handle = thread::spawn(move || {
            let file = match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(f) => f,
                Err(e) => {
                    log::error!("AttackLog FileWriter: failed to open {path:?}: {e}");
                    return;
                }
            };
            let mut writer = BufWriter::new(file);
            for record in rx {
                match serde_json::to_vec(&record) {
                    Ok(mut bytes) => {
                        bytes.push(b'\n');
                        if let Err(e) = writer.write_all(&bytes) {
                            log::error!("AttackLog FileWriter: write failed: {e}");
                        }
                        if let Err(e) = writer.flush() {
                            log::error!("AttackLog FileWriter: flush failed: {e}");
                        }
                    }
                    Err(e) => log::error!("AttackLog FileWriter: serialize failed: {e}"),
                }
            }
            let _ = writer.flush();
        });

        Ok(FileWriter {
            sender,
            _handle: Arc::new(Mutex::new(Some(handle))),
        })
    }

    pub fn send(&self, record: AttackRecord) {
        // best-effort send; ignore failures (e.g., receiver dropped)
        let guard = match self.sender.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        if let Some(tx) = &*guard {
            let _ = tx.send(record);
        }
    }

    /// Drop the sender and join the writer thread so pending writes flush.
    pub fn close(&self) {
        {
            let mut guard = match self.sender.lock() {
                Ok(g) => g,
                Err(e) => e.into_inner(),
            };
            *guard = None;
        }
        let handle_opt = {
            let mut h = match self._handle.lock() {
                Ok(g) => g,
                Err(e) => e.into_inner(),
            };
            h.take()
        };
        if let Some(h) = handle_opt {
            let _ = h.join();
        }
    }
}

/// The append-only AttackRecord stream. Appends assign a strictly
/// incrementing sequence number and land in memory synchronously; the file
/// writer runs off-thread.
#[derive(Debug, Default)]
pub struct AttackLog {
    entries: Mutex<Vec<AttackRecord>>,
    seq: AtomicU64,
    writer: Option<FileWriter>,
}

impl AttackLog {
    pub fn new() -> Self {
        AttackLog {
            entries: Mutex::new(Vec::new()),
            seq: AtomicU64::new(0),
            writer: None,
        }
    }

    pub fn set_writer(&mut self, writer: Option<FileWriter>) {
        self.writer = writer;
    }

    pub fn load_from_file(path: &str) -> Result<AttackLog, String> {
        let file = File::open(path).map_err(|e| e.to_string())?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut max_seq = 0u64;
        for line in reader.lines() {
            let line = line.map_err(|e| e.to_string())?;
            if line.trim().is_empty() {
                continue;
            }
            let record: AttackRecord = serde_json::from_str(&line).map_err(|e| e.to_string())?;
            if record.seq > max_seq {
                max_seq = record.seq;
            }
            entries.push(record);
        }
        let log = AttackLog::new();
        {
            match log.entries.lock() {
                Ok(mut g) => *g = entries,
                Err(e) => *e.into_inner() = entries,
            };
        }
        log.seq.store(max_seq, Ordering::SeqCst);
        Ok(log)
    }

    pub fn write_all_to_file(&self, path: &str) -> Result<(), String> {
        let entries = self.entries();
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| e.to_string())?;
        for e in entries {
            let line = serde_json::to_string(&e).map_err(|e| e.to_string())?;
            writeln!(f, "{line}").map_err(|e| e.to_string())?;
        }
        f.flush().map_err(|e| e.to_string())
    }

    /// Append a record, assigning its sequence number.
    pub fn append(&self, mut record: AttackRecord) -> AttackRecord {
        record.seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        match self.entries.lock() {
            Ok(mut g) => g.push(record.clone()),
            Err(e) => e.into_inner().push(record.clone()),
        }
        if let Some(w) = &self.writer {
            w.send(record.clone());
        }
        record
    }

    /// Cloned snapshot of the stream for inspection.
    pub fn entries(&self) -> Vec<AttackRecord> {
        match self.entries.lock() {
            Ok(g) => g.clone(),
            Err(e) => e.into_inner().clone(),
        }
    }

    pub fn shutdown(&self) {
        if let Some(w) = &self.writer {
            w.close();
        }
    }
}
