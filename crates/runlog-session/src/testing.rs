//! Canned-response fake source for session and poller tests.

use std::collections::VecDeque;
use std::sync::Mutex as StdMutex;
use std::sync::mpsc;
use std::time::Duration;

use runlog_core::types::{HistoryPage, TailChunk, TaskId};

use crate::source::{LogSource, SourceError};

/// Fake transport: queues of canned responses plus a call log.
///
/// Empty queues fall back to benign defaults (empty tail at the caller's
/// position, empty final history page, successful clear). An optional
/// gate makes tail reads block until released, for in-flight tests.
pub(crate) struct FakeSource {
    tails: StdMutex<VecDeque<Result<TailChunk, SourceError>>>,
    histories: StdMutex<VecDeque<Result<HistoryPage, SourceError>>>,
    clears: StdMutex<VecDeque<Result<(), SourceError>>>,
    calls: StdMutex<Vec<String>>,
    gate_tx: StdMutex<Option<mpsc::Sender<()>>>,
    gate_rx: StdMutex<Option<mpsc::Receiver<()>>>,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self {
            tails: StdMutex::new(VecDeque::new()),
            histories: StdMutex::new(VecDeque::new()),
            clears: StdMutex::new(VecDeque::new()),
            calls: StdMutex::new(Vec::new()),
            gate_tx: StdMutex::new(None),
            gate_rx: StdMutex::new(None),
        }
    }

    pub(crate) fn with_tail(self, response: Result<TailChunk, SourceError>) -> Self {
        self.tails.lock().unwrap().push_back(response);
        self
    }

    pub(crate) fn with_history(self, response: Result<HistoryPage, SourceError>) -> Self {
        self.histories.lock().unwrap().push_back(response);
        self
    }

    pub(crate) fn with_clear(self, response: Result<(), SourceError>) -> Self {
        self.clears.lock().unwrap().push_back(response);
        self
    }

    /// Make every tail read block until `release_tail` is called.
    pub(crate) fn with_gated_tails(self) -> Self {
        let (tx, rx) = mpsc::channel();
        *self.gate_tx.lock().unwrap() = Some(tx);
        *self.gate_rx.lock().unwrap() = Some(rx);
        self
    }

    /// Let one gated tail read proceed.
    pub(crate) fn release_tail(&self) {
        if let Some(tx) = self.gate_tx.lock().unwrap().as_ref() {
            tx.send(()).expect("gate receiver alive");
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Spin until a tail read has been recorded (it may be parked on
    /// the gate right after recording).
    pub(crate) async fn wait_for_tail_call(&self) {
        for _ in 0..200 {
            if self.calls().iter().any(|c| c.starts_with("tail")) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("tail call never observed");
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl LogSource for FakeSource {
    fn read_tail(&self, task: TaskId, from_pos: u64) -> Result<TailChunk, SourceError> {
        self.record(format!("tail task={task} from={from_pos}"));
        if let Some(rx) = self.gate_rx.lock().unwrap().as_ref() {
            rx.recv().expect("gate sender alive");
        }
        self.tails
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(TailChunk {
                new_content: String::new(),
                new_pos: from_pos as i64,
            }))
    }

    fn read_history(
        &self,
        task: TaskId,
        before_offset: u64,
        limit_lines: u32,
    ) -> Result<HistoryPage, SourceError> {
        self.record(format!(
            "history task={task} before={before_offset} limit={limit_lines}"
        ));
        self.histories
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(HistoryPage {
                content: String::new(),
                next_offset: 0,
                has_more: false,
                new_pos: 0,
            }))
    }

    fn clear_log(&self, task: TaskId) -> Result<(), SourceError> {
        self.record(format!("clear task={task}"));
        self.clears.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}
