use crate::sink::ConsoleSink;
use buildnote_core::{NoteCodec, NoteKey};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

pub fn codec() -> Arc<NoteCodec> {
    Arc::new(NoteCodec::new(NoteKey::from_bytes([42u8; 32])))
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub bytes: Vec<u8>,
    /// One entry per `write` call that reached the sink.
    pub writes: usize,
    pub closes: usize,
}

/// Sink whose contents stay observable after it has been boxed into a chain.
#[derive(Clone, Default)]
pub struct SharedSink {
    pub recorded: Arc<Mutex<Recorded>>,
    pub fail_writes: bool,
    /// Accept this many writes, then fail like `fail_writes`.
    pub fail_after: Option<usize>,
    pub fail_close: bool,
}

impl SharedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn failing_after(writes: usize) -> Self {
        Self {
            fail_after: Some(writes),
            ..Self::default()
        }
    }

    pub fn failing_close() -> Self {
        Self {
            fail_close: true,
            ..Self::default()
        }
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.recorded.lock().unwrap().bytes.clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.bytes()).unwrap()
    }

    pub fn writes(&self) -> usize {
        self.recorded.lock().unwrap().writes
    }

    pub fn closes(&self) -> usize {
        self.recorded.lock().unwrap().closes
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut rec = self.recorded.lock().unwrap();
        if self.fail_writes || self.fail_after.is_some_and(|n| rec.writes >= n) {
            return Err(io::Error::other("disk full"));
        }
        rec.bytes.extend_from_slice(buf);
        rec.writes += 1;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ConsoleSink for SharedSink {
    fn close(&mut self) -> io::Result<()> {
        self.recorded.lock().unwrap().closes += 1;
        if self.fail_close {
            return Err(io::Error::other("close failed"));
        }
        Ok(())
    }
}
