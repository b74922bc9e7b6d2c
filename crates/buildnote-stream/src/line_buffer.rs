use crate::sink::ConsoleSink;
use buildnote_core::Charset;
use std::io::{self, Write};

/// Per-line callback of a [`LineTransformWriter`].
pub trait LineHook {
    /// Called once per line.
    ///
    /// `line` is the decoded text with the terminator removed, `raw` the exact
    /// bytes including the terminator (absent for a trailing partial line).
    /// Bytes appended to `prefix` are written ahead of `raw`.
    fn eol(&mut self, line: &str, raw: &[u8], prefix: &mut Vec<u8>);
}

/// Decorator that buffers writes into lines and hands each one to a hook.
///
/// Every line reaches the wrapped sink as one `write_all` of
/// `prefix ++ raw`, so the raw bytes are forwarded unchanged and in order no
/// matter how the input was chunked. A line without a terminator stays
/// buffered until [`ConsoleSink::close`].
pub struct LineTransformWriter<S, H> {
    inner: S,
    hook: H,
    charset: Charset,
    buf: Vec<u8>,
    scratch: Vec<u8>,
    deferred: Option<io::Error>,
    closed: bool,
}

impl<S: ConsoleSink, H: LineHook> LineTransformWriter<S, H> {
    pub fn new(inner: S, hook: H, charset: Charset) -> Self {
        Self {
            inner,
            hook,
            charset,
            buf: Vec::new(),
            scratch: Vec::new(),
            deferred: None,
            closed: false,
        }
    }

    pub fn hook(&self) -> &H {
        &self.hook
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Bytes of the current partial line.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_parts(self) -> (S, H) {
        (self.inner, self.hook)
    }

    fn emit(&mut self, raw: &[u8]) -> io::Result<()> {
        let line = self.charset.decode(trim_eol(raw));
        self.scratch.clear();
        self.hook.eol(&line, raw, &mut self.scratch);
        self.scratch.extend_from_slice(raw);
        self.inner.write_all(&self.scratch)
    }

    fn emit_buffered(&mut self) -> io::Result<()> {
        let mut line = std::mem::take(&mut self.buf);
        let result = self.emit(&line);
        line.clear();
        self.buf = line;
        result
    }
}

impl<S: ConsoleSink, H: LineHook> Write for LineTransformWriter<S, H> {
    /// Forwards every complete line in `data` and buffers the remainder.
    ///
    /// If the sink fails after earlier lines of `data` were already
    /// forwarded, the bytes of those lines are reported as written and the
    /// error is returned by the next call (`write`, `flush` or `close`).
    /// An `Err` therefore always means none of `data` was consumed.
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "console sink already closed",
            ));
        }
        if let Some(e) = self.deferred.take() {
            return Err(e);
        }
        let mut consumed = 0;
        let mut rest = data;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(pos + 1);
            let emitted = if self.buf.is_empty() {
                self.emit(head)
            } else {
                self.buf.extend_from_slice(head);
                self.emit_buffered()
            };
            if let Err(e) = emitted {
                if consumed == 0 {
                    return Err(e);
                }
                self.deferred = Some(e);
                return Ok(consumed);
            }
            consumed += head.len();
            rest = tail;
        }
        self.buf.extend_from_slice(rest);
        Ok(data.len())
    }

    /// Flushes the wrapped sink. A partial line stays buffered.
    fn flush(&mut self) -> io::Result<()> {
        if let Some(e) = self.deferred.take() {
            return Err(e);
        }
        self.inner.flush()
    }
}

impl<S: ConsoleSink, H: LineHook + Send> ConsoleSink for LineTransformWriter<S, H> {
    /// Push out a trailing partial line, then close the wrapped sink even if
    /// that failed. Returns the first error. Closing twice is a no-op.
    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let flushed = match self.deferred.take() {
            Some(e) => Err(e),
            None if self.buf.is_empty() => Ok(()),
            None => self.emit_buffered(),
        };
        let closed = self.inner.close();
        flushed.and(closed)
    }
}

fn trim_eol(raw: &[u8]) -> &[u8] {
    let mut end = raw.len();
    while end > 0 && matches!(raw[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &raw[..end]
}
