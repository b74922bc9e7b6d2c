use std::io::{self, Write};

/// A byte sink that can be closed.
///
/// `close` flushes anything the sink buffers and releases the underlying
/// resource. Decorators close the sink they wrap.
pub trait ConsoleSink: Write + Send {
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl ConsoleSink for Vec<u8> {}

impl ConsoleSink for std::fs::File {
    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_data()
    }
}

impl<W: Write + Send> ConsoleSink for io::BufWriter<W> {}

impl ConsoleSink for io::Stdout {}

impl ConsoleSink for io::Stderr {}

impl<S: ConsoleSink + ?Sized> ConsoleSink for Box<S> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}
