use std::io::{self, Read, Write};

/// Wraps a `Write` and tracks how many bytes have passed through it.
///
/// `NodeLog::add` uses this to learn how many bytes a single serialize call
/// produced, without `NodeLog` having to serialize twice or pre-compute a
/// record size.
pub struct CountingWriter<W> {
    inner: W,
    pub amount: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        CountingWriter { inner, amount: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.amount += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Wraps a `Read` and tracks the cumulative number of bytes read.
///
/// The reverser uses this to learn the node record size: after parsing
/// the first node from a stream that started at position 0, `pos` is
/// exactly one record's length.
pub struct CountingReader<R> {
    inner: R,
    pub pos: u64,
}

impl<R: Read> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        CountingReader { inner, pos: 0 }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}
