use std::collections::HashMap;
use std::io::{self, Read, Write};

use milxly2nvg::config::EnvProvider;

/// Reader that hands out at most `chunk` bytes per call
pub struct TrickleReader<R> {
    inner: R,
    chunk: usize,
}

impl<R: Read> TrickleReader<R> {
    pub fn new(inner: R, chunk: usize) -> Self {
        Self {
            inner,
            chunk: chunk.max(1),
        }
    }
}

impl<R: Read> Read for TrickleReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.chunk);
        self.inner.read(&mut buf[..len])
    }
}

/// Reader that fails after `limit` bytes
pub struct FailingReader<R> {
    inner: R,
    remaining: usize,
}

impl<R: Read> FailingReader<R> {
    pub fn new(inner: R, limit: usize) -> Self {
        Self {
            inner,
            remaining: limit,
        }
    }
}

impl<R: Read> Read for FailingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "source went away"));
        }
        let len = buf.len().min(self.remaining);
        let read = self.inner.read(&mut buf[..len])?;
        self.remaining -= read;
        Ok(read)
    }
}

/// Writer that accepts `limit` bytes and then reports a full disk
pub struct FailingWriter {
    pub written: Vec<u8>,
    limit: usize,
}

impl FailingWriter {
    pub fn new(limit: usize) -> Self {
        Self {
            written: Vec::new(),
            limit,
        }
    }
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.limit - self.written.len();
        if room == 0 {
            return Err(io::Error::new(io::ErrorKind::StorageFull, "disk full"));
        }
        let len = buf.len().min(room);
        self.written.extend_from_slice(&buf[..len]);
        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Environment provider backed by a map
#[derive(Default)]
pub struct MockEnvProvider {
    vars: HashMap<String, String>,
}

impl MockEnvProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }
}

impl EnvProvider for MockEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}
