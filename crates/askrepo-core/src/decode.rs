//! Line-buffering stream consumer.
//!
//! Agent processes write newline-delimited JSON, but the pipe delivers it in
//! arbitrary byte chunks: a single JSON line may be split across reads. The
//! decoder owns only the buffering; the format-specific mapping from a
//! complete line to an [`AgentEvent`] belongs to each backend's
//! [`LineMapper`].

use crate::event::AgentEvent;

/// Maps one complete native-format line to at most one normalized event.
///
/// Stateful by design: the lenient mapper accumulates assistant text across
/// lines and only emits a terminal event when its native stream says so.
/// Lines that don't map to anything return `None` and are dropped.
pub trait LineMapper {
    fn map_line(&mut self, line: &str) -> Option<AgentEvent>;
}

/// Buffers raw byte chunks and yields complete lines.
///
/// Handles `\n` and `\r\n` endings; a trailing partial line is held until
/// the next chunk or [`LineDecoder::finish`].
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every line completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Flush the remaining partial line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        Some(line)
    }
}

/// A [`LineDecoder`] paired with a backend's [`LineMapper`].
///
/// Feeding a byte sequence split at arbitrary points yields exactly the
/// same events as feeding it unsplit, in native-stream order.
#[derive(Debug)]
pub struct StreamConsumer<M> {
    decoder: LineDecoder,
    mapper: M,
}

impl<M: LineMapper> StreamConsumer<M> {
    pub fn new(mapper: M) -> Self {
        Self {
            decoder: LineDecoder::new(),
            mapper,
        }
    }

    /// Feed a raw chunk, returning the events mapped from lines it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<AgentEvent> {
        self.decoder
            .push(chunk)
            .iter()
            .filter_map(|line| self.mapper.map_line(line))
            .collect()
    }

    /// Flush any buffered partial line through the mapper.
    pub fn finish(&mut self) -> Option<AgentEvent> {
        let line = self.decoder.finish()?;
        self.mapper.map_line(&line)
    }

    /// Access the mapper, e.g. to finalize after stream end.
    pub fn mapper_mut(&mut self) -> &mut M {
        &mut self.mapper
    }
}
