//! 追加写的文本 trace 输出
//!
//! 每个观测事件一行，字段以制表符分隔，第一个字段是仿真时间（秒）。

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::sim::SimTime;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only trace stream.
pub struct TraceSink<W = Box<dyn Write>> {
    out: W,
    lines: u64,
}

impl TraceSink<Box<dyn Write>> {
    /// 创建（截断）文件作为 trace 输出，整个仿真期间只打开一次。
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let file = File::create(path)?;
        Ok(Self::boxed(BufWriter::new(file)))
    }

    pub fn boxed(out: impl Write + 'static) -> Self {
        Self::new(Box::new(out))
    }
}

impl<W: Write> TraceSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, lines: 0 }
    }

    /// 追加一行：`<time>\t<field>\t<field>...`
    pub fn append(&mut self, at: SimTime, fields: &[&dyn fmt::Display]) -> Result<(), TraceError> {
        write!(self.out, "{}", at.as_secs_f64())?;
        for field in fields {
            write!(self.out, "\t{field}")?;
        }
        writeln!(self.out)?;
        self.lines += 1;
        Ok(())
    }

    /// 已写入的行数
    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn flush(&mut self) -> Result<(), TraceError> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W> fmt::Debug for TraceSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceSink")
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}
