use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Serialize)]
struct FrameRecord<'a> {
    frame: u64,
    time: f64,
    bars: &'a [f32],
}

/// Writes one JSON object per analyzed frame, newline-delimited.
pub struct FrameWriter<W: Write> {
    writer: W,
    written: u64,
}

impl FrameWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn write_frame(&mut self, frame: u64, time: f64, bars: &[f32]) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &FrameRecord { frame, time, bars })
            .context("Failed to serialize frame")?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush().context("Failed to flush output")?;
        Ok(self.writer)
    }
}
