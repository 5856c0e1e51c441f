// src/trace_io.rs
//
// Recorded detector output in, per-frame steering results out.
//
// A fit trace is JSON Lines, one raw detection per frame:
//   {"frame": 0, "timestamp_ms": 0.0, "left": [A, B, C], "right": null}
// Results go to `io.output_dir` as `<stem>_steering.jsonl`, one
// serialized FrameOutput per line.

use crate::pipeline::FrameOutput;
use crate::types::{FrameInput, IoConfig};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const TRACE_EXTENSION: &str = "jsonl";
const OUTPUT_SUFFIX: &str = "_steering";

pub struct TraceProcessor {
    io: IoConfig,
}

impl TraceProcessor {
    pub fn new(io: IoConfig) -> Self {
        Self { io }
    }

    pub fn find_trace_files(&self) -> Result<Vec<PathBuf>> {
        let mut traces = Vec::new();

        for entry in WalkDir::new(&self.io.input_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if is_trace_file(path) {
                traces.push(path.to_path_buf());
            }
        }

        traces.sort();
        info!("Found {} fit trace files", traces.len());
        Ok(traces)
    }

    pub fn open_trace(&self, path: &Path) -> Result<TraceReader<BufReader<File>>> {
        info!("Opening trace: {}", path.display());
        let file =
            File::open(path).with_context(|| format!("opening trace {}", path.display()))?;
        Ok(TraceReader::new(BufReader::new(file)))
    }

    pub fn create_writer(&self, input_path: &Path) -> Result<TraceWriter<BufWriter<File>>> {
        std::fs::create_dir_all(&self.io.output_dir)
            .with_context(|| format!("creating output dir {}", self.io.output_dir))?;

        let output_path = self.output_path_for(input_path);
        let file = File::create(&output_path)
            .with_context(|| format!("creating {}", output_path.display()))?;
        info!("💾 Results will be written to: {}", output_path.display());

        Ok(TraceWriter::new(BufWriter::new(file), output_path))
    }

    pub fn output_path_for(&self, input_path: &Path) -> PathBuf {
        let stem = input_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "trace".to_string());
        PathBuf::from(&self.io.output_dir).join(format!(
            "{}{}.{}",
            stem, OUTPUT_SUFFIX, TRACE_EXTENSION
        ))
    }
}

fn is_trace_file(path: &Path) -> bool {
    let is_jsonl = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(TRACE_EXTENSION))
        .unwrap_or(false);
    // Skip our own results when output_dir sits inside input_dir.
    let is_output = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.ends_with(OUTPUT_SUFFIX))
        .unwrap_or(false);
    is_jsonl && !is_output
}

pub struct TraceReader<R> {
    reader: R,
    line_no: usize,
    buf: String,
    pub frames_read: u64,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: String::new(),
            frames_read: 0,
        }
    }

    /// Next frame, skipping blank lines. `Ok(None)` at end of trace.
    pub fn read_frame(&mut self) -> Result<Option<FrameInput>> {
        loop {
            self.buf.clear();
            let n = self
                .reader
                .read_line(&mut self.buf)
                .with_context(|| format!("reading trace line {}", self.line_no + 1))?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }

            let frame: FrameInput = serde_json::from_str(line)
                .with_context(|| format!("parsing trace line {}", self.line_no))?;
            self.frames_read += 1;
            return Ok(Some(frame));
        }
    }
}

pub struct TraceWriter<W> {
    out: W,
    path: PathBuf,
    pub frames_written: u64,
}

impl<W: Write> TraceWriter<W> {
    pub fn new(out: W, path: PathBuf) -> Self {
        Self {
            out,
            path,
            frames_written: 0,
        }
    }

    pub fn write_frame(&mut self, output: &FrameOutput) -> Result<()> {
        let json_line = serde_json::to_string(output)?;
        writeln!(self.out, "{}", json_line)?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<PathBuf> {
        self.out.flush()?;
        debug!(
            "Wrote {} frames to {}",
            self.frames_written,
            self.path.display()
        );
        Ok(self.path)
    }
}
