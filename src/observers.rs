//! Observer adapters: progress bar and JSONL streaming

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    Error, Result,
    ports::Observer,
    simulation::SharedContext,
    trace::{SimulationTrace, TraceRecord},
};

/// Progress bar observer - shows simulation progress and the running VFE
pub struct ProgressObserver {
    progress_bar: Option<ProgressBar>,
    vfe_total: f64,
    records: usize,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self {
            progress_bar: None,
            vfe_total: 0.0,
            records: 0,
        }
    }

    fn mean_vfe(&self) -> f64 {
        if self.records == 0 {
            0.0
        } else {
            self.vfe_total / self.records as f64
        }
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for ProgressObserver {
    fn on_simulation_start(&mut self, total_steps: usize, _agent_ids: &[String]) -> Result<()> {
        let pb = ProgressBar::new(total_steps as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} steps (mean VFE {msg})")
                .map_err(|e| Error::ProgressBarTemplate {
                    message: e.to_string(),
                })?
                .progress_chars("=>-"),
        );
        self.progress_bar = Some(pb);
        Ok(())
    }

    fn on_agent_step(&mut self, record: &TraceRecord) -> Result<()> {
        self.vfe_total += record.step.vfe;
        self.records += 1;
        Ok(())
    }

    fn on_step_end(&mut self, step: usize, _context: &SharedContext) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.set_position(step as u64 + 1);
            pb.set_message(format!("{:.3}", self.mean_vfe()));
        }
        Ok(())
    }

    fn on_simulation_end(&mut self, _trace: &SimulationTrace) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message(format!("{:.3}", self.mean_vfe()));
        }
        Ok(())
    }
}

/// JSONL observer - writes each agent step as one JSON line
#[derive(Debug)]
pub struct JsonlObserver {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlObserver {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .map_err(|e| Error::io(format!("create JSONL stream {}", path.display()), e))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    fn write_error(&self, source: std::io::Error) -> Error {
        Error::io(format!("write JSONL stream {}", self.path.display()), source)
    }
}

impl Observer for JsonlObserver {
    fn on_agent_step(&mut self, record: &TraceRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        writeln!(&mut self.writer).map_err(|e| self.write_error(e))
    }

    fn on_step_end(&mut self, _step: usize, _context: &SharedContext) -> Result<()> {
        self.writer.flush().map_err(|e| self.write_error(e))
    }

    fn on_simulation_end(&mut self, _trace: &SimulationTrace) -> Result<()> {
        self.writer.flush().map_err(|e| self.write_error(e))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jsonl_create_error_names_the_stream() {
        let err = JsonlObserver::new("/nonexistent/dir/steps.jsonl").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(
            err.to_string()
                .starts_with("failed to create JSONL stream /nonexistent/dir/steps.jsonl"),
            "{err}"
        );
    }
}
