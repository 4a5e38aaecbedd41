//! Append-only record of a simulation run
//!
//! The trace is what the plotting layer consumes: one [`TraceRecord`] per
//! agent per step, in the order the agents stepped.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, agent::StepRecord};

/// One agent's step inside a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub step_index: usize,
    pub agent_id: String,
    #[serde(flatten)]
    pub step: StepRecord,
}

/// Flat CSV row; beliefs are joined with `;` so every row has the same columns
#[derive(Serialize)]
struct CsvRow<'a> {
    step_index: usize,
    agent_id: &'a str,
    state: usize,
    state_label: &'a str,
    action: usize,
    action_label: &'a str,
    observation: usize,
    observation_label: &'a str,
    vfe: f64,
    efe: f64,
    planned_efe: f64,
    fatigue: f64,
    belief_entropy: f64,
    surprise: Option<f64>,
    belief: String,
}

impl<'a> From<&'a TraceRecord> for CsvRow<'a> {
    fn from(record: &'a TraceRecord) -> Self {
        let step = &record.step;
        Self {
            step_index: record.step_index,
            agent_id: &record.agent_id,
            state: step.state,
            state_label: &step.state_label,
            action: step.action,
            action_label: &step.action_label,
            observation: step.observation,
            observation_label: &step.observation_label,
            vfe: step.vfe,
            efe: step.efe,
            planned_efe: step.planned_efe,
            fatigue: step.fatigue,
            belief_entropy: step.belief_entropy,
            surprise: step.surprise,
            belief: step
                .belief
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

/// Ordered per-step records of every agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationTrace {
    records: Vec<TraceRecord>,
}

impl SimulationTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TraceRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct agent ids in first-seen order.
    pub fn agent_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for record in &self.records {
            if !ids.contains(&record.agent_id.as_str()) {
                ids.push(&record.agent_id);
            }
        }
        ids
    }

    pub fn for_agent<'a>(&'a self, agent_id: &'a str) -> impl Iterator<Item = &'a StepRecord> {
        self.records
            .iter()
            .filter(move |record| record.agent_id == agent_id)
            .map(|record| &record.step)
    }

    pub fn last_for(&self, agent_id: &str) -> Option<&StepRecord> {
        self.records
            .iter()
            .rev()
            .find(|record| record.agent_id == agent_id)
            .map(|record| &record.step)
    }

    pub fn vfe_series(&self, agent_id: &str) -> Vec<f64> {
        self.for_agent(agent_id).map(|step| step.vfe).collect()
    }

    pub fn efe_series(&self, agent_id: &str) -> Vec<f64> {
        self.for_agent(agent_id).map(|step| step.efe).collect()
    }

    pub fn state_series(&self, agent_id: &str) -> Vec<usize> {
        self.for_agent(agent_id).map(|step| step.state).collect()
    }

    /// Beliefs over time, one row per step (the belief heatmap).
    pub fn belief_matrix(&self, agent_id: &str) -> Vec<Vec<f64>> {
        self.for_agent(agent_id)
            .map(|step| step.belief.clone())
            .collect()
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)?;
        for record in &self.records {
            writer.serialize(CsvRow::from(record))?;
        }
        writer
            .flush()
            .map_err(|e| Error::io(format!("write trace {}", path.display()), e))?;
        Ok(())
    }

    /// Pretty-printed JSON array of records.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| Error::io(format!("create trace {}", path.display()), e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.records)?;
        writeln!(writer)
            .and_then(|()| writer.flush())
            .map_err(|e| Error::io(format!("write trace {}", path.display()), e))?;
        Ok(())
    }

    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::io(format!("open trace {}", path.display()), e))?;
        let records = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(Self { records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(state: usize, vfe: f64) -> StepRecord {
        StepRecord {
            state,
            state_label: format!("s{state}"),
            action: 0,
            action_label: "serve".into(),
            observation: 1,
            observation_label: "lose".into(),
            belief: vec![0.5, 0.5],
            belief_entropy: std::f64::consts::LN_2,
            vfe,
            efe: 0.1,
            planned_efe: 0.3,
            fatigue: 0.0,
            surprise: None,
        }
    }

    #[test]
    fn series_are_split_by_agent() {
        let mut trace = SimulationTrace::new();
        for i in 0..3 {
            trace.push(TraceRecord {
                step_index: i,
                agent_id: "a".into(),
                step: step(i, i as f64),
            });
            trace.push(TraceRecord {
                step_index: i,
                agent_id: "b".into(),
                step: step(0, -(i as f64)),
            });
        }
        assert_eq!(trace.agent_ids(), vec!["a", "b"]);
        assert_eq!(trace.vfe_series("a"), vec![0.0, 1.0, 2.0]);
        assert_eq!(trace.state_series("b"), vec![0, 0, 0]);
        assert_eq!(trace.belief_matrix("a").len(), 3);
        assert_eq!(trace.last_for("b").map(|s| s.vfe), Some(-2.0));
        assert!(trace.vfe_series("missing").is_empty());
    }

    #[test]
    fn read_error_names_the_trace_path() {
        let err = SimulationTrace::read_json("/nonexistent/dir/trace.json").unwrap_err();
        assert!(
            err.to_string()
                .starts_with("failed to open trace /nonexistent/dir/trace.json"),
            "{err}"
        );
    }
}
