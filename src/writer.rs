//! Iteration output: a fixed-width table on stdout and, optionally, the same
//! rows appended to a CSV file.

use crate::runner::IterationLog;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Run header printed before the first iteration
#[derive(Debug, Clone)]
pub struct RunHeader {
    pub instance: String,
    pub variant: String,
    pub num_ants: usize,
    pub beta: f64,
    pub rho: f64,
    pub rank_window: usize,
}

impl std::fmt::Display for RunHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Date: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "TSP: {}", self.instance)?;
        writeln!(f, "ACO: {}", self.variant)?;
        writeln!(f, "numAnts: {}", self.num_ants)?;
        write!(f, "Alpha: 1 Beta: {} Rho: {} W: {}", self.beta, self.rho, self.rank_window)
    }
}

pub struct IterationWriter {
    echo: bool,
    csv: Option<csv::Writer<File>>,
}

impl IterationWriter {
    /// `echo` controls the stdout table.
    pub fn new(echo: bool) -> Self {
        IterationWriter { echo, csv: None }
    }

    /// Also append rows to `path`; the CSV header is written only when the
    /// file starts out empty.
    pub fn with_csv<P: AsRef<Path>>(mut self, path: P) -> Result<Self, csv::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path.as_ref())?;
        let empty = file.metadata()?.len() == 0;
        let writer = csv::WriterBuilder::new().has_headers(empty).from_writer(file);
        self.csv = Some(writer);
        Ok(self)
    }

    pub fn write_header(&self, header: &RunHeader) {
        if self.echo {
            println!("\n{}", header);
            println!(
                "{:<10} {:>14} {:>14} {:>10} {:>10}",
                "Iteration", "Iter_Best", "Glob_Best", "Time", "Iter_Time"
            );
        }
    }

    pub fn write(&mut self, log_line: &IterationLog) -> Result<(), csv::Error> {
        if self.echo {
            println!("{}", format_row(log_line));
        }
        if let Some(writer) = self.csv.as_mut() {
            writer.serialize(log_line)?;
            writer.flush()?;
        }
        Ok(())
    }
}

pub fn format_row(log_line: &IterationLog) -> String {
    format!(
        "{:<10} {:>14.2} {:>14.2} {:>10.4} {:>10.4}",
        log_line.iteration, log_line.iteration_best, log_line.global_best, log_line.elapsed, log_line.iteration_time
    )
}
