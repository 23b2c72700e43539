//! Line-oriented rendering of the client view.
//!
//! The view is published as a whole every time anything changes. The console
//! prints only what is new since the previous render: status changes, log
//! entries not yet shown (oldest first), a summary line when a new snapshot
//! was applied, and a newly raised error.

use std::io::{self, Write};

use slotwatch_core::{ClientView, MonitorSnapshot};

/// Writes view changes to `W`.
#[derive(Debug)]
pub struct ConsoleView<W: Write> {
    out: W,
    status: Option<String>,
    last_entry: Option<u64>,
    last_snapshot: Option<u64>,
    error: Option<String>,
}

impl<W: Write> ConsoleView<W> {
    /// Console writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out, status: None, last_entry: None, last_snapshot: None, error: None }
    }

    /// Print whatever changed since the last call.
    pub fn render(&mut self, view: &ClientView) -> io::Result<()> {
        if self.status.as_deref() != Some(view.status_label.as_str()) {
            writeln!(self.out, "status: {}", view.status_label)?;
            self.status = Some(view.status_label.clone());
        }

        for entry in view.logs.iter().rev() {
            let seq = entry.id().seq();
            if self.last_entry.is_some_and(|last| seq <= last) {
                continue;
            }
            writeln!(self.out, "{entry}")?;
            self.last_entry = Some(seq);
        }

        if let Some(snapshot) = &view.snapshot {
            let seq = snapshot.seq.value();
            if self.last_snapshot != Some(seq) {
                writeln!(self.out, "{}", summary(snapshot))?;
                self.last_snapshot = Some(seq);
            }
        }

        if view.last_error != self.error {
            if let Some(error) = &view.last_error {
                writeln!(self.out, "error: {error} (/dismiss to clear)")?;
            }
            self.error = view.last_error.clone();
        }

        self.out.flush()
    }

    /// Print the full current state.
    pub fn status(&mut self, view: &ClientView) -> io::Result<()> {
        writeln!(self.out, "status: {}", view.status_label)?;
        match &view.snapshot {
            Some(snapshot) => writeln!(self.out, "{}", summary(snapshot))?,
            None => writeln!(self.out, "monitors: not loaded")?,
        }
        let controls = view.controls;
        let offered: Vec<&str> = [
            (controls.can_start, "/start"),
            (controls.can_stop, "/stop"),
            (controls.can_book, "/book"),
        ]
        .into_iter()
        .filter_map(|(enabled, name)| enabled.then_some(name))
        .collect();
        if view.busy {
            writeln!(self.out, "controls: request in flight")?;
        } else {
            writeln!(self.out, "controls: {}", offered.join(" "))?;
        }
        writeln!(self.out, "log: {} entries", view.logs.len())?;
        if let Some(error) = &view.last_error {
            writeln!(self.out, "error: {error}")?;
        }
        self.out.flush()
    }

    /// Print a line verbatim.
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn summary(snapshot: &MonitorSnapshot) -> String {
    let stats = snapshot.stats();
    let monitoring = match &snapshot.active_monitor {
        Some(active) => match &active.run_id {
            Some(run_id) => format!("monitor #{} running (run {run_id})", active.id),
            None => format!("monitor #{} running", active.id),
        },
        None => "idle".to_string(),
    };
    format!("monitors: {} total, {} active; {monitoring}", stats.total, stats.active)
}
