use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::style::Stylize;
use indoc::indoc;

use crate::{
    session::{Context, PodKey, Segment, StreamSession, StreamState},
    workers::{PodsView, StatusView},
};

const HELP: &str = indoc! {"
    Commands:
      contexts | ctx               list contexts
      use <context>                switch context
      pods | po                    list pods in the selected namespace
      refresh | r                  reload pods
      namespaces | ns              list namespaces
      ns <namespace>               select a namespace (\"all\" for every namespace)
      select <namespace>/<pod>     tail the pod's logs
      deselect                     stop tailing and forget the pod
      start | stop                 resume or stop the log stream
      search <term> | /<term>      filter and highlight logs (empty term clears)
      logs                         print the buffered logs
      clear                        drop buffered logs
      copy                         copy buffered logs to the clipboard
      describe <namespace>/<pod>   print the pod as YAML
      status                       show the session state
      help | ?                     show this help
      quit | q                     exit
"};

const POD_COLUMNS: [&str; 6] = ["NAMESPACE", "NAME", "READY", "STATUS", "RESTARTS", "AGE"];

/// Line-oriented output with ANSI styling.
pub struct Printer<W: Write> {
    out: W,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn help(&mut self) -> Result<()> {
        write!(self.out, "{}", HELP)?;
        self.flush()
    }

    pub fn contexts(&mut self, contexts: &[Context], current: &str) -> Result<()> {
        writeln!(self.out, "{}", "Contexts".bold())?;

        for context in contexts {
            if context.name == current {
                writeln!(
                    self.out,
                    "* {} ({}, {})",
                    context.name.as_str().green(),
                    context.cluster,
                    context.user
                )?;
            } else {
                writeln!(
                    self.out,
                    "  {} ({}, {})",
                    context.name, context.cluster, context.user
                )?;
            }
        }

        self.flush()
    }

    pub fn pods(&mut self, view: &PodsView, now: DateTime<Utc>) -> Result<()> {
        writeln!(
            self.out,
            "{} context={} namespace={}",
            "Pods".bold(),
            view.context,
            view.namespace
        )?;

        if view.loading {
            writeln!(self.out, "{}", "Loading...".dark_grey())?;
        }

        if let Some(error) = &view.error {
            writeln!(self.out, "{}", format!("Error: {}", error).red())?;
        }

        if view.pods.is_empty() {
            writeln!(self.out, "No pods")?;
            return self.flush();
        }

        let rows: Vec<[String; 6]> = view
            .pods
            .iter()
            .map(|pod| {
                [
                    pod.namespace.clone(),
                    pod.name.clone(),
                    pod.ready.to_string(),
                    pod.status.clone(),
                    pod.restarts.to_string(),
                    pod.age(now),
                ]
            })
            .collect();

        let widths = column_widths(&rows);

        writeln!(self.out, "{}", table_row(POD_COLUMNS.as_slice(), &widths).bold())?;

        for row in &rows {
            writeln!(self.out, "{}", table_row(row.as_slice(), &widths))?;
        }

        self.flush()
    }

    pub fn namespaces(&mut self, namespaces: &[String], selected: &str) -> Result<()> {
        writeln!(self.out, "{}", "Namespaces".bold())?;

        for namespace in namespaces {
            if namespace == selected {
                writeln!(self.out, "* {}", namespace.as_str().green())?;
            } else {
                writeln!(self.out, "  {}", namespace)?;
            }
        }

        self.flush()
    }

    pub fn logs(&mut self, lines: &[Vec<Segment>]) -> Result<()> {
        writeln!(self.out, "{}", format!("--- {} lines ---", lines.len()).dark_grey())?;

        for line in lines {
            self.write_segments(line)?;
        }

        self.flush()
    }

    pub fn log_line(&mut self, line: &[Segment]) -> Result<()> {
        self.write_segments(line)?;
        self.flush()
    }

    fn write_segments(&mut self, line: &[Segment]) -> Result<()> {
        for segment in line {
            if segment.highlighted {
                write!(self.out, "{}", segment.text.as_str().black().on_yellow())?;
            } else {
                write!(self.out, "{}", segment.text)?;
            }
        }

        writeln!(self.out)?;
        Ok(())
    }

    pub fn stream(&mut self, session: &StreamSession) -> Result<()> {
        match (&session.pod, session.active) {
            (Some(pod), true) => writeln!(
                self.out,
                "{}",
                format!("Streaming logs: {}", pod.key()).green()
            )?,
            (Some(pod), false) => writeln!(self.out, "Stream stopped: {}", pod.key())?,
            (None, _) => writeln!(self.out, "No pod selected")?,
        }

        if let Some(error) = &session.error {
            writeln!(self.out, "{}", format!("Error: {}", error).red())?;
        }

        self.flush()
    }

    pub fn describe(&mut self, pod: &PodKey, yaml: &str) -> Result<()> {
        writeln!(self.out, "{}", format!("# {}", pod).bold())?;
        write!(self.out, "{}", yaml)?;
        self.flush()
    }

    pub fn status(&mut self, status: &StatusView, copied: bool) -> Result<()> {
        let pod = status
            .pod
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());

        let state = match status.state {
            StreamState::Streaming => "Streaming".green(),
            StreamState::Errored => "Errored".red(),
            StreamState::Starting => "Starting".yellow(),
            StreamState::Stopping => "Stopping".yellow(),
            StreamState::Idle => "Idle".dark_grey(),
        };

        write!(
            self.out,
            "context={} namespace={} pod={} stream={} lines={}",
            status.context, status.namespace, pod, state, status.lines
        )?;

        if !status.search_term.is_empty() {
            write!(self.out, " search={:?}", status.search_term)?;
        }

        if copied {
            write!(self.out, " {}", "Copied!".green())?;
        }

        writeln!(self.out)?;

        if let Some(error) = &status.error {
            writeln!(self.out, "{}", format!("Error: {}", error).red())?;
        }

        self.flush()
    }

    pub fn notice(&mut self, notice: &str) -> Result<()> {
        writeln!(self.out, "{}", notice.dark_grey())?;
        self.flush()
    }

    pub fn failed(&mut self, message: &str) -> Result<()> {
        writeln!(self.out, "{}", message.red())?;
        self.flush()
    }
}

fn column_widths(rows: &[[String; 6]]) -> [usize; 6] {
    let mut widths = POD_COLUMNS.map(str::len);

    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    widths
}

fn table_row<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell.as_ref(), width = width))
        .collect::<Vec<_>>()
        .join("   ")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Pod;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn output(printer: Printer<Vec<u8>>) -> String {
        String::from_utf8(printer.out).unwrap()
    }

    #[test]
    fn pod_table_is_aligned() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        let view = PodsView {
            context: "kind".into(),
            namespace: "all".into(),
            pods: vec![
                Pod {
                    name: "web-0".into(),
                    namespace: "default".into(),
                    status: "Running".into(),
                    ready: true,
                    restarts: 2,
                    creation_timestamp: Some(now - Duration::minutes(5)),
                    ..Default::default()
                },
                Pod {
                    name: "coredns-abc".into(),
                    namespace: "kube-system".into(),
                    status: "Pending".into(),
                    ..Default::default()
                },
            ],
            loading: false,
            error: None,
        };

        let mut printer = Printer::new(Vec::new());
        printer.pods(&view, now).unwrap();

        let out = output(printer);
        let lines: Vec<&str> = out.lines().skip(2).collect();

        assert_eq!(
            lines,
            vec![
                "default       web-0         true    Running   2          5m",
                "kube-system   coredns-abc   false   Pending   0          <unknown>",
            ]
        );
    }

    #[test]
    fn empty_inventory() {
        let mut printer = Printer::new(Vec::new());

        printer
            .pods(
                &PodsView {
                    error: Some("InventoryFetchFailed: forbidden".into()),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();

        let out = output(printer);

        assert!(out.contains("Error: InventoryFetchFailed: forbidden"));
        assert!(out.ends_with("No pods\n"));
    }

    #[test]
    fn matches_are_highlighted() {
        let mut printer = Printer::new(Vec::new());

        printer
            .log_line(&[Segment::plain("level="), Segment::matched("ERROR")])
            .unwrap();

        assert_eq!(
            output(printer),
            format!("level={}\n", "ERROR".black().on_yellow())
        );
    }

    #[test]
    fn current_context_is_marked() {
        let mut printer = Printer::new(Vec::new());

        printer
            .contexts(
                &[
                    Context {
                        name: "dev".into(),
                        cluster: "c1".into(),
                        user: "u1".into(),
                    },
                    Context {
                        name: "prod".into(),
                        cluster: "c2".into(),
                        user: "u2".into(),
                    },
                ],
                "prod",
            )
            .unwrap();

        let out = output(printer);
        let lines: Vec<&str> = out.lines().skip(1).collect();

        assert_eq!(
            lines,
            vec![
                "  dev (c1, u1)".to_string(),
                format!("* {} (c2, u2)", "prod".green()),
            ]
        );
    }

    #[test]
    fn status_line() {
        let mut printer = Printer::new(Vec::new());

        printer
            .status(
                &StatusView {
                    context: "kind".into(),
                    namespace: "default".into(),
                    pod: Some(PodKey::new("default", "web")),
                    state: StreamState::Streaming,
                    lines: 3,
                    search_term: "err".into(),
                    error: None,
                },
                false,
            )
            .unwrap();

        assert_eq!(
            output(printer),
            format!(
                "context=kind namespace=default pod=default/web stream={} lines=3 search=\"err\"\n",
                "Streaming".green()
            )
        );
    }
}
