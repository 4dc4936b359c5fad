// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Queue-state reports for the short (0x03) and long (0x04) status commands.
//
// The report is plain text in the layout BSD `lpq` clients expect:
//
//   laser is ready and printing
//   Rank    Owner   Job     File(s)                         Total Size
//   active  alice   12      report.pdf                      2048 bytes
//   1st     bob     13      notes.txt                       1024 bytes

use std::fmt::Write as _;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use lpdgate_core::types::{DEFAULT_JOB_TITLE, JobQuery, JobRecord, JobState, PrinterState};

use super::command::{split_first_word, split_leading_job_id};
use super::connection::{LpdConnection, ProtocolStatus};
use super::destination::resolve_destination;
use crate::queue_client::PrintQueueClient;

const SHORT_HEADER: &str = "Rank    Owner   Job     File(s)                         Total Size";

pub struct StatusReporter<'a> {
    client: &'a dyn PrintQueueClient,
    report_host: &'a str,
}

impl<'a> StatusReporter<'a> {
    pub fn new(client: &'a dyn PrintQueueClient, report_host: &'a str) -> Self {
        Self {
            client,
            report_host,
        }
    }

    /// Write the state of `destination` and its jobs selected by `list`.
    ///
    /// Lookup failures are reported to the client as a line of text, and
    /// the command fails.
    pub async fn send_state<R, W>(
        &self,
        conn: &mut LpdConnection<R, W>,
        destination: &str,
        list: &str,
        long: bool,
    ) -> ProtocolStatus
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let text = match self.build_report(destination, list, long).await {
            Ok(report) => report,
            Err(message) => {
                warn!(destination, error = %message, "status query failed");
                if let Err(e) = conn.write_text(&format!("{message}\n")).await {
                    debug!(error = %e, "failed to send status error");
                }
                return ProtocolStatus::Rejected;
            }
        };

        match conn.write_text(&text).await {
            Ok(()) => ProtocolStatus::Accepted,
            Err(e) => {
                warn!(destination, error = %e, "failed to send status report");
                ProtocolStatus::Rejected
            }
        }
    }

    async fn build_report(&self, destination: &str, list: &str, long: bool) -> Result<String, String> {
        let printer = resolve_destination(self.client, destination)
            .await
            .map_err(|e| format!("Unable to get printer {destination}: {e}"))?;

        let query = job_query(list);
        debug!(printer = %printer.name, query = ?query, long, "listing jobs");
        let jobs = self
            .client
            .jobs(&printer.name, &query)
            .await
            .map_err(|e| format!("get-jobs failed: {e}"))?;

        Ok(render_report(
            &printer.name,
            printer.state,
            &jobs,
            long,
            self.report_host,
        ))
    }
}

/// Interpret a status command's list operand.
///
/// A leading positive number selects that job; otherwise the first word
/// names a user.  An empty list selects every job.
pub fn job_query(list: &str) -> JobQuery {
    if let Some((id, _)) = split_leading_job_id(list) {
        return JobQuery::Job(id);
    }
    match split_first_word(list.trim()) {
        ("", _) => JobQuery::All,
        (user, _) => JobQuery::User(user.to_string()),
    }
}

pub fn state_sentence(printer: &str, state: PrinterState) -> String {
    match state {
        PrinterState::Idle => format!("{printer} is ready"),
        PrinterState::Processing => format!("{printer} is ready and printing"),
        PrinterState::Stopped => format!("{printer} is not ready"),
    }
}

/// English ordinal suffix for a rank: 1st, 2nd, 3rd, 4th ... 11th, 12th, 13th, 21st.
pub fn ordinal_suffix(n: u32) -> &'static str {
    if (11..=13).contains(&(n % 100)) {
        return "th";
    }
    match n % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// Render a complete status report.  Pure: the same inputs always give the
/// same text.
pub fn render_report(
    printer: &str,
    state: PrinterState,
    jobs: &[JobRecord],
    long: bool,
    host: &str,
) -> String {
    let mut out = state_sentence(printer, state);
    out.push('\n');

    let mut rank = 1u32;
    let mut listed = 0usize;

    for job in jobs {
        if job.state.is_terminal() || job.destination.is_none() {
            continue;
        }
        let Some(owner) = job.owner.as_deref() else {
            continue;
        };

        if !long && listed == 0 {
            out.push_str(SHORT_HEADER);
            out.push('\n');
        }
        listed += 1;

        let rank_label = if job.state == JobState::Processing {
            "active".to_string()
        } else {
            let label = format!("{rank}{}", ordinal_suffix(rank));
            rank += 1;
            label
        };
        let name = job.name.as_deref().unwrap_or(DEFAULT_JOB_TITLE);

        if long {
            let name = if job.copies > 1 {
                format!("{} copies of {name}", job.copies)
            } else {
                name.to_string()
            };
            let _ = write!(
                out,
                "\n{owner}: {rank_label:<33.33} [job {} {host}]\n        {name:<39.39} {} bytes\n",
                job.id, job.size_bytes
            );
        } else {
            let _ = writeln!(
                out,
                "{rank_label:<7} {owner:<7.7} {:<7} {name:<31.31} {} bytes",
                job.id, job.size_bytes
            );
        }
    }

    if listed == 0 {
        out.push_str("no entries\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lpd::fake_queue::{FakeQueue, job};

    #[test]
    fn ordinal_suffixes() {
        let rendered: Vec<String> = [1, 2, 3, 4, 9, 10, 11, 12, 13, 21, 22, 23, 101, 111]
            .into_iter()
            .map(|n| format!("{n}{}", ordinal_suffix(n)))
            .collect();
        assert_eq!(
            rendered,
            [
                "1st", "2nd", "3rd", "4th", "9th", "10th", "11th", "12th", "13th", "21st", "22nd",
                "23rd", "101st", "111th"
            ]
        );
    }

    #[test]
    fn list_operand_selects_query() {
        assert_eq!(job_query("12"), JobQuery::Job(12));
        assert_eq!(job_query(" 7 alice"), JobQuery::Job(7));
        assert_eq!(job_query("alice bob"), JobQuery::User("alice".into()));
        assert_eq!(job_query(""), JobQuery::All);
        assert_eq!(job_query("  "), JobQuery::All);
    }

    #[test]
    fn empty_queue_says_no_entries() {
        let text = render_report("myprinter", PrinterState::Idle, &[], true, "localhost");
        assert_eq!(text, "myprinter is ready\nno entries\n");

        let text = render_report("myprinter", PrinterState::Stopped, &[], false, "localhost");
        assert_eq!(text, "myprinter is not ready\nno entries\n");
    }

    #[test]
    fn short_report_ranks_and_columns() {
        let mut active = job(12, "alice", "lp", "report.pdf");
        active.state = JobState::Processing;
        active.size_bytes = 2048;
        let jobs = vec![active, job(13, "bob", "lp", "notes.txt")];

        let text = render_report("lp", PrinterState::Processing, &jobs, false, "localhost");

        let expected = "lp is ready and printing\n\
            Rank    Owner   Job     File(s)                         Total Size\n\
            active  alice   12      report.pdf                      2048 bytes\n\
            1st     bob     13      notes.txt                       1024 bytes\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn short_report_truncates_owner_and_name() {
        let jobs = vec![job(
            5,
            "administrator",
            "lp",
            "a-very-long-document-name-that-overflows.pdf",
        )];
        let text = render_report("lp", PrinterState::Idle, &jobs, false, "localhost");
        let line = text.lines().nth(2).unwrap();
        assert_eq!(
            line,
            "1st     adminis 5       a-very-long-document-name-that- 1024 bytes"
        );
    }

    #[test]
    fn long_report_layout_with_copies() {
        let mut copies = job(7, "carol", "lp", "slides.pdf");
        copies.copies = 3;
        let text = render_report("lp", PrinterState::Idle, &[copies], true, "print.example");

        let expected = format!(
            "lp is ready\n\ncarol: {:<33} [job 7 print.example]\n        {:<39} 1024 bytes\n",
            "1st", "3 copies of slides.pdf"
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn unattributed_and_finished_jobs_are_skipped() {
        let mut no_owner = job(1, "x", "lp", "a");
        no_owner.owner = None;
        let mut no_dest = job(2, "y", "lp", "b");
        no_dest.destination = None;
        let mut done = job(3, "z", "lp", "c");
        done.state = JobState::Completed;
        let mut unnamed = job(4, "dave", "lp", "");
        unnamed.name = None;

        let text = render_report(
            "lp",
            PrinterState::Idle,
            &[no_owner, no_dest, done, unnamed],
            false,
            "localhost",
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("1st     dave    4       untitled"));
    }

    #[tokio::test]
    async fn long_status_on_empty_queue() {
        let queue = FakeQueue::with_printer("myprinter");
        let reporter = StatusReporter::new(&queue, "localhost");
        let mut conn = LpdConnection::new(&b""[..], Vec::new(), 1024);

        let status = reporter.send_state(&mut conn, "myprinter", "list", true).await;

        assert_eq!(status, ProtocolStatus::Accepted);
        assert_eq!(conn.written(), b"myprinter is ready\nno entries\n");
        assert_eq!(
            queue.queries(),
            vec![("myprinter".to_string(), JobQuery::User("list".into()))]
        );
    }

    #[tokio::test]
    async fn report_is_idempotent() {
        let queue = FakeQueue::with_printer("lp");
        queue.add_job(job(1, "alice", "lp", "a.txt"));
        queue.add_job(job(2, "bob", "lp", "b.txt"));
        let reporter = StatusReporter::new(&queue, "localhost");

        let mut first = LpdConnection::new(&b""[..], Vec::new(), 1024);
        let mut second = LpdConnection::new(&b""[..], Vec::new(), 1024);
        reporter.send_state(&mut first, "lp", "", false).await;
        reporter.send_state(&mut second, "lp", "", false).await;

        assert_eq!(first.written(), second.written());
        assert!(String::from_utf8_lossy(first.written()).contains("2nd     bob"));
    }

    #[tokio::test]
    async fn unknown_printer_is_reported_as_text() {
        let queue = FakeQueue::with_printer("lp");
        let reporter = StatusReporter::new(&queue, "localhost");
        let mut conn = LpdConnection::new(&b""[..], Vec::new(), 1024);

        let status = reporter.send_state(&mut conn, "nowhere", "", false).await;

        assert_eq!(status, ProtocolStatus::Rejected);
        let text = String::from_utf8_lossy(conn.written()).into_owned();
        assert!(text.starts_with("Unable to get printer nowhere"));
        assert!(text.ends_with('\n'));
    }
}
