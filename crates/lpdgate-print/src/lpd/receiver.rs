// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Receive-job handling: admission, the frame loop, and turning the received
// control file into print-queue submissions.

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tracing::{debug, error, info, warn};

use lpdgate_core::config::GatewayConfig;
use lpdgate_core::error::{LpdgateError, Result};
use lpdgate_core::types::{DEFAULT_JOB_TITLE, JobOptions, JobSubmission, PrinterInfo};

use super::connection::{LpdConnection, ProtocolStatus};
use super::control::{ControlLine, ControlReader, Directive, PrintStyle};
use super::destination::resolve_destination;
use super::transaction::JobTransaction;
use super::transfer::{Frame, TransferChannel};
use crate::queue_client::PrintQueueClient;

/// `job-sheets` value that means "no banner".
const NO_BANNER: &str = "none,none";

pub struct JobReceiver<'a> {
    client: &'a dyn PrintQueueClient,
    config: &'a GatewayConfig,
    origin_host: Option<&'a str>,
}

impl<'a> JobReceiver<'a> {
    pub fn new(
        client: &'a dyn PrintQueueClient,
        config: &'a GatewayConfig,
        origin_host: Option<&'a str>,
    ) -> Self {
        Self {
            client,
            config,
            origin_host,
        }
    }

    /// Run a complete receive-job session for `destination`.
    ///
    /// Writes the acceptance byte itself, since acceptance depends on the
    /// destination being able to take jobs.  Every spool file is removed
    /// before this returns.
    pub async fn receive<R, W>(
        &self,
        conn: &mut LpdConnection<R, W>,
        destination: &str,
    ) -> ProtocolStatus
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let printer = match self.admit(destination).await {
            Ok(printer) => printer,
            Err(e) => {
                warn!(destination, error = %e, "job refused");
                if let Err(e) = conn.write_status(ProtocolStatus::Rejected).await {
                    debug!(error = %e, "failed to send refusal");
                }
                return ProtocolStatus::Rejected;
            }
        };

        if let Err(e) = conn.write_status(ProtocolStatus::Accepted).await {
            error!(error = %e, "failed to acknowledge receive-job");
            return ProtocolStatus::Rejected;
        }

        let mut txn = JobTransaction::new(self.config.spool_dir(), self.config.max_data_files);
        let status = match self.receive_files(conn, &mut txn).await {
            Ok(()) => self.submit_jobs(&printer, &txn).await,
            Err(e) => {
                warn!(destination, error = %e, "job transfer failed; discarding received files");
                ProtocolStatus::Rejected
            }
        };
        txn.cleanup();
        status
    }

    async fn admit(&self, destination: &str) -> Result<PrinterInfo> {
        let printer = resolve_destination(self.client, destination).await?;
        if !printer.accepting {
            return Err(LpdgateError::PrintQueue(format!(
                "{} is not accepting jobs",
                printer.name
            )));
        }
        if !printer.shared {
            return Err(LpdgateError::PrintQueue(format!(
                "{} is not shared",
                printer.name
            )));
        }
        Ok(printer)
    }

    async fn receive_files<R, W>(
        &self,
        conn: &mut LpdConnection<R, W>,
        txn: &mut JobTransaction,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut channel = TransferChannel::new(conn);
        loop {
            match channel.next_frame(txn).await? {
                Frame::End => break,
                Frame::Received(file) => {
                    info!(
                        kind = ?file.kind,
                        name = %file.remote_name,
                        bytes = file.declared_length,
                        "received file"
                    );
                }
            }
        }

        if txn.control_path().is_none() {
            return Err(LpdgateError::Protocol("no control file received".into()));
        }
        Ok(())
    }

    /// Apply the control file in order, submitting one job per print
    /// directive.  A failing directive marks the job rejected but does not
    /// stop the ones after it.
    async fn submit_jobs(&self, printer: &PrinterInfo, txn: &JobTransaction) -> ProtocolStatus {
        let Some(control_path) = txn.control_path() else {
            return ProtocolStatus::Rejected;
        };
        let file = match File::open(control_path).await {
            Ok(file) => file,
            Err(e) => {
                error!(error = %e, "failed to open control file");
                return ProtocolStatus::Rejected;
            }
        };
        let mut lines = ControlReader::new(BufReader::new(file), self.config.max_line_bytes);

        let mut job = JobContext::new(self.config, &printer.name);
        let mut status = ProtocolStatus::Accepted;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "failed to read control file");
                    return ProtocolStatus::Rejected;
                }
            };
            let Directive::Print(style) = line.directive() else {
                job.apply(&line);
                continue;
            };

            let result = match job.submission(&line, style, txn, self.origin_host) {
                Ok(submission) => self.submit(&submission).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(directive = %line.code, file = %line.value, error = %e, "print directive failed");
                status = ProtocolStatus::Rejected;
            }
        }

        status
    }

    async fn submit(&self, submission: &JobSubmission) -> Result<()> {
        let job_id = self.client.submit(submission).await?;
        info!(
            job_id,
            queue = %submission.queue,
            user = %submission.user,
            title = %submission.title,
            "job submitted"
        );
        Ok(())
    }
}

/// Ambient state built up while walking one control file.
struct JobContext {
    queue: String,
    title: String,
    document_name: String,
    user: Option<String>,
    /// Queue options overlaid with the gateway defaults.
    base_options: JobOptions,
    /// Options added by directives such as `L`.
    ambient_options: JobOptions,
    banner_allowed: bool,
}

impl JobContext {
    fn new(config: &GatewayConfig, queue: &str) -> Self {
        let queue_options = config.queue_options(queue);
        let defaults = config.default_job_options();

        let banner_allowed = !defaults.contains("job-sheets")
            && queue_options
                .get("job-sheets")
                .is_none_or(|sheets| sheets == NO_BANNER);

        let mut base_options = queue_options;
        base_options.merge(&defaults);

        Self {
            queue: queue.to_string(),
            title: DEFAULT_JOB_TITLE.to_string(),
            document_name: String::new(),
            user: None,
            base_options,
            ambient_options: JobOptions::new(),
            banner_allowed,
        }
    }

    fn apply(&mut self, line: &ControlLine) {
        match line.directive() {
            Directive::JobName => {
                self.title = if line.value.is_empty() {
                    DEFAULT_JOB_TITLE.to_string()
                } else {
                    line.value.clone()
                };
            }
            Directive::DocumentName => self.document_name = line.value.clone(),
            Directive::User => {
                self.user = Some(line.value.clone()).filter(|user| !user.is_empty());
            }
            Directive::Banner => {
                if self.banner_allowed {
                    self.ambient_options.set("job-sheets", "standard");
                }
            }
            Directive::Print(_) | Directive::Ignored => {}
        }
    }

    fn submission(
        &self,
        line: &ControlLine,
        style: PrintStyle,
        txn: &JobTransaction,
        origin_host: Option<&str>,
    ) -> Result<JobSubmission> {
        let user = self.user.clone().ok_or_else(|| {
            LpdgateError::Directive(format!("'{}' directive before any user was named", line.code))
        })?;
        let file_path = txn.data_file(&line.value).ok_or_else(|| {
            LpdgateError::Directive(format!("no data file named {:?}", line.value))
        })?;

        let mut options = self.base_options.clone();
        options.merge(&self.ambient_options);
        match style {
            PrintStyle::Raw if options.contains("document-format") => {}
            _ => {
                if let Some((name, value)) = style.job_option() {
                    options.set(name, value);
                }
            }
        }

        Ok(JobSubmission {
            queue: self.queue.clone(),
            file_path: file_path.to_path_buf(),
            title: self.title.clone(),
            document_name: self.document_name.clone(),
            user,
            options,
            origin_host: origin_host.map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lpd::fake_queue::FakeQueue;

    struct Outcome {
        status: ProtocolStatus,
        written: Vec<u8>,
    }

    async fn receive(
        queue: &FakeQueue,
        config: &GatewayConfig,
        destination: &str,
        input: &[u8],
    ) -> Outcome {
        let mut conn = LpdConnection::new(input, Vec::new(), config.max_line_bytes);
        let status = JobReceiver::new(queue, config, Some("10.0.0.7"))
            .receive(&mut conn, destination)
            .await;
        Outcome {
            status,
            written: conn.written().clone(),
        }
    }

    fn config_in(dir: &tempfile::TempDir) -> GatewayConfig {
        GatewayConfig {
            spool_dir: Some(dir.path().to_path_buf()),
            ..GatewayConfig::default()
        }
    }

    /// Build a control frame followed by one data frame per `(name, data)`.
    fn job_bytes(control: &str, data: &[(&str, &str)]) -> Vec<u8> {
        let mut bytes = format!("\x02{} cfA001client\n{}\0", control.len(), control).into_bytes();
        for (name, contents) in data {
            bytes.extend(format!("\x03{} {}\n{}\0", contents.len(), name, contents).bytes());
        }
        bytes.push(b'\n');
        bytes
    }

    fn spool_is_empty(dir: &tempfile::TempDir) -> bool {
        std::fs::read_dir(dir.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn single_print_directive_submits_one_job() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let queue = FakeQueue::with_printer("myprinter");
        let input = job_bytes(
            "P alice\nJ Report\nfhello.txt\n",
            &[("hello.txt", "Hello World")],
        );

        let outcome = receive(&queue, &config, "myprinter", &input).await;

        assert_eq!(outcome.status, ProtocolStatus::Accepted);
        assert_eq!(outcome.written, b"\0\0\0\0\0");

        let submitted = queue.submitted();
        assert_eq!(submitted.len(), 1);
        let job = &submitted[0].submission;
        assert_eq!(job.queue, "myprinter");
        assert_eq!(job.title, "Report");
        assert_eq!(job.document_name, "");
        assert_eq!(job.user, "alice");
        assert!(job.options.is_empty());
        assert_eq!(job.origin_host.as_deref(), Some("10.0.0.7"));
        assert_eq!(submitted[0].payload, b"Hello World");
        assert!(spool_is_empty(&dir));
    }

    #[tokio::test]
    async fn print_before_user_fails_only_that_directive() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let queue = FakeQueue::with_printer("lp");
        let input = job_bytes(
            "Jfirst\nfdfA001\nPbob\nJsecond\nldfA002\n",
            &[("dfA001", "one"), ("dfA002", "two")],
        );

        let outcome = receive(&queue, &config, "lp", &input).await;

        assert_eq!(outcome.status, ProtocolStatus::Rejected);
        let submitted = queue.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].submission.title, "second");
        assert_eq!(submitted[0].submission.options.get("raw"), Some(""));
        assert_eq!(submitted[0].payload, b"two");
        assert!(spool_is_empty(&dir));
    }

    #[tokio::test]
    async fn empty_user_fails_directive_softly() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let queue = FakeQueue::with_printer("lp");
        let input = job_bytes(
            "P\nfdfA001\nPcarol\nfdfA001\n",
            &[("dfA001", "data")],
        );

        let outcome = receive(&queue, &config, "lp", &input).await;

        assert_eq!(outcome.status, ProtocolStatus::Rejected);
        let submitted = queue.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].submission.user, "carol");
        assert!(spool_is_empty(&dir));
    }

    #[tokio::test]
    async fn overlong_control_lines_are_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let config = GatewayConfig {
            max_line_bytes: 64,
            ..config_in(&dir)
        };
        let queue = FakeQueue::with_printer("lp");
        let control = format!("J{}\nPalice\nfdfA001\n", "x".repeat(500));
        let input = job_bytes(&control, &[("dfA001", "data")]);

        let outcome = receive(&queue, &config, "lp", &input).await;

        assert_eq!(outcome.status, ProtocolStatus::Accepted);
        let submitted = queue.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].submission.title, "x".repeat(63));
        assert_eq!(submitted[0].submission.user, "alice");
    }

    #[tokio::test]
    async fn unknown_data_file_and_failed_submission_are_soft() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let queue = FakeQueue::with_printer("lp");
        queue.fail_submit("bad");
        let input = job_bytes(
            "Palice\nfmissing\nJbad\nfdfA001\nJgood\npdfA001\n",
            &[("dfA001", "payload")],
        );

        let outcome = receive(&queue, &config, "lp", &input).await;

        assert_eq!(outcome.status, ProtocolStatus::Rejected);
        let submitted = queue.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].submission.title, "good");
        assert_eq!(submitted[0].submission.options.get("prettyprint"), Some(""));
    }

    #[tokio::test]
    async fn later_directives_do_not_apply_retroactively() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let queue = FakeQueue::with_printer("lp");
        let input = job_bytes(
            "Palice\nfdfA001\nJlate\nNnotes.txt\nfdfA001\n",
            &[("dfA001", "x")],
        );

        receive(&queue, &config, "lp", &input).await;

        let titles: Vec<_> = queue
            .submitted()
            .into_iter()
            .map(|s| (s.submission.title, s.submission.document_name))
            .collect();
        assert_eq!(
            titles,
            vec![
                ("untitled".to_string(), String::new()),
                ("late".to_string(), "notes.txt".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn short_payload_discards_everything() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let queue = FakeQueue::with_printer("lp");
        let mut input = b"\x0210 cfA001cl\nPalice\nfx\n\0".to_vec();
        input.extend_from_slice(b"\x0350 dfA001\nonly a few bytes");

        let outcome = receive(&queue, &config, "lp", &input).await;

        assert_eq!(outcome.status, ProtocolStatus::Rejected);
        assert!(queue.submitted().is_empty());
        assert!(spool_is_empty(&dir));
    }

    #[tokio::test]
    async fn abort_discards_control_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let queue = FakeQueue::with_printer("lp");
        let mut input = job_bytes("Palice\nfdfA001\n", &[("dfA001", "x")]);
        input.pop();
        input.extend_from_slice(b"\x01\n");

        let outcome = receive(&queue, &config, "lp", &input).await;

        assert_eq!(outcome.status, ProtocolStatus::Rejected);
        assert_eq!(outcome.written.last(), Some(&1));
        assert!(queue.submitted().is_empty());
        assert!(spool_is_empty(&dir));
    }

    #[tokio::test]
    async fn data_only_session_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let queue = FakeQueue::with_printer("lp");

        let outcome = receive(&queue, &config, "lp", b"\x031 dfA001\nx\0\n").await;

        assert_eq!(outcome.status, ProtocolStatus::Rejected);
        assert!(spool_is_empty(&dir));
    }

    #[tokio::test]
    async fn refused_destinations_get_status_one() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let queue = FakeQueue::with_printer("lp");
        queue.update_printer("lp", |p| p.accepting = false);

        let outcome = receive(&queue, &config, "lp", b"").await;
        assert_eq!(outcome.status, ProtocolStatus::Rejected);
        assert_eq!(outcome.written, b"\x01");

        let outcome = receive(&queue, &config, "nowhere", b"").await;
        assert_eq!(outcome.written, b"\x01");

        queue.update_printer("lp", |p| {
            p.accepting = true;
            p.shared = false;
        });
        let outcome = receive(&queue, &config, "lp", b"").await;
        assert_eq!(outcome.written, b"\x01");
    }

    #[tokio::test]
    async fn options_layer_queue_then_defaults_then_directives() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(&dir);
        config
            .default_options
            .insert("media".into(), "a4".into());
        config
            .queues
            .entry("lp".into())
            .or_default()
            .options
            .extend([
                ("media".to_string(), "letter".to_string()),
                ("sides".to_string(), "two-sided-long-edge".to_string()),
            ]);
        let queue = FakeQueue::with_printer("lp");
        let input = job_bytes("Palice\nL\nfdfA001\n", &[("dfA001", "x")]);

        receive(&queue, &config, "lp", &input).await;

        let options = &queue.submitted()[0].submission.options;
        assert_eq!(options.get("media"), Some("a4"));
        assert_eq!(options.get("sides"), Some("two-sided-long-edge"));
        assert_eq!(options.get("job-sheets"), Some("standard"));
    }

    #[tokio::test]
    async fn banner_respects_configured_job_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(&dir);
        config
            .default_options
            .insert("job-sheets".into(), "none,none".into());
        let queue = FakeQueue::with_printer("lp");
        let input = job_bytes("Palice\nLalice\nfdfA001\n", &[("dfA001", "x")]);

        receive(&queue, &config, "lp", &input).await;

        let options = &queue.submitted()[0].submission.options;
        assert_eq!(options.get("job-sheets"), Some("none,none"));
    }

    #[tokio::test]
    async fn raw_style_keeps_explicit_document_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(&dir);
        config
            .default_options
            .insert("document-format".into(), "application/pdf".into());
        let queue = FakeQueue::with_printer("lp");
        let input = job_bytes("Palice\nldfA001\n", &[("dfA001", "%PDF")]);

        receive(&queue, &config, "lp", &input).await;

        let options = &queue.submitted()[0].submission.options;
        assert!(!options.contains("raw"));
        assert_eq!(options.get("document-format"), Some("application/pdf"));
    }

    #[tokio::test]
    async fn split_control_file_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let queue = FakeQueue::with_printer("lp");
        let input = b"\x027 cfA001cl\nPalice\n\0\x0211 cfA001cl\nJtwo\nfdfA1\n\0\x031 dfA1\nz\0\n";

        let outcome = receive(&queue, &config, "lp", input).await;

        assert_eq!(outcome.status, ProtocolStatus::Accepted);
        let submitted = queue.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].submission.title, "two");
        assert_eq!(submitted[0].submission.user, "alice");
    }
}
