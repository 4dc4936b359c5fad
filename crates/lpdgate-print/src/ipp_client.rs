// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// IPP implementation of `PrintQueueClient`.
//
// Talks to a CUPS-style print server using the `ipp` crate's async API:
//   - Get-Printer-Attributes  (RFC 8011 §4.2.5)
//   - CUPS-Get-Printers       (CUPS extension 0x4002)
//   - Print-Job               (RFC 8011 §4.2.1)
//   - Get-Jobs                (RFC 8011 §4.2.6)
//   - Get-Job-Attributes      (RFC 8011 §4.3.4)
//   - Cancel-Job              (RFC 8011 §4.3.3)

use std::io::Cursor;

use async_trait::async_trait;
use ipp::prelude::*;
use tracing::{debug, error, info, instrument};

use lpdgate_core::error::{LpdgateError, Result};
use lpdgate_core::types::{
    JobQuery, JobRecord, JobState, JobSubmission, PrinterInfo, PrinterState,
};

use crate::queue_client::PrintQueueClient;

const PRINTER_ATTRIBUTES: &[&str] = &[
    "printer-name",
    "printer-info",
    "printer-state",
    "printer-is-accepting-jobs",
    "printer-is-shared",
];

const JOB_ATTRIBUTES: &[&str] = &[
    "job-id",
    "job-k-octets",
    "job-state",
    "job-printer-uri",
    "job-originating-user-name",
    "job-name",
    "copies",
];

/// MIME type CUPS uses for jobs that must bypass filtering.
const RAW_DOCUMENT_FORMAT: &str = "application/vnd.cups-raw";

/// Print-queue client bound to one IPP server.
pub struct IppQueueClient {
    /// Server base URI, e.g. `ipp://localhost:631`.
    base: String,
}

impl IppQueueClient {
    /// Create a client for the server at `base` (`ipp://host[:port]`).
    pub fn new(base: &str) -> Result<Self> {
        let base = base.trim_end_matches('/').to_string();
        parse_uri(&base)?;
        Ok(Self { base })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn printer_uri(&self, queue: &str) -> Result<Uri> {
        parse_uri(&format!("{}/printers/{queue}", self.base))
    }

    fn job_uri(&self, job_id: i32) -> Result<Uri> {
        parse_uri(&format!("{}/jobs/{job_id}", self.base))
    }

    async fn send(&self, target: Uri, request: IppRequestResponse, what: &str) -> Result<IppRequestResponse> {
        let client = AsyncIppClient::new(target);
        let response = client
            .send(request)
            .await
            .map_err(|e| LpdgateError::PrintQueue(format!("{what}: {e}")))?;

        if !response.header().status_code().is_success() {
            let code = response.header().status_code();
            error!(status = ?code, "{what} failed");
            return Err(LpdgateError::PrintQueue(format!(
                "{what} returned status {code:?}"
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl PrintQueueClient for IppQueueClient {
    #[instrument(skip(self), fields(base = %self.base))]
    async fn printer(&self, name: &str) -> Result<PrinterInfo> {
        let uri = self.printer_uri(name)?;
        let operation = IppOperationBuilder::get_printer_attributes(uri.clone())
            .attributes(PRINTER_ATTRIBUTES)
            .build();

        debug!("sending Get-Printer-Attributes");
        let response = self
            .send(uri, operation.into(), "Get-Printer-Attributes")
            .await?;

        parse_printers(response.attributes())
            .into_iter()
            .next()
            .map(|mut printer| {
                if printer.name.is_empty() {
                    printer.name = name.to_string();
                }
                printer
            })
            .ok_or_else(|| LpdgateError::UnknownDestination(name.into()))
    }

    #[instrument(skip(self), fields(base = %self.base))]
    async fn printers(&self) -> Result<Vec<PrinterInfo>> {
        let uri = parse_uri(&self.base)?;
        let mut request =
            IppRequestResponse::new(IppVersion::v1_1(), Operation::CupsGetPrinters, Some(uri.clone()));
        request.attributes_mut().add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new("requested-attributes", keywords(PRINTER_ATTRIBUTES)),
        );

        debug!("sending CUPS-Get-Printers");
        let response = self.send(uri, request, "CUPS-Get-Printers").await?;
        let printers = parse_printers(response.attributes());
        debug!(count = printers.len(), "received printer list");
        Ok(printers)
    }

    #[instrument(
        skip(self, submission),
        fields(queue = %submission.queue, user = %submission.user, title = %submission.title)
    )]
    async fn submit(&self, submission: &JobSubmission) -> Result<i32> {
        let uri = self.printer_uri(&submission.queue)?;
        let document = tokio::fs::read(&submission.file_path).await?;
        let payload = IppPayload::new(Cursor::new(document));

        let mut builder = IppOperationBuilder::print_job(uri.clone(), payload)
            .user_name(&submission.user)
            .job_title(&submission.title);
        if !submission.document_name.is_empty() {
            builder = builder.attribute(IppAttribute::new(
                "document-name",
                IppValue::NameWithoutLanguage(submission.document_name.clone().into()),
            ));
        }
        if let Some(host) = &submission.origin_host {
            builder = builder.attribute(IppAttribute::new(
                "job-originating-host-name",
                IppValue::NameWithoutLanguage(host.clone().into()),
            ));
        }
        for (name, value) in submission.options.iter() {
            builder = builder.attribute(job_option(name, value));
        }

        info!(options = submission.options.len(), "sending Print-Job");
        let response = self
            .send(uri, builder.build().into(), "Print-Job")
            .await
            .map_err(|e| LpdgateError::Submission(e.to_string()))?;

        let job_id = extract_job_id(response.attributes()).ok_or_else(|| {
            LpdgateError::Submission("Print-Job response missing job-id attribute".into())
        })?;

        info!(job_id, "print job accepted");
        Ok(job_id)
    }

    #[instrument(skip(self), fields(base = %self.base))]
    async fn jobs(&self, queue: &str, query: &JobQuery) -> Result<Vec<JobRecord>> {
        let uri = self.printer_uri(queue)?;
        let operation = match query {
            JobQuery::Job(_) => Operation::GetJobAttributes,
            JobQuery::User(_) | JobQuery::All => Operation::GetJobs,
        };
        debug!(operation = ?operation, "sending job query");
        let mut request = IppRequestResponse::new(IppVersion::v1_1(), operation, Some(uri.clone()));
        let attrs = request.attributes_mut();
        match query {
            JobQuery::Job(id) => {
                attrs.add(
                    DelimiterTag::OperationAttributes,
                    IppAttribute::new("job-id", IppValue::Integer(*id)),
                );
            }
            JobQuery::User(user) => {
                attrs.add(
                    DelimiterTag::OperationAttributes,
                    IppAttribute::new(
                        "requesting-user-name",
                        IppValue::NameWithoutLanguage(user.clone().into()),
                    ),
                );
                attrs.add(
                    DelimiterTag::OperationAttributes,
                    IppAttribute::new("my-jobs", IppValue::Boolean(true)),
                );
            }
            JobQuery::All => {}
        }
        attrs.add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new("requested-attributes", keywords(JOB_ATTRIBUTES)),
        );

        let response = self.send(uri, request, "Get-Jobs").await?;
        let jobs = parse_jobs(response.attributes());
        debug!(count = jobs.len(), "received job list");
        Ok(jobs)
    }

    #[instrument(skip(self), fields(base = %self.base))]
    async fn cancel(&self, job_id: i32, agent: &str) -> Result<()> {
        let job_uri = self.job_uri(job_id)?;
        let mut request = IppRequestResponse::new(IppVersion::v1_1(), Operation::CancelJob, None);
        let attrs = request.attributes_mut();
        attrs.add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new("job-uri", IppValue::Uri(job_uri.to_string().into())),
        );
        attrs.add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new(
                "requesting-user-name",
                IppValue::NameWithoutLanguage(agent.to_string().into()),
            ),
        );

        info!("sending Cancel-Job");
        self.send(job_uri, request, "Cancel-Job")
            .await
            .map_err(|e| LpdgateError::Cancellation {
                job_id,
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

fn parse_uri(uri: &str) -> Result<Uri> {
    uri.parse()
        .map_err(|e| LpdgateError::Config(format!("invalid IPP URI '{uri}': {e}")))
}

fn keywords(names: &[&str]) -> IppValue {
    IppValue::Array(
        names
            .iter()
            .map(|name| IppValue::Keyword(name.to_string().into()))
            .collect(),
    )
}

/// Encode one `name=value` job option as an IPP attribute.
///
/// Empty values and `true`/`false` are booleans, numbers are integers, and
/// comma-separated values become a set of keywords.  `raw` is spelled as the
/// CUPS raw document format.
pub fn job_option(name: &str, value: &str) -> IppAttribute {
    if name == "raw" {
        return IppAttribute::new(
            "document-format",
            IppValue::MimeMediaType(RAW_DOCUMENT_FORMAT.to_string().into()),
        );
    }
    if name == "document-format" {
        return IppAttribute::new(name, IppValue::MimeMediaType(value.to_string().into()));
    }

    let value = match value {
        "" | "true" => IppValue::Boolean(true),
        "false" => IppValue::Boolean(false),
        v if v.contains(',') => IppValue::Array(
            v.split(',')
                .map(|part| IppValue::Keyword(part.trim().to_string().into()))
                .collect(),
        ),
        v => match v.parse::<i32>() {
            Ok(n) => IppValue::Integer(n),
            Err(_) => IppValue::Keyword(v.to_string().into()),
        },
    };
    IppAttribute::new(name, value)
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn integer(value: &IppValue) -> Option<i32> {
    match value {
        IppValue::Integer(n) | IppValue::Enum(n) => Some(*n),
        _ => None,
    }
}

fn boolean(value: &IppValue) -> Option<bool> {
    match value {
        IppValue::Boolean(b) => Some(*b),
        _ => None,
    }
}

/// Extract the `job-id` integer from a response's Job Attributes group.
fn extract_job_id(attrs: &IppAttributes) -> Option<i32> {
    for group in attrs.groups_of(DelimiterTag::JobAttributes) {
        if let Some(attr) = group.attributes().get("job-id")
            && let IppValue::Integer(id) = attr.value()
        {
            return Some(*id);
        }
    }
    None
}

/// One `PrinterInfo` per Printer Attributes group.
fn parse_printers(attrs: &IppAttributes) -> Vec<PrinterInfo> {
    attrs
        .groups_of(DelimiterTag::PrinterAttributes)
        .map(|group| {
            let attributes = group.attributes();
            let text = |name: &str| attributes.get(name).map(|a| a.value().to_string());
            let flag = |name: &str| attributes.get(name).and_then(|a| boolean(a.value()));

            PrinterInfo {
                name: text("printer-name").unwrap_or_default(),
                info: text("printer-info").filter(|info| !info.is_empty()),
                state: attributes
                    .get("printer-state")
                    .and_then(|a| integer(a.value()))
                    .map_or(PrinterState::Stopped, PrinterState::from_ipp_enum),
                accepting: flag("printer-is-accepting-jobs").unwrap_or(false),
                // IPP Everywhere printers do not report sharing; they are
                // reachable by definition.
                shared: flag("printer-is-shared").unwrap_or(true),
            }
        })
        .collect()
}

/// One `JobRecord` per Job Attributes group that carries a job id.
fn parse_jobs(attrs: &IppAttributes) -> Vec<JobRecord> {
    attrs
        .groups_of(DelimiterTag::JobAttributes)
        .filter_map(|group| {
            let attributes = group.attributes();
            let text = |name: &str| attributes.get(name).map(|a| a.value().to_string());
            let int = |name: &str| attributes.get(name).and_then(|a| integer(a.value()));

            let id = int("job-id")?;
            Some(JobRecord {
                id,
                owner: text("job-originating-user-name"),
                destination: text("job-printer-uri")
                    .and_then(|uri| uri.rsplit('/').next().map(str::to_string))
                    .filter(|queue| !queue.is_empty()),
                name: text("job-name"),
                size_bytes: int("job-k-octets").map_or(0, |k| k.max(0) as u64 * 1024),
                state: int("job-state").map_or(JobState::Pending, JobState::from_ipp_enum),
                copies: int("copies").map_or(1, |c| c.max(1) as u32),
            })
        })
        .collect()
}
