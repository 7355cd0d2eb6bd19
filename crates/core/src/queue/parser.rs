//! `jobs -v` listing parser.
//!
//! Recognized line forms (leading whitespace ignored):
//!
//! ```text
//! [0] queue (sftp://u@host)               session container, not a job
//!     Now executing: [1] mirror -c /a /w  active job
//!     -[2] pget -c /c.iso -o /w           further active job
//!     Commands queued:
//!      1. pget -c /b.iso -o /w            queued command
//! [1] mirror -c /a /w  -- 1.2 MiB/s       active job
//! [2] Done (pget -c /c -o /w)             finished job
//! mirror: Fatal error: max-retries exceeded   marks the previous job failed
//! ```

use crate::lftp::split_words;

use super::types::{JobKind, JobStatus, QueueJob, QueueSnapshot};

/// Parses a job listing into a snapshot. Never fails.
pub fn parse_jobs(text: &str, transfer_limit: u32) -> QueueSnapshot {
    let mut jobs: Vec<QueueJob> = Vec::new();
    let mut backgrounded = false;
    let mut in_queued_section = false;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with("Commands queued:") {
            backgrounded = true;
            in_queued_section = true;
            continue;
        }

        let executing = line
            .strip_prefix("Now executing:")
            .or_else(|| line.starts_with("-[").then_some(line));
        if let Some(rest) = executing {
            backgrounded = true;
            in_queued_section = false;
            for (id, command) in executing_jobs(rest) {
                if let Some(job) = job_from_command(Some(id), command, JobStatus::Active) {
                    upsert(&mut jobs, job);
                }
            }
            continue;
        }

        if let Some((id, rest)) = split_job_number(line) {
            backgrounded = true;
            in_queued_section = false;
            if rest.starts_with("queue") {
                continue;
            }
            let (command, status) = match rest.strip_prefix("Done (") {
                Some(inner) => (
                    inner.rsplit_once(')').map_or(inner, |(command, _)| command),
                    JobStatus::Done,
                ),
                None => (rest, JobStatus::Active),
            };
            if let Some(job) = job_from_command(Some(id), command, status) {
                upsert(&mut jobs, job);
            }
            continue;
        }

        if in_queued_section {
            if let Some(command) = strip_queue_position(line) {
                if let Some(job) = job_from_command(None, command, JobStatus::Queued) {
                    jobs.push(job);
                }
                continue;
            }
        }

        if line.contains("Fatal error") || line.contains("Access failed") {
            // queued commands have not run yet
            if let Some(job) = jobs.last_mut().filter(|job| job.id.is_some()) {
                job.status = JobStatus::Failed;
            }
        }
    }

    let mut slot = 0;
    for job in jobs.iter_mut().filter(|job| job.status == JobStatus::Active) {
        slot += 1;
        job.slot = Some(slot);
    }

    QueueSnapshot {
        jobs,
        transfer_limit,
        backgrounded,
    }
}

/// Splits `[N] rest` into the job number and the trimmed rest.
fn split_job_number(line: &str) -> Option<(u32, &str)> {
    let inner = line.strip_prefix('[')?;
    let (number, rest) = inner.split_once(']')?;
    let id = number.parse().ok()?;
    Some((id, rest.trim()))
}

/// Splits `[1] cmd -[2] cmd` into numbered commands. A leading `-` is
/// accepted for the continuation line form.
fn executing_jobs(text: &str) -> Vec<(u32, &str)> {
    let text = text.trim();
    let text = text.strip_prefix('-').unwrap_or(text);
    let Some(text) = text.strip_prefix('[') else {
        return Vec::new();
    };

    // escaped paths never contain a bare ` -[`
    text.split(" -[")
        .filter_map(|part| {
            let (number, command) = part.split_once(']')?;
            Some((number.trim().parse().ok()?, command.trim()))
        })
        .collect()
}

/// Strips the ` K. ` position prefix of a queued command.
fn strip_queue_position(line: &str) -> Option<&str> {
    let (position, command) = line.split_once(". ")?;
    if position.is_empty() || !position.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(command.trim())
}

/// Builds a job from a command line if it is a transfer.
fn job_from_command(id: Option<u32>, command: &str, status: JobStatus) -> Option<QueueJob> {
    let words = split_words(command);
    let mut words = words.iter().map(String::as_str).peekable();

    if words.peek() == Some(&"queue") {
        words.next();
    }

    let kind = match words.next()? {
        "mirror" => JobKind::Mirror,
        "pget" | "get" => JobKind::SingleFile,
        _ => return None,
    };

    let mut path = None;
    while let Some(word) = words.next() {
        if word.starts_with('-') {
            // short options with a separate value
            if matches!(word, "-n" | "-o" | "-O" | "-P") {
                words.next();
            }
            continue;
        }
        path = Some(word.to_string());
        break;
    }

    Some(QueueJob {
        id,
        kind,
        path: path?,
        status,
        slot: None,
    })
}

/// Adds a job, merging with an earlier line for the same job number.
fn upsert(jobs: &mut Vec<QueueJob>, job: QueueJob) {
    let existing = job
        .id
        .and_then(|id| jobs.iter_mut().find(|j| j.id == Some(id)));

    match existing {
        Some(existing) => {
            if matches!(job.status, JobStatus::Done | JobStatus::Failed) {
                existing.status = job.status;
            }
        }
        None => jobs.push(job),
    }
}
