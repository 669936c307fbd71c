//! Parsing of `git log` output into [`CommitData`].
//!
//! Commits are requested with [`LOG_FORMAT`] together with `--name-only -z`.
//! Every record starts with an ASCII record separator (0x1e) and holds
//! NUL-terminated fields in this order: hash, author name, author email,
//! author time, committer name, committer email, committer time, message,
//! parent hashes, ref names, source ref. The names of the modified files
//! follow, also NUL-terminated.

use crate::commit::CommitData;
use crate::error::{Result, SiftError};

/// The `--format` argument matching [`parse_log`].
pub const LOG_FORMAT: &str =
    "--format=format:%x1e%H%x00%aN%x00%aE%x00%at%x00%cN%x00%cE%x00%ct%x00%B%x00%P%x00%D%x00%S%x00";

const RECORD_SEPARATOR: u8 = 0x1e;
const FIELDS_PER_RECORD: usize = 11;

/// Parse the output of `git log` run with [`LOG_FORMAT`].
pub fn parse_log(raw: &[u8]) -> Result<Vec<CommitData>> {
    raw.split(|&b| b == RECORD_SEPARATOR)
        .filter(|record| !record.iter().all(u8::is_ascii_whitespace))
        .map(parse_record)
        .collect()
}

fn parse_record(record: &[u8]) -> Result<CommitData> {
    let mut fields = record.split(|&b| b == 0);
    let mut next = || {
        fields.next().ok_or_else(|| {
            SiftError::commit(format!(
                "log record has fewer than {FIELDS_PER_RECORD} fields"
            ))
        })
    };

    let hash = text(next()?);
    if hash.is_empty() {
        return Err(SiftError::commit("log record without a commit hash"));
    }
    let author_name = next()?.to_vec();
    let author_email = next()?.to_vec();
    let author_date = next()?.to_vec();
    let committer_name = next()?.to_vec();
    let committer_email = next()?.to_vec();
    let committer_date = next()?.to_vec();
    let message = next()?.to_vec();
    let parent_hashes = text(next()?)
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let refs = split_refs(next()?);
    let source_refs = split_refs(next()?);

    let modified_files = fields
        .map(|name| text(name.trim_ascii_start()))
        .filter(|name| !name.is_empty())
        .collect();

    Ok(CommitData {
        hash,
        author_name,
        author_email,
        author_date,
        committer_name,
        committer_email,
        committer_date,
        message,
        parent_hashes,
        refs,
        source_refs,
        modified_files,
    })
}

/// Split `%D` output such as `HEAD -> main, tag: v1.0`.
fn split_refs(raw: &[u8]) -> Vec<String> {
    text(raw)
        .split(", ")
        .map(|r| r.strip_prefix("HEAD -> ").unwrap_or(r).trim().to_string())
        .filter(|r| !r.is_empty())
        .collect()
}

fn text(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim().to_string()
}
