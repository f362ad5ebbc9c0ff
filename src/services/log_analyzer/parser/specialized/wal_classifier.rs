//! WAL (write-ahead log) classifier

use super::{ClassifyContext, DomainClassifier, capture_i64, event, insert_opt};
use crate::services::log_analyzer::models::{Domain, FieldMap};
use once_cell::sync::Lazy;
use regex::Regex;

static SLOW_SYNC_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Slow sync cost:\s*(\d+)\s*ms").unwrap());

static ROLL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\broll(?:ed|ing)?\b.*\bwal\b|\bwal\b.*\broll(?:ed|ing)?\b").unwrap());

static WAL_SIZE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"WAL.*?size=(\d+)").unwrap());

static WAL_SPLIT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)split(?:ting)?\s+(?:wal|log)\b|SplitLogManager|WALSplitter").unwrap()
});

static WAL_CLASS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:FSHLog|AbstractFSWAL|AsyncFSWAL|FSHLogProvider)\b").unwrap());

#[derive(Debug, Clone, Default)]
pub struct WalClassifier;

impl DomainClassifier for WalClassifier {
    fn domain(&self) -> Domain {
        Domain::Wal
    }

    fn classify(&self, ctx: &ClassifyContext) -> Option<FieldMap> {
        let msg = ctx.message;
        let mut fields = FieldMap::new();

        if let Some(ms) = capture_i64(&SLOW_SYNC_REGEX, msg) {
            fields.insert("sync_duration_ms".into(), ms.into());
            event(&mut fields, "slow_sync");
        } else if WAL_SPLIT_REGEX.is_match(msg) {
            event(&mut fields, "wal_split");
        } else if ROLL_REGEX.is_match(msg) {
            event(&mut fields, "roll");
        } else if !WAL_CLASS_REGEX.is_match(msg) {
            return None;
        } else {
            event(&mut fields, "wal");
        }

        insert_opt(&mut fields, "wal_size", capture_i64(&WAL_SIZE_REGEX, msg));
        Some(fields)
    }
}
