//! Region lifecycle classifiers: compaction, split, flush and balancing

use super::{ClassifyContext, DomainClassifier, capture_f64, capture_str, event, insert_opt};
use crate::services::log_analyzer::models::{Domain, FieldMap};
use crate::services::log_analyzer::parser::core::ValueParser;
use once_cell::sync::Lazy;
use regex::Regex;

static COMPACTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bcompact(?:ion|ing|ed)\b").unwrap());

static COMPACTION_MS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)completed (?:major |minor )?compaction.*?(\d+)\s*ms").unwrap()
});

static TOOK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)took (\d+(?:\.\d+)?\s*(?:ms|sec|s|min))\b").unwrap());

static REGION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bregion[=:\s]+([^\s]+)").unwrap());

static SPLIT_START_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bsplit(?:ting)?\b.*\bregion|\bregion\b.*\bsplit(?:ting)?\b").unwrap());

static SPLIT_DONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bsplit\b.*\b(?:complete|completed|success)").unwrap());

static FLUSH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bflush(?:ing|ed)?\b").unwrap());

static FLUSH_MS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:flushed.*?|finished (?:memstore )?flush.*? in )(\d+)\s*ms").unwrap()
});

static FLUSH_SIZE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)dataSize\s*~?\s*(\d+(?:\.\d+)?\s*[KMGT]?B)\b").unwrap());

static BALANCER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bbalancer\b|\bbalance(?:d|ing)?\b").unwrap());

static MOVE_REGION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bmov(?:e|ing) region\b").unwrap());

fn region_name(msg: &str) -> Option<&str> {
    capture_str(&REGION_REGEX, msg).map(|r| r.trim_end_matches(','))
}

fn duration_ms(ms_regex: &Regex, msg: &str) -> Option<f64> {
    capture_f64(ms_regex, msg).or_else(|| {
        capture_str(&TOOK_REGEX, msg).and_then(|s| ValueParser::parse_duration_ms(s).ok())
    })
}

// ============================================================================
// Compaction
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct CompactionClassifier;

impl DomainClassifier for CompactionClassifier {
    fn domain(&self) -> Domain {
        Domain::Compaction
    }

    fn classify(&self, ctx: &ClassifyContext) -> Option<FieldMap> {
        let msg = ctx.message;
        if !COMPACTION_REGEX.is_match(msg) {
            return None;
        }

        let lower = msg.to_lowercase();
        let mut fields = FieldMap::new();
        fields.insert("major".into(), lower.contains("major compaction").into());
        if lower.contains("starting") {
            event(&mut fields, "start");
        } else if lower.contains("completed") {
            event(&mut fields, "complete");
        } else {
            event(&mut fields, "compaction");
        }
        insert_opt(&mut fields, "duration_ms", duration_ms(&COMPACTION_MS_REGEX, msg));
        Some(fields)
    }
}

// ============================================================================
// Split
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SplitClassifier;

impl DomainClassifier for SplitClassifier {
    fn domain(&self) -> Domain {
        Domain::Split
    }

    fn classify(&self, ctx: &ClassifyContext) -> Option<FieldMap> {
        let msg = ctx.message;
        let done = SPLIT_DONE_REGEX.is_match(msg);
        if !done && !SPLIT_START_REGEX.is_match(msg) {
            return None;
        }

        let mut fields = FieldMap::new();
        event(&mut fields, if done { "split_complete" } else { "split_start" });
        insert_opt(&mut fields, "region", region_name(msg));
        Some(fields)
    }
}

// ============================================================================
// Flush
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct FlushClassifier;

impl DomainClassifier for FlushClassifier {
    fn domain(&self) -> Domain {
        Domain::Flush
    }

    fn classify(&self, ctx: &ClassifyContext) -> Option<FieldMap> {
        let msg = ctx.message;
        if !FLUSH_REGEX.is_match(msg) {
            return None;
        }

        let mut fields = FieldMap::new();
        let duration = duration_ms(&FLUSH_MS_REGEX, msg);
        let finished = duration.is_some() || msg.to_lowercase().contains("finished");
        event(&mut fields, if finished { "flushed" } else { "flushing" });
        insert_opt(&mut fields, "duration_ms", duration);
        let size_mb = capture_str(&FLUSH_SIZE_REGEX, msg).and_then(|s| ValueParser::parse_size_mb(s).ok());
        insert_opt(&mut fields, "data_size_mb", size_mb);
        Some(fields)
    }
}

// ============================================================================
// Balancer
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct BalancerClassifier;

impl DomainClassifier for BalancerClassifier {
    fn domain(&self) -> Domain {
        Domain::Balancer
    }

    fn classify(&self, ctx: &ClassifyContext) -> Option<FieldMap> {
        let msg = ctx.message;
        let moving = MOVE_REGION_REGEX.is_match(msg);
        if !moving && !BALANCER_REGEX.is_match(msg) {
            return None;
        }

        let mut fields = FieldMap::new();
        event(&mut fields, if moving { "move_region" } else { "balance" });
        insert_opt(&mut fields, "region", region_name(msg));
        Some(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::log_analyzer::models::{FieldValue, NodeRole, Severity};

    fn ctx(message: &str) -> ClassifyContext<'_> {
        ClassifyContext { message, severity: Severity::Info, role: NodeRole::RegionServer }
    }

    #[test]
    fn test_completed_major_compaction() {
        let fields = CompactionClassifier
            .classify(&ctx("regionserver.HStore: Completed major compaction of 3 file(s) in cf of t1 into abc, took 5sec to execute"))
            .unwrap();
        assert_eq!(fields.get("major"), Some(&FieldValue::Bool(true)));
        assert_eq!(fields.get("duration_ms"), Some(&FieldValue::Float(5000.0)));
    }

    #[test]
    fn test_compaction_ms() {
        let fields = CompactionClassifier
            .classify(&ctx("Completed compaction of region r1 in 850ms"))
            .unwrap();
        assert_eq!(fields.get("duration_ms"), Some(&FieldValue::Float(850.0)));
    }

    #[test]
    fn test_flush_duration() {
        let fields = FlushClassifier
            .classify(&ctx("regionserver.HRegion: Finished flush of dataSize ~1.2 MB for 1588230740 in 45ms, sequenceid=12"))
            .unwrap();
        assert_eq!(fields.get("duration_ms"), Some(&FieldValue::Float(45.0)));
        assert_eq!(fields.get("data_size_mb"), Some(&FieldValue::Float(1.2)));
    }

    #[test]
    fn test_split_and_balancer() {
        assert!(SplitClassifier.classify(&ctx("Splitting region=t1,,1700.abc")).is_some());
        assert!(SplitClassifier.classify(&ctx("regionserver.CompactSplit: queue sizes")).is_none());
        let moved = BalancerClassifier.classify(&ctx("master.HMaster: Moving region abc to rs2")).unwrap();
        assert_eq!(moved.get("event"), Some(&FieldValue::Text("move_region".into())));
    }
}
