//! JVM classifiers: garbage collection pauses and heap pressure

use super::{ClassifyContext, DomainClassifier, capture_f64, capture_i64, capture_str, event, insert_opt};
use crate::services::log_analyzer::models::{Domain, FieldMap};
use once_cell::sync::Lazy;
use regex::Regex;

static GC_PAUSE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"GC pause[^0-9]*?(\d+(?:\.\d+)?)\s*ms").unwrap());

static JVM_PAUSE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"pause of approximately (\d+)\s*ms").unwrap());

static UNIFIED_PAUSE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Pause (?:Young|Full|Remark|Cleanup|Mixed)\b.*?(\d+(?:\.\d+)?)ms").unwrap()
});

static GC_SECS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(?:GC|Full GC)[^\]]*?(\d+\.\d+) secs\]").unwrap());

static GC_POOL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"GC pool '([^']+)' had collection").unwrap());

static GC_TYPE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(Full GC|ParNew|ConcurrentMarkSweep|CMS|G1(?: \w+)?)\b").unwrap());

static HEAP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)heap.*?(\d+)M/(\d+)M").unwrap());

static OOM_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)OutOfMemoryError|out of memory").unwrap());

static USED_HEAP_MB_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"usedHeapMB=(\d+)").unwrap());

static MAX_HEAP_MB_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"maxHeapMB=(\d+)").unwrap());

static MEMSTORE_PRESSURE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)blocking updates|above global memstore|memstore.*(?:limit|pressure)").unwrap()
});

// ============================================================================
// GC
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct GcClassifier;

impl DomainClassifier for GcClassifier {
    fn domain(&self) -> Domain {
        Domain::Gc
    }

    fn classify(&self, ctx: &ClassifyContext) -> Option<FieldMap> {
        let msg = ctx.message;
        let pause_ms = capture_f64(&GC_PAUSE_REGEX, msg)
            .or_else(|| capture_f64(&JVM_PAUSE_REGEX, msg))
            .or_else(|| capture_f64(&UNIFIED_PAUSE_REGEX, msg))
            .or_else(|| capture_f64(&GC_SECS_REGEX, msg).map(|secs| secs * 1000.0));
        let gc_type = capture_str(&GC_POOL_REGEX, msg).or_else(|| capture_str(&GC_TYPE_REGEX, msg));

        let mentions_gc = msg.contains("JvmPauseMonitor") || msg.contains("GC");
        if pause_ms.is_none() && !(gc_type.is_some() && mentions_gc) {
            return None;
        }

        let mut fields = FieldMap::new();
        insert_opt(&mut fields, "pause_ms", pause_ms);
        insert_opt(&mut fields, "gc_type", gc_type);
        Some(fields)
    }
}

// ============================================================================
// Memory
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryClassifier;

impl DomainClassifier for MemoryClassifier {
    fn domain(&self) -> Domain {
        Domain::Memory
    }

    fn classify(&self, ctx: &ClassifyContext) -> Option<FieldMap> {
        let msg = ctx.message;
        let mut fields = FieldMap::new();

        if OOM_REGEX.is_match(msg) {
            event(&mut fields, "out_of_memory");
        } else if msg.to_lowercase().contains("low memory") {
            event(&mut fields, "low_memory");
        } else if MEMSTORE_PRESSURE_REGEX.is_match(msg) {
            event(&mut fields, "memstore_pressure");
        }

        if let Some(cap) = HEAP_REGEX.captures(msg) {
            let used = cap.get(1).and_then(|m| m.as_str().parse::<i64>().ok());
            let total = cap.get(2).and_then(|m| m.as_str().parse::<i64>().ok());
            if let (Some(used), Some(total)) = (used, total) {
                fields.insert("heap_used_mb".into(), used.into());
                fields.insert("heap_total_mb".into(), total.into());
                if total > 0 {
                    let pct = used as f64 * 100.0 / total as f64;
                    fields.insert("heap_usage_pct".into(), ((pct * 100.0).round() / 100.0).into());
                }
            }
        }

        // Region server load reports: "usedHeapMB=1234, maxHeapMB=4096"
        if let Some(used) = capture_i64(&USED_HEAP_MB_REGEX, msg) {
            fields.entry("heap_used_mb".into()).or_insert(used.into());
            if let Some(max) = capture_i64(&MAX_HEAP_MB_REGEX, msg) {
                fields.entry("heap_total_mb".into()).or_insert(max.into());
            }
        }

        if fields.is_empty() {
            return None;
        }
        if !fields.contains_key("event") {
            event(&mut fields, "heap_usage");
        }
        Some(fields)
    }
}
