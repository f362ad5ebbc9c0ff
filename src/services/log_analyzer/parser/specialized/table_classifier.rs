//! Table DDL classifier

use super::{ClassifyContext, DomainClassifier, capture_str, event, insert_opt};
use crate::services::log_analyzer::models::{Domain, FieldMap};
use once_cell::sync::Lazy;
use regex::Regex;

static DDL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(creat|delet|disabl|enabl|truncat|modify)(?:e|ed|ing)?\s+table\b[\s=:']*([\w:.\-]+)?")
        .unwrap()
});

static TABLE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\btable=([^,\s]+)").unwrap());

#[derive(Debug, Clone, Default)]
pub struct TableClassifier;

impl DomainClassifier for TableClassifier {
    fn domain(&self) -> Domain {
        Domain::Table
    }

    fn classify(&self, ctx: &ClassifyContext) -> Option<FieldMap> {
        let msg = ctx.message;
        let mut fields = FieldMap::new();

        if let Some(cap) = DDL_REGEX.captures(msg) {
            let verb = cap.get(1).map_or("", |m| m.as_str()).to_lowercase();
            let name = match verb.as_str() {
                "modify" => "modify".to_string(),
                stem => format!("{}e", stem),
            };
            event(&mut fields, &name);
            insert_opt(&mut fields, "table", cap.get(2).map(|m| m.as_str()));
        }

        if let Some(table) = capture_str(&TABLE_REGEX, msg) {
            fields.insert("table".into(), table.into());
        }

        if fields.is_empty() { None } else { Some(fields) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::log_analyzer::models::{FieldValue, NodeRole, Severity};

    fn ctx(message: &str) -> ClassifyContext<'_> {
        ClassifyContext { message, severity: Severity::Info, role: NodeRole::Master }
    }

    #[test]
    fn test_create_table() {
        assert!(
            TableClassifier
                .classify(&ctx("master.HMaster: Client=hbase//10.0.0.1 create 'usertable'"))
                .is_none()
        );

        let fields = TableClassifier
            .classify(&ctx("procedure.CreateTableProcedure: Creating table usertable"))
            .unwrap();
        assert_eq!(fields.get("event"), Some(&FieldValue::Text("create".into())));
        assert_eq!(fields.get("table"), Some(&FieldValue::Text("usertable".into())));
    }

    #[test]
    fn test_table_field() {
        let fields = TableClassifier
            .classify(&ctx("hbase.Foo: table=ns:orders, region count 12"))
            .unwrap();
        assert_eq!(fields.get("table"), Some(&FieldValue::Text("ns:orders".into())));
    }
}
