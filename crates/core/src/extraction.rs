//! Structured records parsed out of language-model text.

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use crate::errors::BridgeError;

const MEETING_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

#[derive(Clone, Debug, PartialEq)]
pub struct StructuredRecord(Map<String, Value>);

impl StructuredRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn required_str(&self, field: &str) -> Result<&str, BridgeError> {
        match self.0.get(field) {
            Some(Value::String(value)) => Ok(value.as_str()),
            Some(other) => Err(BridgeError::parse(format!(
                "field `{field}` should be a string, got {other}"
            ))),
            None => Err(BridgeError::parse(format!("missing field `{field}` in model output"))),
        }
    }
}

/// Removes markdown code fences (with or without a language tag) around model output.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.find('\n') {
            Some(newline) if rest[..newline].chars().all(|ch| ch.is_ascii_alphanumeric()) => {
                &rest[newline + 1..]
            }
            _ => rest.trim_start_matches(|ch: char| ch.is_ascii_alphabetic()),
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

pub fn parse_structured(raw: &str) -> Result<StructuredRecord, BridgeError> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err(BridgeError::parse("model returned an empty response"));
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(StructuredRecord(fields)),
        Ok(other) => Err(BridgeError::parse(format!(
            "model output is not a JSON object: {}",
            kind_name(&other)
        ))),
        Err(error) => Err(BridgeError::parse(format!("model output is not valid JSON: {error}"))),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeetingFields {
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl MeetingFields {
    pub fn from_record(record: &StructuredRecord) -> Result<Self, BridgeError> {
        let title = record.required_str("title")?.trim();
        if title.is_empty() {
            return Err(BridgeError::parse("meeting title is empty"));
        }
        let start_time = parse_meeting_time("start_time", record.required_str("start_time")?)?;
        let end_time = parse_meeting_time("end_time", record.required_str("end_time")?)?;
        if end_time < start_time {
            return Err(BridgeError::parse(format!(
                "meeting ends ({end_time}) before it starts ({start_time})"
            )));
        }

        Ok(Self { title: title.to_owned(), start_time, end_time })
    }
}

fn parse_meeting_time(field: &str, value: &str) -> Result<NaiveDateTime, BridgeError> {
    MEETING_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value.trim(), format).ok())
        .ok_or_else(|| {
            BridgeError::parse(format!("`{field}` value `{value}` is not in YYYY-MM-DDTHH:MM form"))
        })
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::{parse_structured, strip_code_fences, MeetingFields};
    use crate::errors::{BridgeError, ErrorKind};

    #[test]
    fn fenced_and_bare_records_parse_identically() {
        let fenced = parse_structured("```json\n{\"response\":\"ok\"}\n```").expect("fenced");
        let bare = parse_structured("{\"response\":\"ok\"}").expect("bare");
        assert_eq!(fenced, bare);
        assert_eq!(fenced.required_str("response"), Ok("ok"));
    }

    #[test]
    fn strips_untagged_fences_and_surrounding_whitespace() {
        assert_eq!(strip_code_fences("  ```\n{\"a\":1}\n```  "), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn nested_objects_survive_parsing() {
        let record = parse_structured("```json\n{\"response\":\"ok\",\"meta\":{\"n\":1}}\n```")
            .expect("nested record");
        assert_eq!(record.get("meta"), Some(&json!({"n": 1})));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let error = parse_structured("Sure! Here is your answer.").expect_err("prose");
        assert_eq!(error.kind(), ErrorKind::Parse);

        let error = parse_structured("```json\n[1,2]\n```").expect_err("array");
        assert!(error.to_string().contains("not a JSON object"));

        let error = parse_structured("```json\n```").expect_err("empty");
        assert!(matches!(error, BridgeError::Parse(_)));
    }

    #[test]
    fn missing_or_non_string_fields_are_parse_errors() {
        let record = parse_structured("{\"response\": 42}").expect("record");
        assert!(matches!(record.required_str("response"), Err(BridgeError::Parse(_))));
        assert!(matches!(record.required_str("other"), Err(BridgeError::Parse(_))));
    }

    #[test]
    fn meeting_fields_parse_from_model_record() {
        let record = parse_structured(
            r#"{"title":"standup","start_time":"2025-05-10T10:00","end_time":"2025-05-10T10:30"}"#,
        )
        .expect("record");
        let fields = MeetingFields::from_record(&record).expect("meeting fields");

        let day = NaiveDate::from_ymd_opt(2025, 5, 10).expect("date");
        assert_eq!(fields.title, "standup");
        assert_eq!(fields.start_time, day.and_hms_opt(10, 0, 0).expect("start"));
        assert_eq!(fields.end_time, day.and_hms_opt(10, 30, 0).expect("end"));
    }

    #[test]
    fn meeting_fields_reject_bad_times() {
        let record = parse_structured(
            r#"{"title":"standup","start_time":"tomorrow","end_time":"2025-05-10T10:30"}"#,
        )
        .expect("record");
        assert!(matches!(MeetingFields::from_record(&record), Err(BridgeError::Parse(_))));

        let reversed = parse_structured(
            r#"{"title":"standup","start_time":"2025-05-10T11:00","end_time":"2025-05-10T10:30"}"#,
        )
        .expect("record");
        let error = MeetingFields::from_record(&reversed).expect_err("reversed");
        assert!(error.to_string().contains("before it starts"));
    }
}
