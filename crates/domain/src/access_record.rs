use chrono::{DateTime, Utc};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use crate::{Geolocation, ResultDetails, ResultType};

/// The question section as it appears in the access log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSummary {
    pub id: u16,
    pub name: String,
    pub record_type: String,
    pub class: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSummary {
    pub ttl: u32,
    pub data: String,
}

/// One line of the DNS access log, written once per query.
#[derive(Debug, Clone)]
pub struct AccessRecord {
    pub request_time: DateTime<Utc>,
    pub client: IpAddr,
    pub resolver: Option<IpAddr>,
    pub response_time: Duration,
    pub question: Option<QuestionSummary>,
    pub rcode: Option<String>,
    pub result_type: Option<ResultType>,
    pub result_location: Option<Geolocation>,
    pub result_details: Option<ResultDetails>,
    pub error: Option<String>,
    pub answers: Vec<AnswerSummary>,
    pub delivery_service: Option<String>,
}

impl AccessRecord {
    pub fn new(request_time: DateTime<Utc>, client: IpAddr) -> Self {
        Self {
            request_time,
            client,
            resolver: None,
            response_time: Duration::ZERO,
            question: None,
            rcode: None,
            result_type: None,
            result_location: None,
            result_details: None,
            error: None,
            answers: Vec::new(),
            delivery_service: None,
        }
    }

    /// Request that failed before it could be parsed.
    pub fn bad_request(mut self, reason: &str) -> Self {
        self.error = Some(format!("Bad Request:{reason}"));
        self
    }

    /// Request that failed while being answered.
    pub fn server_error(mut self, reason: &str) -> Self {
        self.rcode = Some("SERVFAIL".to_string());
        self.error = Some(format!("Server Error:{reason}"));
        self
    }
}

fn or_dash<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

fn joined<F: Fn(&AnswerSummary) -> String>(answers: &[AnswerSummary], f: F) -> String {
    if answers.is_empty() {
        return "-".to_string();
    }
    answers.iter().map(f).collect::<Vec<_>>().join(" ")
}

impl fmt::Display for AccessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:03} qtype=DNS chi={} rhi={} ttms={:.3}",
            self.request_time.timestamp(),
            self.request_time.timestamp_subsec_millis(),
            self.client,
            or_dash(&self.resolver),
            self.response_time.as_secs_f64() * 1000.0,
        )?;

        match &self.question {
            Some(q) => write!(f, " xn={} fqdn={} type={} class={}", q.id, q.name, q.record_type, q.class)?,
            None => f.write_str(" xn=- fqdn=- type=- class=-")?,
        }

        write!(
            f,
            " rcode={} rtype={} rloc=\"{}\" rdtl={} rerr=\"{}\" ttl=\"{}\" ans=\"{}\" svc=\"{}\"",
            or_dash(&self.rcode),
            or_dash(&self.result_type),
            or_dash(&self.result_location),
            or_dash(&self.result_details),
            or_dash(&self.error),
            joined(&self.answers, |a| a.ttl.to_string()),
            joined(&self.answers, |a| a.data.clone()),
            or_dash(&self.delivery_service),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> AccessRecord {
        let time = Utc.timestamp_millis_opt(144_140_678_000).unwrap();
        AccessRecord::new(time, "192.168.10.11".parse().unwrap())
    }

    fn question() -> QuestionSummary {
        QuestionSummary {
            id: 65535,
            name: "www.example.com.".to_string(),
            record_type: "A".to_string(),
            class: "IN".to_string(),
        }
    }

    #[test]
    fn test_bad_request_line() {
        let mut record = base().bad_request("WireParseException:invalid record length");
        record.response_time = Duration::from_millis(789);
        assert_eq!(
            record.to_string(),
            "144140678.000 qtype=DNS chi=192.168.10.11 rhi=- ttms=789.000 xn=- fqdn=- type=- class=- rcode=- \
             rtype=- rloc=\"-\" rdtl=- rerr=\"Bad Request:WireParseException:invalid record length\" ttl=\"-\" ans=\"-\" svc=\"-\""
        );
    }

    #[test]
    fn test_answer_line() {
        let mut record = base();
        record.response_time = Duration::from_nanos(789_123_000);
        record.question = Some(question());
        record.rcode = Some("NOERROR".to_string());
        record.answers = vec![
            AnswerSummary { ttl: 1, data: "foo".to_string() },
            AnswerSummary { ttl: 2, data: "bar".to_string() },
            AnswerSummary { ttl: 3, data: "baz".to_string() },
        ];
        assert_eq!(
            record.to_string(),
            "144140678.000 qtype=DNS chi=192.168.10.11 rhi=- ttms=789.123 xn=65535 fqdn=www.example.com. type=A class=IN \
             rcode=NOERROR rtype=- rloc=\"-\" rdtl=- rerr=\"-\" ttl=\"1 2 3\" ans=\"foo bar baz\" svc=\"-\""
        );
    }

    #[test]
    fn test_server_error_line() {
        let mut record = base().server_error("RuntimeException:boom it failed");
        record.question = Some(question());
        record.response_time = Duration::from_nanos(789_876_321);
        let line = record.to_string();
        assert!(line.contains("ttms=789.876"));
        assert!(line.contains("rcode=SERVFAIL"));
        assert!(line.contains("rerr=\"Server Error:RuntimeException:boom it failed\""));
    }

    #[test]
    fn test_result_fields() {
        let mut record = base();
        record.question = Some(question());
        record.rcode = Some("NOERROR".to_string());
        record.result_type = Some(ResultType::Miss);
        record.result_details = Some(ResultDetails::DsNotFound);
        record.result_location = Some(Geolocation::new(39.7528, -104.9997).unwrap());
        record.resolver = Some("10.0.0.211".parse().unwrap());
        record.delivery_service = Some("test".to_string());
        let line = record.to_string();
        assert!(line.contains("rhi=10.0.0.211"));
        assert!(line.contains("rtype=MISS rloc=\"39.75,-104.99\" rdtl=DS_NOT_FOUND"));
        assert!(line.ends_with("svc=\"test\""));
    }
}
