use hickory_proto::op::{Edns, Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{DNSClass, RData, Record, RecordType};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;
use traffic_router_application::services::TrafficRouter;
use traffic_router_domain::{AccessRecord, AnswerSummary, DnsRequest, QueryType, QuestionSummary};

const MAX_SUPPORTED_EDNS_VERSION: u8 = 0;

/// Answers DNS questions for delivery-service names from the traffic router.
pub struct NameServer {
    router: Arc<TrafficRouter>,
    max_udp_payload: u16,
}

impl NameServer {
    pub fn new(router: Arc<TrafficRouter>, max_udp_payload: u16) -> Self {
        Self {
            router,
            max_udp_payload,
        }
    }

    /// Builds the response to `request` and fills in the routing fields of
    /// the access record.
    pub fn query(&self, request: &Message, client: IpAddr, record: &mut AccessRecord) -> Message {
        let mut response = response_for(request);
        response.set_authoritative(true);

        let Some(question) = request.queries().first() else {
            record.rcode = Some(rcode_mnemonic(response.response_code()));
            return response;
        };
        record.question = Some(question_summary(request.id(), question));

        if let Some(edns) = request.extensions() {
            if edns.version() > MAX_SUPPORTED_EDNS_VERSION {
                response.set_response_code(ResponseCode::NotImp);
                let mut opt = Edns::new();
                opt.set_max_payload(self.max_udp_payload);
                opt.set_version(MAX_SUPPORTED_EDNS_VERSION);
                opt.set_rcode_high(ResponseCode::BADVERS.high());
                response.set_edns(opt);
                record.rcode = Some(rcode_mnemonic(ResponseCode::BADVERS));
                return response;
            }
        }

        if !matches!(question.query_class(), DNSClass::IN | DNSClass::ANY) {
            debug!(class = %question.query_class(), name = %question.name(), "Refusing query class");
            response.set_authoritative(false);
            response.set_response_code(ResponseCode::Refused);
            record.rcode = Some(rcode_mnemonic(ResponseCode::Refused));
            return response;
        }

        let dnssec_ok = request
            .extensions()
            .as_ref()
            .is_some_and(|edns| edns.dnssec_ok());
        let query_type = question.query_type();
        let dns_request = DnsRequest::new(
            client,
            &question.name().to_utf8(),
            QueryType::from_code(u16::from(query_type)),
        )
        .with_dnssec(dnssec_ok);

        let result = self.router.route_dns(&dns_request);
        record.result_type = Some(result.track.result);
        record.result_details = result.track.logged_details();
        record.result_location = result.track.result_location;
        record.delivery_service = result
            .delivery_service
            .as_ref()
            .map(|ds| ds.id().to_string());

        if result.is_unknown_name() {
            response.set_response_code(ResponseCode::NXDomain);
        } else {
            for inet in result
                .addresses
                .iter()
                .filter(|r| answers_type(query_type, r.address))
            {
                let rdata = match inet.address {
                    IpAddr::V4(ip) => RData::A(A(ip)),
                    IpAddr::V6(ip) => RData::AAAA(AAAA(ip)),
                };
                response.add_answer(Record::from_rdata(question.name().clone(), inet.ttl, rdata));
                record.answers.push(AnswerSummary {
                    ttl: inet.ttl,
                    data: inet.address.to_string(),
                });
            }
        }

        if request.extensions().is_some() {
            let mut opt = Edns::new();
            opt.set_max_payload(self.max_udp_payload);
            opt.set_version(MAX_SUPPORTED_EDNS_VERSION);
            opt.set_dnssec_ok(dnssec_ok);
            response.set_edns(opt);
        }

        record.rcode = Some(rcode_mnemonic(response.response_code()));
        response
    }
}

fn answers_type(query_type: RecordType, address: IpAddr) -> bool {
    match query_type {
        RecordType::A => address.is_ipv4(),
        RecordType::AAAA => address.is_ipv6(),
        RecordType::ANY => true,
        _ => false,
    }
}

/// Response header and question copied from `request`, nothing else.
pub fn response_for(request: &Message) -> Message {
    let mut response = Message::new();
    response
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_recursion_desired(request.recursion_desired());
    for query in request.queries() {
        response.add_query(query.clone());
    }
    response
}

/// SERVFAIL keeping the id and question of `request`.
pub fn server_failure(request: &Message) -> Message {
    let mut response = response_for(request);
    response.set_response_code(ResponseCode::ServFail);
    response
}

pub fn question_summary(id: u16, query: &Query) -> QuestionSummary {
    QuestionSummary {
        id,
        name: query.name().to_string(),
        record_type: query.query_type().to_string(),
        class: query.query_class().to_string(),
    }
}

pub fn rcode_mnemonic(code: ResponseCode) -> String {
    match code {
        ResponseCode::NoError => "NOERROR".to_string(),
        ResponseCode::FormErr => "FORMERR".to_string(),
        ResponseCode::ServFail => "SERVFAIL".to_string(),
        ResponseCode::NXDomain => "NXDOMAIN".to_string(),
        ResponseCode::NotImp => "NOTIMP".to_string(),
        ResponseCode::Refused => "REFUSED".to_string(),
        ResponseCode::BADVERS => "BADVERS".to_string(),
        other => u16::from(other).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rcode_mnemonics() {
        assert_eq!(rcode_mnemonic(ResponseCode::NoError), "NOERROR");
        assert_eq!(rcode_mnemonic(ResponseCode::NXDomain), "NXDOMAIN");
        assert_eq!(rcode_mnemonic(ResponseCode::Refused), "REFUSED");
        assert_eq!(rcode_mnemonic(ResponseCode::YXDomain), "6");
    }

    #[test]
    fn test_answers_type_filters_by_family() {
        let v4: IpAddr = "10.0.0.1".parse().unwrap();
        let v6: IpAddr = "2001:db8::1".parse().unwrap();
        assert!(answers_type(RecordType::A, v4));
        assert!(!answers_type(RecordType::A, v6));
        assert!(answers_type(RecordType::AAAA, v6));
        assert!(answers_type(RecordType::ANY, v6));
        assert!(!answers_type(RecordType::MX, v4));
    }

    #[test]
    fn test_server_failure_keeps_id_and_question() {
        let mut request = Message::new();
        request.set_id(4242);
        request.add_query(Query::query(
            hickory_proto::rr::Name::from_ascii("edge.video.cdn.test.").unwrap(),
            RecordType::A,
        ));

        let response = server_failure(&request);

        assert_eq!(response.id(), 4242);
        assert_eq!(response.response_code(), ResponseCode::ServFail);
        assert_eq!(response.queries(), request.queries());
        assert!(response.answers().is_empty());
    }
}
