//! DNS transports and the executor they share.
//!
//! Each transport accepts raw queries and hands them to the
//! [`ProtocolExecutor`] as tasks. Tasks call [`query`] to turn wire bytes
//! into a response and a single access log line.

mod error;
mod executor;
mod tcp;
mod udp;

pub use error::ProtocolError;
pub use executor::{ProtocolExecutor, ProtocolTask, Submission, TaskOutcome};
pub use tcp::{read_frame, write_frame, TcpTransport, MAX_TCP_MESSAGE_SIZE};
pub use udp::{UdpTransport, MIN_UDP_PAYLOAD};

use async_trait::async_trait;
use chrono::Utc;
use hickory_proto::op::Message;
use std::any::Any;
use std::net::IpAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use traffic_router_domain::AccessRecord;

use super::name_server::{rcode_mnemonic, server_failure, NameServer};

pub const ACCESS_LOG_TARGET: &str = "traffic_router::access";

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Accepts queries until [`Transport::shutdown`] is called.
    async fn run(self: Arc<Self>);

    fn shutdown(&self);

    /// Largest response the transport may send for `query`.
    fn max_response_length(&self, query: Option<&Message>) -> usize;
}

pub fn log_access(record: &AccessRecord) {
    info!(target: ACCESS_LOG_TARGET, "{}", record);
}

/// Answers one wire-format query.
///
/// A payload that does not parse is logged as a bad request and returned as
/// an error; the caller drops it. A failure while routing or encoding becomes
/// SERVFAIL with the request's ID and question. Every call logs exactly one
/// access record.
pub fn query(
    name_server: &NameServer,
    client: IpAddr,
    payload: &[u8],
    max_length: impl Fn(Option<&Message>) -> usize,
) -> Result<Vec<u8>, ProtocolError> {
    let started = Instant::now();
    let mut record = AccessRecord::new(Utc::now(), client);

    let request = match Message::from_vec(payload) {
        Ok(request) => request,
        Err(e) => {
            let mut record = record.bad_request(&e.to_string());
            record.response_time = started.elapsed();
            log_access(&record);
            return Err(ProtocolError::Parse(e.to_string()));
        }
    };

    let resolved = panic::catch_unwind(AssertUnwindSafe(|| {
        name_server.query(&request, client, &mut record)
    }));
    let mut response = match resolved {
        Ok(response) => response,
        Err(payload) => {
            let reason = panic_reason(payload.as_ref());
            error!(client = %client, id = request.id(), reason = %reason, "Routing failed while answering query");
            record = record.server_error(&reason);
            record.answers.clear();
            server_failure(&request)
        }
    };
    let max = max_length(Some(&request));

    let bytes = match encode(&mut response, max) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(client = %client, id = request.id(), error = %e, "Failed to answer query");
            record = record.server_error(&e.to_string());
            record.answers.clear();
            let mut failure = server_failure(&request);
            record.rcode = Some(rcode_mnemonic(failure.response_code()));
            match encode(&mut failure, max) {
                Ok(bytes) => bytes,
                Err(e) => {
                    record.response_time = started.elapsed();
                    log_access(&record);
                    return Err(e);
                }
            }
        }
    };

    record.response_time = started.elapsed();
    log_access(&record);
    Ok(bytes)
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(reason) = payload.downcast_ref::<&str>() {
        reason.to_string()
    } else if let Some(reason) = payload.downcast_ref::<String>() {
        reason.clone()
    } else {
        "panic while routing".to_string()
    }
}

/// Serializes `response`, dropping its records and setting TC when it does
/// not fit in `max` bytes.
fn encode(response: &mut Message, max: usize) -> Result<Vec<u8>, ProtocolError> {
    let bytes = response
        .to_vec()
        .map_err(|e| ProtocolError::Encode(e.to_string()))?;
    if bytes.len() <= max {
        return Ok(bytes);
    }

    response.take_answers();
    response.take_name_servers();
    response.take_additionals();
    response.set_truncated(true);
    response
        .to_vec()
        .map_err(|e| ProtocolError::Encode(e.to_string()))
}
