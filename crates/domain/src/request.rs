use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

/// Record types the router answers for; anything else is carried as its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    A,
    Aaaa,
    Other(u16),
}

impl QueryType {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => QueryType::A,
            28 => QueryType::Aaaa,
            other => QueryType::Other(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            QueryType::A => 1,
            QueryType::Aaaa => 28,
            QueryType::Other(code) => *code,
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::A => f.write_str("A"),
            QueryType::Aaaa => f.write_str("AAAA"),
            QueryType::Other(code) => write!(f, "TYPE{code}"),
        }
    }
}

/// Address family a request is answered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    pub fn of(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub client_ip: IpAddr,
    pub hostname: String,
    pub path: String,
    pub query_string: Option<String>,
    pub secure: bool,
    headers: HashMap<String, String>,
}

impl HttpRequest {
    pub fn new(client_ip: IpAddr, hostname: &str, path: &str) -> Self {
        Self {
            client_ip,
            hostname: hostname.to_ascii_lowercase(),
            path: path.to_string(),
            query_string: None,
            secure: false,
            headers: HashMap::new(),
        }
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query_string = (!query.is_empty()).then(|| query.to_string());
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Header names compare case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Path plus `?query` when a query string is present.
    pub fn uri(&self) -> String {
        match &self.query_string {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DnsRequest {
    pub client_ip: IpAddr,
    pub hostname: String,
    pub zone_name: Option<String>,
    pub query_type: QueryType,
    pub dnssec: bool,
}

impl DnsRequest {
    pub fn new(client_ip: IpAddr, hostname: &str, query_type: QueryType) -> Self {
        Self {
            client_ip,
            hostname: hostname.trim_end_matches('.').to_ascii_lowercase(),
            zone_name: None,
            query_type,
            dnssec: false,
        }
    }

    pub fn with_zone(mut self, zone: &str) -> Self {
        self.zone_name = Some(zone.to_ascii_lowercase());
        self
    }

    pub fn with_dnssec(mut self, dnssec: bool) -> Self {
        self.dnssec = dnssec;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Http(HttpRequest),
    Dns(DnsRequest),
}

impl Request {
    pub fn client_ip(&self) -> IpAddr {
        match self {
            Request::Http(r) => r.client_ip,
            Request::Dns(r) => r.client_ip,
        }
    }

    pub fn hostname(&self) -> &str {
        match self {
            Request::Http(r) => &r.hostname,
            Request::Dns(r) => &r.hostname,
        }
    }

    /// AAAA queries want IPv6 caches; HTTP follows the client's own family.
    pub fn ip_version(&self) -> IpVersion {
        match self {
            Request::Http(r) => IpVersion::of(r.client_ip),
            Request::Dns(r) if r.query_type == QueryType::Aaaa => IpVersion::V6,
            Request::Dns(_) => IpVersion::V4,
        }
    }

    pub fn as_http(&self) -> Option<&HttpRequest> {
        match self {
            Request::Http(r) => Some(r),
            Request::Dns(_) => None,
        }
    }
}

impl From<HttpRequest> for Request {
    fn from(request: HttpRequest) -> Self {
        Request::Http(request)
    }
}

impl From<DnsRequest> for Request {
    fn from(request: DnsRequest) -> Self {
        Request::Dns(request)
    }
}
