pub mod name_server;
pub mod protocol;

pub use name_server::NameServer;
pub use protocol::{
    ProtocolError, ProtocolExecutor, ProtocolTask, Submission, TaskOutcome, TcpTransport,
    Transport, UdpTransport,
};
