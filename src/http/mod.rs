//! Asynchronous HTTP request engine.
//!
//! A fixed pool of reusable connections is drained by a single dispatcher task.
//! Callers submit requests from any thread and get a [`Deferred`] back
//! immediately; typed submissions decode the JSON body off the dispatcher.

pub mod decode;
pub mod deferred;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod pool;
pub mod queue;
pub mod resolver;
pub mod transport;
pub mod types;

pub use decode::{check_status, decode_response};
pub use deferred::{deferred, Completer, Deferred};
pub use engine::{AsyncHttpEngine, EngineStats, ShutdownReport};
pub use error::{EngineError, TransportError};
pub use pool::{ConnectionPool, Lease, PoolReport};
pub use queue::{Task, TaskQueue};
pub use transport::{
    parse_header_line, HttpTransport, HttpTransportFactory, TransferSink, Transport,
    TransportFactory,
};
pub use types::{
    Headers, Method, Request, Response, POOL_EXHAUSTED_MESSAGE, POOL_EXHAUSTED_STATUS,
    TRANSPORT_FAILURE_STATUS,
};
