//! Output channel: schema, record and state messages
//!
//! Every stream declares its schema once, then any number of records.
//! State messages are written whenever a bookmark advances.

mod emitter;
mod message;
mod schemas;
mod sink;

pub use emitter::RecordEmitter;
pub use message::OutputMessage;
pub use schemas::{STREAMS, load_schema};
pub use sink::{JsonLinesSink, MemorySink, MessageSink};
