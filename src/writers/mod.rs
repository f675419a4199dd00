pub mod record_writer;

pub use record_writer::{completed_keys, read_records, IncrementalWriter, RecordSink, SyncMode};
