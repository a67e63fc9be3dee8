// topicgroup-core - Records, filename templates and timestamp sources
//
// Pure building blocks shared by the grouper, configuration and binary.
// No I/O, no async, no global state.

pub mod error;
pub mod record;
pub mod template;
pub mod timestamp;

// Re-export commonly used types
pub use error::{GrouperError, Result, TemplateError};
pub use record::{GroupedRecord, SinkRecord, TopicPartition};
pub use template::{Binding, Bindings, Template, TemplateVariable};
pub use timestamp::{
    FixedTimestampSource, TimestampSource, TimestampSourceType, TimestampUnit,
    WallclockTimestampSource,
};

/// Template used when none is configured
pub const DEFAULT_FILE_NAME_TEMPLATE: &str = "{{topic}}-{{partition}}-{{start_offset}}";
