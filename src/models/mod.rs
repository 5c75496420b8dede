pub mod outcome;
pub mod work_item;

pub use outcome::{ItemResult, ItemStatus, RunReport};
pub use work_item::{
    parse_batch, parse_line, parse_timestamp, search_prefix, InputLine, TimestampFormat, WorkItem,
};
