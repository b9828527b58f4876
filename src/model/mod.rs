pub mod entry;
pub mod issue;
pub mod raw_bug;
pub mod series;
pub mod source_record;
pub mod status;
