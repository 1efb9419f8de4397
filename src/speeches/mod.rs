// Speech store — read-only access to the normalized speech records.

pub mod store;
