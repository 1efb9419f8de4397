// Parlsent: topic–sentiment comparison for parliamentary speeches
//
// This is the library root. Each module corresponds to a stage of the
// analysis pipeline or to the plumbing around it (inputs, results store,
// terminal output).

pub mod config;
pub mod db;
pub mod error;
pub mod jsonl;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod sentiment;
pub mod speeches;
pub mod stats;
pub mod status;
pub mod topics;
