// Analysis pipeline: merge -> consolidate -> aggregate -> compare.

pub mod consolidate;
pub mod merge;
pub mod run;
