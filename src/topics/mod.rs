// Topics — raw topic-model assignments and the curated mapping.

pub mod assignments;
pub mod mapping;
pub mod traits;
