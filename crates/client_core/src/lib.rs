//! Client side of the Valentine experience: the riddle flow, its persisted
//! completion flag, the photo wall and the generated extras shown once the
//! proposal is accepted.

pub mod catalog;
pub mod flag_store;
pub mod flow;
pub mod generation;
pub mod matcher;
pub mod photos;

pub use catalog::{Catalog, Question};
pub use flag_store::{
    default_state_path, CompletionFlag, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore,
    COMPLETION_FLAG_KEY,
};
pub use flow::{Flow, FlowError, FlowStep, SubmitOutcome};
pub use generation::{
    compose_poem, suggest_movie, DisabledGenerator, GeminiClient, GenerationError,
    MovieSuggestion, TextGenerator,
};
pub use photos::{PhotoError, PhotoWall};
