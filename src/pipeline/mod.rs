pub mod collector;
pub mod generator;
pub mod normalizer;
pub mod presenter;

pub use collector::Selection;
pub use generator::PromptGenerator;
pub use normalizer::PromptItem;
