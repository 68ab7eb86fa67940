//! @ai:module:intent Golden and trap item definitions and loading
//! @ai:module:layer domain
//! @ai:module:public_api GoldenItem, TrapItem, EvalItem, ExamVariant, Difficulty, DatasetLoader, DatasetError

pub mod item;
pub mod loader;

pub use item::{Difficulty, EvalItem, ExamVariant, GoldenItem, ItemSchema, TrapItem};
pub use loader::{DatasetError, DatasetLoader, DatasetLoaderTrait};
