//! @ai:module:intent Item execution against the answering service
//! @ai:module:layer infrastructure
//! @ai:module:public_api AnswerClientTrait, HttpAnswerClient, MockAnswerClient, BatchExecutor, TestResult, ScheduleMode

pub mod client;
pub mod executor;

pub use client::{
    AnswerClientTrait, AnswerError, AnswerRequest, AnswerResponse, HttpAnswerClient,
    MockAnswerClient,
};
pub use executor::{BatchExecutor, ExecutionError, ExecutionSettings, ScheduleMode, TestResult};
