//! 校验器 - 选择、校验、记录、编排
//!
//! | Module | Role |
//! |--------|------|
//! | [`selection`] | which bitstreams a run visits |
//! | [`verifier`] | one verification attempt per bitstream |
//! | [`recorder`] | status upsert + history append |
//! | [`worker`] | the run loop |
//! | [`report`] | progress output and run summary |
//! | [`digest`] | streaming digests |

pub mod digest;
pub mod recorder;
pub mod report;
pub mod selection;
pub mod verifier;
pub mod worker;

pub use recorder::ResultRecorder;
pub use report::{ProgressReporter, RunSummary};
pub use selection::{BitstreamCursor, SelectionCriteria, SelectionFilter, SelectionFlags};
pub use verifier::{VerificationAttempt, VerificationEngine};
pub use worker::{Action, ChecksumWorker};
