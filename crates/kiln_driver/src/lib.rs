mod codegen;
mod report;

pub use codegen::{generate_code, generate_code_with};
pub use report::{CodegenReport, FailedConstruct, FailureReason};
