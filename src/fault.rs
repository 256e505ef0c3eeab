//! Fatal runtime faults.
//!
//! These are distinct from the in-language `Error` sentinel
//! [`crate::value::Value`]: a `Fault` is never data a program can branch on.
//! It aborts the process after a single diagnostic line, the way
//! `fuel-vm`'s `InterpreterError` distinguishes a recoverable
//! `PanicReason` from an unrecoverable storage/halt condition.

use alloc::string::String;

/// A fatal condition that halts the runtime with a non-zero exit code.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum Fault {
    /// The OS allocator refused to serve a page request.
    #[display(fmt = "out-of-memory: {_0}")]
    OutOfMemory(String),
    /// `org_init_program` finished registering root bindings without a
    /// `main` key in the global scope.
    #[display(fmt = "no-main: main key not found")]
    NoMain,
    /// Generated code violated the compiler ABI contract, e.g. calling a
    /// flow dispatcher with a non-source left operand.
    #[display(fmt = "abi-misuse: {_0}")]
    AbiMisuse(String),
}

impl Fault {
    /// The single-word category used as `<kind>` in the diagnostic line.
    pub const fn kind(&self) -> &'static str {
        match self {
            Fault::OutOfMemory(_) => "out-of-memory",
            Fault::NoMain => "no-main",
            Fault::AbiMisuse(_) => "abi-misuse",
        }
    }

    /// Render the one-line diagnostic: `runtime: <kind>: <details>`.
    pub fn diagnostic_line(&self) -> String {
        alloc::format!("runtime: {self}")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Fault {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_main_diagnostic_line() {
        assert_eq!(
            Fault::NoMain.diagnostic_line(),
            "runtime: no-main: main key not found"
        );
    }

    #[test]
    fn out_of_memory_kind() {
        let fault = Fault::OutOfMemory("page request failed".into());
        assert_eq!(fault.kind(), "out-of-memory");
    }
}
