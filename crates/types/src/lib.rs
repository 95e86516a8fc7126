//! Shared data model for the conformance tester: what a test is, what the
//! simulator run produced, and which addresses matter inside a binary.

pub mod outcome;
pub mod symbols;
pub mod test_case;

pub use outcome::{ExecutionOutcome, ToolFault};
pub use symbols::ResolvedSymbols;
pub use test_case::{ArchTag, NameError, TestCase, Virt};
