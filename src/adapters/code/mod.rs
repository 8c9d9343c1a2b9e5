//! Join code generators.

mod fixed;
mod random;

pub use fixed::FixedCodeGenerator;
pub use random::RandomCodeGenerator;
