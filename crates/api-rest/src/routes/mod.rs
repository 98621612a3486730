pub mod antrol;
pub mod mapping;
pub mod queue;
pub mod report;
pub mod team;
pub mod verification;
