pub mod fetch;
pub mod publish;
pub mod setup;
pub mod ui;
