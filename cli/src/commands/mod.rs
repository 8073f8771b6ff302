pub mod cli;
pub mod edit;
pub mod run;
