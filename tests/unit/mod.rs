pub mod config_tests;
pub mod transcoder_tests;
