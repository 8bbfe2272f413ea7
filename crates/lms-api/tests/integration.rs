mod common;

mod achievement_tests;
mod progress_tests;
