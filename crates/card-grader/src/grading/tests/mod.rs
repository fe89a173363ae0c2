mod common;
mod scenarios;
