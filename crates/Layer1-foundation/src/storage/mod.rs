//! Storage module for aiexec
//!
//! - `json`: JSON - 설정 파일 저장/로드

mod json;

pub use json::{JsonStore, CONFIG_DIR_NAME};
