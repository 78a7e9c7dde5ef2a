//! Anthropic ↔ responses 方言转换

mod request;
mod response;

pub use request::translate_anthropic_to_responses;
pub use response::convert_responses_json_to_anthropic;
