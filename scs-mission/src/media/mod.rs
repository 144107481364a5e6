//! Upload gate: content sniffing and the media validator.

pub mod sniff;
pub mod validator;

pub use sniff::detect_content_type;
pub use validator::{MediaValidator, DEFAULT_MAX_BYTES, DEFAULT_SNIFF_LEN};
