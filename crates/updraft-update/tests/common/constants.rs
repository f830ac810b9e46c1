//! Shared constants for test infrastructure

// Application identifiers
pub const APP_ID: &str = "TestApp";
pub const OTHER_APP_ID: &str = "OtherApp";

// Versions
pub const VERSION_1_0_0_0: &str = "1.0.0.0";
pub const VERSION_2_0_0_0: &str = "2.0.0.0";

// Server paths
pub const MANIFEST_PATH: &str = "/updates.xml";
pub const ARTIFACT_PATH: &str = "/downloads/TestApp.bin";

// Payloads
pub const ARTIFACT_CONTENT: &[u8] = b"updraft test artifact payload";
pub const WRONG_MD5: &str = "00000000000000000000000000000000";

/// Lowercase hex MD5 of `data`
pub fn md5_hex(data: &[u8]) -> String {
    use md5::{Digest, Md5};
    format!("{:x}", Md5::digest(data))
}
