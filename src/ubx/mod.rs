pub(crate) mod checksum;
pub mod cfg_val;
pub mod packets;
pub mod parser;

pub use parser::{UbxFrame, UbxParser};
