pub mod cache;
pub mod client;
pub mod decode;
pub mod normalize;
pub mod writer;

pub use cache::{CacheEntry, CacheKey, SheetCache};
pub use client::SheetClient;
pub use decode::{decode_response, Cell, Column, Row, Table};
pub use normalize::Normalizer;
pub use writer::{LogWriter, SheetWriter, WebhookWriter};
