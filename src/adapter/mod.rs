//! Adapters: typed views over raw ring slots
//!
//! - Block: fixed header followed by an element array (sampling streams)
//! - Message: exactly one `Pod` value per slot

mod block;
mod message;

pub use block::{BlockAdapter, BlockConsumer, BlockProducer, BlockReadSlot, BlockWriteSlot};
pub use message::{message_channel, MessageConsumer, MessageProducer};
