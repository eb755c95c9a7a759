
pub use self::buffer_services::{failing_buffers, heap_buffers, segmented};
pub use self::openers::once_opener;
pub use self::scripted_transport::ScriptedTransport;
