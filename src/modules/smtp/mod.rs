pub mod client;
pub mod delivery;
pub mod mailbox;
pub mod template;
pub mod transport;
pub mod util;
