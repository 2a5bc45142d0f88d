pub mod call;
pub mod info;
pub mod listen;
pub mod output;
pub mod query;
pub mod send;

pub use call::{cmd_call, CallArgs};
pub use info::cmd_info;
pub use listen::{cmd_listen, ListenArgs};
pub use query::{
    cmd_contact, cmd_messages, cmd_photo, cmd_profile, cmd_sims, ContactArgs, MessagesArgs,
    PhotoArgs,
};
pub use send::{cmd_send, SendArgs};
