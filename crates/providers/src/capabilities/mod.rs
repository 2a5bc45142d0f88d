//! One [`Capability`](crate::Capability) per request/response action family.

mod contact_photo;
mod contacts;
mod messages;
mod sender;
mod sim_cards;
mod user_profile;

pub use contact_photo::{
    ContactPhoto, PhotoRequest, CONTACTS_AUTHORITY_URI, GET_CONTACT_PHOTO_ACTION, PHOTO_COLUMN,
};
pub use contacts::{phone_lookup_uri, Contacts, GET_CONTACT_ACTION, PHONE_LOOKUP_URI};
pub use messages::Messages;
pub use sender::{Sender, SEND_SMS_ACTION};
pub use sim_cards::{SimCards, GET_SIM_CARDS_ACTION};
pub use user_profile::{
    entity_uri, UserProfile, CONTACTS_URI, GET_USER_PROFILE_ACTION, PHONE_MIMETYPE, PROFILE_URI,
};
