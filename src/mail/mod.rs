pub mod gmail;

pub use gmail::{GmailMailer, OAuthCredentials};
