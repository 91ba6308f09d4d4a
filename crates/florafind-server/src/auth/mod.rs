//! Authentication primitives: password hashing, signed tokens and account mail

pub mod mailer;
pub mod password;
pub mod token;

pub use mailer::{LogMailer, MailError, Mailer, MemoryMailer, OutgoingMail};
pub use token::{Claims, JwtAlgorithm, TokenError, TokenKind, TokenPair, TokenService};
