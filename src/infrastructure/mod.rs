// 基础设施模块
// 令牌签发、信封加密与邮件发送

pub mod crypto;
pub mod mail;
pub mod token;

pub use mail::{LogMailer, Mailer, OutgoingMail, SmtpMailer};
pub use token::{Claims, TokenPair, TokenService, TokenType};
