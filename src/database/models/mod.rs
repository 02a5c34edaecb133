pub mod config;
pub mod diary;
pub mod session;
pub mod user;

pub use config::{GlobalConfigEntity, SessionSettingsEntity, SessionSettingsUpdate};
pub use diary::{DiaryEntryEntity, DiaryEntryPatch, NewDiaryEntry};
pub use session::{NewSession, SessionEntity};
pub use user::{NewUser, UserEntity};
