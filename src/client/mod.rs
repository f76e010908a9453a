pub mod http;
pub mod meetings;
pub mod pagination;
pub mod reports;
pub mod retry;
pub mod types;
pub mod users;

pub use http::{ClientOptions, ZoomClient};
pub use pagination::{MAX_PAGE_SIZE, Page, PageRequest, collect_all};
pub use retry::RetryConfig;
pub use types::{Meeting, MeetingListType, Participant, ReportMeeting, User, UserStatus};
