pub mod config;
pub mod errors;
pub mod extraction;
pub mod invocation;
pub mod ports;

pub use errors::{BridgeError, ErrorKind};
pub use extraction::{parse_structured, strip_code_fences, MeetingFields, StructuredRecord};
pub use invocation::{CommandInvocation, OutboundNotification};
pub use ports::{
    CalendarProvider, EmailSummary, InboxSummary, LanguageModel, MailProvider, Messenger,
    NewCalendarEvent, TaskBoardProvider, TrelloCard, TrelloCardDetails,
};
