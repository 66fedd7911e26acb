//! RFC 5545 output.
//!
//! Text rules live in `text`, date-times in `time`; `generate` and `diary`
//! build the components.

pub mod diary;
pub mod generate;
pub mod text;
pub mod time;

pub use diary::{DiaryRenderer, SexpDiaryRenderer};
pub use generate::{EntryFields, ical_priority, valarm, vevent, vtodo};
pub use text::{escape, fold, to_crlf};
pub use time::{StampZone, TimeSettings, normalize};
