// Adapters layer: concrete implementations of the domain ports (storage, files, notifications, time).

pub mod clock;
pub mod file_source;
pub mod notify;
pub mod storage;

pub use clock::{FixedClock, SystemClock};
pub use file_source::{PathSource, TextSource};
pub use notify::{ConsoleNotifier, RecordingNotifier};
pub use storage::{FileStorage, MemoryStorage};
