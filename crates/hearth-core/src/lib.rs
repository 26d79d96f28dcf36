//! hearth-core - Core library for Hearth
//!
//! Client-side logic for a couple's shared page: the live location map,
//! gallery and public content, and the private work dashboard with its
//! calendar. Persistence, auth, file storage and change fan-out belong to the
//! hosted backend; this crate reads from it and writes to it.

pub mod auth;
pub mod backend;
pub mod calendar;
pub mod command;
pub mod config;
pub mod error;
pub mod format;
pub mod live_map;
pub mod models;
pub mod notice;
pub mod optimistic;
pub mod public;
pub mod realtime;
pub mod storage;
pub mod util;
pub mod work;

pub use backend::{Backend, InMemoryBackend, Query, RestBackend, Table};
pub use calendar::{CalendarBoard, CalendarItem, ItemKey, ItemKind, VisibleRange};
pub use command::{Command, Interaction, Tab};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use live_map::{LiveMapView, LocationSharing, MarkerReconciler};
pub use models::{LiveLocation, Task, TaskId, UserId};
pub use notice::{Notice, NoticeLevel};
pub use public::PublicPage;
pub use realtime::{ChangeFeed, PollingFeed, Subscription};
pub use storage::{InMemoryStorage, ObjectStorage, SupabaseStorage, Upload};
pub use work::WorkDashboard;
