// Library root
// -----------
// Client for a remote meme generation service, plus the terminal front-end
// used by the binary.
//
// Module responsibilities:
// - `backend`: where the service lives (default URL, persisted override).
// - `api`: one async function per service endpoint, sharing a single
//   request/error-translation path.
// - `error`: the typed error every call resolves to on failure.
// - `types`: request and response shapes.
// - `ui`: interactive menus built on top of `api`.
pub mod api;
pub mod backend;
pub mod error;
pub mod types;
pub mod ui;

pub use api::ApiClient;
pub use backend::{BackendLocator, FileStorage, MemoryStorage, Storage};
pub use error::{MemeError, Result};
pub use types::{ImageRef, ImageResponse, MemeInfo, MemeOptions, SortBy, UploadImageResponse};
