pub mod admin;
pub mod auth;
pub mod gate;
pub mod institution;
pub mod landing;
pub mod responses;
pub mod router;
pub mod state;
pub mod templates;
pub mod uploads;
pub mod verify;

pub use auth::SESSION_COOKIE;
pub use state::AppState;
pub use templates::escape_html;
