pub mod popup;

pub use popup::{Popup, PopupManager};
