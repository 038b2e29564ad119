pub mod app;
pub mod domain;
pub mod infra;

pub use app::locator::ApplicationNameLocator;
pub use domain::document::Document;
pub use domain::errors::LocateError;
pub use domain::model::{ApplicationEntry, Located, Selection, Span};
