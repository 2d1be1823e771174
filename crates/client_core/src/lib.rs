pub mod api;
pub mod controller;
pub mod error;
pub mod i18n;
pub mod navigation;
pub mod scheduler;
pub mod session;

pub use api::{HttpProfileApi, ProfileApi, ProfileLookup};
pub use controller::{
    ControllerOptions, ProfileRender, ProfileStatusController, ViewEvent, ViewPhase,
    DEFAULT_POLL_INTERVAL,
};
pub use error::{CatalogError, EndpointError};
pub use i18n::{Locale, MessageCatalog};
pub use navigation::{Navigator, RecordingNavigator, Route};
pub use scheduler::PeriodicTask;
pub use session::{CurrentUser, UserStore};
