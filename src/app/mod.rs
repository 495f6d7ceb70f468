//! Application wiring - shared state, console input and presentation

pub mod input;
pub mod presenter;
pub mod state;

pub use presenter::{ConsolePresenter, Presenter};
pub use state::AppState;
