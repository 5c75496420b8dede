pub mod admin_console;
pub mod admin_layout;
pub mod element_access;
pub mod login;
pub mod report_writer;
pub mod review_backend;

pub use admin_console::AdminConsole;
pub use admin_layout::AdminLayout;
pub use element_access::{ElementAccess, RetryPolicy};
pub use login::LoginService;
pub use report_writer::{ConsoleReporter, JsonReportWriter, MultiReporter, Reporter};
pub use review_backend::{ReviewBackend, RowPick, ToggleChange, UnitToggle};
