pub mod artifact;
pub mod event;
pub mod function;
pub mod render;
pub mod reporter;
pub mod script;
pub mod types;

pub use artifact::{EventReport, FunctionReport, ScriptReport};
pub use event::{Event, filter_frames};
pub use function::Function;
pub use render::{ReportFormat, render_html, write_report};
pub use reporter::{GeneratedReport, Reporter, discard_current, take_current, with_current};
pub use script::Script;
pub use types::{DEFAULT_FUNCTION_TITLE, DEFAULT_SCRIPT_TITLE, ReportError, ReportResult, Status};
