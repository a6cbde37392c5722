pub mod browser_tool;

pub use browser_tool::{BrowserError, BrowserTool, PageFetcher, BROWSER_TOOL};
