//! chromiumoxide 浏览器驱动

pub mod chrome;
pub mod launch;

pub use chrome::ChromeDriver;
pub use launch::ChromeLauncher;
