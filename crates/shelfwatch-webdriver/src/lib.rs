//! W3C WebDriver implementation of the engine's page capability.
//!
//! Speaks the WebDriver JSON protocol over HTTP against a driver endpoint
//! (chromedriver, or a Selenium hub in front of one). One
//! [`WebDriverSession`] wraps one remote browser session;
//! [`WebDriverFactory`] creates them and plugs into the engine's restart
//! escalation.

mod client;
mod error;
mod factory;
mod protocol;

pub use client::WebDriverSession;
pub use error::WebDriverError;
pub use factory::WebDriverFactory;
