pub mod config;
pub mod error;
pub mod frontmatter;
pub mod ids;
pub mod manifest;
pub mod menu;
pub mod nav;
pub mod notion;
pub mod pages;
pub mod resolve;
pub mod segment;
pub mod stamp;
pub mod sync;
