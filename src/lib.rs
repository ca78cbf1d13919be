//! Provisioner for the resized images bucket
//!
//! Declares the S3 bucket that stores resized and compressed images served
//! through CloudFront, the resource policy letting CloudFront read and the
//! resize edge function write, and the exports other stacks use to find it.

pub mod app;
pub mod backend;
pub mod bucket;
pub mod error;
pub mod exports;
pub mod models;
pub mod policy;
pub mod provisioner;
pub mod role;
pub mod template;

pub use error::{Error, Result};
