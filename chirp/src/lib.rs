//! Chirp client core.
//!
//! Headless view models for a micro-blogging client (timeline, composer,
//! post editor, authentication forms, profile page, route guard) over three
//! backend collaborators: an identity provider, a document store with live
//! queries, and a blob store.

pub mod auth;
pub mod backend;
pub mod composer;
pub mod config;
pub mod errors;
pub mod feed;
pub mod forms;
pub mod id;
pub mod keys;
pub mod model;
pub mod post;
pub mod profile;
pub mod routes;
pub mod validators;

pub use backend::{BlobStore, DocumentStore, IdentityProvider, Query, SortOrder, Subscription};
pub use composer::Composer;
pub use config::{ChirpConfig, Limits};
pub use errors::*;
pub use feed::{ProfileFeed, Timeline};
pub use forms::SubmitOutcome;
pub use model::{Identity, PhotoFile, Post};
pub use post::{DeleteOutcome, Editor, PostItem, delete_post, remove_photo};
pub use profile::{NameEditor, ProfileView};
pub use routes::{Gate, Route, guard, resolve};

pub use redis;
