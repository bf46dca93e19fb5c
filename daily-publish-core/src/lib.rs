#![doc = "daily-publish-core: pipeline library for publishing a daily content bundle."]

//! Everything between "here is a bundle name" and "the document is pushed":
//! asset discovery and backup, WAV duration parsing, Markov text generation,
//! interactive review, record persistence, rendering, git publication and the
//! local mirror.
//!
//! Collaborators with side effects sit behind the traits in [`contract`], so the
//! CLI wires in real implementations and tests wire in mocks.
//!
//! # Usage
//! Build a [`pipeline::Services`] and call [`pipeline::publish`].

pub mod artwork;
pub mod config;
pub mod contract;
pub mod discover;
pub mod duration;
pub mod error;
pub mod markov;
pub mod mirror;
pub mod model;
pub mod pipeline;
pub mod player;
pub mod prompt;
pub mod render;
pub mod review;
pub mod vcs;
