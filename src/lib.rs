//! The code behind my personal site. It has two halves that share the
//! [`article`] model:
//!
//! 1. A browser module, compiled to WebAssembly with
//!    `--no-default-features`, which moves between the home and writing pages
//!    without full reloads ([`transition`]) and runs the writing page itself
//!    ([`renderer`]). The DOM glue lives in `web`; everything above it is
//!    written against small traits so it can be tested natively.
//! 2. The `sync-substack` binary (the default `sync` feature), which reads
//!    the Substack RSS feed ([`feed`]), backfills truncated posts
//!    ([`extract`]), and rewrites `data/articles.json` ([`sync`]).
//!
//! A transition is a pipeline of awaited stages: fade the current content
//! out, close the decorative lanes ([`lanes`]), preload the writing
//! stylesheet, fetch and parse the destination ([`page`]), swap the body, fade
//! back in, and finally record the history entry. Any failure falls back to a
//! plain browser navigation.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod alignment;
pub mod article;
pub mod lanes;
pub mod navigation;
pub mod page;
pub mod renderer;
pub mod transition;

#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(feature = "sync")]
pub mod config;
#[cfg(feature = "sync")]
pub mod extract;
#[cfg(feature = "sync")]
pub mod feed;
#[cfg(feature = "sync")]
pub mod sync;
