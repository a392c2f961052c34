//! # yuki-channels
//!
//! Messaging platform integrations for Yuki.

pub mod telegram;
