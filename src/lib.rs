//! Hands-free code typing: a webcam gaze signal drives a dwell keyboard, spoken commands drive
//! edits, and both feed one editor through a shared typing gate.

pub mod action;
pub mod calibration;
pub mod command;
pub mod config;
pub mod dwell;
pub mod editor;
pub mod error;
pub mod fuzzy;
pub mod gaze;
pub mod mapper;
pub mod pipeline;
pub mod state;
pub mod status_bar;
pub mod voice;
