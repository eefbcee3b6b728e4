//! Turns view models into output: askama HTML for embedding, plain text for the terminal.

pub mod admin;
pub mod text;
pub mod views;
