mod app;
mod config;
mod message;
mod model;
mod utils;
mod views;

use clap::Parser;

pub fn main() -> iced::Result {
    app::run(config::Args::parse())
}
