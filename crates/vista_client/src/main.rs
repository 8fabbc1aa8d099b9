mod app;
mod input;
mod model;
mod pacing;
mod renderer;
mod settings;

fn main() {
    app::run();
}
